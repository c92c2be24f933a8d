//! Randomized Dependence Coefficient (Lopez-Paz et al., 2013)
//!
//! Every variable is copula-transformed (empirical CDF), passed through `k`
//! random sinusoidal projections, and the RDC of a pair is the largest
//! canonical correlation between their projected feature sets. Discrete
//! variables are one-hot encoded over their domain first.

use nalgebra::{DMatrix, SymmetricEigen};
use rand::rngs::StdRng;
use rand::Rng;

use crate::context::Domain;
use crate::method::NumericalWarning;
use crate::Matrix;

/// Number of random non-linear features per variable.
pub const RDC_FEATURES: usize = 10;

/// Projection scale `s` applied to the copula features.
const PROJECTION_SCALE: f64 = 1.0 / 6.0;

/// Eigenvalues below this fraction of the largest are treated as zero.
const EIGEN_CUTOFF: f64 = 1e-10;

/// Pairwise RDC of the columns `scope` over `rows` of `data`.
///
/// Returns a `scope.len() × scope.len()` symmetric matrix with ones on the
/// diagonal.
pub fn rdc_matrix(
    data: &Matrix,
    rows: &[usize],
    scope: &[usize],
    domains: &[&Domain],
    rng: &mut StdRng,
    warnings: &mut Vec<NumericalWarning>,
) -> Vec<Vec<f64>> {
    let features: Vec<DMatrix<f64>> = scope
        .iter()
        .zip(domains)
        .map(|(&col, domain)| {
            let values: Vec<f64> = rows.iter().map(|&r| data.get(r, col)).collect();
            random_features(&copula(&values, domain), rng)
        })
        .collect();

    let q = scope.len();
    let mut rdc = vec![vec![0.0; q]; q];
    for i in 0..q {
        rdc[i][i] = 1.0;
        for j in (i + 1)..q {
            let value = max_canonical_correlation(&features[i], &features[j]).unwrap_or_else(|| {
                warnings.push(NumericalWarning::new(
                    "rdc",
                    format!("degenerate features for columns {} and {}", scope[i], scope[j]),
                ));
                0.0
            });
            rdc[i][j] = value;
            rdc[j][i] = value;
        }
    }
    rdc
}

/// Empirical-CDF features of one variable (`n × d`).
///
/// Continuous variables give one column of normalized ranks; discrete ones
/// give a one-hot block over the domain. Missing values map to 0.5.
fn copula(values: &[f64], domain: &Domain) -> DMatrix<f64> {
    let n = values.len();
    match domain {
        Domain::Discrete { values: categories } if categories.len() > 1 => {
            let raw = DMatrix::from_fn(n, categories.len(), |r, c| {
                if values[r].to_bits() == categories[c].to_bits() {
                    1.0
                } else {
                    0.0
                }
            });
            let columns: Vec<Vec<f64>> = raw
                .column_iter()
                .map(|col| ecdf(&col.iter().copied().collect::<Vec<_>>()))
                .collect();
            DMatrix::from_fn(n, categories.len(), |r, c| columns[c][r])
        }
        _ => {
            let ranks = ecdf(values);
            DMatrix::from_fn(n, 1, |r, _| ranks[r])
        }
    }
}

/// `rank / n` with ties taking the maximum rank.
fn ecdf(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).filter(|&i| !values[i].is_nan()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut out = vec![0.5; n];
    #[allow(clippy::cast_precision_loss)]
    let total = n as f64;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        #[allow(clippy::cast_precision_loss)]
        let rank = (end + 1) as f64 / total;
        for &i in &order[start..=end] {
            out[i] = rank;
        }
        start = end + 1;
    }
    out
}

/// `sin(s/(d+1) · [U, 1] · W)` with `W ~ N(0, 1)` of shape `(d + 1) × k`.
fn random_features(copula: &DMatrix<f64>, rng: &mut StdRng) -> DMatrix<f64> {
    let (n, d) = copula.shape();
    let weights = DMatrix::from_fn(d + 1, RDC_FEATURES, |_, _| standard_normal(rng));
    #[allow(clippy::cast_precision_loss)]
    let scale = PROJECTION_SCALE / (d + 1) as f64;
    let augmented = DMatrix::from_fn(n, d + 1, |r, c| if c < d { copula[(r, c)] * scale } else { scale });
    (augmented * weights).map(f64::sin)
}

/// Box-Muller draw from N(0, 1).
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Largest canonical correlation between the columns of `x` and `y`.
///
/// `None` when either side has no variance.
fn max_canonical_correlation(x: &DMatrix<f64>, y: &DMatrix<f64>) -> Option<f64> {
    let x = center(x);
    let y = center(y);

    let cxx = x.transpose() * &x;
    let cyy = y.transpose() * &y;
    let cxy = x.transpose() * &y;

    let wx = inverse_sqrt(cxx)?;
    let wy = inverse_sqrt(cyy)?;
    let m = wx * cxy * wy;
    let top = m.singular_values().iter().copied().fold(0.0, f64::max);
    Some(top.clamp(0.0, 1.0))
}

fn center(m: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = m.clone();
    for mut col in out.column_iter_mut() {
        let mean = col.mean();
        col.add_scalar_mut(-mean);
    }
    out
}

/// Pseudo-inverse square root of a symmetric PSD matrix.
fn inverse_sqrt(m: DMatrix<f64>) -> Option<DMatrix<f64>> {
    let eigen = SymmetricEigen::new(m);
    let largest = eigen.eigenvalues.iter().copied().fold(0.0, f64::max);
    if largest <= 0.0 {
        return None;
    }
    let cutoff = largest * EIGEN_CUTOFF;
    let inv = eigen
        .eigenvalues
        .map(|l| if l > cutoff { 1.0 / l.sqrt() } else { 0.0 });
    let v = &eigen.eigenvectors;
    Some(v * DMatrix::from_diagonal(&inv) * v.transpose())
}
