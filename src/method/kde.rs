//! Density-kernel adapter: multivariate product-kernel density estimation
//!
//! ## Kernels
//!
//! - Continuous (`c`): Gaussian, scaled by the column bandwidth `h`
//! - Discrete (`u`): Aitchison-Aitken, `1 - λ` on a match and `λ / (c - 1)`
//!   otherwise, where `c` is the number of levels observed in training
//!
//! `pdf(x) = (1/n) Σ_i Π_j K_j(x_j, X_ij)`
//!
//! Discrete bandwidths are clamped to `[0, (c-1)/c]` after selection, which
//! statsmodels' `KDEMultivariate` does not do, so densities on discrete
//! columns are not statsmodels-identical.
//!
//! ## Scoring
//!
//! The test log-likelihood is `Σ ln pdf(x)` over test rows, except that a
//! density of exactly zero contributes `0` instead of `-inf`. Aggregates are
//! therefore not true log-likelihoods whenever some test row falls outside
//! the numerical support of the fitted density.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DensityMethod, NumericalWarning, WarningPolicy};
use crate::{Context, Error, Matrix, Result, Schema, VariableKind};

/// Method tag used in result paths.
pub const KDE_TAG: &str = "KDE";

/// Normal-reference rule-of-thumb constant.
const NORMAL_REFERENCE_SCALE: f64 = 1.06;

/// Smallest bandwidth used for a continuous column.
const MIN_CONTINUOUS_BANDWIDTH: f64 = 1e-8;

/// Golden-section iterations per column for `cv_ml`.
const CV_ML_ITERATIONS: usize = 24;

/// Search range of the `cv_ml` scale factor relative to normal reference.
const CV_ML_SCALE_RANGE: (f64, f64) = (0.05, 5.0);

/// `1 / sqrt(2π)`
const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Bandwidth-selection policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum BandwidthPolicy {
    /// `1.06 · σ · n^(-1/(4+q))` per column
    NormalReference,
    /// Maximum leave-one-out likelihood cross-validation
    CrossValidatedMl,
    /// Fixed bandwidths, one per column (or a single value for all columns)
    Fixed(Vec<f64>),
}

impl Default for BandwidthPolicy {
    fn default() -> Self {
        Self::NormalReference
    }
}

impl FromStr for BandwidthPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "normal_reference" => Ok(Self::NormalReference),
            "cv_ml" => Ok(Self::CrossValidatedMl),
            other => {
                let values = other
                    .split(',')
                    .map(|v| v.trim().parse::<f64>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| {
                        Error::InvalidConfig(format!(
                            "unknown bandwidth policy \"{other}\" (expected normal_reference, cv_ml, or comma-separated numbers)"
                        ))
                    })?;
                if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "fixed bandwidths must be finite and non-negative, got \"{other}\""
                    )));
                }
                Ok(Self::Fixed(values))
            }
        }
    }
}

impl fmt::Display for BandwidthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NormalReference => f.write_str("normal_reference"),
            Self::CrossValidatedMl => f.write_str("cv_ml"),
            Self::Fixed(values) => {
                let joined: Vec<String> = values.iter().map(f64::to_string).collect();
                f.write_str(&joined.join(","))
            }
        }
    }
}

impl From<BandwidthPolicy> for String {
    fn from(policy: BandwidthPolicy) -> Self {
        policy.to_string()
    }
}

impl TryFrom<String> for BandwidthPolicy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Kernel of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKernel {
    Gaussian,
    AitchisonAitken { levels: usize },
}

impl ColumnKernel {
    fn for_column(kind: VariableKind, data: &Matrix, col: usize) -> Self {
        match kind {
            VariableKind::Continuous => Self::Gaussian,
            VariableKind::Discrete => Self::AitchisonAitken {
                levels: distinct_levels(data, col),
            },
        }
    }

    /// Kernel weight of training value `xi` for query `x` at bandwidth `h`.
    fn weight(self, h: f64, xi: f64, x: f64) -> f64 {
        match self {
            Self::Gaussian => {
                let u = (x - xi) / h;
                INV_SQRT_2PI * (-0.5 * u * u).exp() / h
            }
            Self::AitchisonAitken { levels } => {
                if xi == x {
                    1.0 - h
                } else if levels > 1 {
                    #[allow(clippy::cast_precision_loss)]
                    let off = h / (levels - 1) as f64;
                    off
                } else {
                    0.0
                }
            }
        }
    }

    /// Largest admissible bandwidth for discrete kernels: the uniform kernel.
    fn max_lambda(self) -> Option<f64> {
        match self {
            Self::Gaussian => None,
            #[allow(clippy::cast_precision_loss)]
            Self::AitchisonAitken { levels } => {
                Some(if levels > 1 { (levels - 1) as f64 / levels as f64 } else { 0.0 })
            }
        }
    }
}

/// Number of distinct non-NaN values in a column.
fn distinct_levels(data: &Matrix, col: usize) -> usize {
    data.column(col)
        .filter(|v| !v.is_nan())
        .map(f64::to_bits)
        .collect::<FxHashSet<u64>>()
        .len()
}

/// Population standard deviation (ddof = 0) of a column, NaN ignored.
fn column_std(data: &Matrix, col: usize) -> f64 {
    let values: Vec<f64> = data.column(col).filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Fitted product-kernel density.
#[derive(Debug, Clone)]
pub struct KdeModel {
    data: Matrix,
    kernels: Vec<ColumnKernel>,
    bandwidths: Vec<f64>,
}

impl KdeModel {
    /// Fit a density to `data` under `schema` with the given bandwidth policy.
    ///
    /// Returns the model and any numerical warnings raised while choosing
    /// bandwidths.
    ///
    /// # Errors
    ///
    /// - [`Error::SchemaMismatch`] if `data` does not fit `schema`
    /// - [`Error::InvalidConfig`] if fixed bandwidths do not match the column count
    /// - [`Error::Numerical`] if `data` has no rows
    pub fn fit(
        data: &Matrix,
        schema: &Schema,
        policy: &BandwidthPolicy,
    ) -> Result<(Self, Vec<NumericalWarning>)> {
        schema.validate(data, "KDE training data")?;
        if data.is_empty() {
            return Err(Error::Numerical(
                "cannot fit a kernel density to zero rows".to_string(),
            ));
        }

        let kernels: Vec<ColumnKernel> = schema
            .kinds()
            .iter()
            .enumerate()
            .map(|(col, &kind)| ColumnKernel::for_column(kind, data, col))
            .collect();

        let mut warnings = Vec::new();
        let raw = match policy {
            BandwidthPolicy::NormalReference => normal_reference(data),
            BandwidthPolicy::CrossValidatedMl => {
                let start = normal_reference(data);
                let start = sanitize(&kernels, start, &mut warnings);
                cv_ml(data, &kernels, start)
            }
            BandwidthPolicy::Fixed(values) => match values.len() {
                1 => vec![values[0]; data.cols()],
                n if n == data.cols() => values.clone(),
                n => {
                    return Err(Error::InvalidConfig(format!(
                        "{n} fixed bandwidths given for {} columns",
                        data.cols()
                    )))
                }
            },
        };
        let bandwidths = sanitize(&kernels, raw, &mut warnings);

        debug!(?bandwidths, policy = %policy, "kde bandwidths selected");
        Ok((
            Self {
                data: data.clone(),
                kernels,
                bandwidths,
            },
            warnings,
        ))
    }

    /// Selected bandwidth of every column
    #[must_use]
    pub fn bandwidths(&self) -> &[f64] {
        &self.bandwidths
    }

    /// Density at `x`.
    #[must_use]
    pub fn pdf(&self, x: &[f64]) -> f64 {
        let total: f64 = self
            .data
            .iter_rows()
            .map(|row| self.kernel_product(row, x))
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let n = self.data.rows() as f64;
        total / n
    }

    /// Density at every row of `test`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if `test` has the wrong column count
    pub fn pdf_rows(&self, test: &Matrix) -> Result<Vec<f64>> {
        if test.cols() != self.kernels.len() {
            return Err(Error::SchemaMismatch {
                context: "KDE test data".to_string(),
                expected: self.kernels.len(),
                actual: test.cols(),
            });
        }
        Ok(test.iter_rows().map(|x| self.pdf(x)).collect())
    }

    /// Total test log-likelihood with zero-density rows contributing 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if `test` has the wrong column count
    pub fn total_log_likelihood(&self, test: &Matrix) -> Result<f64> {
        Ok(sum_log_densities(&self.pdf_rows(test)?))
    }

    fn kernel_product(&self, row: &[f64], x: &[f64]) -> f64 {
        self.kernels
            .iter()
            .zip(&self.bandwidths)
            .zip(row.iter().zip(x))
            .map(|((kernel, &h), (&xi, &xj))| kernel.weight(h, xi, xj))
            .product()
    }
}

/// `Σ ln d` over densities, with `ln 0` replaced by `0`.
#[must_use]
pub fn sum_log_densities(densities: &[f64]) -> f64 {
    densities
        .iter()
        .map(|&d| if d == 0.0 { 0.0 } else { d.ln() })
        .sum()
}

fn normal_reference(data: &Matrix) -> Vec<f64> {
    #[allow(clippy::cast_precision_loss)]
    let (n, q) = (data.rows() as f64, data.cols() as f64);
    let factor = NORMAL_REFERENCE_SCALE * n.powf(-1.0 / (4.0 + q));
    (0..data.cols())
        .map(|col| factor * column_std(data, col))
        .collect()
}

/// Clamp discrete bandwidths to `[0, (c-1)/c]` and floor continuous ones.
fn sanitize(
    kernels: &[ColumnKernel],
    mut bandwidths: Vec<f64>,
    warnings: &mut Vec<NumericalWarning>,
) -> Vec<f64> {
    for (col, (kernel, h)) in kernels.iter().zip(bandwidths.iter_mut()).enumerate() {
        match kernel.max_lambda() {
            Some(max) => *h = h.clamp(0.0, max),
            None if !(*h > 0.0) || !h.is_finite() => {
                warnings.push(NumericalWarning::new(
                    "kde",
                    format!("column {col} has bandwidth {h}, using {MIN_CONTINUOUS_BANDWIDTH}"),
                ));
                *h = MIN_CONTINUOUS_BANDWIDTH;
            }
            None => {}
        }
    }
    bandwidths
}

/// Leave-one-out log-likelihood of the training data.
fn loo_log_likelihood(data: &Matrix, kernels: &[ColumnKernel], bandwidths: &[f64]) -> f64 {
    let n = data.rows();
    if n < 2 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| {
            let x = data.row(i);
            let total: f64 = (0..n)
                .filter(|&k| k != i)
                .map(|k| {
                    kernels
                        .iter()
                        .zip(bandwidths)
                        .zip(data.row(k).iter().zip(x))
                        .map(|((kernel, &h), (&xi, &xj))| kernel.weight(h, xi, xj))
                        .product::<f64>()
                })
                .sum();
            (total / denom).max(f64::MIN_POSITIVE).ln()
        })
        .sum()
}

/// Coordinate-wise golden-section search maximizing the leave-one-out likelihood.
fn cv_ml(data: &Matrix, kernels: &[ColumnKernel], start: Vec<f64>) -> Vec<f64> {
    let mut bandwidths = start;
    for col in 0..kernels.len() {
        let (lo, hi) = match kernels[col].max_lambda() {
            Some(max) => (0.0, max),
            None => (
                bandwidths[col] * CV_ML_SCALE_RANGE.0,
                bandwidths[col] * CV_ML_SCALE_RANGE.1,
            ),
        };
        if hi <= lo {
            continue;
        }
        let mut trial = bandwidths.clone();
        let best = golden_section_max(lo, hi, CV_ML_ITERATIONS, |h| {
            trial[col] = h;
            loo_log_likelihood(data, kernels, &trial)
        });
        trial[col] = best;
        // Keep the previous bandwidth unless the search improved on it
        if loo_log_likelihood(data, kernels, &trial) > loo_log_likelihood(data, kernels, &bandwidths) {
            bandwidths[col] = best;
        }
    }
    bandwidths
}

fn golden_section_max(mut lo: f64, mut hi: f64, iterations: usize, mut f: impl FnMut(f64) -> f64) -> f64 {
    let ratio = (5f64.sqrt() - 1.0) / 2.0;
    let mut a = hi - ratio * (hi - lo);
    let mut b = lo + ratio * (hi - lo);
    let mut fa = f(a);
    let mut fb = f(b);
    for _ in 0..iterations {
        if fa >= fb {
            hi = b;
            b = a;
            fb = fa;
            a = hi - ratio * (hi - lo);
            fa = f(a);
        } else {
            lo = a;
            a = b;
            fa = fb;
            b = lo + ratio * (hi - lo);
            fb = f(b);
        }
    }
    (lo + hi) / 2.0
}

/// Kernel density estimation method.
#[derive(Debug, Clone, Default)]
pub struct KdeMethod {
    bandwidth: BandwidthPolicy,
    warnings: WarningPolicy,
}

impl KdeMethod {
    /// Create a KDE method with the given bandwidth policy.
    #[must_use]
    pub const fn new(bandwidth: BandwidthPolicy) -> Self {
        Self {
            bandwidth,
            warnings: WarningPolicy::Log,
        }
    }

    /// Bandwidth policy
    #[must_use]
    pub const fn bandwidth(&self) -> &BandwidthPolicy {
        &self.bandwidth
    }
}

impl DensityMethod for KdeMethod {
    type Model = KdeModel;

    fn tag(&self) -> &str {
        KDE_TAG
    }

    fn fit(&self, train: &Matrix, context: &mut Context) -> Result<KdeModel> {
        let (model, warnings) = KdeModel::fit(train, context.schema(), &self.bandwidth)?;
        self.warnings.report(KDE_TAG, &warnings);
        Ok(model)
    }

    fn score(&self, model: &KdeModel, test: &Matrix) -> Result<f64> {
        model.total_log_likelihood(test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(types: &str) -> Schema {
        Schema::from_type_string(types).unwrap()
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "normal_reference".parse::<BandwidthPolicy>().unwrap(),
            BandwidthPolicy::NormalReference
        );
        assert_eq!("cv_ml".parse::<BandwidthPolicy>().unwrap(), BandwidthPolicy::CrossValidatedMl);
        assert_eq!(
            "0.5, 1".parse::<BandwidthPolicy>().unwrap(),
            BandwidthPolicy::Fixed(vec![0.5, 1.0])
        );
        assert!("silverman".parse::<BandwidthPolicy>().is_err());
        assert!("-1".parse::<BandwidthPolicy>().is_err());
    }

    #[test]
    fn test_policy_display_roundtrip() {
        for text in ["normal_reference", "cv_ml", "0.5,2"] {
            let policy: BandwidthPolicy = text.parse().unwrap();
            assert_eq!(policy.to_string(), text);
        }
    }

    #[test]
    fn test_single_point_gaussian_density() {
        let data = Matrix::from_rows(&[vec![0.0]]).unwrap();
        let (model, _) = KdeModel::fit(&data, &schema("c"), &BandwidthPolicy::Fixed(vec![1.0])).unwrap();
        assert!((model.pdf(&[0.0]) - INV_SQRT_2PI).abs() < 1e-15);
        let expected = INV_SQRT_2PI * (-0.5f64).exp();
        assert!((model.pdf(&[1.0]) - expected).abs() < 1e-15);
    }

    #[test]
    fn test_aitchison_aitken_density() {
        // Levels {0, 1, 2}; lambda 0.3 -> 0.7 on match, 0.15 otherwise
        let data = Matrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0], vec![0.0]]).unwrap();
        let (model, _) = KdeModel::fit(&data, &schema("u"), &BandwidthPolicy::Fixed(vec![0.3])).unwrap();
        let expected = (0.7 + 0.15 + 0.15 + 0.7) / 4.0;
        assert!((model.pdf(&[0.0]) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_discrete_bandwidth_clamped_to_uniform() {
        let data = Matrix::from_rows(&[vec![0.0], vec![1.0]]).unwrap();
        let (model, _) = KdeModel::fit(&data, &schema("u"), &BandwidthPolicy::Fixed(vec![5.0])).unwrap();
        assert!((model.bandwidths()[0] - 0.5).abs() < 1e-12);
        // Uniform kernel over two levels
        assert!((model.pdf(&[0.0]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_normal_reference_bandwidth() {
        let data = Matrix::from_rows(&[vec![1.0], vec![3.0]]).unwrap();
        let (model, warnings) = KdeModel::fit(&data, &schema("c"), &BandwidthPolicy::NormalReference).unwrap();
        assert!(warnings.is_empty());
        // std (ddof 0) = 1, n = 2, q = 1
        let expected = 1.06 * 2f64.powf(-1.0 / 5.0);
        assert!((model.bandwidths()[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_warns() {
        let data = Matrix::from_rows(&[vec![2.0], vec![2.0], vec![2.0]]).unwrap();
        let (model, warnings) = KdeModel::fit(&data, &schema("c"), &BandwidthPolicy::NormalReference).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(model.bandwidths()[0] > 0.0);
    }

    #[test]
    fn test_fixed_bandwidth_count_mismatch() {
        let data = Matrix::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
        let err = KdeModel::fit(&data, &schema("ccc"), &BandwidthPolicy::Fixed(vec![1.0, 1.0])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_substitution() {
        assert_eq!(sum_log_densities(&[0.0, 0.0, 0.0]), 0.0);
        let mixed = sum_log_densities(&[0.0, 1.0, std::f64::consts::E]);
        assert!((mixed - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_far_away_test_rows_score_zero() {
        let train = Matrix::from_rows(&[vec![0.0, 0.0], vec![0.5, -0.5], vec![-0.2, 0.1]]).unwrap();
        let test = Matrix::from_rows(&[vec![1.0e6, 1.0e6], vec![-1.0e6, 2.0e6]]).unwrap();
        let (model, _) = KdeModel::fit(&train, &schema("cc"), &BandwidthPolicy::Fixed(vec![1.0])).unwrap();
        assert!(model.pdf_rows(&test).unwrap().iter().all(|&d| d == 0.0));
        assert_eq!(model.total_log_likelihood(&test).unwrap(), 0.0);
    }

    #[test]
    fn test_cv_ml_improves_on_start() {
        let rows: Vec<Vec<f64>> = (0..30)
            .map(|i| {
                let x = f64::from(i) / 10.0;
                vec![x.sin() * 3.0, (x * 1.7).cos()]
            })
            .collect();
        let data = Matrix::from_rows(&rows).unwrap();
        let kernels = vec![ColumnKernel::Gaussian; 2];

        let start = normal_reference(&data);
        let tuned = cv_ml(&data, &kernels, start.clone());
        assert!(loo_log_likelihood(&data, &kernels, &tuned) >= loo_log_likelihood(&data, &kernels, &start) - 1e-9);
    }

    #[test]
    fn test_method_does_not_touch_context() {
        let mut ctx = Context::new(schema("cu"));
        let train = Matrix::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let test = Matrix::from_rows(&[vec![0.5, 1.0]]).unwrap();
        let before = ctx.clone();
        KdeMethod::default().fit_and_score(&train, &test, &mut ctx).unwrap();
        assert_eq!(ctx, before);
    }
}
