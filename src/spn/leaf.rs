//! Histogram leaves
//!
//! Discrete leaves put one bin on every category of the fold's domain.
//! Continuous leaves use equal-width bins over the domain range, with the bin
//! count chosen like numpy's `auto` rule (the finer of Sturges and
//! Freedman-Diaconis). Both apply Laplace smoothing.

use crate::context::Domain;

/// Laplace smoothing pseudo-count per bin.
pub const SMOOTHING_ALPHA: f64 = 1.0;

/// Smallest probability a leaf reports, so log-likelihoods stay finite.
pub const MIN_PROBABILITY: f64 = 1e-15;

/// Cap on continuous bins.
pub const MAX_BINS: usize = 1024;

/// Univariate histogram over one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramLeaf {
    var: usize,
    bins: Bins,
    log_densities: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
enum Bins {
    /// One bin per category value (sorted)
    Categories(Vec<f64>),
    /// Equal-width bins starting at `lo`
    Uniform { lo: f64, width: f64, count: usize },
}

impl HistogramLeaf {
    /// Fit a histogram for variable `var` on `values` (NaN ignored).
    #[must_use]
    pub fn fit(var: usize, values: &[f64], domain: &Domain) -> Self {
        let observed: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();

        let bins = match domain {
            Domain::Discrete { values } => Bins::Categories(values.clone()),
            Domain::Continuous { min, max } => uniform_bins(&observed, *min, *max),
        };

        let n_bins = bins.len();
        let mut counts = vec![0usize; n_bins];
        for &v in &observed {
            if let Some(b) = bins.locate(v) {
                counts[b] += 1;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let denom = observed.len() as f64 + n_bins as f64 * SMOOTHING_ALPHA;
        let width = bins.width();
        let log_densities = counts
            .iter()
            .map(|&c| {
                #[allow(clippy::cast_precision_loss)]
                let p = (c as f64 + SMOOTHING_ALPHA) / denom;
                (p / width).ln()
            })
            .collect();

        Self {
            var,
            bins,
            log_densities,
        }
    }

    /// Variable index this leaf models
    #[must_use]
    pub const fn var(&self) -> usize {
        self.var
    }

    /// Number of bins
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Log density (log probability for discrete variables) of `value`.
    ///
    /// `NaN` is marginalized out (log 1 = 0). Values outside the support get
    /// the floor probability.
    #[must_use]
    pub fn log_density(&self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        self.bins
            .locate(value)
            .map_or(MIN_PROBABILITY.ln(), |b| self.log_densities[b].max(MIN_PROBABILITY.ln()))
    }
}

impl Bins {
    fn len(&self) -> usize {
        match self {
            Self::Categories(values) => values.len().max(1),
            Self::Uniform { count, .. } => *count,
        }
    }

    fn width(&self) -> f64 {
        match self {
            Self::Categories(_) => 1.0,
            Self::Uniform { width, .. } => *width,
        }
    }

    fn locate(&self, v: f64) -> Option<usize> {
        match self {
            Self::Categories(values) => values.binary_search_by(|c| c.total_cmp(&v)).ok(),
            Self::Uniform { lo, width, count } => {
                let hi = lo + width * *count as f64;
                if v < *lo || v > hi {
                    return None;
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let b = ((v - lo) / width).floor() as usize;
                Some(b.min(count - 1))
            }
        }
    }
}

/// Equal-width bins over `[min, max]` sized by numpy's `auto` rule on `observed`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn uniform_bins(observed: &[f64], min: f64, max: f64) -> Bins {
    let range = max - min;
    if !(range > 0.0) || observed.len() < 2 {
        // Degenerate support: a single unit-width bin centered on the value
        let center = if range > 0.0 { (min + max) / 2.0 } else { min };
        return Bins::Uniform {
            lo: center - 0.5 * range.max(1.0),
            width: range.max(1.0),
            count: 1,
        };
    }

    let n = observed.len() as f64;
    let sturges_width = range / (n.log2() + 1.0);
    let fd_width = 2.0 * iqr(observed) * n.powf(-1.0 / 3.0);
    let width = if fd_width > 0.0 {
        sturges_width.min(fd_width)
    } else {
        sturges_width
    };

    let count = ((range / width).ceil() as usize).clamp(1, MAX_BINS);
    Bins::Uniform {
        lo: min,
        width: range / count as f64,
        count,
    }
}

/// Interquartile range with linear interpolation (numpy default).
fn iqr(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile(&sorted, 0.75) - percentile(&sorted, 0.25)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
