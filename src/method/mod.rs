//! Method Adapters: density estimators behind one fit/score contract
//!
//! The cross-validation runner only knows [`DensityMethod`]. Each
//! implementation fits a model on a fold's training matrix and scores the
//! held-out matrix as a total log-likelihood.
//!
//! ## Implementations
//!
//! - [`KdeMethod`]: product-kernel density estimation
//! - [`SpnMethod`]: mixed sum-product network structure learning
//!
//! ## Timing
//!
//! [`DensityMethod::fit_and_score`] measures wall-clock time of the fit call
//! only. [`DensityMethod::prepare`] runs before the timer starts and scoring
//! after it stops, so neither is part of the reported learning time.

pub mod kde;
pub mod spn;

use std::fmt;
use std::time::Instant;

use tracing::{trace, warn};

use crate::{Context, FoldResult, Matrix, Result};

pub use kde::{BandwidthPolicy, KdeMethod, KdeModel};
pub use spn::SpnMethod;

/// A density estimation algorithm benchmarked by the runner.
pub trait DensityMethod {
    /// Fitted model, owned by the runner for one fold and then dropped
    type Model;

    /// Tag used in result paths and file names (e.g. `"KDE"`)
    fn tag(&self) -> &str;

    /// Untimed setup on the fold's training data, run before [`fit`](Self::fit).
    ///
    /// # Errors
    ///
    /// Any error is fatal to the fold and aborts the run
    fn prepare(&self, _train: &Matrix, _context: &mut Context) -> Result<()> {
        Ok(())
    }

    /// Fit a model on `train`.
    ///
    /// `context` belongs to the current fold only. Implementations may fill
    /// in its data-dependent domains.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the fold and aborts the run
    fn fit(&self, train: &Matrix, context: &mut Context) -> Result<Self::Model>;

    /// Total log-likelihood of `test` under `model`.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the fold and aborts the run
    fn score(&self, model: &Self::Model, test: &Matrix) -> Result<f64>;

    /// Prepare on `train`, fit on `train`, score `test`, and time the fit.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`prepare`](Self::prepare), [`fit`](Self::fit)
    /// and [`score`](Self::score)
    fn fit_and_score(&self, train: &Matrix, test: &Matrix, context: &mut Context) -> Result<FoldResult> {
        self.prepare(train, context)?;

        let started = Instant::now();
        let model = self.fit(train, context)?;
        let learning_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        let test_ll = self.score(&model, test)?;
        Ok(FoldResult::new(test_ll, learning_time_ms))
    }
}

/// Non-fatal numerical issue raised while fitting (degenerate column,
/// singular covariance, collapsed clustering, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericalWarning {
    /// Component that raised the warning
    pub source: &'static str,
    /// Description
    pub message: String,
}

impl NumericalWarning {
    /// Create a warning.
    pub fn new(source: &'static str, message: impl Into<String>) -> Self {
        Self {
            source,
            message: message.into(),
        }
    }
}

impl fmt::Display for NumericalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

/// What a method does with the numerical warnings of its estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningPolicy {
    /// Log every warning at `warn` level
    #[default]
    Log,
    /// Keep warnings out of the console (logged at `trace` only)
    Suppress,
}

impl WarningPolicy {
    /// Emit `warnings` according to this policy.
    pub fn report(self, method: &str, warnings: &[NumericalWarning]) {
        for warning in warnings {
            match self {
                Self::Log => warn!(method = method, "{warning}"),
                Self::Suppress => trace!(method = method, "suppressed: {warning}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Schema;

    /// Returns the row count of the test matrix as log-likelihood.
    struct CountingMethod;

    impl DensityMethod for CountingMethod {
        type Model = usize;

        fn tag(&self) -> &str {
            "COUNT"
        }

        fn fit(&self, train: &Matrix, _context: &mut Context) -> Result<usize> {
            Ok(train.rows())
        }

        fn score(&self, model: &usize, test: &Matrix) -> Result<f64> {
            #[allow(clippy::cast_precision_loss)]
            Ok((model + test.rows()) as f64)
        }
    }

    #[test]
    fn test_fit_and_score_default() {
        let schema = Schema::from_type_string("c").unwrap();
        let mut ctx = Context::new(schema);
        let train = Matrix::from_rows(&[vec![1.0], vec![2.0]]).unwrap();
        let test = Matrix::from_rows(&[vec![1.0]]).unwrap();

        let result = CountingMethod.fit_and_score(&train, &test, &mut ctx).unwrap();
        assert!((result.test_ll() - 3.0).abs() < f64::EPSILON);
        assert!(result.learning_time_ms() >= 0.0);
    }

    /// Sleeps in `prepare` and records whether it ran before `fit`.
    struct SlowPrepare;

    impl DensityMethod for SlowPrepare {
        type Model = bool;

        fn tag(&self) -> &str {
            "SLOW"
        }

        fn prepare(&self, train: &Matrix, context: &mut Context) -> Result<()> {
            std::thread::sleep(std::time::Duration::from_millis(50));
            context.add_domains(train)
        }

        fn fit(&self, _train: &Matrix, context: &mut Context) -> Result<bool> {
            Ok(context.has_domains())
        }

        fn score(&self, prepared: &bool, _test: &Matrix) -> Result<f64> {
            Ok(if *prepared { 1.0 } else { 0.0 })
        }
    }

    #[test]
    fn test_prepare_runs_before_fit_and_is_not_timed() {
        let mut ctx = Context::new(Schema::from_type_string("c").unwrap());
        let train = Matrix::from_rows(&[vec![1.0], vec![2.0]]).unwrap();
        let test = Matrix::from_rows(&[vec![1.0]]).unwrap();

        let result = SlowPrepare.fit_and_score(&train, &test, &mut ctx).unwrap();
        assert!((result.test_ll() - 1.0).abs() < f64::EPSILON);
        assert!(result.learning_time_ms() < 50.0);
    }

    #[test]
    fn test_warning_display() {
        let w = NumericalWarning::new("kde", "constant column 2");
        assert_eq!(w.to_string(), "kde: constant column 2");
    }
}
