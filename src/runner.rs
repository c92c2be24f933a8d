//! Cross-Validation Runner
//!
//! Drives one [`DensityMethod`] over every fold of a [`FoldSet`], in fold
//! order, and averages the per-fold metrics. The first failing fold aborts
//! the run; nothing is retried.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::data::FoldSet;
use crate::method::DensityMethod;
use crate::results::{self, AggregateResult};
use crate::Result;

/// Runner options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Log every fold's metrics as it completes
    pub fold_log: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { fold_log: true }
    }
}

/// Sequential k-fold cross-validation driver.
#[derive(Debug, Clone, Default)]
pub struct CrossValidationRunner {
    config: RunnerConfig,
}

impl CrossValidationRunner {
    /// Create a runner.
    #[must_use]
    pub const fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Runner options
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Fit and score `method` on every fold and aggregate the results.
    ///
    /// Each fold's own context is handed to the method, so a method that
    /// fills in domains never sees another fold's data.
    ///
    /// # Errors
    ///
    /// Returns the first fit/score error, or [`crate::Error::InvalidConfig`]
    /// if `folds` is empty
    pub fn run<M: DensityMethod>(&self, method: &M, folds: &mut FoldSet) -> Result<AggregateResult> {
        let tag = method.tag().to_string();
        let mut builder = AggregateResult::builder();

        for fold in folds.iter_mut() {
            let label = fold.label();
            let (train, test, context) = fold.parts_mut();
            let result = method.fit_and_score(train, test, context)?;

            if self.config.fold_log {
                info!(
                    method = %tag,
                    fold = %label,
                    test_ll = result.test_ll(),
                    learning_time_ms = result.learning_time_ms(),
                    "fold complete"
                );
            }
            builder.record(label, result);
        }

        let aggregate = builder.finish()?;
        info!(
            method = %tag,
            folds = aggregate.folds().len(),
            average_test_ll = aggregate.average_test_ll(),
            average_learning_time_s = aggregate.average_learning_time(),
            "cross-validation complete"
        );
        Ok(aggregate)
    }

    /// [`run`](Self::run), then persist the aggregate under
    /// `<results_root>/run_<run_id>/<dataset>/<N>_folds/<TAG>/`.
    ///
    /// # Errors
    ///
    /// Returns errors from the run or from writing the result file
    pub fn run_and_persist<M: DensityMethod>(
        &self,
        method: &M,
        folds: &mut FoldSet,
        dataset: &str,
        results_root: &Path,
        run_id: u32,
    ) -> Result<(AggregateResult, PathBuf)> {
        let aggregate = self.run(method, folds)?;
        let directory = results_dir(results_root, run_id, dataset, folds.len(), method.tag());
        let path = results::persist(&aggregate, &directory, dataset, method.tag())?;
        info!(path = %path.display(), "results written");
        Ok((aggregate, path))
    }
}

/// `<results_root>/run_<run_id>/<dataset>/<n_folds>_folds/<method_tag>`
#[must_use]
pub fn results_dir(results_root: &Path, run_id: u32, dataset: &str, n_folds: usize, method_tag: &str) -> PathBuf {
    results_root
        .join(format!("run_{run_id}"))
        .join(dataset)
        .join(format!("{n_folds}_folds"))
        .join(method_tag)
}
