//! Experiment driver: one dataset, both methods
//!
//! Loads the folds of a registered dataset once, then runs KDE and MSPN over
//! them in that order, writing one result file per method. Any error aborts
//! the experiment; result files already written stay on disk.

use std::path::PathBuf;

use tracing::info;

use crate::config::BenchmarkConfig;
use crate::data::FoldSet;
use crate::registry::ExperimentConfig;
use crate::results::AggregateResult;
use crate::runner::CrossValidationRunner;
use crate::Result;

/// Aggregate and result file of one method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodOutcome {
    /// Method tag
    pub tag: String,
    /// Averaged metrics
    pub result: AggregateResult,
    /// Written result file
    pub path: PathBuf,
}

/// Everything produced by one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentOutcome {
    /// Dataset name
    pub dataset: String,
    /// KDE outcome
    pub kde: MethodOutcome,
    /// MSPN outcome
    pub spn: MethodOutcome,
}

/// Load the folds of `experiment` and benchmark both methods on them.
///
/// # Errors
///
/// Returns configuration errors (invalid settings, missing or malformed
/// folds) before any method runs, then the first fit/score/write error
pub fn run_experiment(experiment: &ExperimentConfig, config: &BenchmarkConfig) -> Result<ExperimentOutcome> {
    config.validate()?;
    let schema = experiment.schema()?;

    info!("------------------------------------------------------------------");
    info!(
        dataset = experiment.name,
        family = %experiment.family,
        vars = schema.len(),
        folds = config.n_folds,
        "starting experiment"
    );

    let mut folds = FoldSet::load(&config.data_layout(), experiment.name, &schema, config.n_folds)?;
    run_on_folds(experiment.name, &mut folds, config)
}

/// Benchmark KDE then MSPN on already loaded folds.
///
/// # Errors
///
/// Returns the first fit/score/write error
pub fn run_on_folds(dataset: &str, folds: &mut FoldSet, config: &BenchmarkConfig) -> Result<ExperimentOutcome> {
    let runner = CrossValidationRunner::new(config.runner_config());

    let kde_method = config.kde_method();
    info!(dataset, method = "KDE", bandwidth = %kde_method.bandwidth(), "running method");
    let (kde_result, kde_path) =
        runner.run_and_persist(&kde_method, folds, dataset, &config.results_root, config.run_id)?;

    let spn_method = config.spn_method();
    info!(
        dataset,
        method = "MSPN",
        min_instances_slice = spn_method.params().min_instances_slice,
        "running method"
    );
    let (spn_result, spn_path) =
        runner.run_and_persist(&spn_method, folds, dataset, &config.results_root, config.run_id)?;

    Ok(ExperimentOutcome {
        dataset: dataset.to_string(),
        kde: MethodOutcome {
            tag: crate::method::kde::KDE_TAG.to_string(),
            result: kde_result,
            path: kde_path,
        },
        spn: MethodOutcome {
            tag: crate::method::spn::SPN_TAG.to_string(),
            result: spn_result,
            path: spn_path,
        },
    })
}
