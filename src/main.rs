use std::path::PathBuf;

use anyhow::{bail, Context as _};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use density_bench::data::FileFormat;
use density_bench::experiment::run_experiment;
use density_bench::registry::{self, DataFamily, ExperimentConfig, EXPERIMENTS};
use density_bench::{BandwidthPolicy, BenchmarkConfig};

#[derive(Parser)]
#[command(name = "density-bench")]
#[command(about = "K-fold cross-validation benchmarks for KDE and mixed SPNs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark KDE and MSPN on the selected datasets
    Run(RunArgs),
    /// List the registered datasets
    List,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Dataset names from the registry
    datasets: Vec<String>,

    /// Add every dataset of a family (continuous, discrete, mixed)
    #[arg(long)]
    family: Option<DataFamily>,

    /// Run every registered dataset
    #[arg(long, action = ArgAction::SetTrue)]
    all: bool,

    /// JSON configuration file; flags below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run identifier (results go to run_<ID>)
    #[arg(long)]
    run_id: Option<u32>,

    /// Number of folds to evaluate
    #[arg(long)]
    folds: Option<usize>,

    /// Log every fold's metrics
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "no_fold_log")]
    fold_log: bool,

    /// Only log averages
    #[arg(long, action = ArgAction::SetTrue)]
    no_fold_log: bool,

    /// KDE bandwidth: normal_reference, cv_ml, or comma-separated values
    #[arg(long, value_name = "POLICY")]
    kde_bw: Option<BandwidthPolicy>,

    /// Minimum rows per SPN slice
    #[arg(long)]
    min_instances_slice: Option<usize>,

    /// Root directory of the fold files
    #[arg(long, value_name = "DIR")]
    data_root: Option<PathBuf>,

    /// Root directory of the result files
    #[arg(long, value_name = "DIR")]
    results_root: Option<PathBuf>,

    /// Fold file format (arff, parquet)
    #[arg(long)]
    format: Option<FileFormat>,
}

impl RunArgs {
    fn benchmark_config(&self) -> anyhow::Result<BenchmarkConfig> {
        let mut config = match &self.config {
            Some(path) => BenchmarkConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => BenchmarkConfig::default(),
        };

        if let Some(run_id) = self.run_id {
            config.run_id = run_id;
        }
        if let Some(folds) = self.folds {
            config.n_folds = folds;
        }
        if self.fold_log {
            config.fold_log = true;
        }
        if self.no_fold_log {
            config.fold_log = false;
        }
        if let Some(policy) = &self.kde_bw {
            config.kde_bandwidth = policy.clone();
        }
        if let Some(min) = self.min_instances_slice {
            config.min_instances_slice = min;
        }
        if let Some(root) = &self.data_root {
            config.data_root = root.clone();
        }
        if let Some(root) = &self.results_root {
            config.results_root = root.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }

        config.validate()?;
        Ok(config)
    }

    fn selected(&self) -> anyhow::Result<Vec<&'static ExperimentConfig>> {
        let mut selected: Vec<&'static ExperimentConfig> = if self.all {
            EXPERIMENTS.iter().collect()
        } else {
            Vec::new()
        };
        if let Some(family) = self.family {
            selected.extend(registry::by_family(family));
        }
        for name in &self.datasets {
            selected.push(registry::lookup(name)?);
        }

        let mut seen = Vec::new();
        selected.retain(|e| {
            let fresh = !seen.contains(&e.name);
            seen.push(e.name);
            fresh
        });
        if selected.is_empty() {
            bail!("no datasets selected; name datasets or pass --family / --all");
        }
        Ok(selected)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::List => {
            println!("{:<22} {:<11} {:>4}  types", "dataset", "family", "vars");
            for e in EXPERIMENTS {
                println!("{:<22} {:<11} {:>4}  {}", e.name, e.family.as_str(), e.n_vars(), e.var_types);
            }
            Ok(())
        }
        Commands::Run(args) => {
            let config = args.benchmark_config()?;
            let experiments = args.selected()?;
            info!(
                run_id = config.run_id,
                folds = config.n_folds,
                datasets = experiments.len(),
                "benchmark starting"
            );

            for experiment in experiments {
                let outcome = run_experiment(experiment, &config).map_err(|e| {
                    error!(dataset = experiment.name, "experiment failed: {e}");
                    e
                })?;
                info!(
                    dataset = %outcome.dataset,
                    kde_average_test_ll = outcome.kde.result.average_test_ll(),
                    mspn_average_test_ll = outcome.spn.result.average_test_ll(),
                    "experiment complete"
                );
            }
            Ok(())
        }
    }
}
