//! Benchmark configuration
//!
//! Every field has a default, so a JSON config file may set any subset of
//! them. Command-line flags override the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::{DataLayout, FileFormat, DEFAULT_PARTITION_FOLDS};
use crate::method::{BandwidthPolicy, KdeMethod, SpnMethod};
use crate::runner::RunnerConfig;
use crate::spn::DEFAULT_MIN_INSTANCES_SLICE;
use crate::{Error, Result};

/// Default data root
pub const DEFAULT_DATA_ROOT: &str = "latent_data";

/// Default results root
pub const DEFAULT_RESULTS_ROOT: &str = "latent_results";

/// Settings shared by every experiment of one benchmark invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchmarkConfig {
    /// Run identifier, the `run_<id>` results directory
    pub run_id: u32,
    /// Number of folds to evaluate
    pub n_folds: usize,
    /// Number of partitions on disk (`<k>_folds` directory)
    pub partition_folds: usize,
    /// Log every fold's metrics
    pub fold_log: bool,
    /// KDE bandwidth policy
    pub kde_bandwidth: BandwidthPolicy,
    /// SPN minimum slice size
    pub min_instances_slice: usize,
    /// Root of the fold files
    pub data_root: PathBuf,
    /// Root of the result files
    pub results_root: PathBuf,
    /// Fold file format
    pub format: FileFormat,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            run_id: 1,
            n_folds: DEFAULT_PARTITION_FOLDS,
            partition_folds: DEFAULT_PARTITION_FOLDS,
            fold_log: true,
            kde_bandwidth: BandwidthPolicy::NormalReference,
            min_instances_slice: DEFAULT_MIN_INSTANCES_SLICE,
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
            results_root: PathBuf::from(DEFAULT_RESULTS_ROOT),
            format: FileFormat::Arff,
        }
    }
}

impl BenchmarkConfig {
    /// Read a configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not valid JSON, or fails
    /// [`validate`](Self::validate)
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::data_load(path, e.to_string()))?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.partition_folds == 0 {
            return Err(Error::InvalidConfig("partition_folds must be at least 1".to_string()));
        }
        if self.n_folds == 0 || self.n_folds > self.partition_folds {
            return Err(Error::InvalidConfig(format!(
                "n_folds must be in 1..={}, got {}",
                self.partition_folds, self.n_folds
            )));
        }
        if self.min_instances_slice == 0 {
            return Err(Error::InvalidConfig(
                "min_instances_slice must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Fold file layout under the data root
    #[must_use]
    pub fn data_layout(&self) -> DataLayout {
        DataLayout::new(&self.data_root)
            .partition_folds(self.partition_folds)
            .format(self.format)
    }

    /// Runner options
    #[must_use]
    pub const fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            fold_log: self.fold_log,
        }
    }

    /// KDE method with the configured bandwidth policy
    #[must_use]
    pub fn kde_method(&self) -> KdeMethod {
        KdeMethod::new(self.kde_bandwidth.clone())
    }

    /// SPN method with the configured slice size
    #[must_use]
    pub fn spn_method(&self) -> SpnMethod {
        SpnMethod::new(self.min_instances_slice)
    }
}
