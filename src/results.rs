//! Result Store - per-fold and averaged metrics of one (dataset, method) run
//!
//! ## File Format
//!
//! One pretty-printed JSON document per (dataset, method) pair, keys sorted
//! lexicographically at every level and indented by four spaces:
//!
//! ```text
//! {
//!     "average_learning_time": 0.0123,
//!     "average_test_LL": -1234.5,
//!     "folds": {
//!         "fold_1": {
//!             "learning_time": 12.0,
//!             "test_LL": -1200.0
//!         },
//!         ...
//!     }
//! }
//! ```
//!
//! Fold learning times are milliseconds; the average is in seconds. A
//! non-finite metric is written as `null` and read back as `NaN`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::{Error, Result};

/// Metrics of a single fold. Field order is the sorted key order on disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FoldResult {
    #[serde(deserialize_with = "null_as_nan")]
    learning_time: f64,
    #[serde(rename = "test_LL", deserialize_with = "null_as_nan")]
    test_ll: f64,
}

fn null_as_nan<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl FoldResult {
    /// Create a fold result.
    ///
    /// # Arguments
    ///
    /// * `test_ll` - Total log-likelihood of the test matrix
    /// * `learning_time_ms` - Wall-clock fit time in milliseconds
    #[must_use]
    pub const fn new(test_ll: f64, learning_time_ms: f64) -> Self {
        Self {
            learning_time: learning_time_ms,
            test_ll,
        }
    }

    /// Total test log-likelihood
    #[must_use]
    pub const fn test_ll(&self) -> f64 {
        self.test_ll
    }

    /// Fit time in milliseconds
    #[must_use]
    pub const fn learning_time_ms(&self) -> f64 {
        self.learning_time
    }
}

/// Averaged metrics plus every fold's metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateResult {
    #[serde(deserialize_with = "null_as_nan")]
    average_learning_time: f64,
    #[serde(rename = "average_test_LL", deserialize_with = "null_as_nan")]
    average_test_ll: f64,
    folds: BTreeMap<String, FoldResult>,
}

impl AggregateResult {
    /// Start collecting fold results.
    #[must_use]
    pub fn builder() -> AggregateResultBuilder {
        AggregateResultBuilder::default()
    }

    /// Mean test log-likelihood over folds
    #[must_use]
    pub const fn average_test_ll(&self) -> f64 {
        self.average_test_ll
    }

    /// Mean fit time over folds, in seconds
    #[must_use]
    pub const fn average_learning_time(&self) -> f64 {
        self.average_learning_time
    }

    /// Fold results keyed by label (`fold_1`, `fold_2`, ...)
    #[must_use]
    pub const fn folds(&self) -> &BTreeMap<String, FoldResult> {
        &self.folds
    }

    /// Result of the fold with the given label
    #[must_use]
    pub fn fold(&self, label: &str) -> Option<&FoldResult> {
        self.folds.get(label)
    }

    /// Render as sorted, four-space indented JSON.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| Error::Numerical(format!("non UTF-8 JSON output: {e}")))
    }
}

/// Incremental builder, fed one fold at a time by the runner.
#[derive(Debug, Default)]
pub struct AggregateResultBuilder {
    folds: BTreeMap<String, FoldResult>,
    total_test_ll: f64,
    total_learning_time_ms: f64,
}

impl AggregateResultBuilder {
    /// Record the result of one fold under `label`.
    pub fn record(&mut self, label: impl Into<String>, fold: FoldResult) {
        self.total_test_ll += fold.test_ll();
        self.total_learning_time_ms += fold.learning_time_ms();
        self.folds.insert(label.into(), fold);
    }

    /// Number of folds recorded so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.folds.len()
    }

    /// True if no fold was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    /// Compute the averages. Learning time is converted from ms to seconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if no fold was recorded
    pub fn finish(self) -> Result<AggregateResult> {
        if self.folds.is_empty() {
            return Err(Error::InvalidConfig(
                "cannot aggregate zero folds".to_string(),
            ));
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.folds.len() as f64;
        Ok(AggregateResult {
            average_learning_time: self.total_learning_time_ms / n / 1000.0,
            average_test_ll: self.total_test_ll / n,
            folds: self.folds,
        })
    }
}

/// File name of a persisted result, `{base_name}_results_{method_tag}.json`.
#[must_use]
pub fn result_file_name(base_name: &str, method_tag: &str) -> String {
    format!("{base_name}_results_{method_tag}.json")
}

/// Write `result` to `directory/{base_name}_results_{method_tag}.json`.
///
/// Missing directories are created. An existing file at that path is removed
/// first and replaced; nothing is merged or backed up.
///
/// # Errors
///
/// Returns error if the directory cannot be created or the file cannot be written
pub fn persist(
    result: &AggregateResult,
    directory: &Path,
    base_name: &str,
    method_tag: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(directory)?;

    let path = directory.join(result_file_name(base_name, method_tag));
    if path.is_file() {
        debug!(path = %path.display(), "replacing existing result file");
        fs::remove_file(&path)?;
    }

    fs::write(&path, result.to_json_pretty()?)?;
    Ok(path)
}

/// Read a result file written by [`persist`].
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn load(path: &Path) -> Result<AggregateResult> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
