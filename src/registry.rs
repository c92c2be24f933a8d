//! Experiment Registry: every benchmarked dataset and its variable types
//!
//! Each entry names a dataset directory under the data root and the type
//! string (`c` continuous, `u` discrete) of its columns. The family only
//! groups datasets for selection on the command line.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, Schema};

/// Dataset family by variable kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFamily {
    /// Only continuous variables
    Continuous,
    /// Only discrete variables
    Discrete,
    /// Both kinds
    Mixed,
}

impl DataFamily {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Continuous => "continuous",
            Self::Discrete => "discrete",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for DataFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "continuous" => Ok(Self::Continuous),
            "discrete" => Ok(Self::Discrete),
            "mixed" => Ok(Self::Mixed),
            other => Err(Error::InvalidConfig(format!(
                "unknown data family '{other}' (expected continuous, discrete or mixed)"
            ))),
        }
    }
}

/// Declaration of one benchmarked dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperimentConfig {
    /// Dataset name, also its directory and file prefix
    pub name: &'static str,
    /// Family used for selection
    pub family: DataFamily,
    /// One type character per column
    pub var_types: &'static str,
}

impl ExperimentConfig {
    /// Parse the type string into a schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] on an invalid type string
    pub fn schema(&self) -> Result<Schema> {
        Schema::from_type_string(self.var_types)
    }

    /// Number of columns
    #[must_use]
    pub const fn n_vars(&self) -> usize {
        self.var_types.len()
    }
}

const fn entry(name: &'static str, family: DataFamily, var_types: &'static str) -> ExperimentConfig {
    ExperimentConfig {
        name,
        family,
        var_types,
    }
}

/// All registered datasets, grouped by family.
pub const EXPERIMENTS: &[ExperimentConfig] = &[
    entry("alcohol", DataFamily::Continuous, "cccccccccc"),
    entry("ilpd", DataFamily::Continuous, "ccccccccc"),
    entry("nba", DataFamily::Continuous, "cccccccccccccccccc"),
    entry("qsar_fish_toxicity", DataFamily::Continuous, "ccccccc"),
    entry("real_state_valuation", DataFamily::Continuous, "ccccc"),
    entry("travel_reviews", DataFamily::Continuous, "cccccccccc"),
    entry("alarm", DataFamily::Discrete, "uuuuuuuuuuuuuuuuuuuuuuuuuuuuuuuuuuuu"),
    entry("breast_cancer", DataFamily::Discrete, "uuuuuuuuuu"),
    entry("car_evaluation", DataFamily::Discrete, "uuuuuuu"),
    entry("hayes_roth", DataFamily::Discrete, "uuuuu"),
    entry("hiv_test", DataFamily::Discrete, "uuuu"),
    entry("nursery", DataFamily::Discrete, "uuuuuuuuu"),
    entry("somerville", DataFamily::Discrete, "uuuuuuu"),
    entry("web_phishing", DataFamily::Discrete, "uuuuuuuuuu"),
    entry("zoo", DataFamily::Discrete, "uuuuuuuuuuuuuuuuu"),
    entry("planning_relax", DataFamily::Mixed, "ccccccccccccu"),
    entry("thoracic_surgery", DataFamily::Mixed, "uccuuuuuuuuucu"),
    entry("thyroid", DataFamily::Mixed, "cuuuuuuuuuuuuuuccccuu"),
    entry("user_knowledge", DataFamily::Mixed, "cccccu"),
    entry("vertebral", DataFamily::Mixed, "ccccccu"),
];

/// Look up a dataset by name.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if no dataset has that name
pub fn lookup(name: &str) -> Result<&'static ExperimentConfig> {
    EXPERIMENTS
        .iter()
        .find(|e| e.name == name)
        .ok_or_else(|| Error::InvalidConfig(format!("unknown dataset '{name}'")))
}

/// Datasets of one family, in registry order.
pub fn by_family(family: DataFamily) -> impl Iterator<Item = &'static ExperimentConfig> {
    EXPERIMENTS.iter().filter(move |e| e.family == family)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VariableKind;

    #[test]
    fn test_lookup() {
        let zoo = lookup("zoo").unwrap();
        assert_eq!(zoo.family, DataFamily::Discrete);
        assert_eq!(zoo.n_vars(), 17);
        assert!(lookup("iris").is_err());
    }

    #[test]
    fn test_family_filter() {
        assert_eq!(by_family(DataFamily::Continuous).count(), 6);
        assert_eq!(by_family(DataFamily::Discrete).count(), 9);
        assert_eq!(by_family(DataFamily::Mixed).count(), 5);
    }

    #[test]
    fn test_family_parsing() {
        assert_eq!("mixed".parse::<DataFamily>().unwrap(), DataFamily::Mixed);
        assert_eq!(DataFamily::Discrete.to_string(), "discrete");
        assert!("binary".parse::<DataFamily>().is_err());
    }

    #[test]
    fn test_alarm_width() {
        assert_eq!(lookup("alarm").unwrap().schema().unwrap().len(), 36);
    }

    #[test]
    fn test_thyroid_schema() {
        let schema = lookup("thyroid").unwrap().schema().unwrap();
        assert_eq!(schema.kind(0), VariableKind::Continuous);
        assert_eq!(schema.count(VariableKind::Continuous), 5);
        assert_eq!(schema.count(VariableKind::Discrete), 16);
    }
}
