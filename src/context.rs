//! Per-fold, schema-bound value domains
//!
//! The SPN learner needs to know, for every column, the range of a continuous
//! variable or the set of observed categories of a discrete one. Those domains
//! depend on the training data, so every fold owns its own [`Context`].

use serde::{Deserialize, Serialize};

use crate::{Matrix, Result, Schema, VariableKind};

/// Observed value domain of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Domain {
    /// Observed range of a continuous variable
    Continuous {
        /// Smallest observed value
        min: f64,
        /// Largest observed value
        max: f64,
    },
    /// Sorted, de-duplicated observed categories
    Discrete {
        /// Category values
        values: Vec<f64>,
    },
}

impl Domain {
    /// Number of categories of a discrete domain, `None` for continuous ones.
    #[must_use]
    pub fn cardinality(&self) -> Option<usize> {
        match self {
            Self::Continuous { .. } => None,
            Self::Discrete { values } => Some(values.len()),
        }
    }
}

/// Schema plus data-dependent domains for one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    schema: Schema,
    domains: Vec<Option<Domain>>,
}

impl Context {
    /// Create a context without domains.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        let domains = vec![None; schema.len()];
        Self { schema, domains }
    }

    /// The schema this context is bound to
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Domain of column `col`, if computed
    #[must_use]
    pub fn domain(&self, col: usize) -> Option<&Domain> {
        self.domains.get(col).and_then(Option::as_ref)
    }

    /// True once [`Context::add_domains`] has run
    #[must_use]
    pub fn has_domains(&self) -> bool {
        self.domains.iter().all(Option::is_some)
    }

    /// Compute every column's domain from `data`, replacing previous domains.
    ///
    /// `NaN` values are ignored. A column without any observed value gets an
    /// empty discrete domain or a `[0, 0]` continuous range.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SchemaMismatch`] if `data` does not fit the schema
    pub fn add_domains(&mut self, data: &Matrix) -> Result<()> {
        self.schema.validate(data, "domain inference data")?;

        self.domains = self
            .schema
            .kinds()
            .iter()
            .enumerate()
            .map(|(col, kind)| {
                let observed = data.column(col).filter(|v| !v.is_nan());
                Some(match kind {
                    VariableKind::Continuous => {
                        let (min, max) = observed.fold(
                            (f64::INFINITY, f64::NEG_INFINITY),
                            |(lo, hi), v| (lo.min(v), hi.max(v)),
                        );
                        if min > max {
                            Domain::Continuous { min: 0.0, max: 0.0 }
                        } else {
                            Domain::Continuous { min, max }
                        }
                    }
                    VariableKind::Discrete => {
                        let mut values: Vec<f64> = observed.collect();
                        values.sort_by(f64::total_cmp);
                        values.dedup();
                        Domain::Discrete { values }
                    }
                })
            })
            .collect();
        Ok(())
    }
}
