//! Mixed SPN adapter
//!
//! Fills the fold's context with the domains of its training matrix before
//! the timed fit, learns a mixed sum-product network, and scores the test matrix as the sum of the
//! per-row log-likelihoods. Numerical warnings of the learner are kept off
//! the console by default.

use super::{DensityMethod, WarningPolicy};
use crate::spn::{LearnerParams, Spn, DEFAULT_MIN_INSTANCES_SLICE};
use crate::{Context, Matrix, Result};

/// Method tag used in result paths.
pub const SPN_TAG: &str = "MSPN";

/// Mixed sum-product network method.
#[derive(Debug, Clone)]
pub struct SpnMethod {
    params: LearnerParams,
    warnings: WarningPolicy,
}

impl Default for SpnMethod {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INSTANCES_SLICE)
    }
}

impl SpnMethod {
    /// Create an SPN method splitting slices of at least `min_instances_slice` rows.
    #[must_use]
    pub fn new(min_instances_slice: usize) -> Self {
        Self {
            params: LearnerParams {
                min_instances_slice,
                ..LearnerParams::default()
            },
            warnings: WarningPolicy::Suppress,
        }
    }

    /// Override the learner seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    /// Override how learner warnings are reported.
    #[must_use]
    pub const fn with_warnings(mut self, warnings: WarningPolicy) -> Self {
        self.warnings = warnings;
        self
    }

    /// Structure learning parameters
    #[must_use]
    pub const fn params(&self) -> &LearnerParams {
        &self.params
    }
}

impl DensityMethod for SpnMethod {
    type Model = Spn;

    fn tag(&self) -> &str {
        SPN_TAG
    }

    fn prepare(&self, train: &Matrix, context: &mut Context) -> Result<()> {
        context.add_domains(train)
    }

    /// Learns from the context's domains, computing them first if they are absent.
    fn fit(&self, train: &Matrix, context: &mut Context) -> Result<Spn> {
        if !context.has_domains() {
            context.add_domains(train)?;
        }
        let (spn, warnings) = Spn::learn(train, context, &self.params)?;
        self.warnings.report(SPN_TAG, &warnings);
        Ok(spn)
    }

    fn score(&self, model: &Spn, test: &Matrix) -> Result<f64> {
        Ok(model.log_likelihood_rows(test)?.iter().sum())
    }
}
