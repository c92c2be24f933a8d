//! # density-bench: K-Fold Benchmarks for Density Estimators
//!
//! **Version**: 0.1.0
//!
//! density-bench runs k-fold cross-validation of density estimation methods
//! over pre-split tabular datasets and records, per fold and on average, the
//! test log-likelihood and the fit time.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke safety**: Schema/column mismatches fail before any fit
//! - **Jidoka**: The first failing fold stops the run; no silent partial results
//! - **Genchi Genbutsu**: Fit time is measured around the fit call only
//! - **Heijunka**: Every method runs through the same [`DensityMethod`] contract
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use density_bench::data::{DataLayout, FoldSet};
//! use density_bench::method::KdeMethod;
//! use density_bench::runner::CrossValidationRunner;
//! use density_bench::Schema;
//!
//! let schema = Schema::from_type_string("ccu")?;
//! let mut folds = FoldSet::load(&DataLayout::new("latent_data"), "toy", &schema, 10)?;
//!
//! let result = CrossValidationRunner::default().run(&KdeMethod::default(), &mut folds)?;
//! println!("average test LL: {}", result.average_test_ll());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod experiment;
pub mod matrix;
pub mod method;
pub mod registry;
pub mod results;
pub mod runner;
pub mod schema;
pub mod spn;

pub use config::BenchmarkConfig;
pub use context::{Context, Domain};
pub use error::{Error, Result};
pub use matrix::Matrix;
pub use method::{BandwidthPolicy, DensityMethod, KdeMethod, NumericalWarning, SpnMethod, WarningPolicy};
pub use results::{AggregateResult, FoldResult};
pub use schema::{Schema, VariableKind};
