//! Property-based tests for density-bench
//!
//! - Test aggregation invariants of the runner and result builder
//! - Test the zero-density substitution law of the KDE score
//! - Run with ProptestConfig::with_cases(100)

use density_bench::data::FoldSet;
use density_bench::method::kde::sum_log_densities;
use density_bench::runner::{CrossValidationRunner, RunnerConfig};
use density_bench::{AggregateResult, Context, DensityMethod, FoldResult, Matrix, Schema};
use proptest::prelude::*;

/// Reports the first training value as the fold's test log-likelihood.
struct ScriptedMethod;

impl DensityMethod for ScriptedMethod {
    type Model = f64;

    fn tag(&self) -> &str {
        "SCRIPTED"
    }

    fn fit(&self, train: &Matrix, _context: &mut Context) -> density_bench::Result<f64> {
        Ok(train.get(0, 0))
    }

    fn score(&self, model: &f64, _test: &Matrix) -> density_bench::Result<f64> {
        Ok(*model)
    }
}

fn scripted_folds(lls: &[f64]) -> FoldSet {
    let schema = Schema::from_type_string("c").unwrap();
    let pairs = lls
        .iter()
        .map(|&ll| (Matrix::from_rows(&[vec![ll]]).unwrap(), Matrix::from_rows(&[vec![0.0]]).unwrap()))
        .collect();
    FoldSet::from_pairs(schema, pairs).unwrap()
}

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Fold log-likelihoods for 1..=10 folds
fn arb_fold_lls() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(-1.0e6f64..0.0, 1..=10)
}

/// (test_LL, learning_time_ms) per fold
fn arb_fold_results() -> impl Strategy<Value = Vec<(f64, f64)>> {
    proptest::collection::vec((-1.0e6f64..0.0, 0.0f64..1.0e5), 1..=10)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: average_test_LL is the arithmetic mean of fold test_LL
    #[test]
    fn prop_runner_average_is_mean(lls in arb_fold_lls()) {
        let mut folds = scripted_folds(&lls);
        let runner = CrossValidationRunner::new(RunnerConfig { fold_log: false });
        let result = runner.run(&ScriptedMethod, &mut folds).unwrap();

        #[allow(clippy::cast_precision_loss)]
        let mean = lls.iter().sum::<f64>() / lls.len() as f64;
        prop_assert!((result.average_test_ll() - mean).abs() <= 1e-9 * mean.abs().max(1.0));
        prop_assert_eq!(result.folds().len(), lls.len());
    }

    /// Property: every fold is recorded under fold_i with its own value
    #[test]
    fn prop_runner_labels_folds(lls in arb_fold_lls()) {
        let mut folds = scripted_folds(&lls);
        let result = CrossValidationRunner::new(RunnerConfig { fold_log: false })
            .run(&ScriptedMethod, &mut folds)
            .unwrap();

        for (i, ll) in lls.iter().enumerate() {
            let fold = result.fold(&format!("fold_{}", i + 1)).unwrap();
            prop_assert!((fold.test_ll() - ll).abs() < f64::EPSILON);
        }
    }

    /// Property: average_learning_time = Σ ms / N / 1000
    #[test]
    fn prop_average_learning_time_in_seconds(folds in arb_fold_results()) {
        let mut builder = AggregateResult::builder();
        for (i, &(ll, ms)) in folds.iter().enumerate() {
            builder.record(format!("fold_{}", i + 1), FoldResult::new(ll, ms));
        }
        let result = builder.finish().unwrap();

        #[allow(clippy::cast_precision_loss)]
        let expected = folds.iter().map(|f| f.1).sum::<f64>() / folds.len() as f64 / 1000.0;
        prop_assert!((result.average_learning_time() - expected).abs() <= 1e-9 * expected.max(1.0));
    }

    /// Property: zero densities contribute exactly 0 to the log-likelihood
    #[test]
    fn prop_zero_density_contributes_nothing(
        positives in proptest::collection::vec(1.0e-300f64..10.0, 0..20),
        zeros in 0usize..20
    ) {
        let mut densities = positives.clone();
        densities.extend(std::iter::repeat(0.0).take(zeros));

        let expected: f64 = positives.iter().map(|d| d.ln()).sum();
        let total = sum_log_densities(&densities);
        prop_assert!(total.is_finite());
        prop_assert!((total - expected).abs() <= 1e-9 * expected.abs().max(1.0));
    }

    /// Property: all-zero densities give exactly 0
    #[test]
    fn prop_all_zero_densities(n in 1usize..50) {
        prop_assert_eq!(sum_log_densities(&vec![0.0; n]), 0.0);
    }
}
