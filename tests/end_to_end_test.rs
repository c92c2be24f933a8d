//! End-to-end tests: fold files on disk through the runner to result files

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use density_bench::data::{DataLayout, FoldSet};
use density_bench::experiment::run_experiment;
use density_bench::registry;
use density_bench::runner::CrossValidationRunner;
use density_bench::{BandwidthPolicy, BenchmarkConfig, DensityMethod, Error, KdeMethod, Schema, SpnMethod};

/// Write `<root>/<dataset>/<partitions>_folds/<dataset>_<i>_{train,test}.arff`.
fn write_folds(root: &Path, dataset: &str, types: &str, partitions: usize, n_folds: usize, sizes: (usize, usize)) {
    let dir = root.join(dataset).join(format!("{partitions}_folds"));
    fs::create_dir_all(&dir).unwrap();

    for fold in 1..=n_folds {
        for (split, rows) in [("train", sizes.0), ("test", sizes.1)] {
            let mut text = format!("@relation {dataset}\n");
            for (j, t) in types.chars().enumerate() {
                if t == 'c' {
                    writeln!(text, "@attribute x{j} numeric").unwrap();
                } else {
                    writeln!(text, "@attribute x{j} {{0,1,2}}").unwrap();
                }
            }
            text.push_str("@data\n");
            for r in 0..rows {
                let values: Vec<String> = types
                    .chars()
                    .enumerate()
                    .map(|(j, t)| {
                        let k = r * 7 + j * 3 + fold;
                        if t == 'c' {
                            format!("{:.3}", (k % 23) as f64 / 4.0 + j as f64)
                        } else {
                            (k % 3).to_string()
                        }
                    })
                    .collect();
                writeln!(text, "{}", values.join(",")).unwrap();
            }
            fs::write(dir.join(format!("{dataset}_{fold}_{split}.arff")), text).unwrap();
        }
    }
}

// =============================================================================
// Runner Over Disk Folds
// =============================================================================

#[test]
fn test_kde_fixed_bandwidth_two_folds() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_folds(data.path(), "toy", "ccc", 10, 2, (20, 5));

    let schema = Schema::from_type_string("ccc").unwrap();
    let mut folds = FoldSet::load(&DataLayout::new(data.path()), "toy", &schema, 2).unwrap();
    assert_eq!(folds.fold(1).unwrap().train().rows(), 20);
    assert_eq!(folds.fold(2).unwrap().test().rows(), 5);

    let method = KdeMethod::new(BandwidthPolicy::Fixed(vec![0.5, 0.5, 0.5]));
    let (result, path) = CrossValidationRunner::default()
        .run_and_persist(&method, &mut folds, "toy", out.path(), 1)
        .unwrap();

    assert_eq!(path, out.path().join("run_1/toy/2_folds/KDE/toy_results_KDE.json"));
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(value["average_test_LL"].is_f64());
    assert!(value["average_learning_time"].is_f64());
    for label in ["fold_1", "fold_2"] {
        assert!(value["folds"][label]["test_LL"].is_f64());
        assert!(value["folds"][label]["learning_time"].is_f64());
    }
    assert!(result.average_test_ll().is_finite());
}

#[test]
fn test_schema_mismatch_detected_at_load() {
    let data = tempfile::tempdir().unwrap();
    write_folds(data.path(), "toy", "ccc", 10, 1, (10, 3));

    let schema = Schema::from_type_string("cccc").unwrap();
    let err = FoldSet::load(&DataLayout::new(data.path()), "toy", &schema, 1).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { expected: 4, actual: 3, .. }));
}

#[test]
fn test_fold_count_beyond_partitions() {
    let data = tempfile::tempdir().unwrap();
    write_folds(data.path(), "toy", "cc", 3, 3, (10, 3));

    let schema = Schema::from_type_string("cc").unwrap();
    let layout = DataLayout::new(data.path()).partition_folds(3);
    assert!(FoldSet::load(&layout, "toy", &schema, 3).is_ok());
    assert!(matches!(
        FoldSet::load(&layout, "toy", &schema, 4),
        Err(Error::InvalidConfig(_))
    ));
}

// =============================================================================
// Context Isolation
// =============================================================================

#[test]
fn test_each_fold_gets_its_own_context() {
    let data = tempfile::tempdir().unwrap();
    write_folds(data.path(), "toy", "cu", 10, 3, (30, 5));

    let schema = Schema::from_type_string("cu").unwrap();
    let mut folds = FoldSet::load(&DataLayout::new(data.path()), "toy", &schema, 3).unwrap();

    let (train, test, context) = folds.fold_mut(2).unwrap().parts_mut();
    SpnMethod::default().fit_and_score(train, test, context).unwrap();

    assert!(folds.fold(2).unwrap().context().has_domains());
    assert!(!folds.fold(1).unwrap().context().has_domains());
    assert!(!folds.fold(3).unwrap().context().has_domains());
}

#[test]
fn test_contexts_reflect_their_own_training_data() {
    let data = tempfile::tempdir().unwrap();
    write_folds(data.path(), "toy", "cu", 10, 2, (30, 5));

    let schema = Schema::from_type_string("cu").unwrap();
    let mut folds = FoldSet::load(&DataLayout::new(data.path()), "toy", &schema, 2).unwrap();
    CrossValidationRunner::default().run(&SpnMethod::default(), &mut folds).unwrap();

    for fold in folds.iter() {
        let mut expected = density_bench::Context::new(schema.clone());
        expected.add_domains(fold.train()).unwrap();
        assert_eq!(fold.context(), &expected);
    }
}

// =============================================================================
// Experiment Driver
// =============================================================================

#[test]
fn test_run_experiment_writes_both_methods() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let experiment = registry::lookup("user_knowledge").unwrap();
    write_folds(data.path(), experiment.name, experiment.var_types, 10, 2, (40, 10));

    let config = BenchmarkConfig {
        run_id: 2,
        n_folds: 2,
        fold_log: false,
        data_root: data.path().to_path_buf(),
        results_root: out.path().to_path_buf(),
        ..BenchmarkConfig::default()
    };
    let outcome = run_experiment(experiment, &config).unwrap();

    let base = out.path().join("run_2/user_knowledge/2_folds");
    assert_eq!(outcome.kde.path, base.join("KDE/user_knowledge_results_KDE.json"));
    assert_eq!(outcome.spn.path, base.join("MSPN/user_knowledge_results_MSPN.json"));
    assert!(outcome.spn.result.average_test_ll().is_finite());

    let reloaded = density_bench::results::load(&outcome.kde.path).unwrap();
    assert_eq!(reloaded.folds().len(), 2);
    let diff = reloaded.average_test_ll() - outcome.kde.result.average_test_ll();
    assert!(diff.abs() <= 1e-9 * outcome.kde.result.average_test_ll().abs().max(1.0));
}
