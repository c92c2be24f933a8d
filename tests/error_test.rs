//! Tests for error types

use std::path::PathBuf;

use density_bench::Error;

#[test]
fn test_data_load_error() {
    let error = Error::data_load("latent_data/zoo/10_folds/zoo_1_train.arff", "file not found");
    let error_str = format!("{error}");
    assert!(error_str.contains("Failed to load fold data"));
    assert!(error_str.contains("zoo_1_train.arff"));
    assert!(error_str.contains("Check the dataset root"));
    assert!(error.is_configuration());
}

#[test]
fn test_schema_mismatch_error() {
    let error = Error::SchemaMismatch {
        context: "fold 3 train".to_string(),
        expected: 7,
        actual: 6,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("fold 3 train"));
    assert!(error_str.contains("declares 7 columns"));
    assert!(error_str.contains("data has 6"));
    assert!(error.is_configuration());
}

#[test]
fn test_invalid_config_error() {
    let error = Error::InvalidConfig("n_folds must be in 1..=10, got 0".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid configuration"));
    assert!(error.is_configuration());
}

#[test]
fn test_numerical_error_is_not_configuration() {
    let error = Error::Numerical("cannot learn an SPN from empty training data".to_string());
    assert!(format!("{error}").contains("Numerical error"));
    assert!(!error.is_configuration());
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    let error: Error = io_error.into();
    assert!(format!("{error}").contains("IO error"));
    assert!(!error.is_configuration());
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").contains("JSON error"));
}

#[test]
fn test_data_load_keeps_path() {
    let Error::DataLoad { path, .. } = Error::data_load("a/b.arff", "x") else {
        panic!("expected DataLoad");
    };
    assert_eq!(path, PathBuf::from("a/b.arff"));
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync + std::error::Error>() {}
    assert_send_sync::<Error>();
}
