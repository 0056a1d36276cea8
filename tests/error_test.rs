//! Tests for error types

use battery_soh::config::HealthConfig;
use battery_soh::Error;
use std::path::PathBuf;

#[test]
fn test_missing_mandatory_field_error() {
    let error = Error::MissingMandatoryField("data".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Missing mandatory field"));
    assert!(error_str.contains("'data'"));
}

#[test]
fn test_unknown_cycle_type_error() {
    let error = Error::UnknownCycleType("rest".to_string());
    assert_eq!(format!("{error}"), "Unknown cycle type: 'rest'");
}

#[test]
fn test_corpus_source_missing_error() {
    let error = Error::CorpusSourceMissing(PathBuf::from("/data/raw"));
    let error_str = format!("{error}");
    assert!(error_str.contains("Corpus source not found"));
    assert!(error_str.contains("/data/raw"));
    assert!(error_str.contains("--raw-dir"));
}

#[test]
fn test_identifier_exhausted_error() {
    let error = Error::IdentifierExhausted(100_000);
    let error_str = format!("{error}");
    assert!(error_str.contains("100000"));
    assert!(error_str.contains("5-digit"));
}

#[test]
fn test_missing_column_error() {
    let error = Error::MissingColumn {
        column: "Time".to_string(),
        file: PathBuf::from("data/00042.csv"),
    };
    assert_eq!(format!("{error}"), "Missing column 'Time' in data/00042.csv");
}

#[test]
fn test_invalid_cell_error() {
    let error = Error::InvalidCell {
        column: "Voltage_measured".to_string(),
        row: 7,
        value: "abc".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("'abc'"));
    assert!(error_str.contains("Voltage_measured"));
    assert!(error_str.contains("row 7"));
}

#[test]
fn test_series_length_mismatch_error() {
    let error = Error::SeriesLengthMismatch {
        column: "Time".to_string(),
        expected: 10,
        found: 9,
    };
    assert_eq!(
        format!("{error}"),
        "Series length mismatch: 'Time' has 9 samples, expected 10"
    );
}

#[test]
fn test_invalid_config_from_validation() {
    let config = HealthConfig {
        num_bins: 0,
        ..HealthConfig::default()
    };
    let error = config.validate().unwrap_err();
    assert!(matches!(error, Error::InvalidConfig(_)));
    assert!(format!("{error}").contains("num_bins"));
}

#[test]
fn test_storage_error() {
    let error = Error::StorageError("Nothing to write: no batches".to_string());
    assert_eq!(format!("{error}"), "Storage error: Nothing to write: no batches");
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").starts_with("JSON error"));
}

#[test]
fn test_error_debug_format() {
    let error = Error::UnknownCycleType("rest".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("UnknownCycleType"));
}
