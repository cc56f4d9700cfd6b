//! Integration tests for data loading and stratified splitting

use fraudlab::utils::{load, stratified_split, DataLoader};
use fraudlab::FraudError;
use ndarray::{Array1, Array2};
use std::io::Write;
use tempfile::NamedTempFile;

/// CSV with Time, V1, Amount, Class; every 50th row is a positive
fn write_transactions(n_rows: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Time,V1,Amount,Class").unwrap();
    for i in 0..n_rows {
        let class = if i % 50 == 0 { 1 } else { 0 };
        writeln!(file, "{},{:.3},{:.2},{}", i, (i as f64 * 0.37).sin(), 10.0 + (i % 13) as f64, class).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_load_preserves_class_ratio() {
    let file = write_transactions(1000);
    let split = load(file.path(), "Class", 0.2, 2023).unwrap();

    assert_eq!(split.n_train(), 800);
    assert_eq!(split.n_test(), 200);
    assert_eq!(split.y_train.sum(), 16.0);
    assert_eq!(split.y_test.sum(), 4.0);
    assert_eq!(split.feature_names, vec!["Time", "V1", "Amount"]);
    assert_eq!(split.x_train.ncols(), 3);
}

#[test]
fn test_load_is_reproducible() {
    let file = write_transactions(300);
    let a = load(file.path(), "Class", 0.2, 7).unwrap();
    let b = load(file.path(), "Class", 0.2, 7).unwrap();
    let c = load(file.path(), "Class", 0.2, 8).unwrap();

    assert_eq!(a.x_test, b.x_test);
    assert_eq!(a.y_train, b.y_train);
    assert_ne!(a.x_test, c.x_test);
}

#[test]
fn test_partitions_cover_every_row_once() {
    let file = write_transactions(250);
    let split = load(file.path(), "Class", 0.3, 1).unwrap();

    let mut times: Vec<i64> = split
        .x_train
        .column(0)
        .iter()
        .chain(split.x_test.column(0).iter())
        .map(|&t| t as i64)
        .collect();
    times.sort_unstable();
    assert_eq!(times, (0..250).collect::<Vec<i64>>());
}

#[test]
fn test_missing_file() {
    let err = load("/nonexistent/creditcard.csv", "Class", 0.2, 2023).unwrap_err();
    assert!(matches!(err, FraudError::DataAccess(_)));
}

#[test]
fn test_missing_label_column() {
    let file = write_transactions(100);
    let err = load(file.path(), "is_fraud", 0.2, 2023).unwrap_err();
    assert!(matches!(err, FraudError::Schema(_)));
}

#[test]
fn test_invalid_test_fraction() {
    let file = write_transactions(100);
    for fraction in [0.0, 1.0, -0.1, 1.5] {
        let err = load(file.path(), "Class", fraction, 2023).unwrap_err();
        assert!(matches!(err, FraudError::InvalidParameter { .. }));
    }
}

#[test]
fn test_missing_values_become_nan() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Time,Amount,Class").unwrap();
    for i in 0..20 {
        let amount = if i == 3 { String::new() } else { format!("{}.5", i) };
        writeln!(file, "{},{},{}", i, amount, i % 2).unwrap();
    }
    file.flush().unwrap();

    let split = DataLoader::new()
        .with_infer_schema_length(None)
        .load(file.path(), "Class", 0.25, 3)
        .unwrap();
    let n_nan = split
        .x_train
        .column(1)
        .iter()
        .chain(split.x_test.column(1).iter())
        .filter(|v| v.is_nan())
        .count();
    assert_eq!(n_nan, 1);
}

#[test]
fn test_singleton_class_is_rejected() {
    let x = Array2::from_shape_fn((10, 2), |(i, j)| (i * 2 + j) as f64);
    let mut y = Array1::zeros(10);
    y[4] = 1.0;
    let err = stratified_split(vec!["a".into(), "b".into()], &x, &y, 0.2, 0).unwrap_err();
    assert!(matches!(err, FraudError::Validation(_)));
}
