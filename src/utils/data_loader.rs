//! Dataset loading and stratified train/test splitting

use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Name of the label column in the transaction datasets
pub const DEFAULT_LABEL_COLUMN: &str = "Class";

/// A stratified train/test partition of a labeled dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Split {
    /// Feature column names, in matrix column order
    pub feature_names: Vec<String>,
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

impl Split {
    /// Build a split by selecting rows of `x`/`y`
    pub fn from_indices(
        feature_names: Vec<String>,
        x: &Array2<f64>,
        y: &Array1<f64>,
        train_indices: &[usize],
        test_indices: &[usize],
    ) -> Self {
        Self {
            feature_names,
            x_train: x.select(Axis(0), train_indices),
            x_test: x.select(Axis(0), test_indices),
            y_train: y.select(Axis(0), train_indices),
            y_test: y.select(Axis(0), test_indices),
        }
    }

    pub fn n_train(&self) -> usize {
        self.y_train.len()
    }

    pub fn n_test(&self) -> usize {
        self.y_test.len()
    }

    /// Returns (Xtrain, Xtest, ytrain, ytest)
    pub fn into_parts(self) -> (Array2<f64>, Array2<f64>, Array1<f64>, Array1<f64>) {
        (self.x_train, self.x_test, self.y_train, self.y_test)
    }
}

/// Loader for labeled CSV datasets
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows used by polars to infer column types
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(1000),
        }
    }

    /// Set the number of rows used for schema inference (`None` scans the whole file)
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Read a CSV file with a header row
    pub fn load_frame(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| FraudError::DataAccess(format!("{}: {}", path.display(), e)))?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| FraudError::DataAccess(format!("{}: {}", path.display(), e)))?;

        if df.height() == 0 {
            return Err(FraudError::DataAccess(format!(
                "{}: file contains no data rows",
                path.display()
            )));
        }

        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Loaded CSV");
        Ok(df)
    }

    /// Load a labeled dataset and split it into stratified train/test partitions.
    ///
    /// Every column other than `label_column` is a feature. Missing feature
    /// values become `NaN` so they can be imputed later.
    pub fn load(
        &self,
        path: impl AsRef<Path>,
        label_column: &str,
        test_fraction: f64,
        seed: u64,
    ) -> Result<Split> {
        validate_test_fraction(test_fraction)?;

        let df = self.load_frame(path.as_ref())?;
        let (x, y, feature_names) = separate_label(&df, label_column)?;
        let (train_indices, test_indices) = stratified_indices(&y, test_fraction, seed)?;
        let split = Split::from_indices(feature_names, &x, &y, &train_indices, &test_indices);

        info!(
            path = %path.as_ref().display(),
            train_rows = split.n_train(),
            train_positives = count_positives(&split.y_train),
            test_rows = split.n_test(),
            test_positives = count_positives(&split.y_test),
            "Stratified split complete"
        );

        Ok(split)
    }
}

/// Load `path` with a default [`DataLoader`]
pub fn load(path: impl AsRef<Path>, label_column: &str, test_fraction: f64, seed: u64) -> Result<Split> {
    DataLoader::new().load(path, label_column, test_fraction, seed)
}

/// Split in-memory arrays into stratified train/test partitions
pub fn stratified_split(
    feature_names: Vec<String>,
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<Split> {
    validate_test_fraction(test_fraction)?;
    if x.nrows() != y.len() {
        return Err(FraudError::length_mismatch("y", x.nrows(), y.len()));
    }
    let (train_indices, test_indices) = stratified_indices(y, test_fraction, seed)?;
    Ok(Split::from_indices(feature_names, x, y, &train_indices, &test_indices))
}

fn validate_test_fraction(test_fraction: f64) -> Result<()> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(FraudError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: "must be in the open interval (0, 1)".to_string(),
        });
    }
    Ok(())
}

fn count_positives(y: &Array1<f64>) -> usize {
    y.iter().filter(|&&v| v > 0.5).count()
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Separate the label column from the features.
/// Returns (features, labels, feature names).
pub fn separate_label(df: &DataFrame, label_column: &str) -> Result<(Array2<f64>, Array1<f64>, Vec<String>)> {
    let label = df
        .column(label_column)
        .map_err(|_| FraudError::Schema(format!("label column '{}' not found", label_column)))?;

    if !is_numeric_dtype(label.dtype()) && label.dtype() != &DataType::Boolean {
        return Err(FraudError::Schema(format!(
            "label column '{}' has non-numeric type {}",
            label_column,
            label.dtype()
        )));
    }

    let label_f64 = label.cast(&DataType::Float64)?;
    let y = label_f64
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(v) if v == 0.0 || v == 1.0 => Ok(v),
            Some(v) => Err(FraudError::Schema(format!(
                "label column '{}' must be binary, found {} at row {}",
                label_column, v, row
            ))),
            None => Err(FraudError::Schema(format!(
                "label column '{}' has a missing value at row {}",
                label_column, row
            ))),
        })
        .collect::<Result<Array1<f64>>>()?;

    let feature_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != label_column)
        .map(|s| s.to_string())
        .collect();

    let x = columns_to_array2(df, &feature_names)?;
    Ok((x, y, feature_names))
}

/// Extract named numeric columns into a row-major matrix; nulls become `NaN`.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let column = df
                .column(col_name)
                .map_err(|_| FraudError::Schema(format!("column '{}' not found", col_name)))?;
            if !is_numeric_dtype(column.dtype()) {
                return Err(FraudError::Schema(format!(
                    "feature column '{}' has non-numeric type {}",
                    col_name,
                    column.dtype()
                )));
            }
            let values: Vec<f64> = column
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}

/// Stratified shuffle split of row indices.
///
/// The test partition holds `ceil(n * test_fraction)` rows. Each class
/// receives its proportional share of the test rows, with leftover rows
/// going to the classes with the largest fractional remainders.
pub fn stratified_indices(y: &Array1<f64>, test_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    validate_test_fraction(test_fraction)?;

    let n = y.len();
    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        class_indices.entry(val.round() as i64).or_default().push(idx);
    }

    if let Some((class, members)) = class_indices.iter().find(|(_, m)| m.len() < 2) {
        return Err(FraudError::Validation(format!(
            "class {} has only {} member(s), need at least 2 for a stratified split",
            class,
            members.len()
        )));
    }

    let n_test = (n as f64 * test_fraction).ceil() as usize;
    let n_train = n - n_test;
    let n_classes = class_indices.len();
    if n_test < n_classes || n_train < n_classes {
        return Err(FraudError::Validation(format!(
            "train size {} and test size {} must both be at least the number of classes {}",
            n_train, n_test, n_classes
        )));
    }

    let test_counts = allocate_test_counts(&class_indices, n, n_test);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);

    for ((_, indices), &class_test) in class_indices.iter_mut().zip(test_counts.iter()) {
        indices.shuffle(&mut rng);
        test.extend_from_slice(&indices[..class_test]);
        train.extend_from_slice(&indices[class_test..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    debug!(n_train = train.len(), n_test = test.len(), n_classes, "Stratified indices");
    Ok((train, test))
}

fn allocate_test_counts(class_indices: &BTreeMap<i64, Vec<usize>>, n: usize, n_test: usize) -> Vec<usize> {
    let exact: Vec<f64> = class_indices
        .values()
        .map(|members| n_test as f64 * members.len() as f64 / n as f64)
        .collect();

    // Each class keeps at least one training row
    let caps: Vec<usize> = class_indices.values().map(|m| m.len() - 1).collect();
    let mut counts: Vec<usize> = exact
        .iter()
        .zip(caps.iter())
        .map(|(&e, &cap)| (e.floor() as usize).min(cap))
        .collect();

    let mut order: Vec<usize> = (0..exact.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra)
    });

    let mut remaining = n_test.saturating_sub(counts.iter().sum());
    while remaining > 0 {
        let mut assigned = false;
        for &class in &order {
            if remaining == 0 {
                break;
            }
            if counts[class] < caps[class] {
                counts[class] += 1;
                remaining -= 1;
                assigned = true;
            }
        }
        if !assigned {
            break;
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_test_csv(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file
    }

    fn labels(n: usize, n_pos: usize) -> Array1<f64> {
        // Spread positives evenly through the rows
        let step = n / n_pos.max(1);
        Array1::from_iter((0..n).map(|i| if n_pos > 0 && i % step == 0 && i / step < n_pos { 1.0 } else { 0.0 }))
    }

    #[test]
    fn test_stratified_indices_exact_proportions() {
        let y = labels(1000, 20);
        assert_eq!(count_positives(&y), 20);

        let (train, test) = stratified_indices(&y, 0.2, 2023).unwrap();
        assert_eq!(train.len(), 800);
        assert_eq!(test.len(), 200);

        let test_pos = test.iter().filter(|&&i| y[i] > 0.5).count();
        let train_pos = train.iter().filter(|&&i| y[i] > 0.5).count();
        assert_eq!(test_pos, 4);
        assert_eq!(train_pos, 16);
    }

    #[test]
    fn test_stratified_indices_disjoint_and_complete() {
        let y = labels(101, 10);
        let (train, test) = stratified_indices(&y, 0.3, 7).unwrap();

        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..101).collect::<Vec<_>>());
        assert_eq!(test.len(), (101.0_f64 * 0.3).ceil() as usize);
    }

    #[test]
    fn test_stratified_indices_reproducible() {
        let y = labels(200, 10);
        let a = stratified_indices(&y, 0.25, 42).unwrap();
        let b = stratified_indices(&y, 0.25, 42).unwrap();
        let c = stratified_indices(&y, 0.25, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.1, c.1);
    }

    #[test]
    fn test_invalid_test_fraction() {
        let y = labels(100, 10);
        for f in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let err = stratified_indices(&y, f, 1).unwrap_err();
            assert!(matches!(err, FraudError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_singleton_class_rejected() {
        let y = labels(50, 1);
        assert!(matches!(
            stratified_indices(&y, 0.2, 1),
            Err(FraudError::Validation(_))
        ));
    }

    #[test]
    fn test_load_splits_features_and_label() {
        let mut rows = vec!["Time,V1,Amount,Class"];
        let body: Vec<String> = (0..20)
            .map(|i| format!("{},{},{},{}", i, i as f64 * 0.5, 10 + i, if i % 5 == 0 { 1 } else { 0 }))
            .collect();
        rows.extend(body.iter().map(|s| s.as_str()));
        let file = create_test_csv(&rows);

        let split = load(file.path(), "Class", 0.2, 2023).unwrap();
        assert_eq!(split.feature_names, vec!["Time", "V1", "Amount"]);
        assert_eq!(split.n_train(), 16);
        assert_eq!(split.n_test(), 4);
        assert_eq!(split.x_train.ncols(), 3);
        assert_eq!(count_positives(&split.y_test), 1);
    }

    #[test]
    fn test_missing_feature_values_become_nan() {
        let file = create_test_csv(&["a,b,Class", "1.0,,0", "2.0,3.0,1", "3.0,4.0,0", "4.0,5.0,1"]);
        let df = DataLoader::new().load_frame(file.path()).unwrap();
        let (x, _, _) = separate_label(&df, "Class").unwrap();
        assert!(x[[0, 1]].is_nan());
        assert_eq!(x[[1, 1]], 3.0);
    }

    #[test]
    fn test_missing_label_column() {
        let file = create_test_csv(&["a,b", "1,2", "3,4"]);
        let err = load(file.path(), "Class", 0.2, 1).unwrap_err();
        assert!(matches!(err, FraudError::Schema(_)));
    }

    #[test]
    fn test_non_binary_label() {
        let file = create_test_csv(&["a,Class", "1,0", "2,2", "3,1", "4,0"]);
        let err = load(file.path(), "Class", 0.5, 1).unwrap_err();
        assert!(matches!(err, FraudError::Schema(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load("/definitely/not/here.csv", "Class", 0.2, 1).unwrap_err();
        assert!(matches!(err, FraudError::DataAccess(_)));
    }
}
