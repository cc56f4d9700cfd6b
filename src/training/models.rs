//! Estimator trait and hyperparameter values

use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(usize),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Interpret as a count (depth, number of trees)
    pub fn as_usize(&self, name: &str) -> Result<usize> {
        match self {
            ParamValue::Int(v) => Ok(*v),
            other => Err(invalid(name, other, "expected an integer")),
        }
    }

    /// Interpret as a float; integers widen
    pub fn as_f64(&self, name: &str) -> Result<f64> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(invalid(name, other, "expected a number")),
        }
    }

    pub fn as_str(&self, name: &str) -> Result<&str> {
        match self {
            ParamValue::Text(s) => Ok(s),
            other => Err(invalid(name, other, "expected a string")),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

pub(crate) fn invalid(name: &str, value: &ParamValue, reason: &str) -> FraudError {
    FraudError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub(crate) fn unknown_param(estimator: &str, name: &str, value: &ParamValue) -> FraudError {
    invalid(name, value, &format!("not a hyperparameter of {}", estimator))
}

/// Binary classifier used by the grid search and the pipeline
pub trait Estimator: Send + Sync {
    /// Fit the model to training data with 0/1 labels
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Class probabilities, columns `[P(0), P(1)]`
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Predicted 0/1 labels
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.column(1).mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    /// Set a hyperparameter by name
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()>;

    /// Mean accuracy on the given data
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let predictions = self.predict(x)?;
        accuracy(y, &predictions)
    }
}

/// Stack positive-class probabilities into the `[P(0), P(1)]` layout
pub(crate) fn two_column_proba(positive: &Array1<f64>) -> Array2<f64> {
    let negative = positive.mapv(|p| 1.0 - p);
    ndarray::stack(Axis(1), &[negative.view(), positive.view()])
        .unwrap_or_else(|_| Array2::zeros((positive.len(), 2)))
}

/// Shared input checks for `fit`
pub(crate) fn check_binary_xy(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(FraudError::length_mismatch("y", x.nrows(), y.len()));
    }
    if x.nrows() == 0 {
        return Err(FraudError::Validation("cannot fit on zero samples".to_string()));
    }
    if y.iter().any(|&v| v != 0.0 && v != 1.0) {
        return Err(FraudError::Validation("labels must be 0 or 1".to_string()));
    }
    check_finite(x)
}

/// Reject `NaN` or infinite features; missing values must be imputed first
pub(crate) fn check_finite(x: &Array2<f64>) -> Result<()> {
    if let Some(((row, col), v)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(FraudError::Validation(format!(
            "input contains {} at row {}, column {}",
            v, row, col
        )));
    }
    Ok(())
}

/// Fraction of matching labels
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(FraudError::length_mismatch("predictions", y_true.len(), y_pred.len()));
    }
    if y_true.is_empty() {
        return Ok(0.0);
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 1e-10)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_param_value_conversions() {
        assert_eq!(ParamValue::from(7usize).as_usize("max_depth").unwrap(), 7);
        assert_eq!(ParamValue::from(3usize).as_f64("C").unwrap(), 3.0);
        assert_eq!(ParamValue::from("l1").as_str("penalty").unwrap(), "l1");
        assert!(matches!(
            ParamValue::from(0.5).as_usize("max_depth"),
            Err(FraudError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_param_value_json() {
        let values: Vec<ParamValue> = serde_json::from_str(r#"[3, 0.01, "l2"]"#).unwrap();
        assert_eq!(values, vec![ParamValue::Int(3), ParamValue::Float(0.01), ParamValue::from("l2")]);
    }

    #[test]
    fn test_accuracy() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        assert_eq!(accuracy(&y_true, &y_pred).unwrap(), 0.75);
        assert!(accuracy(&y_true, &array![1.0]).is_err());
    }

    #[test]
    fn test_two_column_proba() {
        let proba = two_column_proba(&array![0.25, 1.0]);
        assert_eq!(proba, array![[0.75, 0.25], [0.0, 1.0]]);
    }

    #[test]
    fn test_check_binary_xy_rejects_missing_features() {
        let y = array![0.0, 1.0];
        assert!(check_binary_xy(&array![[1.0, 2.0], [3.0, 4.0]], &y).is_ok());

        let err = check_binary_xy(&array![[1.0, 2.0], [3.0, f64::NAN]], &y).unwrap_err();
        assert!(matches!(err, FraudError::Validation(_)));
        assert!(err.to_string().contains("row 1, column 1"));
        assert!(check_binary_xy(&array![[f64::INFINITY, 2.0], [3.0, 4.0]], &y).is_err());
    }
}
