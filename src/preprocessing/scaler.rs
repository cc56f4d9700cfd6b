//! Feature scaling implementations

use crate::error::{FraudError, Result};
use crate::utils::stats::{quantile_sorted, sorted_finite};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Robust scaling using median and IQR (25th to 75th percentile)
    Robust,
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
}

/// Parameters for a fitted column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // median or mean
    scale: f64,  // IQR or std
}

/// Column-wise feature scaler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit the scaler to the data; `NaN` entries are ignored
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        self.params = x
            .axis_iter(Axis(1))
            .map(|col| {
                let sorted = sorted_finite(col);
                self.compute_params(&sorted)
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_columns(x)?;
        let mut result = x.clone();
        for (mut col, params) in result.axis_iter_mut(Axis(1)).zip(self.params.iter()) {
            col.mapv_inplace(|v| (v - params.center) / params.scale);
        }
        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Undo the scaling
    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_columns(x)?;
        let mut result = x.clone();
        for (mut col, params) in result.axis_iter_mut(Axis(1)).zip(self.params.iter()) {
            col.mapv_inplace(|v| v * params.scale + params.center);
        }
        Ok(result)
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    /// Fitted (center, scale) per column
    pub fn params(&self) -> Vec<(f64, f64)> {
        self.params.iter().map(|p| (p.center, p.scale)).collect()
    }

    fn check_columns(&self, x: &Array2<f64>) -> Result<()> {
        if !self.is_fitted {
            return Err(FraudError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(FraudError::length_mismatch("columns", self.params.len(), x.ncols()));
        }
        Ok(())
    }

    fn compute_params(&self, sorted: &[f64]) -> ScalerParams {
        match self.scaler_type {
            ScalerType::Robust => {
                let median = quantile_sorted(sorted, 0.5).unwrap_or(0.0);
                let q1 = quantile_sorted(sorted, 0.25).unwrap_or(0.0);
                let q3 = quantile_sorted(sorted, 0.75).unwrap_or(0.0);
                let iqr = q3 - q1;
                ScalerParams {
                    center: median,
                    scale: if iqr == 0.0 { 1.0 } else { iqr },
                }
            }
            ScalerType::Standard => {
                if sorted.is_empty() {
                    return ScalerParams { center: 0.0, scale: 1.0 };
                }
                let n = sorted.len() as f64;
                let mean = sorted.iter().sum::<f64>() / n;
                let std = (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
                ScalerParams {
                    center: mean,
                    scale: if std == 0.0 { 1.0 } else { std },
                }
            }
        }
    }
}
