//! Missing value imputation

use crate::error::{FraudError, Result};
use crate::utils::stats::nan_median;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the column median
    Median,
    /// Replace with the column mean
    Mean,
}

/// Column-wise imputer for `NaN` entries.
///
/// Fill values are learned by [`Imputer::fit`] and reused by
/// [`Imputer::transform`], so statistics never leak from the data being
/// transformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: Vec<f64>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learn one fill value per column
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        self.fill_values = x
            .axis_iter(Axis(1))
            .enumerate()
            .map(|(j, col)| {
                let value = match self.strategy {
                    ImputeStrategy::Median => nan_median(col),
                    ImputeStrategy::Mean => {
                        let (sum, count) = col
                            .iter()
                            .filter(|v| !v.is_nan())
                            .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
                        if count > 0 { Some(sum / count as f64) } else { None }
                    }
                };
                value.unwrap_or_else(|| {
                    warn!(column = j, "Column has no observed values, imputing 0.0");
                    0.0
                })
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace `NaN` entries with the learned fill values
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(FraudError::ModelNotFitted);
        }
        if x.ncols() != self.fill_values.len() {
            return Err(FraudError::length_mismatch("columns", self.fill_values.len(), x.ncols()));
        }

        let mut result = x.clone();
        for (mut col, &fill) in result.axis_iter_mut(Axis(1)).zip(self.fill_values.iter()) {
            col.mapv_inplace(|v| if v.is_nan() { fill } else { v });
        }
        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }

    /// Learned fill values, one per column
    pub fn fill_values(&self) -> &[f64] {
        &self.fill_values
    }
}
