//! Linear model implementations

use super::models::{check_binary_xy, invalid, two_column_proba, unknown_param, Estimator, ParamValue};
use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Regularization penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    L1,
    L2,
}

impl FromStr for Penalty {
    type Err = FraudError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "l1" => Ok(Penalty::L1),
            "l2" => Ok(Penalty::L2),
            other => Err(invalid("penalty", &ParamValue::from(other), "expected 'l1' or 'l2'")),
        }
    }
}

impl Penalty {
    fn value(self, w: f64) -> f64 {
        match self {
            Penalty::L1 => w.abs(),
            Penalty::L2 => 0.5 * w * w,
        }
    }
}

/// Soft thresholding operator for L1
fn soft_threshold(x: f64, lambda: f64) -> f64 {
    if x > lambda {
        x - lambda
    } else if x < -lambda {
        x + lambda
    } else {
        0.0
    }
}

/// `ln(1 + e^z)` without overflow
fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Regularized logistic regression.
///
/// Minimizes `C * sum(logloss) + R(w)` where `R` is `0.5 * ||w||^2` (l2)
/// or `||w||_1` (l1). Solved by cyclic coordinate descent with one Newton
/// step per coordinate and a backtracking line search; the l1 step applies
/// soft-thresholding. The intercept is not penalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Whether to fit intercept
    pub fit_intercept: bool,
    /// Penalty type
    pub penalty: Penalty,
    /// Inverse regularization strength
    pub c: f64,
    /// Maximum passes over the coordinates
    pub max_iter: usize,
    /// Stop when the largest coordinate update falls below this
    pub tol: f64,
    /// Whether model is fitted
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model (l2, C = 1)
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept: true,
            penalty: Penalty::L2,
            c: 1.0,
            max_iter: 100,
            tol: 1e-4,
            is_fitted: false,
        }
    }

    /// Set penalty type
    pub fn with_penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    /// Set inverse regularization strength
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set whether to fit an intercept
    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Fit the model by coordinate descent
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_binary_xy(x, y)?;
        if !(self.c > 0.0) {
            return Err(invalid("C", &ParamValue::Float(self.c), "must be positive"));
        }

        let n_features = x.ncols();
        let mut weights = Array1::<f64>::zeros(n_features);
        let mut bias = 0.0;
        // Margins z = Xw + b, kept in sync with every update
        let mut z = Array1::<f64>::zeros(x.nrows());
        let ones = Array1::<f64>::ones(x.nrows());

        let mut n_iter = 0;
        for _ in 0..self.max_iter {
            n_iter += 1;
            let mut max_step = 0.0f64;

            for j in 0..n_features {
                let step = self.coordinate_step(x.column(j), y, &z, weights[j], Some(self.penalty));
                if step != 0.0 {
                    weights[j] += step;
                    z.scaled_add(step, &x.column(j));
                    max_step = max_step.max(step.abs());
                }
            }

            if self.fit_intercept {
                let step = self.coordinate_step(ones.view(), y, &z, bias, None);
                if step != 0.0 {
                    bias += step;
                    z.mapv_inplace(|v| v + step);
                    max_step = max_step.max(step.abs());
                }
            }

            if max_step < self.tol {
                break;
            }
        }

        debug!(
            penalty = ?self.penalty,
            c = self.c,
            n_iter,
            nonzero = weights.iter().filter(|w| **w != 0.0).count(),
            "Logistic regression fitted"
        );

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        self.is_fitted = true;

        Ok(self)
    }

    /// Newton step for one coordinate, shortened until the objective drops.
    /// `penalty` is `None` for the intercept.
    fn coordinate_step(
        &self,
        col: ArrayView1<f64>,
        y: &Array1<f64>,
        z: &Array1<f64>,
        w: f64,
        penalty: Option<Penalty>,
    ) -> f64 {
        let mut grad = 0.0;
        let mut hess = 0.0;
        for ((&xi, &yi), &zi) in col.iter().zip(y.iter()).zip(z.iter()) {
            if xi == 0.0 {
                continue;
            }
            let p = sigmoid(zi);
            grad += (p - yi) * xi;
            hess += p * (1.0 - p) * xi * xi;
        }
        grad *= self.c;
        hess = self.c * hess + 1e-12;

        let mut step = match penalty {
            None => -grad / hess,
            Some(Penalty::L2) => -(grad + w) / (hess + 1.0),
            Some(Penalty::L1) => soft_threshold(w - grad / hess, 1.0 / hess) - w,
        };
        if step == 0.0 {
            return 0.0;
        }

        let penalty_at = |v: f64| penalty.map_or(0.0, |p| p.value(v));
        for _ in 0..30 {
            let loss_change: f64 = col
                .iter()
                .zip(y.iter())
                .zip(z.iter())
                .filter(|((&xi, _), _)| xi != 0.0)
                .map(|((&xi, &yi), &zi)| {
                    let moved = zi + step * xi;
                    (softplus(moved) - yi * moved) - (softplus(zi) - yi * zi)
                })
                .sum();
            let change = self.c * loss_change + penalty_at(w + step) - penalty_at(w);
            if change <= 0.0 {
                return step;
            }
            step *= 0.5;
        }
        0.0
    }

    /// Probability of the positive class
    pub fn decision_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(FraudError::ModelNotFitted)?;
        if x.ncols() != coefficients.len() {
            return Err(FraudError::length_mismatch("columns", coefficients.len(), x.ncols()));
        }
        let intercept = self.intercept.unwrap_or(0.0);
        Ok((x.dot(coefficients) + intercept).mapv(sigmoid))
    }
}

impl Estimator for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LogisticRegression::fit(self, x, y).map(|_| ())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(two_column_proba(&self.decision_proba(x)?))
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "penalty" => self.penalty = value.as_str(name)?.parse()?,
            "C" => {
                let c = value.as_f64(name)?;
                if !(c > 0.0) {
                    return Err(invalid(name, value, "must be positive"));
                }
                self.c = c;
            }
            "max_iter" => self.max_iter = value.as_usize(name)?,
            "tol" => self.tol = value.as_f64(name)?,
            _ => return Err(unknown_param("LogisticRegression", name, value)),
        }
        Ok(())
    }
}
