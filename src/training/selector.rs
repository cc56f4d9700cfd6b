//! Model selection: estimator and hyperparameter grid by model name

use super::cross_validation::{CVStrategy, CrossValidator};
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
use super::grid_search::{GridSearchCV, ParamGrid};
use super::linear_models::LogisticRegression;
use super::models::{Estimator, ParamValue};
use super::random_forest::RandomForest;
use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Penalties searched for logistic regression
pub const LOGISTIC_PENALTIES: [&str; 2] = ["l2", "l1"];
/// Inverse regularization strengths searched for logistic regression
pub const LOGISTIC_C_VALUES: [f64; 4] = [0.01, 1.0, 100.0, 10000.0];
/// Tree depths searched for both tree ensembles
pub const TREE_MAX_DEPTHS: [usize; 3] = [3, 7, 11];
/// Ensemble sizes searched for both tree ensembles
pub const TREE_N_ESTIMATORS: [usize; 3] = [10, 30, 70];
/// Row fraction drawn for every boosting round
pub const GRADIENT_BOOST_SUBSAMPLE: f64 = 0.3;

/// Models known to the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelName {
    LogisticRegression,
    RandomForest,
    GradientBoost,
}

impl ModelName {
    pub const ALL: [ModelName; 3] = [
        ModelName::LogisticRegression,
        ModelName::RandomForest,
        ModelName::GradientBoost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::LogisticRegression => "logistic_regression",
            ModelName::RandomForest => "random_forest",
            ModelName::GradientBoost => "gradient_boost",
        }
    }

    /// Unfitted estimator with its fixed settings
    pub fn estimator(&self) -> Classifier {
        match self {
            ModelName::LogisticRegression => Classifier::LogisticRegression(LogisticRegression::new()),
            ModelName::RandomForest => Classifier::RandomForest(RandomForest::default()),
            ModelName::GradientBoost => Classifier::GradientBoosting(GradientBoostingClassifier::new(
                GradientBoostingConfig::default().with_subsample(GRADIENT_BOOST_SUBSAMPLE),
            )),
        }
    }

    /// Hyperparameter grid searched for this model
    pub fn param_grid(&self) -> ParamGrid {
        match self {
            ModelName::LogisticRegression => ParamGrid::new()
                .add("penalty", LOGISTIC_PENALTIES)
                .add("C", LOGISTIC_C_VALUES),
            ModelName::RandomForest | ModelName::GradientBoost => ParamGrid::new()
                .add("max_depth", TREE_MAX_DEPTHS)
                .add("n_estimators", TREE_N_ESTIMATORS),
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = FraudError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "logistic_regression" => Ok(ModelName::LogisticRegression),
            "random_forest" => Ok(ModelName::RandomForest),
            "gradient_boost" => Ok(ModelName::GradientBoost),
            other => Err(FraudError::UnknownModel(other.to_string())),
        }
    }
}

/// Any estimator the selector can hand out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoostingClassifier),
}

impl Classifier {
    /// Seed every source of randomness in the estimator
    pub fn set_random_state(&mut self, seed: u64) {
        match self {
            Classifier::LogisticRegression(_) => {}
            Classifier::RandomForest(m) => m.random_state = Some(seed),
            Classifier::GradientBoosting(m) => m.set_random_state(seed),
        }
    }
}

impl Estimator for Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Classifier::LogisticRegression(m) => Estimator::fit(m, x, y),
            Classifier::RandomForest(m) => Estimator::fit(m, x, y),
            Classifier::GradientBoosting(m) => Estimator::fit(m, x, y),
        }
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        match self {
            Classifier::LogisticRegression(m) => m.predict_proba(x),
            Classifier::RandomForest(m) => m.predict_proba(x),
            Classifier::GradientBoosting(m) => m.predict_proba(x),
        }
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match self {
            Classifier::LogisticRegression(m) => m.set_param(name, value),
            Classifier::RandomForest(m) => m.set_param(name, value),
            Classifier::GradientBoosting(m) => m.set_param(name, value),
        }
    }
}

/// Estimator, grid and folds for one model, ready to search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model: ModelName,
    pub estimator: Classifier,
    pub param_grid: ParamGrid,
    pub cv: CrossValidator,
}

impl ModelConfig {
    /// Number of grid points
    pub fn n_candidates(&self) -> usize {
        self.param_grid.len()
    }

    /// Seed the estimator and the fold shuffling
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.estimator.set_random_state(seed);
        self.cv = self.cv.with_random_state(seed);
        self
    }

    /// Wrap into an unfitted grid search
    pub fn into_search(self) -> GridSearchCV<Classifier> {
        GridSearchCV::new(self.estimator, self.param_grid, self.cv)
    }
}

impl From<ModelConfig> for GridSearchCV<Classifier> {
    fn from(config: ModelConfig) -> Self {
        config.into_search()
    }
}

/// Look up `model_name` and pair its estimator and grid with `cv`.
/// Nothing is fitted here.
pub fn select(model_name: &str, cv: impl Into<CVStrategy>) -> Result<ModelConfig> {
    let model: ModelName = model_name.parse()?;
    let config = ModelConfig {
        model,
        estimator: model.estimator(),
        param_grid: model.param_grid(),
        cv: CrossValidator::new(cv.into()),
    };
    debug!(model = %model, n_candidates = config.n_candidates(), "Model selected");
    Ok(config)
}
