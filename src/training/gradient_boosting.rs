//! Gradient Boosting implementation
//!
//! Binary log-loss boosting over regression trees. Each round fits a tree to
//! the pseudo-residuals of a row subsample drawn without replacement, then
//! replaces the tree's leaf values with one Newton step per leaf.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::decision_tree::DecisionTree;
use super::models::{check_binary_xy, invalid, two_column_proba, unknown_param, Estimator, ParamValue};
use crate::error::{FraudError, Result};

/// Gradient Boosting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn for each tree
    pub subsample: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: None,
        }
    }
}

impl GradientBoostingConfig {
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(invalid("subsample", &ParamValue::Float(self.subsample), "must be in (0, 1]"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(invalid(
                "learning_rate",
                &ParamValue::Float(self.learning_rate),
                "must be positive",
            ));
        }
        Ok(())
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Gradient Boosting Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    initial_log_odds: f64,
    feature_importances: Vec<f64>,
    is_fitted: bool,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_log_odds: 0.0,
            feature_importances: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    pub fn set_random_state(&mut self, seed: u64) {
        self.config.random_state = Some(seed);
    }

    /// Fit binary classification
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_binary_xy(x, y)?;
        self.config.validate()?;

        let start = Instant::now();
        let n_samples = x.nrows();
        let n_features = x.ncols();

        let p = y.mean().unwrap_or(0.5).clamp(1e-10, 1.0 - 1e-10);
        self.initial_log_odds = (p / (1.0 - p)).ln();
        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees = Vec::with_capacity(self.config.n_estimators);
        self.feature_importances = vec![0.0; n_features];

        for _ in 0..self.config.n_estimators {
            let probs = log_odds.mapv(sigmoid);
            let residuals = y - &probs;

            let sample_indices = self.subsample_indices(n_samples, &mut rng);
            let x_sub = x.select(Axis(0), &sample_indices);
            let r_sub = residuals.select(Axis(0), &sample_indices);

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf)
                .with_random_state(rng.next_u64());
            tree.fit(&x_sub, &r_sub)?;

            // Newton step per leaf: sum(residual) / sum(p * (1 - p))
            let leaves = tree.apply(&x_sub)?;
            let n_leaves = tree.get_n_leaves();
            let mut numerator = vec![0.0; n_leaves];
            let mut denominator = vec![0.0; n_leaves];
            for (k, &leaf) in leaves.iter().enumerate() {
                let pi = probs[sample_indices[k]];
                numerator[leaf] += r_sub[k];
                denominator[leaf] += pi * (1.0 - pi);
            }
            let values: Vec<f64> = numerator
                .iter()
                .zip(denominator.iter())
                .map(|(&num, &den)| if den.abs() < 1e-150 { 0.0 } else { num / den })
                .collect();
            tree.set_leaf_values(&values)?;

            // Every row moves, not only the sampled ones
            let update = tree.predict_value(x)?;
            log_odds.scaled_add(self.config.learning_rate, &update);

            if let Some(importance) = tree.feature_importances() {
                for (total, &v) in self.feature_importances.iter_mut().zip(importance.iter()) {
                    *total += v;
                }
            }
            self.trees.push(tree);
        }

        let total: f64 = self.feature_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= total;
            }
        }
        self.is_fitted = true;

        debug!(
            n_estimators = self.config.n_estimators,
            max_depth = self.config.max_depth,
            subsample = self.config.subsample,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Gradient boosting fitted"
        );

        Ok(())
    }

    /// Probability of the positive class
    pub fn positive_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(FraudError::ModelNotFitted);
        }
        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for tree in &self.trees {
            let update = tree.predict_value(x)?;
            log_odds.scaled_add(self.config.learning_rate, &update);
        }
        Ok(log_odds.mapv(sigmoid))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let sample_size = ((n as f64 * self.config.subsample).floor() as usize).clamp(1, n);
        let mut indices = rand::seq::index::sample(rng, n, sample_size).into_vec();
        indices.sort_unstable();
        indices
    }
}

impl Estimator for GradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        GradientBoostingClassifier::fit(self, x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(two_column_proba(&self.positive_proba(x)?))
    }

    /// `subsample` is fixed at construction and is not settable here
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "max_depth" => self.config.max_depth = value.as_usize(name)?,
            "n_estimators" => self.config.n_estimators = value.as_usize(name)?,
            "learning_rate" => self.config.learning_rate = value.as_f64(name)?,
            "random_state" => self.config.random_state = Some(value.as_usize(name)? as u64),
            _ => return Err(unknown_param("GradientBoostingClassifier", name, value)),
        }
        Ok(())
    }
}
