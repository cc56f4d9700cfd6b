//! Random Forest implementation

use super::decision_tree::{Criterion, DecisionTree};
use super::models::{check_binary_xy, two_column_proba, unknown_param, Estimator, ParamValue};
use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }
}

/// Bagged ensemble of classification trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (sqrt by default)
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Random state
    pub random_state: Option<u64>,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    /// Create a new classifier forest
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: None,
            feature_importances: None,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Enable or disable bootstrap sampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_binary_xy(x, y)?;
        if self.n_estimators == 0 {
            return Err(FraudError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let start = Instant::now();
        let n_samples = x.nrows();
        self.n_features = x.ncols();
        let max_features = self.max_features.resolve(self.n_features);
        let base_seed = self.random_state.unwrap_or_else(|| rand::thread_rng().next_u64());

        // Build trees in parallel, one seeded RNG per tree
        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot = y.select(Axis(0), &sample_indices);

                let mut tree = DecisionTree::new_classifier()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_criterion(self.criterion)
                    .with_max_features(max_features)
                    .with_random_state(rng.next_u64());
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.compute_feature_importances();

        debug!(
            n_estimators = self.n_estimators,
            max_depth = ?self.max_depth,
            max_features,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Random forest fitted"
        );

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        let mut total = Array1::<f64>::zeros(self.n_features);
        for imp in self.trees.iter().filter_map(|t| t.feature_importances()) {
            total += imp;
        }
        let sum = total.sum();
        if sum > 0.0 {
            total /= sum;
        }
        self.feature_importances = Some(total);
    }

    /// Mean over trees of the leaf positive-class frequency
    pub fn positive_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(FraudError::ModelNotFitted);
        }

        let per_tree = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_value(x))
            .collect::<Result<Vec<_>>>()?;

        let mut sum = Array1::<f64>::zeros(x.nrows());
        for values in &per_tree {
            sum += values;
        }
        Ok(sum / per_tree.len() as f64)
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Fitted trees
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

impl Estimator for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        RandomForest::fit(self, x, y).map(|_| ())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(two_column_proba(&self.positive_proba(x)?))
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "max_depth" => self.max_depth = Some(value.as_usize(name)?),
            "n_estimators" => self.n_estimators = value.as_usize(name)?,
            "min_samples_leaf" => self.min_samples_leaf = value.as_usize(name)?,
            "random_state" => self.random_state = Some(value.as_usize(name)? as u64),
            _ => return Err(unknown_param("RandomForest", name, value)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 4), |(i, j)| {
            let base = if i % 2 == 0 { 0.0 } else { 5.0 };
            base + ((i * 7 + j * 3) % 10) as f64 * 0.1
        });
        let y = Array1::from_iter((0..n).map(|i| (i % 2) as f64));
        (x, y)
    }

    #[test]
    fn test_forest_separates_blobs() {
        let (x, y) = blobs(60);
        let mut rf = RandomForest::new(10).with_max_depth(3).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        assert_eq!(rf.trees().len(), 10);
        assert_eq!(rf.score(&x, &y).unwrap(), 1.0);
    }

    #[test]
    fn test_proba_in_unit_interval() {
        let (x, y) = blobs(40);
        let mut rf = RandomForest::new(5).with_random_state(1);
        rf.fit(&x, &y).unwrap();
        let proba = rf.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let (x, y) = blobs(40);
        let mut a = RandomForest::new(5).with_max_depth(2).with_random_state(7);
        let mut b = RandomForest::new(5).with_max_depth(2).with_random_state(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.positive_proba(&x).unwrap(), b.positive_proba(&x).unwrap());
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(30), 5);
        assert_eq!(MaxFeatures::Log2.resolve(1), 1);
        assert_eq!(MaxFeatures::All.resolve(7), 7);
        assert_eq!(MaxFeatures::Fixed(10).resolve(4), 4);
    }

    #[test]
    fn test_set_param() {
        let mut rf = RandomForest::default();
        rf.set_param("max_depth", &ParamValue::Int(7)).unwrap();
        rf.set_param("n_estimators", &ParamValue::Int(30)).unwrap();
        assert_eq!(rf.max_depth, Some(7));
        assert_eq!(rf.n_estimators, 30);
        assert!(rf.set_param("C", &ParamValue::Float(1.0)).is_err());
    }

    #[test]
    fn test_unfitted() {
        let rf = RandomForest::default();
        assert!(matches!(rf.positive_proba(&Array2::zeros((1, 2))), Err(FraudError::ModelNotFitted)));
    }
}
