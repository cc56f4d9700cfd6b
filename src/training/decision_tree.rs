//! Decision tree implementation

use super::models::check_finite;
use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node. For classification `value` is the fraction of positive
    /// samples, for regression it is the mean target.
    Leaf {
        id: usize,
        value: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity (binary classification)
    Gini,
    /// Entropy (binary classification)
    Entropy,
    /// Mean squared error (regression)
    MSE,
}

/// Running sums over the targets of a node
#[derive(Debug, Clone, Copy, Default)]
struct NodeStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
}

impl NodeStats {
    fn push(&mut self, y: f64) {
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
    }

    fn minus(&self, other: &NodeStats) -> NodeStats {
        NodeStats {
            count: self.count - other.count,
            sum: self.sum - other.sum,
            sq_sum: self.sq_sum - other.sq_sum,
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.sum / self.count as f64 }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match criterion {
            Criterion::Gini => {
                let p = self.sum / n;
                2.0 * p * (1.0 - p)
            }
            Criterion::Entropy => {
                let p = self.sum / n;
                [p, 1.0 - p]
                    .iter()
                    .filter(|&&q| q > 0.0)
                    .map(|&q| -q * q.ln())
                    .sum()
            }
            // Var = E[X²] - E[X]²
            Criterion::MSE => (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0),
        }
    }
}

/// Mutable state threaded through tree construction
struct BuildState {
    importances: Vec<f64>,
    n_leaves: usize,
    rng: ChaCha8Rng,
}

/// Best split found for a node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// CART decision tree for binary classification or regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth (root is depth 0)
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Number of features drawn at random for each split (all when `None`)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for feature sampling
    pub random_state: Option<u64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
    is_classification: bool,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new binary classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            feature_importances: None,
            is_classification: true,
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::MSE,
            is_classification: false,
            ..Self::new_classifier()
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

    /// Set number of features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(FraudError::length_mismatch("y", n_samples, y.len()));
        }
        if n_samples == 0 {
            return Err(FraudError::Validation("cannot fit a tree on zero samples".to_string()));
        }
        if self.is_classification && y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(FraudError::Validation(
                "classification tree expects 0/1 labels".to_string(),
            ));
        }
        check_finite(x)?;

        self.n_features = n_features;
        let rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut state = BuildState {
            importances: vec![0.0; n_features],
            n_leaves: 0,
            rng,
        };

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut state));

        let mut importances = state.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        state: &mut BuildState,
    ) -> TreeNode {
        let n_samples = indices.len();
        let mut stats = NodeStats::default();
        for &i in indices {
            stats.push(y[i]);
        }
        let impurity = stats.impurity(self.criterion);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || impurity <= 1e-12;

        let best = if should_stop {
            None
        } else {
            self.find_best_split(x, y, indices, &stats, &mut state.rng)
        };
        let Some(best) = best else {
            let id = state.n_leaves;
            state.n_leaves += 1;
            return TreeNode::Leaf {
                id,
                value: stats.mean(),
                n_samples,
            };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best.feature_idx]] <= best.threshold);

        state.importances[best.feature_idx] += n_samples as f64 * best.gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, state));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, state));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    /// Scan the candidate features in parallel. Each feature is sorted once
    /// and swept left to right with running sums.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        parent: &NodeStats,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n_features = x.ncols();
        let features: Vec<usize> = match self.max_features {
            Some(k) if k < n_features => sample(rng, n_features, k.max(1)).into_vec(),
            _ => (0..n_features).collect(),
        };

        let parent_impurity = parent.impurity(self.criterion);
        let n = indices.len() as f64;

        features
            .into_par_iter()
            .filter_map(|feature_idx| {
                let mut pairs: Vec<(f64, f64)> = indices.iter().map(|&i| (x[[i, feature_idx]], y[i])).collect();
                pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut left = NodeStats::default();
                let mut best: Option<SplitCandidate> = None;

                for k in 0..pairs.len().saturating_sub(1) {
                    left.push(pairs[k].1);
                    let (v, next) = (pairs[k].0, pairs[k + 1].0);
                    if !(v < next) {
                        continue;
                    }
                    let right = parent.minus(&left);
                    if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                        continue;
                    }

                    let weighted = (left.count as f64 * left.impurity(self.criterion)
                        + right.count as f64 * right.impurity(self.criterion))
                        / n;
                    let gain = parent_impurity - weighted;
                    if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                        best = Some(SplitCandidate {
                            feature_idx,
                            threshold: (v + next) / 2.0,
                            gain,
                        });
                    }
                }
                best
            })
            .reduce_with(|a, b| {
                if b.gain > a.gain || (b.gain == a.gain && b.feature_idx < a.feature_idx) {
                    b
                } else {
                    a
                }
            })
    }

    /// Raw leaf value for every row: positive fraction (classifier) or mean (regressor)
    pub fn predict_value(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(FraudError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(FraudError::length_mismatch("columns", self.n_features, x.ncols()));
        }
        Ok(x.rows().into_iter().map(|row| Self::predict_sample(root, row)).collect())
    }

    /// Predict class labels (classifier) or values (regressor)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let values = self.predict_value(x)?;
        if self.is_classification {
            Ok(values.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
        } else {
            Ok(values)
        }
    }

    fn find_leaf<'a>(node: &'a TreeNode, sample: ArrayView1<f64>) -> &'a TreeNode {
        match node {
            TreeNode::Leaf { .. } => node,
            TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                if sample[*feature_idx] <= *threshold {
                    Self::find_leaf(left, sample)
                } else {
                    Self::find_leaf(right, sample)
                }
            }
        }
    }

    fn predict_sample(node: &TreeNode, sample: ArrayView1<f64>) -> f64 {
        match Self::find_leaf(node, sample) {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split { .. } => f64::NAN,
        }
    }

    /// Leaf id reached by every row, ids run `0..get_n_leaves()`
    pub fn apply(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let root = self.root.as_ref().ok_or(FraudError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(FraudError::length_mismatch("columns", self.n_features, x.ncols()));
        }
        Ok(x.rows()
            .into_iter()
            .map(|row| match Self::find_leaf(root, row) {
                TreeNode::Leaf { id, .. } => *id,
                TreeNode::Split { .. } => 0,
            })
            .collect())
    }

    /// Overwrite leaf values by id
    pub fn set_leaf_values(&mut self, values: &[f64]) -> Result<()> {
        fn walk(node: &mut TreeNode, values: &[f64]) {
            match node {
                TreeNode::Leaf { id, value, .. } => {
                    if let Some(v) = values.get(*id) {
                        *value = *v;
                    }
                }
                TreeNode::Split { left, right, .. } => {
                    walk(left, values);
                    walk(right, values);
                }
            }
        }
        let n_leaves = self.get_n_leaves();
        let root = self.root.as_mut().ok_or(FraudError::ModelNotFitted)?;
        if values.len() != n_leaves {
            return Err(FraudError::length_mismatch("leaf values", n_leaves, values.len()));
        }
        walk(root, values);
        Ok(())
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Number of split levels on the longest root-to-leaf path
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}
