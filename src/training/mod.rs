//! Model training module
//!
//! Provides the binary classifiers and the search machinery around them:
//! - Logistic regression (l1/l2, coordinate descent)
//! - Decision trees, Random Forests and Gradient Boosting
//! - K-Fold and Stratified K-Fold cross-validation
//! - Exhaustive grid search over a static hyperparameter grid
//! - Precision-recall curves and threshold metrics

mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod grid_search;
pub mod linear_models;
pub mod metrics;
pub mod random_forest;
pub mod selector;

pub use cross_validation::{CVResults, CVSplit, CVStrategy, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use grid_search::{CandidateResult, GridSearchCV, ParamGrid, ParamSet};
pub use linear_models::{LogisticRegression, Penalty};
pub use metrics::{average_precision, precision_recall_curve, ClassificationMetrics, PrecisionRecallCurve};
pub use models::{accuracy, Estimator, ParamValue};
pub use random_forest::{MaxFeatures, RandomForest};
pub use selector::{
    select, Classifier, ModelConfig, ModelName, GRADIENT_BOOST_SUBSAMPLE, LOGISTIC_C_VALUES,
    LOGISTIC_PENALTIES, TREE_MAX_DEPTHS, TREE_N_ESTIMATORS,
};
