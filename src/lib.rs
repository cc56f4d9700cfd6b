//! fraudlab - Fraud-detection classification toolkit
//!
//! This crate covers the path from a labeled transaction CSV to a
//! precision-recall curve:
//! - Stratified train/test loading
//! - Median imputation and robust scaling of heavy-tailed columns
//! - Grid-searched classifiers selected by name
//! - Precision-recall curves drawn on a caller-supplied surface
//!
//! # Modules
//!
//! - [`utils`] - CSV loading and stratified splitting
//! - [`preprocessing`] - Column-wise imputation and scaling plans
//! - [`training`] - Classifiers, cross-validation, grid search, metrics
//! - [`visualization`] - Precision-recall curve plotting
//! - [`autopipeline`] - Fit-able pipeline and end-to-end experiments
//!
//! # Example
//!
//! ```no_run
//! use fraudlab::prelude::*;
//!
//! let split = load("creditcard.csv", "Class", 0.2, 2023)?;
//! let config = select("logistic_regression", CVStrategy::StratifiedKFold { n_splits: 5, shuffle: false })?;
//! let mut pipeline = Pipeline::new(build(&["Amount", "Time"]), config);
//! pipeline.fit(&split)?;
//!
//! let evaluation = pipeline.evaluate(&split.x_test, &split.y_test)?;
//! let mut figure = Figure::new();
//! draw(&mut figure, &evaluation.curve.precision, &evaluation.curve.recall)?;
//! # Ok::<(), fraudlab::FraudError>(())
//! ```

// Core error handling
pub mod error;

// Data
pub mod utils;
pub mod preprocessing;

// Models
pub mod training;

// Output
pub mod visualization;

// Composition
pub mod autopipeline;

pub use error::{FraudError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{FraudError, Result};

    // Data loading
    pub use crate::utils::{load, stratified_split, DataLoader, Split};

    // Preprocessing
    pub use crate::preprocessing::{build, FittedPreprocessor, PreprocessingBuilder, PreprocessingPlan};

    // Training
    pub use crate::training::{
        average_precision, precision_recall_curve, select, CVStrategy, ClassificationMetrics, Classifier,
        CrossValidator, Estimator, GridSearchCV, ModelConfig, ModelName, ParamGrid, ParamValue,
    };

    // Visualization
    pub use crate::visualization::{draw, DrawingSurface, Figure};

    // Pipeline
    pub use crate::autopipeline::{run_experiment, Evaluation, ExperimentConfig, Pipeline};
}
