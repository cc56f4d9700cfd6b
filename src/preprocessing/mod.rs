//! Data preprocessing module
//!
//! Provides the column-wise preprocessing used for transaction data:
//! - Missing value imputation (median by default)
//! - Robust scaling with median and interquartile range
//! - Passthrough of every column that is not named
//!
//! Transaction amounts and elapsed times are heavy-tailed, so the default
//! plan scales with median/IQR rather than mean/variance.

mod imputer;
mod pipeline;
mod scaler;

pub use imputer::{ImputeStrategy, Imputer};
pub use pipeline::{
    build, ColumnTransformer, FittedPreprocessor, NumericStep, PreprocessingBuilder, PreprocessingPlan,
    Remainder, DEFAULT_NUMERIC_COLUMNS,
};
pub use scaler::{Scaler, ScalerType};
