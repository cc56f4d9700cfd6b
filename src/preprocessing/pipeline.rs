//! Column-wise preprocessing plan

use super::imputer::{ImputeStrategy, Imputer};
use super::scaler::{Scaler, ScalerType};
use crate::error::{FraudError, Result};
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Default numeric columns of the card transaction dataset
pub const DEFAULT_NUMERIC_COLUMNS: [&str; 2] = ["Amount", "Time"];

/// A single transformation applied to the selected columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NumericStep {
    Impute(ImputeStrategy),
    Scale(ScalerType),
}

/// What happens to columns that no transformer names
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Remainder {
    Passthrough,
    Drop,
}

/// Ordered steps applied to a named group of columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    pub name: String,
    pub columns: Vec<String>,
    pub steps: Vec<NumericStep>,
}

/// Unfitted preprocessing plan.
///
/// A plan is plain data: building it twice from the same columns yields
/// equal plans. Statistics are learned only by [`PreprocessingPlan::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingPlan {
    pub transformers: Vec<ColumnTransformer>,
    pub remainder: Remainder,
}

impl PreprocessingPlan {
    /// Plan that passes every column through unchanged
    pub fn passthrough() -> Self {
        Self {
            transformers: Vec::new(),
            remainder: Remainder::Passthrough,
        }
    }

    /// Add a transformer for `columns`
    pub fn with_transformer(mut self, transformer: ColumnTransformer) -> Self {
        self.transformers.push(transformer);
        self
    }

    /// Set the remainder policy
    pub fn with_remainder(mut self, remainder: Remainder) -> Self {
        self.remainder = remainder;
        self
    }

    /// True when no column is transformed
    pub fn is_passthrough(&self) -> bool {
        self.remainder == Remainder::Passthrough
            && self.transformers.iter().all(|t| t.columns.is_empty() || t.steps.is_empty())
    }

    /// Learn imputation and scaling statistics from training data
    pub fn fit(&self, x: &Array2<f64>, feature_names: &[String]) -> Result<FittedPreprocessor> {
        let start = Instant::now();

        if x.ncols() != feature_names.len() {
            return Err(FraudError::length_mismatch("feature names", x.ncols(), feature_names.len()));
        }

        let mut claimed = vec![false; feature_names.len()];
        let mut blocks = Vec::with_capacity(self.transformers.len());
        let mut output_names = Vec::with_capacity(feature_names.len());

        for transformer in &self.transformers {
            let indices = transformer
                .columns
                .iter()
                .map(|col| {
                    feature_names
                        .iter()
                        .position(|name| name == col)
                        .ok_or_else(|| FraudError::Schema(format!(
                            "transformer '{}' references unknown column '{}'",
                            transformer.name, col
                        )))
                })
                .collect::<Result<Vec<usize>>>()?;

            let mut block = x.select(Axis(1), &indices);
            let mut steps = Vec::with_capacity(transformer.steps.len());
            for step in &transformer.steps {
                let fitted = match step {
                    NumericStep::Impute(strategy) => {
                        let mut imputer = Imputer::new(*strategy);
                        block = imputer.fit_transform(&block)?;
                        FittedStep::Impute(imputer)
                    }
                    NumericStep::Scale(scaler_type) => {
                        let mut scaler = Scaler::new(*scaler_type);
                        block = scaler.fit_transform(&block)?;
                        FittedStep::Scale(scaler)
                    }
                };
                steps.push(fitted);
            }

            for &idx in &indices {
                claimed[idx] = true;
                output_names.push(feature_names[idx].clone());
            }
            blocks.push(FittedBlock { indices, steps });
        }

        let remainder_indices: Vec<usize> = match self.remainder {
            Remainder::Passthrough => (0..feature_names.len()).filter(|&i| !claimed[i]).collect(),
            Remainder::Drop => Vec::new(),
        };
        output_names.extend(remainder_indices.iter().map(|&i| feature_names[i].clone()));

        debug!(
            transformers = blocks.len(),
            passthrough = remainder_indices.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Preprocessing plan fitted"
        );

        Ok(FittedPreprocessor {
            plan: self.clone(),
            n_input_features: feature_names.len(),
            blocks,
            remainder_indices,
            output_names,
        })
    }
}

/// Builder for the transaction preprocessing plan
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingBuilder {
    impute_strategy: ImputeStrategy,
    scaler_type: ScalerType,
}

impl Default for PreprocessingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PreprocessingBuilder {
    /// Median imputation followed by robust scaling
    pub fn new() -> Self {
        Self {
            impute_strategy: ImputeStrategy::Median,
            scaler_type: ScalerType::Robust,
        }
    }

    /// Build a plan that imputes then scales `numeric_columns` and passes
    /// every other column through. Duplicate names are kept once.
    pub fn build<S: AsRef<str>>(&self, numeric_columns: &[S]) -> PreprocessingPlan {
        let mut columns: Vec<String> = Vec::with_capacity(numeric_columns.len());
        for col in numeric_columns {
            let col = col.as_ref();
            if !columns.iter().any(|c| c == col) {
                columns.push(col.to_string());
            }
        }

        if columns.is_empty() {
            return PreprocessingPlan::passthrough();
        }

        PreprocessingPlan::passthrough().with_transformer(ColumnTransformer {
            name: "num".to_string(),
            columns,
            steps: vec![
                NumericStep::Impute(self.impute_strategy),
                NumericStep::Scale(self.scaler_type),
            ],
        })
    }
}

/// Build the default plan for `numeric_columns`
pub fn build<S: AsRef<str>>(numeric_columns: &[S]) -> PreprocessingPlan {
    PreprocessingBuilder::new().build(numeric_columns)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum FittedStep {
    Impute(Imputer),
    Scale(Scaler),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedBlock {
    indices: Vec<usize>,
    steps: Vec<FittedStep>,
}

/// A plan with statistics learned from training data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    plan: PreprocessingPlan,
    n_input_features: usize,
    blocks: Vec<FittedBlock>,
    remainder_indices: Vec<usize>,
    output_names: Vec<String>,
}

impl FittedPreprocessor {
    /// Apply the fitted plan. Transformed columns come first, in plan
    /// order, followed by the passthrough columns in input order.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_input_features {
            return Err(FraudError::length_mismatch("columns", self.n_input_features, x.ncols()));
        }

        let mut parts: Vec<Array2<f64>> = Vec::with_capacity(self.blocks.len() + 1);
        for block in &self.blocks {
            let mut values = x.select(Axis(1), &block.indices);
            for step in &block.steps {
                values = match step {
                    FittedStep::Impute(imputer) => imputer.transform(&values)?,
                    FittedStep::Scale(scaler) => scaler.transform(&values)?,
                };
            }
            parts.push(values);
        }
        parts.push(x.select(Axis(1), &self.remainder_indices));

        let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
        Ok(concatenate(Axis(1), &views)?)
    }

    /// Feature names in output column order
    pub fn output_feature_names(&self) -> &[String] {
        &self.output_names
    }

    pub fn plan(&self) -> &PreprocessingPlan {
        &self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_default_steps() {
        let plan = build(&DEFAULT_NUMERIC_COLUMNS);
        assert_eq!(plan.transformers.len(), 1);
        assert_eq!(plan.transformers[0].columns, names(&["Amount", "Time"]));
        assert_eq!(
            plan.transformers[0].steps,
            vec![NumericStep::Impute(ImputeStrategy::Median), NumericStep::Scale(ScalerType::Robust)]
        );
        assert_eq!(plan.remainder, Remainder::Passthrough);
    }

    #[test]
    fn test_build_is_idempotent() {
        assert_eq!(build(&["Amount", "Time"]), build(&["Amount", "Time"]));
    }

    #[test]
    fn test_empty_plan_passes_through() {
        let empty: [&str; 0] = [];
        let plan = build(&empty);
        assert!(plan.is_passthrough());

        let x = array![[1.0, f64::NAN], [3.0, 4.0]];
        let fitted = plan.fit(&x, &names(&["a", "b"])).unwrap();
        let out = fitted.transform(&x).unwrap();
        assert_eq!(out[[0, 0]], 1.0);
        assert!(out[[0, 1]].is_nan());
        assert_eq!(fitted.output_feature_names(), &names(&["a", "b"])[..]);
    }

    #[test]
    fn test_fit_transform_reorders_and_passes_through() {
        let x = array![
            [0.0, 10.0, 1.0],
            [1.0, f64::NAN, 2.0],
            [2.0, 30.0, 3.0],
            [3.0, 40.0, 4.0],
            [4.0, 50.0, 5.0]
        ];
        let feature_names = names(&["Time", "Amount", "V1"]);
        let plan = build(&["Amount", "Time"]);
        let fitted = plan.fit(&x, &feature_names).unwrap();
        let out = fitted.transform(&x).unwrap();

        assert_eq!(fitted.output_feature_names(), &names(&["Amount", "Time", "V1"])[..]);
        // Amount: median of [10, 30, 40, 50] = 35 fills the gap, then scaled to 0
        assert_eq!(out[[1, 0]], 0.0);
        // Time: median 2, IQR 2
        assert_eq!(out[[4, 1]], 1.0);
        // V1 untouched
        assert_eq!(out.column(2).to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_unknown_column_fails_at_fit() {
        let plan = build(&["Amount"]);
        let x = array![[1.0], [2.0]];
        let err = plan.fit(&x, &names(&["Time"])).unwrap_err();
        assert!(matches!(err, FraudError::Schema(_)));
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let plan = build(&["a"]);
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let fitted = plan.fit(&x, &names(&["a", "b"])).unwrap();
        assert!(matches!(
            fitted.transform(&array![[1.0]]),
            Err(FraudError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_remainder_drop_keeps_only_transformed_columns() {
        let x = array![[1.0, 7.0, 10.0], [2.0, 8.0, 20.0], [3.0, 9.0, 30.0]];
        let plan = build(&["Amount"]).with_remainder(Remainder::Drop);
        assert!(!plan.is_passthrough());

        let fitted = plan.fit(&x, &names(&["Amount", "V1", "V2"])).unwrap();
        let out = fitted.transform(&x).unwrap();
        assert_eq!(out.ncols(), 1);
        assert_eq!(fitted.output_feature_names(), &names(&["Amount"])[..]);
        // median 2, IQR 1
        assert_eq!(out.column(0).to_vec(), vec![-1.0, 0.0, 1.0]);
    }
}
