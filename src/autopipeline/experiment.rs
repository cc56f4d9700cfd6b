//! End-to-end experiment: load, split, preprocess, search, evaluate

use super::pipeline::{Evaluation, Pipeline};
use crate::error::Result;
use crate::preprocessing::{PreprocessingBuilder, DEFAULT_NUMERIC_COLUMNS};
use crate::training::{select, CVStrategy, ModelName, ParamSet};
use crate::utils::{DataLoader, DEFAULT_LABEL_COLUMN};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Settings for [`run_experiment`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// CSV file with a header row
    pub data_path: PathBuf,
    pub label_column: String,
    pub test_fraction: f64,
    pub seed: u64,
    /// Columns imputed and robust-scaled; the rest pass through
    pub numeric_columns: Vec<String>,
    pub cv_folds: usize,
    /// Model names as accepted by [`select`]
    pub models: Vec<String>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("creditcard.csv"),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            test_fraction: 0.2,
            seed: 2023,
            numeric_columns: DEFAULT_NUMERIC_COLUMNS.iter().map(|s| s.to_string()).collect(),
            cv_folds: 5,
            models: ModelName::ALL.iter().map(|m| m.as_str().to_string()).collect(),
        }
    }
}

impl ExperimentConfig {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            ..Self::default()
        }
    }

    pub fn with_label_column(mut self, label_column: impl Into<String>) -> Self {
        self.label_column = label_column.into();
        self
    }

    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_numeric_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.numeric_columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    pub fn with_models<S: AsRef<str>>(mut self, models: &[S]) -> Self {
        self.models = models.iter().map(|m| m.as_ref().to_string()).collect();
        self
    }

    /// Read a config from JSON; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Outcome for one model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub model: ModelName,
    pub best_params: ParamSet,
    /// Mean cross-validated accuracy of the chosen parameters
    pub best_cv_score: f64,
    pub evaluation: Evaluation,
}

/// Run every configured model on one stratified split of the data.
///
/// Model names are checked before the file is read, so an unknown name
/// fails without any loading or fitting.
pub fn run_experiment(config: &ExperimentConfig) -> Result<Vec<ExperimentResult>> {
    let start = Instant::now();
    let models = config
        .models
        .iter()
        .map(|name| name.parse::<ModelName>())
        .collect::<Result<Vec<_>>>()?;

    let split = DataLoader::new().load(&config.data_path, &config.label_column, config.test_fraction, config.seed)?;
    let plan = PreprocessingBuilder::new().build(&config.numeric_columns);
    let cv = CVStrategy::StratifiedKFold {
        n_splits: config.cv_folds,
        shuffle: false,
    };

    let mut results = Vec::with_capacity(models.len());
    for model in models {
        let model_config = select(model.as_str(), cv.clone())?.with_random_state(config.seed);
        let mut pipeline = Pipeline::new(plan.clone(), model_config);
        pipeline.fit(&split)?;
        let evaluation = pipeline.evaluate(&split.x_test, &split.y_test)?;

        results.push(ExperimentResult {
            model,
            best_params: pipeline.best_params().cloned().unwrap_or_default(),
            best_cv_score: pipeline.best_score().unwrap_or(f64::NAN),
            evaluation,
        });
    }

    info!(
        n_models = results.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Experiment finished"
    );
    Ok(results)
}
