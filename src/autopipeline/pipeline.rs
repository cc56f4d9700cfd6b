//! Preprocessing plan plus grid-searched classifier

use crate::error::{FraudError, Result};
use crate::preprocessing::{FittedPreprocessor, PreprocessingPlan};
use crate::training::{
    precision_recall_curve, ClassificationMetrics, Classifier, GridSearchCV, ModelConfig, ModelName, ParamSet,
    PrecisionRecallCurve,
};
use crate::utils::Split;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Test-set scores of a fitted pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Metrics at the 0.5 probability threshold
    pub metrics: ClassificationMetrics,
    /// Precision-recall curve over positive-class probabilities
    pub curve: PrecisionRecallCurve,
    pub average_precision: f64,
}

/// Preprocessing followed by a grid search over one model.
///
/// The plan is fitted on the training features only; the same fitted
/// statistics are applied to every later call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    model: ModelName,
    plan: PreprocessingPlan,
    search: GridSearchCV<Classifier>,
    preprocessor: Option<FittedPreprocessor>,
}

impl Pipeline {
    pub fn new(plan: PreprocessingPlan, config: ModelConfig) -> Self {
        Self {
            model: config.model,
            plan,
            search: config.into_search(),
            preprocessor: None,
        }
    }

    pub fn model(&self) -> ModelName {
        self.model
    }

    /// Fit on the training half of `split`
    pub fn fit(&mut self, split: &Split) -> Result<&mut Self> {
        self.fit_arrays(&split.x_train, &split.y_train, &split.feature_names)
    }

    /// Fit on raw features with the given column names
    pub fn fit_arrays(&mut self, x: &Array2<f64>, y: &Array1<f64>, feature_names: &[String]) -> Result<&mut Self> {
        let start = Instant::now();
        let preprocessor = self.plan.fit(x, feature_names)?;
        let x_ready = preprocessor.transform(x)?;
        self.search.fit(&x_ready, y)?;
        self.preprocessor = Some(preprocessor);

        info!(
            model = %self.model,
            n_samples = x.nrows(),
            best_score = self.search.best_score().unwrap_or(f64::NAN),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pipeline fitted"
        );
        Ok(self)
    }

    fn prepare(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.preprocessor.as_ref().ok_or(FraudError::ModelNotFitted)?.transform(x)
    }

    /// Class probabilities `[P(0), P(1)]` for raw features
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.search.predict_proba(&self.prepare(x)?)
    }

    /// 0/1 predictions for raw features
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.search.predict(&self.prepare(x)?)
    }

    /// Score on held-out data
    pub fn evaluate(&self, x_test: &Array2<f64>, y_test: &Array1<f64>) -> Result<Evaluation> {
        let proba = self.predict_proba(x_test)?;
        let scores = proba.column(1).to_owned();
        let predictions = scores.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 });

        let metrics = ClassificationMetrics::compute(y_test, &predictions)?;
        let curve = precision_recall_curve(y_test, &scores)?;
        let average_precision = curve.average_precision();

        info!(
            model = %self.model,
            accuracy = metrics.accuracy,
            precision = metrics.precision,
            recall = metrics.recall,
            average_precision,
            "Pipeline evaluated"
        );

        Ok(Evaluation {
            metrics,
            curve,
            average_precision,
        })
    }

    pub fn best_params(&self) -> Option<&ParamSet> {
        self.search.best_params()
    }

    pub fn best_score(&self) -> Option<f64> {
        self.search.best_score()
    }

    pub fn search(&self) -> &GridSearchCV<Classifier> {
        &self.search
    }

    /// Column names after preprocessing, once fitted
    pub fn output_feature_names(&self) -> Option<&[String]> {
        self.preprocessor.as_ref().map(|p| p.output_feature_names())
    }
}
