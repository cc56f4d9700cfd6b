//! Exhaustive hyperparameter search with cross-validation

use super::cross_validation::{CVResults, CrossValidator};
use super::models::{Estimator, ParamValue};
use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

/// One point of a grid: parameter name to value
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Named lists of candidate values. Candidates are enumerated over the
/// names in sorted order, the last name varying fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    params: BTreeMap<String, Vec<ParamValue>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the candidate values for `name`
    pub fn add<V: Into<ParamValue>>(mut self, name: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.params
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn values(&self, name: &str) -> Option<&[ParamValue]> {
        self.params.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Size of the cross product
    pub fn len(&self) -> usize {
        self.params.values().map(Vec::len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every point of the cross product
    pub fn candidates(&self) -> Vec<ParamSet> {
        let mut out = vec![ParamSet::new()];
        for (name, values) in &self.params {
            out = out
                .into_iter()
                .flat_map(|partial| {
                    values.iter().map(move |v| {
                        let mut next = partial.clone();
                        next.insert(name.clone(), v.clone());
                        next
                    })
                })
                .collect();
        }
        out
    }
}

/// Cross-validated score of one grid point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub params: ParamSet,
    pub cv: CVResults,
    /// 1 for the best mean score; ties share a rank
    pub rank: usize,
}

/// Fit `estimator` for every grid point on every fold, keep the best mean
/// accuracy and refit it on all the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchCV<E> {
    estimator: E,
    param_grid: ParamGrid,
    cv: CrossValidator,
    best_estimator: Option<E>,
    best_index: Option<usize>,
    cv_results: Vec<CandidateResult>,
}

impl<E: Estimator + Clone> GridSearchCV<E> {
    pub fn new(estimator: E, param_grid: ParamGrid, cv: CrossValidator) -> Self {
        Self {
            estimator,
            param_grid,
            cv,
            best_estimator: None,
            best_index: None,
            cv_results: Vec::new(),
        }
    }

    pub fn param_grid(&self) -> &ParamGrid {
        &self.param_grid
    }

    /// Blocks until every candidate has been scored and the winner refit
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(FraudError::length_mismatch("y", x.nrows(), y.len()));
        }
        let start = Instant::now();
        let splits = self.cv.split(x.nrows(), Some(y))?;
        let candidates = self.param_grid.candidates();

        info!(
            n_candidates = candidates.len(),
            n_folds = splits.len(),
            n_samples = x.nrows(),
            "Starting grid search"
        );

        let scored: Vec<CVResults> = candidates
            .par_iter()
            .map(|params| -> Result<CVResults> {
                let scores = splits
                    .iter()
                    .map(|split| -> Result<f64> {
                        let mut model = self.configured(params)?;
                        let x_train = x.select(Axis(0), &split.train_indices);
                        let y_train = y.select(Axis(0), &split.train_indices);
                        model.fit(&x_train, &y_train)?;

                        let x_test = x.select(Axis(0), &split.test_indices);
                        let y_test = y.select(Axis(0), &split.test_indices);
                        model.score(&x_test, &y_test)
                    })
                    .collect::<Result<Vec<f64>>>()?;
                let results = CVResults::from_scores(scores);
                debug!(params = ?params, mean_score = results.mean_score, "Candidate scored");
                Ok(results)
            })
            .collect::<Result<Vec<_>>>()?;

        // First candidate wins ties
        let mut best_index = 0;
        for (i, r) in scored.iter().enumerate() {
            if r.mean_score > scored[best_index].mean_score {
                best_index = i;
            }
        }

        self.cv_results = candidates
            .into_iter()
            .zip(scored.iter())
            .map(|(params, cv)| CandidateResult {
                params,
                rank: 1 + scored.iter().filter(|o| o.mean_score > cv.mean_score).count(),
                cv: cv.clone(),
            })
            .collect();

        let best_params = &self.cv_results[best_index].params;
        let mut best = self.configured(best_params)?;
        best.fit(x, y)?;

        info!(
            best_params = ?best_params,
            best_score = self.cv_results[best_index].cv.mean_score,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Grid search finished"
        );

        self.best_estimator = Some(best);
        self.best_index = Some(best_index);
        Ok(self)
    }

    fn configured(&self, params: &ParamSet) -> Result<E> {
        let mut model = self.estimator.clone();
        for (name, value) in params {
            model.set_param(name, value)?;
        }
        Ok(model)
    }

    /// Parameters of the winning candidate
    pub fn best_params(&self) -> Option<&ParamSet> {
        self.best_index.map(|i| &self.cv_results[i].params)
    }

    /// Mean cross-validated accuracy of the winning candidate
    pub fn best_score(&self) -> Option<f64> {
        self.best_index.map(|i| self.cv_results[i].cv.mean_score)
    }

    /// One entry per grid point, in enumeration order
    pub fn cv_results(&self) -> &[CandidateResult] {
        &self.cv_results
    }

    /// The winner refit on the full training data
    pub fn best_estimator(&self) -> Option<&E> {
        self.best_estimator.as_ref()
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.best_estimator.as_ref().ok_or(FraudError::ModelNotFitted)?.predict(x)
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.best_estimator.as_ref().ok_or(FraudError::ModelNotFitted)?.predict_proba(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::cross_validation::CVStrategy;
    use crate::training::linear_models::LogisticRegression;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let n = 60;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            let offset = if i % 3 == 0 { 3.0 } else { 0.0 };
            offset + ((i * 5 + j * 11) % 7) as f64 * 0.2
        });
        let y = Array1::from_iter((0..n).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }));
        (x, y)
    }

    #[test]
    fn test_candidates_cross_product() {
        let grid = ParamGrid::new()
            .add("penalty", ["l2", "l1"])
            .add("C", [0.01, 1.0, 100.0, 10000.0]);
        let candidates = grid.candidates();

        assert_eq!(grid.len(), 8);
        assert_eq!(candidates.len(), 8);
        assert_eq!(candidates[0]["C"], ParamValue::Float(0.01));
        assert_eq!(candidates[0]["penalty"], ParamValue::from("l2"));
        assert_eq!(candidates[1]["penalty"], ParamValue::from("l1"));
        for (i, a) in candidates.iter().enumerate() {
            assert!(candidates[i + 1..].iter().all(|b| a != b));
        }
    }

    #[test]
    fn test_empty_grid_has_one_candidate() {
        assert_eq!(ParamGrid::new().candidates(), vec![ParamSet::new()]);
        assert_eq!(ParamGrid::new().len(), 1);
    }

    #[test]
    fn test_grid_search_fits_and_ranks() {
        let (x, y) = data();
        let grid = ParamGrid::new().add("C", [0.0001, 100.0]);
        let cv = CrossValidator::new(CVStrategy::from(3usize));
        let mut search = GridSearchCV::new(LogisticRegression::new(), grid, cv);
        search.fit(&x, &y).unwrap();

        assert_eq!(search.cv_results().len(), 2);
        assert_eq!(search.best_params().unwrap()["C"], ParamValue::Float(100.0));
        assert_eq!(search.best_score(), Some(1.0));
        assert_eq!(search.cv_results()[1].rank, 1);
        assert_eq!(search.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let (x, y) = data();
        let grid = ParamGrid::new().add("C", [100.0, 1000.0]);
        let cv = CrossValidator::new(CVStrategy::from(3usize));
        let mut search = GridSearchCV::new(LogisticRegression::new(), grid, cv);
        search.fit(&x, &y).unwrap();

        assert_eq!(search.best_params().unwrap()["C"], ParamValue::Float(100.0));
        assert!(search.cv_results().iter().all(|r| r.rank == 1));
    }

    #[test]
    fn test_unknown_param_fails() {
        let (x, y) = data();
        let grid = ParamGrid::new().add("max_depth", [3usize]);
        let mut search = GridSearchCV::new(LogisticRegression::new(), grid, CrossValidator::new(CVStrategy::from(3usize)));
        assert!(matches!(search.fit(&x, &y), Err(FraudError::InvalidParameter { .. })));
    }

    #[test]
    fn test_predict_before_fit() {
        let search = GridSearchCV::new(
            LogisticRegression::new(),
            ParamGrid::new(),
            CrossValidator::new(CVStrategy::default()),
        );
        assert!(matches!(search.predict(&Array2::zeros((1, 2))), Err(FraudError::ModelNotFitted)));
    }
}
