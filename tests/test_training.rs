//! Integration tests for model selection, cross-validation and grid search

use fraudlab::training::{
    precision_recall_curve, select, CVStrategy, Classifier, CrossValidator, Estimator, GridSearchCV,
    LogisticRegression, ModelName, ParamGrid, ParamValue, RandomForest,
};
use fraudlab::FraudError;
use ndarray::{Array1, Array2};

/// Two features; positives (one in five) sit well away from negatives
fn fraud_like(n: usize) -> (Array2<f64>, Array1<f64>) {
    let is_positive = |i: usize| i % 5 == 0;
    let x = Array2::from_shape_fn((n, 2), |(i, j)| {
        let jitter = ((i * 7 + j * 3) % 11) as f64 * 0.05;
        match (j, is_positive(i)) {
            (0, true) => 3.0 + jitter,
            (0, false) => -1.0 + jitter,
            (_, true) => 1.5 - jitter,
            (_, false) => jitter,
        }
    });
    let y = Array1::from_iter((0..n).map(|i| if is_positive(i) { 1.0 } else { 0.0 }));
    (x, y)
}

#[test]
fn test_select_every_model() {
    let expected = [
        ("logistic_regression", 8),
        ("random_forest", 9),
        ("gradient_boost", 9),
    ];
    for (name, n_candidates) in expected {
        let config = select(name, 5usize).unwrap();
        assert_eq!(config.model.as_str(), name);
        assert_eq!(config.n_candidates(), n_candidates);
        assert_eq!(config.cv.strategy().n_splits(), 5);
    }
}

#[test]
fn test_select_unknown_model() {
    let err = select("svm", 5usize).unwrap_err();
    assert_eq!(err.to_string(), "Sorry, there is no such model in the database: svm");
}

#[test]
fn test_select_accepts_splitter() {
    let config = select("logistic_regression", CVStrategy::KFold { n_splits: 3, shuffle: false }).unwrap();
    assert_eq!(config.cv.strategy().n_splits(), 3);
}

#[test]
fn test_stratified_folds_keep_positives_in_every_fold() {
    let (_, y) = fraud_like(100);
    let splits = CrossValidator::new(CVStrategy::from(5usize)).split(100, Some(&y)).unwrap();
    assert_eq!(splits.len(), 5);
    for split in &splits {
        let positives = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
        assert_eq!(positives, 4);
        assert_eq!(split.test_indices.len(), 20);
    }
}

#[test]
fn test_grid_search_over_selected_logistic_regression() {
    let (x, y) = fraud_like(150);
    let mut search = select("logistic_regression", 3usize).unwrap().into_search();
    search.fit(&x, &y).unwrap();

    assert_eq!(search.cv_results().len(), 8);
    assert!(search.best_score().unwrap() > 0.95);
    let best = search.best_params().unwrap();
    assert!(best.contains_key("penalty"));
    assert!(best.contains_key("C"));

    let predictions = search.predict(&x).unwrap();
    let correct = predictions.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
    assert!(correct as f64 / y.len() as f64 > 0.95);
}

#[test]
fn test_grid_search_over_selected_forest() {
    let (x, y) = fraud_like(120);
    let config = select("random_forest", 3usize).unwrap().with_random_state(11);
    let mut search: GridSearchCV<Classifier> = config.into();
    search.fit(&x, &y).unwrap();

    assert!(search.cv_results().iter().any(|c| c.rank == 1));
    let proba = search.predict_proba(&x).unwrap();
    assert_eq!(proba.dim(), (120, 2));
    let curve = precision_recall_curve(&y, &proba.column(1).to_owned()).unwrap();
    assert!(curve.average_precision() > 0.95);
}

#[test]
fn test_custom_grid_search() {
    let (x, y) = fraud_like(90);
    let grid = ParamGrid::new().add("C", [0.001, 1.0]);
    let mut search = GridSearchCV::new(LogisticRegression::new(), grid, CrossValidator::new(CVStrategy::from(3usize)));
    search.fit(&x, &y).unwrap();

    assert_eq!(search.best_params().unwrap()["C"], ParamValue::Float(1.0));
}

#[test]
fn test_bad_grid_value_is_reported() {
    let (x, y) = fraud_like(60);
    let grid = ParamGrid::new().add("max_depth", ["deep"]);
    let mut search = GridSearchCV::new(RandomForest::new(5), grid, CrossValidator::new(CVStrategy::from(3usize)));
    let err = search.fit(&x, &y).unwrap_err();
    assert!(matches!(err, FraudError::InvalidParameter { .. }));
}

#[test]
fn test_every_selected_estimator_fits() {
    let (x, y) = fraud_like(80);
    for model in ModelName::ALL {
        let mut estimator = model.estimator();
        estimator.set_random_state(3);
        estimator.fit(&x, &y).unwrap();
        assert!(estimator.score(&x, &y).unwrap() > 0.9, "{} underfits", model);
    }
}
