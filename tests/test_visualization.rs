//! Integration tests for precision-recall plotting

use fraudlab::training::precision_recall_curve;
use fraudlab::visualization::{draw, draw_curve, DrawingSurface, Figure, PlotCommand, Style};
use fraudlab::FraudError;
use ndarray::array;
use tempfile::tempdir;

#[test]
fn test_draw_fixed_axes() {
    let mut fig = Figure::new();
    draw(&mut fig, &[1.0, 0.8, 0.6], &[0.0, 0.5, 1.0]).unwrap();

    assert_eq!(fig.xlim(), Some((0.0, 1.0)));
    assert_eq!(fig.ylim(), Some((0.0, 1.05)));
    assert_eq!(fig.xlabel(), Some("Recall"));
    assert_eq!(fig.ylabel(), Some("Precision"));
}

#[test]
fn test_draw_computed_curve() {
    let y = array![0.0, 0.0, 1.0, 1.0];
    let scores = array![0.1, 0.4, 0.35, 0.8];
    let curve = precision_recall_curve(&y, &scores).unwrap();

    let mut fig = Figure::new();
    draw_curve(&mut fig, &curve).unwrap();
    match &fig.commands()[0] {
        PlotCommand::Step { x, y, .. } => {
            assert_eq!(x, &curve.recall);
            assert_eq!(y, &curve.precision);
        }
        other => panic!("expected step, got {:?}", other),
    }
}

#[test]
fn test_mismatched_lengths() {
    let mut fig = Figure::new();
    let err = draw(&mut fig, &[1.0], &[0.0, 1.0]).unwrap_err();
    assert!(matches!(err, FraudError::ShapeMismatch { .. }));
}

#[test]
fn test_saved_figure_reloads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pr_curve.json");

    let mut fig = Figure::new();
    draw(&mut fig, &[1.0, 0.5, 1.0], &[0.0, 0.5, 1.0]).unwrap();
    fig.save_json(&path).unwrap();

    let reloaded = Figure::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reloaded, fig);
}

/// Surface that only counts calls
#[derive(Default)]
struct Counter {
    strokes: usize,
    fills: usize,
    limits: usize,
}

impl DrawingSurface for Counter {
    fn step(&mut self, _x: &[f64], _y: &[f64], _style: Style) {
        self.strokes += 1;
    }

    fn fill_between(&mut self, _x: &[f64], _y: &[f64], _style: Style) {
        self.fills += 1;
    }

    fn set_xlabel(&mut self, _label: &str) {}

    fn set_ylabel(&mut self, _label: &str) {}

    fn set_xlim(&mut self, _min: f64, _max: f64) {
        self.limits += 1;
    }

    fn set_ylim(&mut self, _min: f64, _max: f64) {
        self.limits += 1;
    }
}

#[test]
fn test_custom_surface() {
    let mut surface = Counter::default();
    draw(&mut surface, &[1.0, 0.5], &[0.0, 1.0]).unwrap();
    assert_eq!((surface.strokes, surface.fills, surface.limits), (1, 1, 2));
}
