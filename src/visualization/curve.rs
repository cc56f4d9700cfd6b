//! Precision-recall curve plotting

use super::surface::{Color, DrawingSurface, StepWhere, Style};
use crate::error::{FraudError, Result};
use crate::training::PrecisionRecallCurve;
use tracing::debug;

/// Outline of the step curve
pub const CURVE_STYLE: Style = Style {
    color: Color::RED,
    alpha: 0.2,
    step: StepWhere::Post,
};

/// Shaded area under the curve (#F59B00)
pub const FILL_STYLE: Style = Style {
    color: Color::rgb(0xF5, 0x9B, 0x00),
    alpha: 0.2,
    step: StepWhere::Post,
};

pub const X_LIMITS: (f64, f64) = (0.0, 1.0);
pub const Y_LIMITS: (f64, f64) = (0.0, 1.05);

/// Draw precision against recall as a post step curve with the area under
/// it shaded. Axis limits are fixed to `[0, 1]` (recall) and `[0, 1.05]`
/// (precision) whatever the data.
pub fn draw<S: DrawingSurface + ?Sized>(surface: &mut S, precision: &[f64], recall: &[f64]) -> Result<()> {
    if precision.len() != recall.len() {
        return Err(FraudError::ShapeMismatch {
            expected: format!("recall length = {}", precision.len()),
            actual: format!("recall length = {}", recall.len()),
        });
    }

    surface.step(recall, precision, CURVE_STYLE);
    surface.fill_between(recall, precision, FILL_STYLE);
    surface.set_xlabel("Recall");
    surface.set_ylabel("Precision");
    surface.set_ylim(Y_LIMITS.0, Y_LIMITS.1);
    surface.set_xlim(X_LIMITS.0, X_LIMITS.1);

    debug!(points = precision.len(), "Precision-recall curve drawn");
    Ok(())
}

/// Draw a computed curve
pub fn draw_curve<S: DrawingSurface + ?Sized>(surface: &mut S, curve: &PrecisionRecallCurve) -> Result<()> {
    draw(surface, &curve.precision, &curve.recall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualization::{Figure, PlotCommand};

    #[test]
    fn test_draw_sets_fixed_limits() {
        let mut fig = Figure::new();
        draw(&mut fig, &[1.0, 0.8, 0.6], &[0.0, 0.5, 1.0]).unwrap();

        assert_eq!(fig.xlim(), Some((0.0, 1.0)));
        assert_eq!(fig.ylim(), Some((0.0, 1.05)));
        assert_eq!(fig.xlabel(), Some("Recall"));
        assert_eq!(fig.ylabel(), Some("Precision"));
    }

    #[test]
    fn test_draw_plots_recall_on_x() {
        let mut fig = Figure::new();
        draw(&mut fig, &[1.0, 0.5], &[0.2, 0.9]).unwrap();

        match &fig.commands()[0] {
            PlotCommand::Step { x, y, style } => {
                assert_eq!(x, &vec![0.2, 0.9]);
                assert_eq!(y, &vec![1.0, 0.5]);
                assert_eq!(*style, CURVE_STYLE);
            }
            other => panic!("expected step, got {:?}", other),
        }
        match &fig.commands()[1] {
            PlotCommand::FillBetween { style, .. } => {
                assert_eq!(style.color.to_string(), "#F59B00");
                assert_eq!(style.step, StepWhere::Post);
            }
            other => panic!("expected fill, got {:?}", other),
        }
    }

    #[test]
    fn test_limits_ignore_data_range() {
        let mut fig = Figure::new();
        draw(&mut fig, &[5.0, -3.0], &[10.0, -2.0]).unwrap();
        assert_eq!(fig.xlim(), Some((0.0, 1.0)));
        assert_eq!(fig.ylim(), Some((0.0, 1.05)));
    }

    #[test]
    fn test_length_mismatch() {
        let mut fig = Figure::new();
        let err = draw(&mut fig, &[1.0, 0.5], &[0.0]).unwrap_err();
        assert!(matches!(err, FraudError::ShapeMismatch { .. }));
        assert!(fig.commands().is_empty());
    }

    #[test]
    fn test_empty_curve_still_sets_axes() {
        let mut fig = Figure::new();
        draw(&mut fig, &[], &[]).unwrap();
        assert_eq!(fig.commands().len(), 6);
    }
}
