//! Visualization module: precision-recall curves on caller-supplied surfaces.

mod curve;
mod surface;

pub use curve::{draw, draw_curve, CURVE_STYLE, FILL_STYLE, X_LIMITS, Y_LIMITS};
pub use surface::{Color, DrawingSurface, Figure, PlotCommand, StepWhere, Style};
