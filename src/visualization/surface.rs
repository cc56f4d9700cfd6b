//! Drawing surfaces and the recording `Figure`

use crate::error::{FraudError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB`
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let parse = |range: std::ops::Range<usize>| {
            digits
                .get(range)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| FraudError::InvalidParameter {
                    name: "color".to_string(),
                    value: hex.to_string(),
                    reason: "expected #RRGGBB".to_string(),
                })
        };
        if digits.len() != 6 {
            return Err(FraudError::InvalidParameter {
                name: "color".to_string(),
                value: hex.to_string(),
                reason: "expected #RRGGBB".to_string(),
            });
        }
        Ok(Self::rgb(parse(0..2)?, parse(2..4)?, parse(4..6)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Where a step changes value relative to its x coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepWhere {
    Pre,
    Post,
    Mid,
}

/// Stroke or fill style
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub color: Color,
    pub alpha: f64,
    pub step: StepWhere,
}

/// A 2D plotting context owned by the caller
pub trait DrawingSurface {
    /// Step line through `(x[i], y[i])`
    fn step(&mut self, x: &[f64], y: &[f64], style: Style);

    /// Shade between the step curve and `y = 0`
    fn fill_between(&mut self, x: &[f64], y: &[f64], style: Style);

    fn set_xlabel(&mut self, label: &str);

    fn set_ylabel(&mut self, label: &str);

    fn set_xlim(&mut self, min: f64, max: f64);

    fn set_ylim(&mut self, min: f64, max: f64);
}

/// One recorded drawing call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlotCommand {
    Step { x: Vec<f64>, y: Vec<f64>, style: Style },
    FillBetween { x: Vec<f64>, y: Vec<f64>, style: Style },
    XLabel { label: String },
    YLabel { label: String },
    XLim { min: f64, max: f64 },
    YLim { min: f64, max: f64 },
}

/// Surface that records every call, for inspection or JSON export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    commands: Vec<PlotCommand>,
}

impl Figure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[PlotCommand] {
        &self.commands
    }

    /// Last x limits set, if any
    pub fn xlim(&self) -> Option<(f64, f64)> {
        self.commands.iter().rev().find_map(|c| match c {
            PlotCommand::XLim { min, max } => Some((*min, *max)),
            _ => None,
        })
    }

    /// Last y limits set, if any
    pub fn ylim(&self) -> Option<(f64, f64)> {
        self.commands.iter().rev().find_map(|c| match c {
            PlotCommand::YLim { min, max } => Some((*min, *max)),
            _ => None,
        })
    }

    pub fn xlabel(&self) -> Option<&str> {
        self.commands.iter().rev().find_map(|c| match c {
            PlotCommand::XLabel { label } => Some(label.as_str()),
            _ => None,
        })
    }

    pub fn ylabel(&self) -> Option<&str> {
        self.commands.iter().rev().find_map(|c| match c {
            PlotCommand::YLabel { label } => Some(label.as_str()),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the recorded commands as JSON
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl DrawingSurface for Figure {
    fn step(&mut self, x: &[f64], y: &[f64], style: Style) {
        self.commands.push(PlotCommand::Step {
            x: x.to_vec(),
            y: y.to_vec(),
            style,
        });
    }

    fn fill_between(&mut self, x: &[f64], y: &[f64], style: Style) {
        self.commands.push(PlotCommand::FillBetween {
            x: x.to_vec(),
            y: y.to_vec(),
            style,
        });
    }

    fn set_xlabel(&mut self, label: &str) {
        self.commands.push(PlotCommand::XLabel { label: label.to_string() });
    }

    fn set_ylabel(&mut self, label: &str) {
        self.commands.push(PlotCommand::YLabel { label: label.to_string() });
    }

    fn set_xlim(&mut self, min: f64, max: f64) {
        self.commands.push(PlotCommand::XLim { min, max });
    }

    fn set_ylim(&mut self, min: f64, max: f64) {
        self.commands.push(PlotCommand::YLim { min, max });
    }
}
