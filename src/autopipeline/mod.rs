//! Automated ML Pipeline module
//!
//! Composes the pieces into something that can be fitted and scored:
//! - [`Pipeline`]: fitted preprocessing plan plus grid-searched classifier
//! - [`run_experiment`]: load, split and evaluate every configured model

mod experiment;
mod pipeline;

pub use experiment::{run_experiment, ExperimentConfig, ExperimentResult};
pub use pipeline::{Evaluation, Pipeline};
