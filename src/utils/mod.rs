//! Data loading utilities

pub mod data_loader;
pub mod stats;

pub use data_loader::{load, stratified_split, DataLoader, Split, DEFAULT_LABEL_COLUMN};
