//! # Burn Rhetoric
#![forbid(unsafe_code)]

/// Experiment configuration
pub mod config;

/// Rhetorical device labels
pub mod labels;

/// Text normalization
pub mod text;

/// Models
pub mod models;

/// Pipelines
pub mod pipelines;

/// Datasets
pub mod datasets;

/// Inference
pub mod inference;

/// Training
pub mod training;

/// Utilities
pub mod utils;

/// Error macros
#[macro_use]
extern crate anyhow;

#[cfg(test)]
pub(crate) mod test_utils;
