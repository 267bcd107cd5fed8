/// Transformer encoder for Multi-label Classification Configuration
pub mod config;

/// Transformer encoder for Multi-label Classification
pub mod model;

/// Training routine
pub mod train;

pub use config::Config;
pub use model::{Heads, Model, ModelRecord};
