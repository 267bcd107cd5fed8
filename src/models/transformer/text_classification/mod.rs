/// Transformer encoder for Text Classification Configuration
pub mod config;

/// Transformer encoder for Text Classification
pub mod model;

/// Training routine
pub mod train;

pub use config::Config;
pub use model::{Model, ModelRecord};
