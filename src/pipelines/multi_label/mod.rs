/// Batcher
pub mod batcher;

pub use batcher::Batcher;
