/// Transformer encoder variants
pub mod transformer;
