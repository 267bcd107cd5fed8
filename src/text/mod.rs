/// Tweet normalization applied before tokenization
pub mod normalize;

pub use normalize::normalize_text;
