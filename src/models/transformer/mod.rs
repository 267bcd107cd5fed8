/// The shared transformer encoder
pub mod encoder;

/// Pretrained BERT weight import
pub mod weights;

/// Loss helpers shared by the classification heads
pub mod loss;

/// Transformer encoder for Text Classification (a single label column)
pub mod text_classification;

/// Transformer encoder for Multi-label Classification (one head per rhetorical device)
pub mod multi_label;

pub use encoder::{Encoder, EncoderConfig};
pub use weights::BertWeights;
