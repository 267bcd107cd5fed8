use std::collections::BTreeMap;

use burn::{
    nn::{DropoutConfig, LinearConfig},
    tensor::backend::Backend,
};

use crate::{
    labels::{Label, PerLabel},
    models::transformer::EncoderConfig,
    pipelines::{self, ModelConfig},
};

use super::{Heads, Model};

/// The Model Configuration
#[derive(burn::config::Config)]
pub struct Config {
    /// The encoder configuration
    pub encoder: EncoderConfig,

    /// Hugging Face model id or local directory the tokenizer comes from
    pub tokenizer: String,

    /// A map from class ids to class name labels, shared by every head
    pub id2label: BTreeMap<usize, String>,

    /// Per-class loss weights for each head, empty for an unweighted loss
    #[config(default = "PerLabel::default()")]
    pub class_weights: PerLabel<Vec<f32>>,

    /// Dropout applied before the classification heads
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl Config {
    /// Build a configuration with `n_classes` integer class names per head
    pub fn new_with_classes(encoder: EncoderConfig, tokenizer: String, n_classes: usize) -> Self {
        let id2label = (0..n_classes).map(|id| (id, id.to_string())).collect();

        Config::new(encoder, tokenizer, id2label)
    }

    /// Initializes a model with default weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let n_classes = self.id2label.len();
        let head = || LinearConfig::new(self.encoder.hidden_size, n_classes).init(device);

        Model {
            encoder: self.encoder.init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            heads: Heads {
                sarcasm: head(),
                irony: head(),
                satire: head(),
                understatement: head(),
                overstatement: head(),
                rhetorical_question: head(),
            },
            n_classes,
            class_weights: self.class_weights.clone().into_vec(),
        }
    }
}

impl ModelConfig for Config {
    fn encoder(&self) -> &EncoderConfig {
        &self.encoder
    }

    fn tokenizer(&self) -> &str {
        &self.tokenizer
    }

    fn id2label(&self) -> &BTreeMap<usize, String> {
        &self.id2label
    }

    type Batcher<B: Backend> = pipelines::multi_label::Batcher<B>;

    fn label_columns(&self) -> Vec<String> {
        Label::ALL.iter().map(|label| label.to_string()).collect()
    }
}
