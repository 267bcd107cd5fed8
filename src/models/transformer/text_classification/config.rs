use std::collections::BTreeMap;

use burn::{
    nn::{DropoutConfig, LinearConfig},
    tensor::backend::Backend,
};

use crate::{
    models::transformer::EncoderConfig,
    pipelines::{self, ModelConfig},
};

use super::Model;

/// The Model Configuration
#[derive(burn::config::Config)]
pub struct Config {
    /// The encoder configuration
    pub encoder: EncoderConfig,

    /// Hugging Face model id or local directory the tokenizer comes from
    pub tokenizer: String,

    /// The label column the head is trained on
    pub label_column: String,

    /// A map from class ids to class name labels
    pub id2label: BTreeMap<usize, String>,

    /// Per-class loss weights, empty for an unweighted loss
    #[config(default = "Vec::new()")]
    pub class_weights: Vec<f32>,

    /// Dropout applied before the classification head
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl Config {
    /// Build a configuration with class names derived from the label column
    pub fn new_for_column(
        encoder: EncoderConfig,
        tokenizer: String,
        label_column: String,
        n_classes: usize,
    ) -> Self {
        let id2label = pipelines::class_names(&label_column, n_classes);

        Config::new(encoder, tokenizer, label_column, id2label)
    }

    /// Initializes a model with default weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let n_classes = self.id2label.len();

        Model {
            encoder: self.encoder.init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            output: LinearConfig::new(self.encoder.hidden_size, n_classes).init(device),
            n_classes,
            class_weights: self.class_weights.clone(),
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

    type Batcher<B: Backend> = pipelines::text_classification::Batcher<B>;

    fn label_columns(&self) -> Vec<String> {
        vec![self.label_column.clone()]
    }
}
