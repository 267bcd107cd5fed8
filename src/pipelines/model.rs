use std::{collections::BTreeMap, fmt::Display};

use burn::{
    data::dataloader,
    module::AutodiffModule,
    tensor::{
        backend::{AutodiffBackend, Backend},
        Tensor,
    },
    train::TrainStep,
};

use tokenizers::Tokenizer;

use crate::{
    datasets::rhetoric,
    labels::PerLabel,
    models::transformer::{BertWeights, EncoderConfig},
};

use super::{Infer, Output, PipelineError, Train};

/// A trait for models that can be trained by the sequence classification pipelines
pub trait Model<B>: AutodiffModule<B> + TrainStep<Train<B>, Output<B>> + Display
where
    B: AutodiffBackend,
{
    /// The model configuration
    type Config: ModelConfig;

    /// Initialize a model from its configuration
    fn init(config: &Self::Config, device: &B::Device) -> Self;

    /// Perform a forward pass
    fn forward(&self, item: Train<B>) -> Output<B>;

    /// Replace the encoder weights with those of a pretrained checkpoint
    fn load_pretrained(self, weights: &BertWeights, device: &B::Device) -> anyhow::Result<Self>;
}

/// A trait for configs that can be used for sequence classification models
pub trait ModelConfig: burn::config::Config + Clone {
    /// The encoder configuration
    fn encoder(&self) -> &EncoderConfig;

    /// Hugging Face model id or local directory the tokenizer comes from
    fn tokenizer(&self) -> &str;

    /// A mapping from class ids to class name labels
    fn id2label(&self) -> &BTreeMap<usize, String>;

    /// Label columns each head is trained on, in head order
    fn label_columns(&self) -> Vec<String>;

    /// The batcher that selects this model's targets from dataset items
    type Batcher<B: Backend>: TrainBatcher<B>;
}

/// A batcher producing training batches with one target column per model head
pub trait TrainBatcher<B: Backend>:
    dataloader::batcher::Batcher<rhetoric::Item, Train<B>> + Clone + 'static
{
    /// Match the model's label columns against the dataset's label columns
    fn for_columns(
        tokenizer: Tokenizer,
        max_seq_length: usize,
        dataset_columns: &[String],
        model_columns: &[String],
        device: B::Device,
    ) -> Result<Self, PipelineError>;
}

/// A model producing a single class distribution per sample
pub trait Classifier<B: Backend> {
    /// Raw class scores: [batch_size, n_classes]
    fn logits(&self, input: Infer<B>) -> Tensor<B, 2>;
}

/// A model producing one class distribution per rhetorical device per sample
pub trait MultiLabelClassifier<B: Backend> {
    /// Raw class scores for each head: [batch_size, n_classes]
    fn logits(&self, input: Infer<B>) -> PerLabel<Tensor<B, 2>>;
}
