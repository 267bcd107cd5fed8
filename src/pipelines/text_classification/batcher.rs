use burn::{data::dataloader, tensor::backend::Backend};
use tokenizers::Tokenizer;

use crate::{
    pipelines::{self, Infer, Item, PipelineError, Train, TrainBatcher},
    utils::tensors,
};

use super::resolve_label_column;

/// Struct for batching single-label text classification items
#[derive(Clone)]
pub struct Batcher<B: Backend> {
    /// Wrap the common batcher, adding target selection
    batcher: pipelines::Batcher<B>,

    /// Position of the trained label column within each item's labels
    label_index: usize,
}

impl<B: Backend> Batcher<B> {
    /// Creates a new batcher
    pub fn new(
        tokenizer: Tokenizer,
        max_seq_length: usize,
        label_index: usize,
        device: B::Device,
    ) -> Result<Self, PipelineError> {
        let batcher = pipelines::Batcher::new(tokenizer, max_seq_length, device)?;

        Ok(Self {
            batcher,
            label_index,
        })
    }
}

impl<B: Backend> TrainBatcher<B> for Batcher<B> {
    fn for_columns(
        tokenizer: Tokenizer,
        max_seq_length: usize,
        dataset_columns: &[String],
        model_columns: &[String],
        device: B::Device,
    ) -> Result<Self, PipelineError> {
        let label_column = model_columns.first().map(String::as_str);
        let label_index = resolve_label_column(dataset_columns, label_column)?;

        Self::new(tokenizer, max_seq_length, label_index, device)
    }
}

/// Implement Batcher trait for Batcher struct for inference
impl<B: Backend> dataloader::batcher::Batcher<String, Infer<B>> for Batcher<B> {
    /// Collects a vector of text items into a inference batch
    fn batch(&self, items: Vec<String>) -> Infer<B> {
        self.batcher.encode_batch(items).expect("unable to encode")
    }
}

/// Implement Batcher trait for Batcher struct for training
impl<B: Backend, I: Item> dataloader::batcher::Batcher<I, Train<B>> for Batcher<B> {
    /// Collects a vector of text classification items into a training batch
    fn batch(&self, items: Vec<I>) -> Train<B> {
        let inputs = items.iter().map(|item| item.input().to_string()).collect();
        let infer = self.batcher.encode_batch(inputs).expect("unable to encode");

        let class_ids = items
            .iter()
            .map(|item| vec![item.labels()[self.label_index]])
            .collect();

        let targets = tensors::pad_to::<B>(0, class_ids, 1, &self.batcher.device);

        // Create and return training batch
        Train {
            input: infer,
            targets,
        }
    }
}
