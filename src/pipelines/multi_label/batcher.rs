use burn::{data::dataloader, tensor::backend::Backend};
use tokenizers::Tokenizer;

use crate::{
    labels::PerLabel,
    pipelines::{self, Infer, Item, PipelineError, Train, TrainBatcher},
    utils::tensors,
};

/// Struct for batching multi-label items, one target per rhetorical device
#[derive(Clone)]
pub struct Batcher<B: Backend> {
    /// Wrap the common batcher, adding target selection
    batcher: pipelines::Batcher<B>,

    /// Position of each device's column within an item's labels
    positions: PerLabel<usize>,
}

impl<B: Backend> Batcher<B> {
    /// Creates a new batcher, matching label columns to heads by name
    pub fn new(
        tokenizer: Tokenizer,
        max_seq_length: usize,
        label_columns: &[String],
        device: B::Device,
    ) -> Result<Self, PipelineError> {
        let positions = PerLabel::try_from_columns(label_columns)?;
        let batcher = pipelines::Batcher::new(tokenizer, max_seq_length, device)?;

        Ok(Self { batcher, positions })
    }
}

impl<B: Backend> TrainBatcher<B> for Batcher<B> {
    /// Every head is matched by name, so the model's own column list is not needed
    fn for_columns(
        tokenizer: Tokenizer,
        max_seq_length: usize,
        dataset_columns: &[String],
        _model_columns: &[String],
        device: B::Device,
    ) -> Result<Self, PipelineError> {
        Self::new(tokenizer, max_seq_length, dataset_columns, device)
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
    /// Collects a vector of multi-label items into a training batch
    fn batch(&self, items: Vec<I>) -> Train<B> {
        let inputs = items.iter().map(|item| item.input().to_string()).collect();
        let infer = self.batcher.encode_batch(inputs).expect("unable to encode");

        // Targets follow head order, whatever the column order in the file
        let class_ids: Vec<Vec<usize>> = items
            .iter()
            .map(|item| {
                self.positions
                    .iter()
                    .map(|(_, position)| item.labels()[*position])
                    .collect()
            })
            .collect();

        let n_heads = self.positions.iter().count();
        let targets = tensors::pad_to::<B>(0, class_ids, n_heads, &self.batcher.device);

        // Create and return training batch
        Train {
            input: infer,
            targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use burn::data::dataloader::batcher::Batcher as _;
    use pretty_assertions::assert_eq;

    use crate::{
        datasets::rhetoric::Item,
        test_utils::{tokenizer, TestBackend},
    };

    use super::*;

    #[test]
    fn orders_targets_by_head() {
        let columns: Vec<String> = [
            "irony",
            "sarcasm",
            "satire",
            "understatement",
            "overstatement",
            "rhetorical_question",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let batcher =
            Batcher::<TestBackend>::new(tokenizer(), 8, &columns, Default::default()).unwrap();

        let batch: Train<TestBackend> = batcher.batch(vec![Item::new(
            "oh great".to_string(),
            vec![1, 0, 0, 0, 1, 1],
        )]);

        assert_eq!(batch.targets.dims(), [1, 6]);
        assert_eq!(
            batch.targets.into_data().convert::<i64>().value,
            vec![0, 1, 0, 0, 1, 1]
        );
    }

    #[test]
    fn rejects_incomplete_label_columns() {
        let columns = vec!["sarcasm".to_string()];

        assert!(Batcher::<TestBackend>::new(tokenizer(), 8, &columns, Default::default()).is_err());
    }
}
