use std::fmt::Debug;

use burn::{
    data::dataloader,
    tensor::{backend::Backend, Bool, Int, Tensor},
};
use derive_new::new;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::utils::tensors;

use super::PipelineError;

/// A single sentence encoded to exactly `max_length` positions
#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct Encoded {
    /// Token ids, special tokens included
    pub ids: Vec<u32>,

    /// 1 for real tokens, 0 for padding
    pub attention_mask: Vec<u32>,

    /// Token type (segment) ids
    pub type_ids: Vec<u32>,
}

/// An inference batch for sequence classification
#[derive(Debug, Clone, new)]
pub struct Infer<B: Backend> {
    /// Tokenized text as 2D tensor: [batch_size, max_seq_length]
    pub tokens: Tensor<B, 2, Int>,

    /// Padding mask for the tokenized text containing booleans for padding locations
    pub mask_pad: Tensor<B, 2, Bool>,
}

/// A training batch for sequence classification
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Model input
    pub input: Infer<B>,

    /// Class ids for the batch: [batch_size, n_heads]
    pub targets: Tensor<B, 2, Int>,
}

/// Struct for batching sequence classification items
#[derive(Clone)]
pub struct Batcher<B: Backend> {
    /// Tokenizer that truncates and pads to `max_seq_length`
    pub tokenizer: Tokenizer,

    /// Length of every tokenized sequence
    pub max_seq_length: usize,

    /// ID of the padding token
    pub pad_token_id: u32,

    /// Device on which to perform computation (e.g., CPU or CUDA device)
    pub device: B::Device,
}

impl<B: Backend> Batcher<B> {
    /// Creates a new batcher
    pub fn new(
        tokenizer: Tokenizer,
        max_seq_length: usize,
        device: B::Device,
    ) -> Result<Self, PipelineError> {
        let tokenizer = fixed_length(tokenizer, max_seq_length)?;
        let pad_token_id = tokenizer.get_padding().map_or(0, |p| p.pad_id);

        Ok(Self {
            tokenizer,
            max_seq_length,
            pad_token_id,
            device,
        })
    }

    /// Encode a single sentence with special tokens, truncated and padded to `max_seq_length`
    pub fn encode(&self, text: &str) -> Result<Encoded, PipelineError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| PipelineError::Tokenizer(e.to_string()))?;

        Ok(Encoded {
            ids: encoding.get_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
            type_ids: encoding.get_type_ids().to_vec(),
        })
    }

    /// Encode a list of sentences into an inference batch
    pub fn encode_batch(&self, items: Vec<String>) -> Result<Infer<B>, PipelineError> {
        let batch_size = items.len();

        let mut token_ids_list = Vec::with_capacity(batch_size);
        let mut attention_list = Vec::with_capacity(batch_size);

        for input in items {
            let encoded = self.encode(&input)?;

            token_ids_list.push(encoded.ids.iter().map(|t| *t as usize).collect());
            attention_list.push(encoded.attention_mask.iter().map(|m| *m as usize).collect());
        }

        let tokens = tensors::pad_to::<B>(
            self.pad_token_id as usize,
            token_ids_list,
            self.max_seq_length,
            &self.device,
        );

        let mask_pad =
            tensors::pad_to::<B>(0, attention_list, self.max_seq_length, &self.device).equal_elem(0);

        Ok(Infer { tokens, mask_pad })
    }
}

/// Implement Batcher trait for Batcher struct for inference
impl<B: Backend> dataloader::batcher::Batcher<String, Infer<B>> for Batcher<B> {
    /// Collects a vector of text items into a inference batch
    fn batch(&self, items: Vec<String>) -> Infer<B> {
        self.encode_batch(items).expect("unable to encode")
    }
}

/// Configure a tokenizer to right-truncate and right-pad every sequence to `max_length`
pub fn fixed_length(mut tokenizer: Tokenizer, max_length: usize) -> Result<Tokenizer, PipelineError> {
    let (pad_id, pad_token) = match tokenizer.get_padding() {
        Some(padding) => (padding.pad_id, padding.pad_token.clone()),
        None => ["<pad>", "[PAD]"]
            .iter()
            .find_map(|token| {
                tokenizer
                    .token_to_id(token)
                    .map(|id| (id, token.to_string()))
            })
            .unwrap_or((0, "[PAD]".to_string())),
    };

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| PipelineError::Tokenizer(e.to_string()))?;

    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::Fixed(max_length),
        pad_id,
        pad_token,
        ..Default::default()
    }));

    Ok(tokenizer)
}

#[cfg(test)]
mod tests {
    use burn::data::dataloader::batcher::Batcher as _;
    use pretty_assertions::assert_eq;

    use crate::test_utils::{tokenizer, TestBackend};

    use super::*;

    #[test]
    fn encodes_to_exactly_max_length() {
        let batcher = Batcher::<TestBackend>::new(tokenizer(), 8, Default::default()).unwrap();

        for text in [
            "",
            "so",
            "oh great another monday",
            "oh great another monday what a lovely surprise i totally love mondays so much",
        ] {
            let encoded = batcher.encode(text).unwrap();

            assert_eq!(encoded.ids.len(), 8);
            assert_eq!(encoded.attention_mask.len(), 8);
            assert_eq!(encoded.type_ids.len(), 8);
        }
    }

    #[test]
    fn adds_special_tokens_and_pads() {
        let batcher = Batcher::<TestBackend>::new(tokenizer(), 6, Default::default()).unwrap();

        let encoded = batcher.encode("great monday").unwrap();

        // [CLS] great monday [SEP] [PAD] [PAD]
        assert_eq!(encoded.ids, vec![1, 5, 8, 2, 0, 0]);
        assert_eq!(encoded.attention_mask, vec![1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn keeps_the_closing_special_token_when_truncating() {
        let batcher = Batcher::<TestBackend>::new(tokenizer(), 4, Default::default()).unwrap();

        let encoded = batcher.encode("oh great another monday").unwrap();

        assert_eq!(encoded.ids.first(), Some(&1));
        assert_eq!(encoded.ids.last(), Some(&2));
    }

    #[test]
    fn batches_with_a_padding_mask() {
        let batcher = Batcher::<TestBackend>::new(tokenizer(), 6, Default::default()).unwrap();

        let batch = batcher.batch(vec!["great".to_string(), "oh great monday".to_string()]);

        assert_eq!(batch.tokens.dims(), [2, 6]);

        let mask = batch.mask_pad.into_data().value;
        assert_eq!(&mask[..6], &[false, false, false, true, true, true]);
        assert_eq!(&mask[6..], &[false, false, false, false, false, true]);
    }
}
