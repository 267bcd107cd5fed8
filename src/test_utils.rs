use std::{collections::HashMap, path::Path, str::FromStr};

use burn::backend::{Autodiff, NdArray};
use candle_core::{safetensors, Device, Tensor};
use tokenizers::Tokenizer;

use crate::{models::transformer::EncoderConfig, pipelines};

pub type TestBackend = NdArray;
pub type TestAutodiffBackend = Autodiff<TestBackend>;

pub const MAX_SEQ_LENGTH: usize = 8;

/// Word-level tokenizer over a tiny vocabulary, wrapping sequences in [CLS] ... [SEP]
pub const TOKENIZER: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [],
  "normalizer": { "type": "Lowercase" },
  "pre_tokenizer": { "type": "Whitespace" },
  "post_processor": { "type": "BertProcessing", "sep": ["[SEP]", 2], "cls": ["[CLS]", 1] },
  "decoder": null,
  "model": {
    "type": "WordLevel",
    "vocab": {
      "[PAD]": 0, "[CLS]": 1, "[SEP]": 2, "[UNK]": 3,
      "oh": 4, "great": 5, "another": 6, "so": 7, "monday": 8,
      "what": 9, "a": 10, "surprise": 11, "love": 12, "waiting": 13, "sure": 14, "nice": 15
    },
    "unk_token": "[UNK]"
  }
}"#;

pub fn tokenizer() -> Tokenizer {
    Tokenizer::from_str(TOKENIZER).unwrap()
}

pub fn encoder_config() -> EncoderConfig {
    EncoderConfig::new(16)
        .with_hidden_size(16)
        .with_num_layers(1)
        .with_num_heads(2)
        .with_intermediate_size(32)
        .with_dropout(0.0)
        .with_max_seq_length(MAX_SEQ_LENGTH)
}

pub fn infer_batch<B: burn::tensor::backend::Backend>(
    texts: &[&str],
    device: &B::Device,
) -> pipelines::Infer<B> {
    pipelines::Batcher::<B>::new(tokenizer(), MAX_SEQ_LENGTH, device.clone())
        .unwrap()
        .encode_batch(texts.iter().map(|s| s.to_string()).collect())
        .unwrap()
}

/// The deterministic value `write_bert_weights` stores at a flat index of a tensor
pub fn bert_value(key: &str, index: usize) -> f32 {
    (index as f32 * 0.37 + key.len() as f32).sin() * 0.05
}

/// Write a BERT checkpoint in safetensors format shaped after an encoder config, with
/// `positions` learned positions
pub fn write_bert_weights(path: &Path, config: &EncoderConfig, positions: usize) {
    let hidden = config.hidden_size;
    let ff = config.intermediate_size;

    let mut shapes: Vec<(String, Vec<usize>)> = vec![
        ("embeddings.word_embeddings.weight".into(), vec![config.vocab_size, hidden]),
        ("embeddings.position_embeddings.weight".into(), vec![positions, hidden]),
        ("embeddings.token_type_embeddings.weight".into(), vec![config.type_vocab_size, hidden]),
        ("embeddings.LayerNorm.gamma".into(), vec![hidden]),
        ("embeddings.LayerNorm.beta".into(), vec![hidden]),
        ("pooler.dense.weight".into(), vec![hidden, hidden]),
    ];

    for layer in 0..config.num_layers {
        let prefix = format!("encoder.layer.{}", layer);

        for (name, rows, cols) in [
            ("attention.self.query", hidden, hidden),
            ("attention.self.key", hidden, hidden),
            ("attention.self.value", hidden, hidden),
            ("attention.output.dense", hidden, hidden),
            ("intermediate.dense", ff, hidden),
            ("output.dense", hidden, ff),
        ] {
            shapes.push((format!("{}.{}.weight", prefix, name), vec![rows, cols]));
            shapes.push((format!("{}.{}.bias", prefix, name), vec![rows]));
        }

        for name in ["attention.output.LayerNorm", "output.LayerNorm"] {
            shapes.push((format!("{}.{}.weight", prefix, name), vec![hidden]));
            shapes.push((format!("{}.{}.bias", prefix, name), vec![hidden]));
        }
    }

    let tensors: HashMap<String, Tensor> = shapes
        .into_iter()
        .map(|(key, shape)| {
            let len = shape.iter().product::<usize>();
            let values = (0..len).map(|i| bert_value(&key, i)).collect::<Vec<_>>();
            let tensor = Tensor::from_vec(values, shape.as_slice(), &Device::Cpu).unwrap();

            (format!("bert.{}", key), tensor)
        })
        .collect();

    safetensors::save(&tensors, path).unwrap();
}
