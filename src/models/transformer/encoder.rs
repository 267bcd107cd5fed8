use std::path::Path;

use burn::{
    module::Module,
    nn::{
        transformer::{TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput},
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig,
    },
    tensor::{backend::Backend, Int, Tensor},
};
use serde::Deserialize;

use crate::pipelines::Infer;

/// The encoder configuration
#[derive(burn::config::Config)]
pub struct EncoderConfig {
    /// Size of the vocabulary
    pub vocab_size: usize,

    /// Size of the hidden state (e.g., 768 for bert-base-uncased)
    #[config(default = 512)]
    pub hidden_size: usize,

    /// Number of transformer encoder layers/blocks
    #[config(default = 6)]
    pub num_layers: usize,

    /// Number of attention heads in the multi-head attention
    #[config(default = 8)]
    pub num_heads: usize,

    /// Size of the intermediate position wise feedforward layer
    #[config(default = 2048)]
    pub intermediate_size: usize,

    /// Dropout value across layers, typically 0.1
    #[config(default = 0.1)]
    pub dropout: f64,

    /// Index of the padding token
    #[config(default = 0)]
    pub pad_token_id: usize,

    /// Maximum sequence length
    #[config(default = 512)]
    pub max_seq_length: usize,

    /// Number of token types (segments)
    #[config(default = 2)]
    pub type_vocab_size: usize,

    /// Epsilon of the embedding layer norm
    #[config(default = 1e-12)]
    pub layer_norm_eps: f64,
}

/// The subset of a Hugging Face `config.json` needed to shape the encoder. BERT and T5 use
/// different key names for the same properties.
#[derive(Deserialize)]
struct PretrainedConfig {
    vocab_size: usize,

    #[serde(alias = "d_model")]
    hidden_size: Option<usize>,

    #[serde(alias = "num_hidden_layers")]
    num_layers: Option<usize>,

    #[serde(alias = "num_attention_heads")]
    num_heads: Option<usize>,

    #[serde(alias = "d_ff")]
    intermediate_size: Option<usize>,

    #[serde(alias = "dropout_rate")]
    hidden_dropout_prob: Option<f64>,

    pad_token_id: Option<usize>,

    type_vocab_size: Option<usize>,

    #[serde(alias = "layer_norm_epsilon")]
    layer_norm_eps: Option<f64>,
}

impl EncoderConfig {
    /// Shape the encoder after a pretrained model's Hugging Face config file
    pub fn from_pretrained(config_file: &Path, max_seq_length: usize) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(config_file)
            .map_err(|e| anyhow!("Unable to read {}: {}", config_file.display(), e))?;

        let pretrained: PretrainedConfig = serde_json::from_str(&contents)
            .map_err(|e| anyhow!("Unable to load Hugging Face Config file: {}", e))?;

        let mut config = EncoderConfig::new(pretrained.vocab_size).with_max_seq_length(max_seq_length);

        if let Some(hidden_size) = pretrained.hidden_size {
            config.hidden_size = hidden_size;
        }
        if let Some(num_layers) = pretrained.num_layers {
            config.num_layers = num_layers;
        }
        if let Some(num_heads) = pretrained.num_heads {
            config.num_heads = num_heads;
        }
        if let Some(intermediate_size) = pretrained.intermediate_size {
            config.intermediate_size = intermediate_size;
        }
        if let Some(dropout) = pretrained.hidden_dropout_prob {
            config.dropout = dropout;
        }
        if let Some(pad_token_id) = pretrained.pad_token_id {
            config.pad_token_id = pad_token_id;
        }
        if let Some(type_vocab_size) = pretrained.type_vocab_size {
            config.type_vocab_size = type_vocab_size;
        }
        if let Some(layer_norm_eps) = pretrained.layer_norm_eps {
            config.layer_norm_eps = layer_norm_eps;
        }

        if config.hidden_size % config.num_heads != 0 {
            return Err(anyhow!(
                "Hidden size {} is not divisible by {} attention heads",
                config.hidden_size,
                config.num_heads
            ));
        }

        Ok(config)
    }

    /// Initializes an encoder with default weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let transformer = TransformerEncoderConfig::new(
            self.hidden_size,
            self.intermediate_size,
            self.num_heads,
            self.num_layers,
        )
        .with_dropout(self.dropout)
        .with_norm_first(false)
        .init(device);

        Encoder {
            transformer,
            embedding_token: EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
            embedding_pos: EmbeddingConfig::new(self.max_seq_length, self.hidden_size).init(device),
            embedding_type: EmbeddingConfig::new(self.type_vocab_size, self.hidden_size)
                .init(device),
            embedding_norm: LayerNormConfig::new(self.hidden_size)
                .with_epsilon(self.layer_norm_eps)
                .init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// BERT-style embeddings followed by a stack of post-norm transformer encoder layers
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    /// The transformer layers
    pub transformer: TransformerEncoder<B>,

    /// Token embeddings
    pub embedding_token: Embedding<B>,

    /// Learned position embeddings
    pub embedding_pos: Embedding<B>,

    /// Token type embeddings; every sequence is a single segment of type 0
    pub embedding_type: Embedding<B>,

    /// Layer norm over the summed embeddings
    pub embedding_norm: LayerNorm<B>,

    /// Embedding dropout
    pub dropout: Dropout,
}

impl<B: Backend> Encoder<B> {
    /// Encode a batch, returning the hidden state of the first position: [batch_size, hidden_size]
    pub fn forward(&self, input: Infer<B>) -> Tensor<B, 2> {
        let [batch_size, seq_length] = input.tokens.dims();
        let device = &self.embedding_token.devices()[0];

        let tokens = input.tokens.to_device(device);
        let mask_pad = input.mask_pad.to_device(device);

        let index_positions = Tensor::arange(0..seq_length as i64, device)
            .reshape([1, seq_length])
            .repeat(0, batch_size);

        let index_types = Tensor::<B, 2, Int>::zeros([batch_size, seq_length], device);

        let embedding = self.embedding_token.forward(tokens)
            + self.embedding_pos.forward(index_positions)
            + self.embedding_type.forward(index_types);
        let embedding = self.dropout.forward(self.embedding_norm.forward(embedding));

        let encoded = self
            .transformer
            .forward(TransformerEncoderInput::new(embedding).mask_pad(mask_pad));

        let [_, _, hidden_size] = encoded.dims();

        encoded
            .slice([0..batch_size, 0..1])
            .reshape([batch_size, hidden_size])
    }
}
