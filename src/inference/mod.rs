use std::{collections::BTreeMap, path::Path};

use burn::{
    config::Config as _,
    record::CompactRecorder,
    tensor::{
        activation::softmax,
        backend::{AutodiffBackend, Backend},
    },
};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::{
    labels::PerLabel,
    pipelines::{self, Classifier, Encoded, Infer, ModelConfig, MultiLabelClassifier, PipelineError},
    utils::{
        files::{self, BestModel, BEST_MODEL_FILE},
        hugging_face, tensors,
    },
};

/// Sequence length used when none is configured
pub const DEFAULT_MAX_LENGTH: usize = 128;

/// Predictions from a single-head classifier
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// The most likely class id for each input
    pub classes: Vec<usize>,

    /// The class probability distribution for each input
    pub probabilities: Vec<Vec<f32>>,
}

/// The most likely class id for each input, per rhetorical device
pub type MultiPrediction = PerLabel<Vec<usize>>;

/// Wraps a trained model with the tokenizer and class names needed to run it on raw text
pub struct Inference<B: Backend, M> {
    model: M,
    tokenizer: Tokenizer,
    id2label: BTreeMap<usize, String>,
    max_length: usize,
    device: B::Device,
}

impl<B: Backend, M> Inference<B, M> {
    /// Wrap a model for inference
    pub fn new(
        model: M,
        tokenizer: Tokenizer,
        id2label: BTreeMap<usize, String>,
        device: B::Device,
    ) -> Self {
        Self {
            model,
            tokenizer,
            id2label,
            max_length: DEFAULT_MAX_LENGTH,
            device,
        }
    }

    /// Set the sequence length used by `predict` and `predict_multi`
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// The wrapped model
    pub fn model(&self) -> &M {
        &self.model
    }

    /// A map from class ids to class name labels
    pub fn id2label(&self) -> &BTreeMap<usize, String> {
        &self.id2label
    }

    fn batcher(&self, max_length: usize) -> Result<pipelines::Batcher<B>, InferenceError> {
        Ok(pipelines::Batcher::new(
            self.tokenizer.clone(),
            max_length,
            self.device.clone(),
        )?)
    }

    /// Encode a sentence with special tokens, truncated and padded to `max_length`
    pub fn tokenize(&self, sentence: &str, max_length: usize) -> Result<Encoded, InferenceError> {
        Ok(self.batcher(max_length)?.encode(sentence)?)
    }

    /// Encode sentences into a model input batch of `max_length` positions
    pub fn encode_batch(
        &self,
        sentences: &[String],
        max_length: usize,
    ) -> Result<Infer<B>, InferenceError> {
        Ok(self.batcher(max_length)?.encode_batch(sentences.to_vec())?)
    }

    /// Map every sequence of class ids in a batch to class names
    pub fn ids_to_labels(
        &self,
        predicted: &[Vec<usize>],
    ) -> Result<Vec<Vec<String>>, InferenceError> {
        predicted
            .iter()
            .map(|sequence| {
                sequence
                    .iter()
                    .map(|id| {
                        self.id2label
                            .get(id)
                            .cloned()
                            .ok_or(InferenceError::UnknownClass(*id))
                    })
                    .collect()
            })
            .collect()
    }

    /// Map the token ids of a batch back to tokens, padding included
    pub fn token_ids_to_tokens(&self, batch: &Infer<B>) -> Vec<Vec<String>> {
        tensors::to_id_rows(batch.tokens.clone())
            .into_iter()
            .map(|ids| {
                ids.into_iter()
                    .filter_map(|id| self.tokenizer.id_to_token(id as u32))
                    .collect()
            })
            .collect()
    }
}

impl<B: Backend, M: Classifier<B>> Inference<B, M> {
    /// Run one forward pass, returning the argmax class and class distribution per input
    pub fn predict(&self, inputs: &[String]) -> Result<Prediction, InferenceError> {
        if inputs.is_empty() {
            return Ok(Prediction {
                classes: Vec::new(),
                probabilities: Vec::new(),
            });
        }

        let batch = self.encode_batch(inputs, self.max_length)?;

        let probabilities = softmax(self.model.logits(batch), 1);

        Ok(Prediction {
            classes: tensors::argmax_rows(probabilities.clone()),
            probabilities: tensors::to_rows(probabilities),
        })
    }
}

impl<B: Backend, M: MultiLabelClassifier<B>> Inference<B, M> {
    /// Run one forward pass, returning the argmax class per input for every head
    pub fn predict_multi(&self, inputs: &[String]) -> Result<MultiPrediction, InferenceError> {
        if inputs.is_empty() {
            return Ok(MultiPrediction::default());
        }

        let batch = self.encode_batch(inputs, self.max_length)?;

        Ok(self
            .model
            .logits(batch)
            .map(|_, logits| tensors::argmax_rows(logits)))
    }
}

impl<B: AutodiffBackend, M: pipelines::Model<B>> Inference<B, M> {
    /// Load the model config and the best checkpoint recorded in an artifact directory
    pub async fn load(artifact_dir: &Path, device: &B::Device) -> anyhow::Result<Self> {
        let config = M::Config::load(artifact_dir.join("config.json"))
            .map_err(|e| anyhow!("Unable to load config file: {}", e))?;

        let best: BestModel = files::read_json(&artifact_dir.join(BEST_MODEL_FILE))
            .await
            .map_err(|e| anyhow!("Unable to read the best model record: {}", e))?;

        Self::from_checkpoint(&config, &best.path(), device).await
    }

    /// Load a specific checkpoint, fetching the tokenizer named by the config
    pub async fn from_checkpoint(
        config: &M::Config,
        checkpoint: &Path,
        device: &B::Device,
    ) -> anyhow::Result<Self> {
        let tokenizer = hugging_face::load_tokenizer(config.tokenizer()).await?;

        Self::from_parts(config, tokenizer, checkpoint, device)
    }

    /// Build a model from its config and load the checkpoint weights into it
    pub fn from_parts(
        config: &M::Config,
        tokenizer: Tokenizer,
        checkpoint: &Path,
        device: &B::Device,
    ) -> anyhow::Result<Self> {
        log::info!("Loading weights from {}", checkpoint.display());

        let model = M::init(config, device)
            .load_file(checkpoint.to_path_buf(), &CompactRecorder::new(), device)
            .map_err(|e| anyhow!("Unable to load trained model weights: {}", e))?;

        Ok(
            Self::new(model, tokenizer, config.id2label().clone(), device.clone())
                .with_max_length(config.encoder().max_seq_length),
        )
    }
}

/// Inference Error
#[derive(thiserror::Error, Debug)]
pub enum InferenceError {
    /// Tokenization or batching failed
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A predicted class id has no name
    #[error("no label found for class id {0}")]
    UnknownClass(usize),
}

#[cfg(test)]
mod tests {
    use burn::module::Module;
    use pretty_assertions::assert_eq;

    use crate::{
        models::transformer::{multi_label, text_classification},
        pipelines::class_names,
        test_utils::{encoder_config, tokenizer, TestAutodiffBackend, TestBackend, MAX_SEQ_LENGTH},
    };

    use super::*;

    fn texts(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn text_classifier() -> Inference<TestBackend, text_classification::Model<TestBackend>> {
        let device = Default::default();
        let config = text_classification::Config::new_for_column(
            encoder_config(),
            "test".to_string(),
            "sarcasm".to_string(),
            2,
        );

        Inference::new(
            config.init(&device),
            tokenizer(),
            config.id2label.clone(),
            device,
        )
        .with_max_length(MAX_SEQ_LENGTH)
    }

    #[test]
    fn predicts_a_distribution_per_input() {
        let inference = text_classifier();

        let prediction = inference
            .predict(&texts(&["oh great another monday", "nice", "what a surprise"]))
            .unwrap();

        assert_eq!(prediction.classes.len(), 3);
        assert_eq!(prediction.probabilities.len(), 3);

        for (class, row) in prediction.classes.iter().zip(&prediction.probabilities) {
            assert!(*class < 2);
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn predicts_every_head() {
        let device = Default::default();
        let config = multi_label::Config::new_with_classes(encoder_config(), "test".into(), 2);
        let inference: Inference<TestBackend, _> = Inference::new(
            config.init(&device),
            tokenizer(),
            config.id2label.clone(),
            device,
        );

        let prediction = inference
            .predict_multi(&texts(&["oh great", "sure", "love waiting"]))
            .unwrap();

        for (_, classes) in prediction.iter() {
            assert_eq!(classes.len(), 3);
        }
    }

    #[test]
    fn predicts_nothing_for_no_inputs() {
        let prediction = text_classifier().predict(&[]).unwrap();

        assert_eq!(
            prediction,
            Prediction {
                classes: Vec::new(),
                probabilities: Vec::new(),
            }
        );

        let device = Default::default();
        let config = multi_label::Config::new_with_classes(encoder_config(), "test".into(), 2);
        let inference: Inference<TestBackend, _> = Inference::new(
            config.init(&device),
            tokenizer(),
            config.id2label.clone(),
            device,
        );

        let prediction = inference.predict_multi(&[]).unwrap();

        for (_, classes) in prediction.iter() {
            assert!(classes.is_empty());
        }
    }

    #[test]
    fn maps_the_whole_batch_to_labels() {
        let inference = text_classifier();

        let labels = inference.ids_to_labels(&[vec![1, 0], vec![0]]).unwrap();

        assert_eq!(
            labels,
            vec![
                vec!["sarcasm".to_string(), "not_sarcasm".to_string()],
                vec!["not_sarcasm".to_string()]
            ]
        );
        assert!(matches!(
            inference.ids_to_labels(&[vec![7]]),
            Err(InferenceError::UnknownClass(7))
        ));
    }

    #[test]
    fn tokenizes_to_a_fixed_length() {
        let inference = text_classifier();

        let encoded = inference.tokenize("great monday", 6).unwrap();
        assert_eq!(encoded.ids, vec![1, 5, 8, 2, 0, 0]);

        let batch = inference
            .encode_batch(&texts(&["great monday"]), 5)
            .unwrap();
        assert_eq!(
            inference.token_ids_to_tokens(&batch),
            vec![texts(&["[CLS]", "great", "monday", "[SEP]", "[PAD]"])]
        );
    }

    #[test]
    fn loads_a_saved_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = text_classification::Config::new(
            encoder_config(),
            "test".to_string(),
            "irony".to_string(),
            class_names("irony", 2),
        );

        let model = config.init::<TestAutodiffBackend>(&device);
        let checkpoint = dir.path().join("model-1");
        model
            .save_file(checkpoint.clone(), &CompactRecorder::new())
            .unwrap();

        let inference = Inference::<TestAutodiffBackend, text_classification::Model<_>>::from_parts(
            &config,
            tokenizer(),
            &checkpoint,
            &device,
        )
        .unwrap();

        assert_eq!(inference.id2label()[&1], "irony");
        assert_eq!(
            inference.predict(&texts(&["so nice"])).unwrap().classes.len(),
            1
        );
    }
}
