use burn::{
    module::Module,
    nn::{Dropout, Linear},
    tensor::{activation::softmax, backend::Backend, Int, Tensor},
};

use crate::{
    models::transformer::{loss::weighted_cross_entropy, Encoder},
    pipelines::{Classifier, Infer, Output},
};

/// Transformer encoder with a single classification head
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// The base encoder
    pub encoder: Encoder<B>,

    /// Dropout before the head
    pub dropout: Dropout,

    /// Linear layer for sequence classification
    pub output: Linear<B>,

    /// Total number of classes
    pub n_classes: usize,

    /// Per-class loss weights
    pub class_weights: Vec<f32>,
}

/// Define model behavior
impl<B: Backend> Model<B> {
    /// Defines forward pass for training
    pub fn forward(&self, input: Infer<B>, targets: Tensor<B, 2, Int>) -> Output<B> {
        let [batch_size, _seq_length] = input.tokens.dims();
        let device = &self.output.devices()[0];

        let targets = targets.to_device(device);

        let output = self.logits(input);

        let loss = weighted_cross_entropy(
            output.clone(),
            targets.clone().reshape([batch_size]),
            &self.class_weights,
        );

        Output {
            loss,
            output: output.reshape([batch_size, 1, self.n_classes]),
            targets,
        }
    }

    /// Defines forward pass for inference
    pub fn infer(&self, input: Infer<B>) -> Tensor<B, 2> {
        softmax(self.logits(input), 1)
    }
}

impl<B: Backend> Classifier<B> for Model<B> {
    fn logits(&self, input: Infer<B>) -> Tensor<B, 2> {
        let pooled = self.encoder.forward(input);

        self.output.forward(self.dropout.forward(pooled))
    }
}
