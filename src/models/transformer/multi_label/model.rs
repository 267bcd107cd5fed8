use burn::{
    module::Module,
    nn::{Dropout, Linear},
    tensor::{activation::softmax, backend::Backend, Int, Tensor},
};

use crate::{
    labels::{Label, PerLabel},
    models::transformer::{loss::weighted_cross_entropy, Encoder},
    pipelines::{Infer, MultiLabelClassifier, Output},
};

/// One linear classification head per rhetorical device
#[derive(Module, Debug)]
pub struct Heads<B: Backend> {
    /// Sarcasm head
    pub sarcasm: Linear<B>,
    /// Irony head
    pub irony: Linear<B>,
    /// Satire head
    pub satire: Linear<B>,
    /// Understatement head
    pub understatement: Linear<B>,
    /// Overstatement head
    pub overstatement: Linear<B>,
    /// Rhetorical question head
    pub rhetorical_question: Linear<B>,
}

impl<B: Backend> Heads<B> {
    fn get(&self, label: Label) -> &Linear<B> {
        match label {
            Label::Sarcasm => &self.sarcasm,
            Label::Irony => &self.irony,
            Label::Satire => &self.satire,
            Label::Understatement => &self.understatement,
            Label::Overstatement => &self.overstatement,
            Label::RhetoricalQuestion => &self.rhetorical_question,
        }
    }
}

/// Transformer encoder shared by six classification heads
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// The base encoder
    pub encoder: Encoder<B>,

    /// Dropout before the heads
    pub dropout: Dropout,

    /// The classification heads
    pub heads: Heads<B>,

    /// Number of classes per head
    pub n_classes: usize,

    /// Per-class loss weights for each head, in head order
    pub class_weights: Vec<Vec<f32>>,
}

/// Define model behavior
impl<B: Backend> Model<B> {
    /// Defines forward pass for training. The loss is the sum of the per-head losses.
    pub fn forward(&self, input: Infer<B>, targets: Tensor<B, 2, Int>) -> Output<B> {
        let [batch_size, _n_heads] = targets.dims();
        let device = &self.heads.sarcasm.devices()[0];

        let targets = targets.to_device(device);

        let logits = self.logits(input).into_vec();

        let loss = logits
            .iter()
            .enumerate()
            .map(|(head, output)| {
                let target = targets
                    .clone()
                    .slice([0..batch_size, head..head + 1])
                    .reshape([batch_size]);

                let weights = self
                    .class_weights
                    .get(head)
                    .map(Vec::as_slice)
                    .unwrap_or_default();

                weighted_cross_entropy(output.clone(), target, weights)
            })
            .reduce(|total, loss| total + loss)
            .unwrap_or_else(|| Tensor::zeros([1], device));

        let output = Tensor::cat(
            logits
                .into_iter()
                .map(|output| output.reshape([batch_size, 1, self.n_classes]))
                .collect(),
            1,
        );

        Output {
            loss,
            output,
            targets,
        }
    }

    /// Defines forward pass for inference, one probability distribution per head
    pub fn infer(&self, input: Infer<B>) -> PerLabel<Tensor<B, 2>> {
        self.logits(input).map(|_, logits| softmax(logits, 1))
    }
}

impl<B: Backend> MultiLabelClassifier<B> for Model<B> {
    fn logits(&self, input: Infer<B>) -> PerLabel<Tensor<B, 2>> {
        let pooled = self.dropout.forward(self.encoder.forward(input));

        PerLabel::from_fn(|label| self.heads.get(label).forward(pooled.clone()))
    }
}
