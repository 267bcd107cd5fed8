use burn::{
    tensor::backend::{AutodiffBackend, Backend},
    train::{TrainOutput, TrainStep, ValidStep},
};

use crate::{
    models::transformer::BertWeights,
    pipelines::{self, Output, Train},
};

use super::{Config, Model};

/// Define training step
impl<B: AutodiffBackend> TrainStep<Train<B>, Output<B>> for Model<B> {
    fn step(&self, item: Train<B>) -> TrainOutput<Output<B>> {
        // Run forward pass, calculate gradients and return them along with the output
        let output = self.forward(item.input, item.targets);
        let grads = output.loss.backward();

        TrainOutput::new(self, grads, output)
    }
}

/// Define validation step
impl<B: Backend> ValidStep<Train<B>, Output<B>> for Model<B> {
    fn step(&self, item: Train<B>) -> Output<B> {
        // Run forward pass and return the output
        self.forward(item.input, item.targets)
    }
}

impl<B: AutodiffBackend> pipelines::Model<B> for Model<B> {
    /// The model configuration
    type Config = Config;

    fn init(config: &Self::Config, device: &B::Device) -> Self {
        config.init(device)
    }

    /// Perform a forward pass
    fn forward(&self, item: Train<B>) -> Output<B> {
        self.forward(item.input, item.targets)
    }

    fn load_pretrained(self, weights: &BertWeights, device: &B::Device) -> anyhow::Result<Self> {
        let encoder = self.encoder.clone().load_pretrained(weights, device)?;

        Ok(Self { encoder, ..self })
    }
}
