use burn::{
    tensor::{backend::Backend, Int, Tensor},
    train::metric::{AccuracyInput, Adaptor, LossInput},
};
use derive_new::new;

/// Classification output for one or more heads, adapted for Burn metrics
#[derive(new)]
pub struct Output<B: Backend> {
    /// The summed loss over every head
    pub loss: Tensor<B, 1>,

    /// Logits: [batch_size, n_heads, n_classes]
    pub output: Tensor<B, 3>,

    /// Targets: [batch_size, n_heads]
    pub targets: Tensor<B, 2, Int>,
}

impl<B: Backend> Adaptor<AccuracyInput<B>> for Output<B> {
    fn adapt(&self) -> AccuracyInput<B> {
        let [batch_size, n_heads, n_classes] = self.output.dims();

        // Every head counts as an independent prediction
        AccuracyInput::new(
            self.output
                .clone()
                .reshape([batch_size * n_heads, n_classes]),
            self.targets.clone().reshape([batch_size * n_heads]),
        )
    }
}

impl<B: Backend> Adaptor<LossInput<B>> for Output<B> {
    fn adapt(&self) -> LossInput<B> {
        LossInput::new(self.loss.clone())
    }
}
