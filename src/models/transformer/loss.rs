use burn::{
    nn::loss::CrossEntropyLossConfig,
    tensor::{backend::Backend, Int, Tensor},
};

/// Cross-entropy over `[batch_size, n_classes]` logits, weighting each class when weights
/// are given
pub fn weighted_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
    class_weights: &[f32],
) -> Tensor<B, 1> {
    let weights = (!class_weights.is_empty()).then(|| class_weights.to_vec());

    CrossEntropyLossConfig::new()
        .with_weights(weights)
        .init(&logits.device())
        .forward(logits, targets)
}

#[cfg(test)]
mod tests {
    use crate::test_utils::TestBackend;

    use super::*;

    #[test]
    fn weights_shift_the_loss_toward_rare_classes() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats([[2.0, 0.0], [2.0, 0.0]], &device);
        // The first sample is misclassified, the second one is right
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([1, 0], &device);

        let plain = weighted_cross_entropy(logits.clone(), targets.clone(), &[]).into_scalar();
        let weighted = weighted_cross_entropy(logits, targets, &[1.0, 3.0]).into_scalar();

        assert!(plain > 0.0);
        assert!(weighted > plain);
    }
}
