use burn::tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor};

/// Pad (or cut) each row of ids to a specific length, typically to correlate with tokenized
/// sequences
pub fn pad_to<B: Backend>(
    pad_token: usize,
    tokens_list: Vec<Vec<usize>>,
    seq_length: usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let batch_size = tokens_list.len();

    let mut values = Vec::with_capacity(batch_size * seq_length);

    for tokens in tokens_list {
        let kept = tokens.len().min(seq_length);

        values.extend(
            tokens
                .into_iter()
                .take(seq_length)
                .map(|e| (e as i64).elem::<B::IntElem>()),
        );
        values.extend(
            std::iter::repeat((pad_token as i64).elem::<B::IntElem>()).take(seq_length - kept),
        );
    }

    Tensor::from_data(
        Data::new(values, Shape::new([batch_size, seq_length])),
        device,
    )
}

/// The index of the highest value in each row
pub fn argmax_rows<B: Backend>(tensor: Tensor<B, 2>) -> Vec<usize> {
    tensor
        .argmax(1)
        .into_data()
        .convert::<i64>()
        .value
        .into_iter()
        .map(|index| index as usize)
        .collect()
}

/// Copy a 2D float tensor out into one vector per row
pub fn to_rows<B: Backend>(tensor: Tensor<B, 2>) -> Vec<Vec<f32>> {
    let [_, n_columns] = tensor.dims();

    if n_columns == 0 {
        return Vec::new();
    }

    tensor
        .into_data()
        .convert::<f32>()
        .value
        .chunks(n_columns)
        .map(|row| row.to_vec())
        .collect()
}

/// Copy a 2D int tensor out into one vector per row
pub fn to_id_rows<B: Backend>(tensor: Tensor<B, 2, Int>) -> Vec<Vec<usize>> {
    let [_, n_columns] = tensor.dims();

    if n_columns == 0 {
        return Vec::new();
    }

    tensor
        .into_data()
        .convert::<i64>()
        .value
        .chunks(n_columns)
        .map(|row| row.iter().map(|id| *id as usize).collect())
        .collect()
}
