use std::{collections::HashMap, path::Path};

use burn::{
    module::{Module, Param},
    tensor::{backend::Backend, Data, Shape, Tensor},
};
use candle_core::{safetensors, DType, Device as CandleDevice, Tensor as CandleTensor};

use super::Encoder;

/// Prefix Hugging Face gives the encoder tensors of task-specific BERT checkpoints
static BERT_PREFIX: &str = "bert.";

/// The tensors of a pretrained BERT checkpoint in safetensors format, keyed without the
/// `bert.` prefix
pub struct BertWeights {
    tensors: HashMap<String, CandleTensor>,
}

impl BertWeights {
    /// Read every tensor of a safetensors file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let tensors = safetensors::load(path, &CandleDevice::Cpu)
            .map_err(|e| anyhow!("Unable to read weights from {}: {}", path.display(), e))?
            .into_iter()
            .map(|(key, tensor)| match key.strip_prefix(BERT_PREFIX) {
                Some(stripped) => (stripped.to_string(), tensor),
                None => (key, tensor),
            })
            .collect();

        Ok(Self { tensors })
    }

    /// Convert the first tensor found under one of `keys` to a Burn tensor
    fn tensor<B: Backend, const D: usize>(
        &self,
        keys: &[&str],
        device: &B::Device,
    ) -> anyhow::Result<Tensor<B, D>> {
        let (key, tensor) = keys
            .iter()
            .find_map(|key| self.tensors.get(*key).map(|tensor| (*key, tensor)))
            .ok_or_else(|| {
                anyhow!(
                    "Tensor {} is missing from the pretrained weights; only BERT checkpoints can be imported",
                    keys[0]
                )
            })?;

        let dims: [usize; D] = tensor.dims().try_into().map_err(|_| {
            anyhow!("Tensor {} has shape {:?}, expected {} dimensions", key, tensor.dims(), D)
        })?;

        let values = tensor
            .to_dtype(DType::F32)
            .and_then(|tensor| tensor.flatten_all())
            .and_then(|tensor| tensor.to_vec1::<f32>())
            .map_err(|e| anyhow!("Unable to read tensor {}: {}", key, e))?;

        Ok(Tensor::from_data(
            Data::new(values, Shape::new(dims)).convert::<B::FloatElem>(),
            device,
        ))
    }

    /// An embedding table, cut or extended with `current` rows to match its size
    fn embedding<B: Backend>(
        &self,
        key: &str,
        current: &Param<Tensor<B, 2>>,
        device: &B::Device,
    ) -> anyhow::Result<Param<Tensor<B, 2>>> {
        let loaded = self.tensor::<B, 2>(&[format!("{}.weight", key).as_str()], device)?;

        Ok(Param::from_tensor(fit_rows(key, loaded, current.val())?))
    }

    /// A dense layer, transposed from `[d_output, d_input]` to Burn's `[d_input, d_output]`
    fn linear<B: Backend>(
        &self,
        key: &str,
        current: &Param<Tensor<B, 2>>,
        device: &B::Device,
    ) -> anyhow::Result<(Param<Tensor<B, 2>>, Param<Tensor<B, 1>>)> {
        let weight = self
            .tensor::<B, 2>(&[format!("{}.weight", key).as_str()], device)?
            .transpose();
        let bias = self.tensor::<B, 1>(&[format!("{}.bias", key).as_str()], device)?;

        check_dims(key, &weight.dims(), &current.dims())?;

        Ok((Param::from_tensor(weight), Param::from_tensor(bias)))
    }

    /// A layer norm scale and shift, under either the current or the legacy gamma/beta names
    fn layer_norm<B: Backend>(
        &self,
        key: &str,
        current: &Param<Tensor<B, 1>>,
        device: &B::Device,
    ) -> anyhow::Result<(Param<Tensor<B, 1>>, Param<Tensor<B, 1>>)> {
        let gamma = self.tensor::<B, 1>(
            &[format!("{}.weight", key).as_str(), format!("{}.gamma", key).as_str()],
            device,
        )?;
        let beta = self.tensor::<B, 1>(
            &[format!("{}.bias", key).as_str(), format!("{}.beta", key).as_str()],
            device,
        )?;

        check_dims(key, &gamma.dims(), &current.dims())?;

        Ok((Param::from_tensor(gamma), Param::from_tensor(beta)))
    }
}

/// Fail when a pretrained tensor does not fit the parameter it replaces
fn check_dims(key: &str, loaded: &[usize], expected: &[usize]) -> anyhow::Result<()> {
    if loaded != expected {
        return Err(anyhow!(
            "Tensor {} has shape {:?}, the encoder expects {:?}",
            key,
            loaded,
            expected
        ));
    }

    Ok(())
}

/// Match an embedding table to the number of rows the encoder was configured with. Extra
/// pretrained rows are dropped; missing rows keep their initial values.
fn fit_rows<B: Backend>(
    key: &str,
    loaded: Tensor<B, 2>,
    current: Tensor<B, 2>,
) -> anyhow::Result<Tensor<B, 2>> {
    let [loaded_rows, loaded_cols] = loaded.dims();
    let [rows, cols] = current.dims();

    check_dims(key, &[loaded_cols], &[cols])?;

    Ok(if loaded_rows >= rows {
        loaded.slice([0..rows, 0..cols])
    } else {
        Tensor::cat(
            vec![loaded, current.slice([loaded_rows..rows, 0..cols])],
            0,
        )
    })
}

impl<B: Backend> Encoder<B> {
    /// Replace the embeddings and every transformer layer with pretrained BERT weights
    pub fn load_pretrained(self, weights: &BertWeights, device: &B::Device) -> anyhow::Result<Self> {
        let mut record = self.clone().into_record();

        record.embedding_token.weight = weights.embedding(
            "embeddings.word_embeddings",
            &record.embedding_token.weight,
            device,
        )?;
        record.embedding_pos.weight = weights.embedding(
            "embeddings.position_embeddings",
            &record.embedding_pos.weight,
            device,
        )?;
        record.embedding_type.weight = weights.embedding(
            "embeddings.token_type_embeddings",
            &record.embedding_type.weight,
            device,
        )?;

        let (gamma, beta) =
            weights.layer_norm("embeddings.LayerNorm", &record.embedding_norm.gamma, device)?;
        record.embedding_norm.gamma = gamma;
        record.embedding_norm.beta = beta;

        for (index, layer) in record.transformer.layers.iter_mut().enumerate() {
            let prefix = format!("encoder.layer.{}", index);

            for (linear, name) in [
                (&mut layer.mha.query, "attention.self.query"),
                (&mut layer.mha.key, "attention.self.key"),
                (&mut layer.mha.value, "attention.self.value"),
                (&mut layer.mha.output, "attention.output.dense"),
                (&mut layer.pwff.linear_inner, "intermediate.dense"),
                (&mut layer.pwff.linear_outer, "output.dense"),
            ] {
                let (weight, bias) =
                    weights.linear(&format!("{}.{}", prefix, name), &linear.weight, device)?;
                linear.weight = weight;
                linear.bias = Some(bias);
            }

            for (norm, name) in [
                (&mut layer.norm_1, "attention.output.LayerNorm"),
                (&mut layer.norm_2, "output.LayerNorm"),
            ] {
                let (gamma, beta) =
                    weights.layer_norm(&format!("{}.{}", prefix, name), &norm.gamma, device)?;
                norm.gamma = gamma;
                norm.beta = beta;
            }
        }

        Ok(self.load_record(record))
    }
}
