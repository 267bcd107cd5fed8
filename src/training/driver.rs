use std::path::PathBuf;

use burn::{config::Config as _, tensor::backend::AutodiffBackend, train::ValidStep};

use crate::{
    config::Config,
    labels::PerLabel,
    models::transformer::{multi_label, text_classification, BertWeights, EncoderConfig},
    pipelines::{text_classification::resolve_label_column, Model, Output, Pipeline, Train},
    utils::{
        classes::ClassWeights,
        files::{self, BestModel},
        hugging_face,
    },
};

use super::{metrics, DataModule, LearnerTrainer, Split, Trainer};

/// Train the configured pipeline end to end, returning the best checkpoint.
///
/// Loads the three splits, weights each class by its inverse frequency in the training
/// split, starts from the pretrained encoder weights, fits the model, scores the best
/// checkpoint on every split and records its path in `b_model_path.json` within the
/// artifact directory.
pub async fn run<B: AutodiffBackend>(
    config: Config,
    devices: Vec<B::Device>,
) -> anyhow::Result<PathBuf> {
    let pipeline = Pipeline::try_from(config.pipeline.as_str())?;

    log::info!("Running the {} pipeline", pipeline);

    let data = DataModule::load(&config).await?;
    data.setup();

    let class_weights = ClassWeights::from_dataset(&data.train, config.n_classes);

    let encoder = encoder_config(&config, data.tokenizer.get_vocab_size(true)).await?;

    match pipeline {
        Pipeline::TextClassification => {
            let index =
                resolve_label_column(&data.label_columns, config.label_column.as_deref())?;
            let label_column = data.label_columns[index].clone();

            let model_config = text_classification::Config::new_for_column(
                encoder,
                config.lm_model_path.clone(),
                label_column.clone(),
                config.n_classes,
            )
            .with_class_weights(class_weights.for_column(&label_column, config.n_classes))
            .with_dropout(config.dropout);

            train::<B, text_classification::Model<B>>(config, model_config, data, devices).await
        }
        Pipeline::MultiLabel => {
            let model_config = multi_label::Config::new_with_classes(
                encoder,
                config.lm_model_path.clone(),
                config.n_classes,
            )
            .with_class_weights(PerLabel::from_fn(|label| {
                class_weights.for_column(label.as_str(), config.n_classes)
            }))
            .with_dropout(config.dropout);

            train::<B, multi_label::Model<B>>(config, model_config, data, devices).await
        }
    }
}

/// Shape the encoder after the pretrained model, growing the vocabulary to fit the tokenizer
async fn encoder_config(config: &Config, tokenizer_vocab: usize) -> anyhow::Result<EncoderConfig> {
    let config_file = hugging_face::resolve_file(&config.lm_model_path, "config.json").await?;

    let mut encoder = EncoderConfig::from_pretrained(&config_file, config.max_length)?;
    encoder.vocab_size = encoder.vocab_size.max(tokenizer_vocab);

    Ok(encoder.with_dropout(config.dropout))
}

/// Fit a model, then score and record its best checkpoint
async fn train<B, M>(
    config: Config,
    model_config: M::Config,
    data: DataModule,
    devices: Vec<B::Device>,
) -> anyhow::Result<PathBuf>
where
    B: AutodiffBackend,
    M: Model<B> + 'static,
    M::InnerModule: ValidStep<Train<B::InnerBackend>, Output<B::InnerBackend>>,
{
    let device = devices
        .first()
        .ok_or_else(|| anyhow!("No device to train on"))?
        .clone();

    let artifact_dir = config.artifact_dir();
    tokio::fs::create_dir_all(&artifact_dir).await?;

    // Save the configurations alongside the checkpoints
    model_config
        .save(artifact_dir.join("config.json"))
        .map_err(|e| anyhow!("Unable to save model config: {}", e))?;

    config
        .save(artifact_dir.join("experiment.json"))
        .map_err(|e| anyhow!("Unable to save experiment config: {}", e))?;

    let mut model = M::init(&model_config, &device);

    if config.load_pretrained {
        let weights_file =
            hugging_face::resolve_file(&config.lm_model_path, "model.safetensors").await?;

        log::info!("Loading pretrained weights from {}", weights_file.display());

        model = model.load_pretrained(&BertWeights::load(&weights_file)?, &device)?;
    }

    log::info!("Model parameters: {}", model.num_params());

    let trainer = LearnerTrainer::<B, M::Config>::new(config.clone(), model_config, devices);

    let best_model_path = Trainer::<B, M>::fit(&trainer, model, &data)?;

    log::info!("Best model path: {}", best_model_path.display());

    let metrics_log = config.metrics_log();

    for split in [Split::Train, Split::Valid, Split::Test] {
        let metrics = Trainer::<B, M>::evaluate(&trainer, &best_model_path, split, &data)?;

        log::info!(
            "{} loss {:.4} accuracy {:.4} weighted F1 {:.4} over {} items",
            split,
            metrics.loss,
            metrics.accuracy,
            metrics.weighted_f1(),
            metrics.items
        );

        for head in &metrics.heads {
            log::info!("{} {} F1 per class {:?}", split, head.name, head.f1);
        }

        metrics::append(&metrics_log, split, &best_model_path, &metrics)?;
    }

    files::write_json(&config.best_model_record(), &BestModel::new(&best_model_path)).await?;

    Ok(best_model_path)
}
