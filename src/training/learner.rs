use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
};

use burn::{
    data::dataloader::DataLoaderBuilder,
    optim::AdamWConfig,
    record::CompactRecorder,
    tensor::backend::AutodiffBackend,
    train::{
        checkpoint::{
            ComposedCheckpointingStrategy, KeepLastNCheckpoints, MetricCheckpointingStrategy,
        },
        metric::{
            store::{Aggregate, Direction, Split as MetricSplit},
            AccuracyMetric, CudaMetric, LearningRateMetric, LossMetric,
        },
        LearnerBuilder, MetricEarlyStoppingStrategy, StoppingCondition, ValidStep,
    },
};

use crate::{
    config::Config,
    pipelines::{Model, ModelConfig, Output, Train, TrainBatcher},
    utils::renderer::Simple,
};

use super::{checkpoints, metrics::Accumulator, DataModule, Metrics, Split, Trainer};

/// The batcher a model config selects for a backend
type BatcherOf<C, B> = <C as ModelConfig>::Batcher<B>;

/// Trains with the Burn Learner: AdamW at a fixed learning rate, early stopping on validation
/// loss, and file checkpoints of the most recent and the best epochs
pub struct LearnerTrainer<B: AutodiffBackend, C: ModelConfig> {
    /// The experiment configuration
    config: Config,

    /// The configuration of the model being trained
    model_config: C,

    /// Devices on which to perform computation (e.g., CPU or CUDA device)
    devices: Vec<B::Device>,

    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend, C: ModelConfig> LearnerTrainer<B, C> {
    /// Creates a new trainer
    pub fn new(config: Config, model_config: C, devices: Vec<B::Device>) -> Self {
        Self {
            config,
            model_config,
            devices,
            _backend: PhantomData,
        }
    }

    /// Directory the learner writes checkpoints and logs to
    pub fn artifact_dir(&self) -> PathBuf {
        self.config.artifact_dir()
    }

    fn device(&self) -> anyhow::Result<&B::Device> {
        self.devices
            .first()
            .ok_or_else(|| anyhow!("No device to train on"))
    }
}

impl<B, M> Trainer<B, M> for LearnerTrainer<B, M::Config>
where
    B: AutodiffBackend,
    M: Model<B> + 'static,
    M::InnerModule: ValidStep<Train<B::InnerBackend>, Output<B::InnerBackend>>,
{
    fn fit(&self, model: M, data: &DataModule) -> anyhow::Result<PathBuf> {
        let device = self.device()?;
        let model_columns = self.model_config.label_columns();

        let batcher_train: BatcherOf<M::Config, B> = TrainBatcher::for_columns(
            data.tokenizer.clone(),
            data.max_length,
            &data.label_columns,
            &model_columns,
            device.clone(),
        )?;

        let batcher_valid: BatcherOf<M::Config, B::InnerBackend> = TrainBatcher::for_columns(
            data.tokenizer.clone(),
            data.max_length,
            &data.label_columns,
            &model_columns,
            device.clone(),
        )?;

        let dataloader_train = DataLoaderBuilder::new(batcher_train)
            .batch_size(data.batch_size)
            .shuffle(self.config.seed)
            .num_workers(data.num_workers)
            .build(data.train.clone());

        let dataloader_valid = DataLoaderBuilder::new(batcher_valid)
            .batch_size(data.batch_size)
            .num_workers(data.num_workers)
            .build(data.val.clone());

        // Initialize optimizer
        let optimizer = AdamWConfig::new()
            .with_epsilon(self.config.adam_epsilon)
            .init();

        let artifact_dir = self.artifact_dir();

        let early_stopping = MetricEarlyStoppingStrategy::new::<LossMetric<B>>(
            Aggregate::Mean,
            Direction::Lowest,
            MetricSplit::Valid,
            StoppingCondition::NoImprovementSince {
                n_epochs: self.config.patience,
            },
        );

        let checkpointing = ComposedCheckpointingStrategy::builder()
            .add(KeepLastNCheckpoints::new(self.config.save_top_k))
            .add(MetricCheckpointingStrategy::new::<LossMetric<B>>(
                Aggregate::Mean,
                Direction::Lowest,
                MetricSplit::Valid,
            ))
            .build();

        // Start from an empty checkpoint directory
        checkpoints::clear(&artifact_dir)?;

        // Initialize learner
        let mut builder = LearnerBuilder::new(&artifact_dir.to_string_lossy())
            .metric_train(CudaMetric::new())
            .metric_valid(CudaMetric::new())
            .metric_train_numeric(AccuracyMetric::new())
            .metric_valid_numeric(AccuracyMetric::new())
            .metric_train_numeric(LossMetric::new())
            .metric_valid_numeric(LossMetric::new())
            .metric_train_numeric(LearningRateMetric::new())
            .with_file_checkpointer(CompactRecorder::new())
            .early_stopping(early_stopping)
            .devices(self.devices.clone())
            .num_epochs(self.config.n_epochs)
            .summary();

        builder.with_checkpointing_strategy(checkpointing);

        if !self.config.use_tui {
            builder = builder.renderer(Simple::new());
        }

        let learner = builder.build(model, optimizer, self.config.learning_rate);

        // Train the model
        let _model_trained = learner.fit(dataloader_train, dataloader_valid);

        // Pick the retained checkpoint that scores best on the validation split
        let mut best: Option<(PathBuf, Metrics)> = None;

        for checkpoint in checkpoints::list(&artifact_dir)? {
            let metrics =
                Trainer::<B, M>::evaluate(self, &checkpoint.path, Split::Valid, data)?;

            log::info!(
                "Epoch {} validation loss {:.4} accuracy {:.4} weighted F1 {:.4}",
                checkpoint.epoch,
                metrics.loss,
                metrics.accuracy,
                metrics.weighted_f1()
            );

            if best
                .as_ref()
                .map_or(true, |(_, current)| metrics.loss < current.loss)
            {
                best = Some((checkpoint.path, metrics));
            }
        }

        best.map(|(path, _)| path)
            .ok_or_else(|| anyhow!("No checkpoint found in {}", artifact_dir.display()))
    }

    fn evaluate(
        &self,
        checkpoint: &Path,
        split: Split,
        data: &DataModule,
    ) -> anyhow::Result<Metrics> {
        let device = self.device()?;

        let model = M::init(&self.model_config, device)
            .load_file(checkpoint.to_path_buf(), &CompactRecorder::new(), device)
            .map_err(|e| anyhow!("Unable to load checkpoint {}: {}", checkpoint.display(), e))?
            .valid();

        let model_columns = self.model_config.label_columns();

        let batcher: BatcherOf<M::Config, B::InnerBackend> = TrainBatcher::for_columns(
            data.tokenizer.clone(),
            data.max_length,
            &data.label_columns,
            &model_columns,
            device.clone(),
        )?;

        let dataloader = DataLoaderBuilder::new(batcher)
            .batch_size(data.batch_size)
            .num_workers(data.num_workers)
            .build(data.split(split));

        let mut accumulator = Accumulator::new(model_columns);

        for batch in dataloader.iter() {
            accumulator.update(ValidStep::step(&model, batch));
        }

        Ok(accumulator.finish())
    }
}
