use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::pipelines::Model;

/// Checkpoint discovery within an artifact directory
pub mod checkpoints;

/// Train, validation and test splits with their loading settings
pub mod data;

/// The end-to-end training run
pub mod driver;

/// A trainer backed by the Burn Learner
pub mod learner;

/// Evaluation metrics and their CSV log
pub mod metrics;

pub use data::DataModule;
pub use learner::LearnerTrainer;
pub use metrics::Metrics;

/// The dataset splits a checkpoint can be evaluated on
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Split {
    /// Training split
    Train,

    /// Validation split
    Valid,

    /// Test split
    Test,
}

impl Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Split::Train => "train",
            Split::Valid => "val",
            Split::Test => "test",
        };

        write!(f, "{}", name)
    }
}

/// Fits models and evaluates their checkpoints
pub trait Trainer<B: AutodiffBackend, M: Model<B>> {
    /// Train the model, returning the path of the best checkpoint
    fn fit(&self, model: M, data: &DataModule) -> anyhow::Result<PathBuf>;

    /// Score a checkpoint on one split of the data
    fn evaluate(&self, checkpoint: &Path, split: Split, data: &DataModule)
        -> anyhow::Result<Metrics>;
}
