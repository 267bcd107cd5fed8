use std::{collections::BTreeMap, fmt::Display};

/// Common batcher operations for sequence classification
pub mod batcher;

/// Items that can be batched
pub mod item;

/// Training output adapted for Burn metrics
pub mod output;

/// Common model traits
pub mod model;

/// Text Classification (a single label column)
pub mod text_classification;

/// Multi-label Classification (one head per rhetorical device)
pub mod multi_label;

pub use batcher::{Batcher, Encoded, Infer, Train};
pub use item::Item;
pub use model::{Classifier, Model, ModelConfig, MultiLabelClassifier, TrainBatcher};
pub use output::Output;

/// The unique string token that identifies the text classification pipeline
pub static TEXT_CLASSIFICATION: &str = "text-classification";

/// The unique string token that identifies the multi-label pipeline
pub static MULTI_LABEL: &str = "multi-label";

/// Available Pipelines
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Pipeline {
    /// Text Classification
    TextClassification,

    /// Multi-label Classification
    MultiLabel,
}

impl TryFrom<&str> for Pipeline {
    type Error = PipelineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value == TEXT_CLASSIFICATION {
            Ok(Pipeline::TextClassification)
        } else if value == MULTI_LABEL {
            Ok(Pipeline::MultiLabel)
        } else {
            Err(PipelineError::Unknown(value.to_string()))
        }
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Pipeline::TextClassification => TEXT_CLASSIFICATION,
            Pipeline::MultiLabel => MULTI_LABEL,
        };

        write!(f, "{}", name)
    }
}

/// Class names for a label column: `not_<column>` and `<column>` for binary columns,
/// `<column>_<id>` otherwise
pub fn class_names(column: &str, n_classes: usize) -> BTreeMap<usize, String> {
    if n_classes == 2 {
        return BTreeMap::from([(0, format!("not_{}", column)), (1, column.to_string())]);
    }

    (0..n_classes)
        .map(|id| (id, format!("{}_{}", column, id)))
        .collect()
}

/// Pipeline Error
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// No pipeline found for the given string
    #[error("no pipeline found for {0}")]
    Unknown(String),

    /// The tokenizer rejected the input or its configuration
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// The configured label column is not in the dataset
    #[error("label column {0} not found")]
    MissingLabelColumn(String),

    /// Label columns could not be matched to the model heads
    #[error(transparent)]
    Label(#[from] crate::labels::LabelError),
}
