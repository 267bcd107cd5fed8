use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The rhetorical devices predicted by the multi-label pipeline
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Label {
    /// Sarcasm
    Sarcasm,
    /// Irony
    Irony,
    /// Satire
    Satire,
    /// Understatement
    Understatement,
    /// Overstatement
    Overstatement,
    /// Rhetorical question
    RhetoricalQuestion,
}

impl Label {
    /// Every label, in head order
    pub const ALL: [Label; 6] = [
        Label::Sarcasm,
        Label::Irony,
        Label::Satire,
        Label::Understatement,
        Label::Overstatement,
        Label::RhetoricalQuestion,
    ];

    /// The column name that identifies this label
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Sarcasm => "sarcasm",
            Label::Irony => "irony",
            Label::Satire => "satire",
            Label::Understatement => "understatement",
            Label::Overstatement => "overstatement",
            Label::RhetoricalQuestion => "rhetorical_question",
        }
    }
}

impl TryFrom<&str> for Label {
    type Error = LabelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_lowercase().replace([' ', '-'], "_");

        Label::ALL
            .into_iter()
            .find(|label| label.as_str() == normalized)
            .ok_or_else(|| LabelError::Unknown(value.to_string()))
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One value per rhetorical device, addressed by name rather than position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerLabel<T> {
    /// Sarcasm
    pub sarcasm: T,
    /// Irony
    pub irony: T,
    /// Satire
    pub satire: T,
    /// Understatement
    pub understatement: T,
    /// Overstatement
    pub overstatement: T,
    /// Rhetorical question
    pub rhetorical_question: T,
}

impl<T> PerLabel<T> {
    /// Build a record by calling `f` once per label, in head order
    pub fn from_fn(mut f: impl FnMut(Label) -> T) -> Self {
        Self {
            sarcasm: f(Label::Sarcasm),
            irony: f(Label::Irony),
            satire: f(Label::Satire),
            understatement: f(Label::Understatement),
            overstatement: f(Label::Overstatement),
            rhetorical_question: f(Label::RhetoricalQuestion),
        }
    }

    /// Fallible version of `from_fn`
    pub fn try_from_fn<E>(mut f: impl FnMut(Label) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            sarcasm: f(Label::Sarcasm)?,
            irony: f(Label::Irony)?,
            satire: f(Label::Satire)?,
            understatement: f(Label::Understatement)?,
            overstatement: f(Label::Overstatement)?,
            rhetorical_question: f(Label::RhetoricalQuestion)?,
        })
    }

    /// Borrow the value for a label
    pub fn get(&self, label: Label) -> &T {
        match label {
            Label::Sarcasm => &self.sarcasm,
            Label::Irony => &self.irony,
            Label::Satire => &self.satire,
            Label::Understatement => &self.understatement,
            Label::Overstatement => &self.overstatement,
            Label::RhetoricalQuestion => &self.rhetorical_question,
        }
    }

    /// Transform every value
    pub fn map<U>(self, mut f: impl FnMut(Label, T) -> U) -> PerLabel<U> {
        PerLabel {
            sarcasm: f(Label::Sarcasm, self.sarcasm),
            irony: f(Label::Irony, self.irony),
            satire: f(Label::Satire, self.satire),
            understatement: f(Label::Understatement, self.understatement),
            overstatement: f(Label::Overstatement, self.overstatement),
            rhetorical_question: f(Label::RhetoricalQuestion, self.rhetorical_question),
        }
    }

    /// Iterate over `(label, value)` pairs in head order
    pub fn iter(&self) -> impl Iterator<Item = (Label, &T)> {
        Label::ALL.into_iter().map(move |label| (label, self.get(label)))
    }

    /// Consume the record into a vector in head order
    pub fn into_vec(self) -> Vec<T> {
        vec![
            self.sarcasm,
            self.irony,
            self.satire,
            self.understatement,
            self.overstatement,
            self.rhetorical_question,
        ]
    }
}

impl PerLabel<usize> {
    /// Resolve the position of each label within the given label columns
    pub fn try_from_columns(columns: &[String]) -> Result<Self, LabelError> {
        Self::try_from_fn(|label| {
            columns
                .iter()
                .position(|column| Label::try_from(column.as_str()).ok() == Some(label))
                .ok_or(LabelError::MissingColumn(label))
        })
    }
}

/// Label Error
#[derive(thiserror::Error, Debug)]
pub enum LabelError {
    /// The string is not a known rhetorical device
    #[error("no label found for {0}")]
    Unknown(String),

    /// A label has no matching column in the dataset
    #[error("no column found for label {0}")]
    MissingColumn(Label),
}
