use std::path::Path;

use async_trait::async_trait;

///  The rhetorical device dataset (iSarcasmEval-style CSV tables)
pub mod rhetoric;

/// A dataset which can be loaded from a CSV table
#[async_trait]
pub trait LoadableDataset<I>: burn::data::dataset::Dataset<I> {
    /// Load the table at `path`, reading the `data_headers` columns and renaming them to
    /// `customized_headers`
    async fn load(
        path: &Path,
        data_headers: &[String],
        customized_headers: &[String],
    ) -> Result<Self, DatasetError>
    where
        Self: std::marker::Sized;
}

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// A configured header is absent from the CSV file
    #[error("column {0} not found in the CSV header")]
    MissingColumn(String),

    /// The raw and customized header lists disagree
    #[error("expected {expected} customized headers, found {found}")]
    HeaderMismatch {
        /// Number of raw headers
        expected: usize,
        /// Number of customized headers
        found: usize,
    },

    /// At least a text column and one label column are needed
    #[error("a text column and at least one label column are required")]
    NoLabelColumns,

    /// A label cell could not be read as a class index, or names a class beyond the
    /// configured number of classes
    #[error("invalid label {value:?} in column {column} on row {row}")]
    InvalidLabel {
        /// 1-based data row
        row: usize,
        /// Customized column name
        column: String,
        /// Raw cell contents
        value: String,
    },

    /// Malformed CSV
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Unreadable file
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
