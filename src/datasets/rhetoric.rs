use std::path::Path;

use async_trait::async_trait;
use burn::data::dataset::{self, Dataset as _, InMemDataset};
use derive_new::new;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use crate::{pipelines, text::normalize_text};

use super::{DatasetError, LoadableDataset};

/// Cell contents treated as missing values
static MISSING: &[&str] = &["", "na", "n/a", "nan", "null", "none", "<na>"];

/// Define a struct for rhetorical device classification items
#[derive(Clone, Debug, Serialize, Deserialize, new)]
pub struct Item {
    /// The normalized text for classification
    pub input: String,

    /// One class index per label column
    pub labels: Vec<usize>,
}

impl pipelines::Item for Item {
    fn input(&self) -> &str {
        &self.input
    }

    fn labels(&self) -> &[usize] {
        &self.labels
    }
}

/// Struct for the rhetorical device dataset
pub struct Dataset {
    /// Underlying In-Memory dataset
    dataset: InMemDataset<Item>,

    /// Customized column names, text column first
    columns: Vec<String>,

    /// 1-based CSV data row of each item
    rows: Vec<usize>,
}

/// Implement the Dataset trait for the rhetorical device dataset
impl dataset::Dataset<Item> for Dataset {
    /// Returns a specific item from the dataset
    fn get(&self, index: usize) -> Option<Item> {
        self.dataset.get(index)
    }

    /// Returns the length of the dataset
    fn len(&self) -> usize {
        self.dataset.len()
    }
}

#[async_trait]
impl LoadableDataset<Item> for Dataset {
    async fn load(
        path: &Path,
        data_headers: &[String],
        customized_headers: &[String],
    ) -> Result<Self, DatasetError> {
        let bytes = tokio::fs::read(path).await?;

        Self::from_reader(bytes.as_slice(), data_headers, customized_headers)
    }
}

impl Dataset {
    /// Read a CSV table, keeping the `data_headers` columns under their `customized_headers`
    /// names. Rows with a missing value in any kept column are dropped.
    pub fn from_reader<R: std::io::Read>(
        reader: R,
        data_headers: &[String],
        customized_headers: &[String],
    ) -> Result<Self, DatasetError> {
        if data_headers.len() != customized_headers.len() {
            return Err(DatasetError::HeaderMismatch {
                expected: data_headers.len(),
                found: customized_headers.len(),
            });
        }

        if data_headers.len() < 2 {
            return Err(DatasetError::NoLabelColumns);
        }

        let mut reader = csv::ReaderBuilder::new().from_reader(reader);

        let headers = reader.headers()?.clone();
        let positions = data_headers
            .iter()
            .map(|name| {
                headers
                    .iter()
                    .position(|header| header.trim() == name)
                    .ok_or_else(|| DatasetError::MissingColumn(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut items = Vec::new();
        let mut rows = Vec::new();
        let mut dropped = 0;

        for (row, record) in reader.records().enumerate() {
            let record = record?;

            let cells: Vec<&str> = positions
                .iter()
                .map(|&i| record.get(i).unwrap_or("").trim())
                .collect();

            if cells.iter().any(|cell| is_missing(cell)) {
                dropped += 1;
                continue;
            }

            let labels = cells[1..]
                .iter()
                .zip(&customized_headers[1..])
                .map(|(cell, column)| {
                    parse_label(cell).ok_or_else(|| DatasetError::InvalidLabel {
                        row: row + 1,
                        column: column.clone(),
                        value: cell.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            items.push(Item::new(normalize_text(cells[0]), labels));
            rows.push(row + 1);
        }

        if dropped > 0 {
            log::debug!("Dropped {} rows with missing values", dropped);
        }

        Ok(Self {
            dataset: InMemDataset::new(items),
            columns: customized_headers.to_vec(),
            rows,
        })
    }

    /// Ensure every label is a class index below `n_classes`
    pub fn check_classes(&self, n_classes: usize) -> Result<(), DatasetError> {
        for (position, item) in self.dataset.iter().enumerate() {
            let invalid = item
                .labels
                .iter()
                .zip(self.label_columns())
                .find(|(label, _)| **label >= n_classes);

            if let Some((label, column)) = invalid {
                return Err(DatasetError::InvalidLabel {
                    row: self.rows.get(position).copied().unwrap_or(position + 1),
                    column: column.clone(),
                    value: label.to_string(),
                });
            }
        }

        Ok(())
    }

    /// The name of the text column
    pub fn text_column(&self) -> &str {
        &self.columns[0]
    }

    /// The label columns: every column after the text column, in header order
    pub fn label_columns(&self) -> &[String] {
        &self.columns[1..]
    }

    /// All values of a label column, or `None` if there is no such column
    pub fn column(&self, name: &str) -> Option<Vec<usize>> {
        let position = self.label_columns().iter().position(|c| c == name)?;

        Some(self.dataset.iter().map(|item| item.labels[position]).collect())
    }

    /// Returns random samples from the dataset
    pub fn samples(&self, count: usize) -> Vec<(String, Vec<usize>)> {
        let mut rng = rand::thread_rng();

        index::sample(&mut rng, self.len(), count.min(self.len()))
            .into_iter()
            .filter_map(|i| self.get(i))
            .map(|item| (item.input, item.labels))
            .collect()
    }
}

fn is_missing(cell: &str) -> bool {
    MISSING.contains(&cell.to_lowercase().as_str())
}

/// Accept integral class ids written either as "1" or "1.0"
fn parse_label(cell: &str) -> Option<usize> {
    if let Ok(value) = cell.parse::<usize>() {
        return Some(value);
    }

    let value = cell.parse::<f64>().ok()?;

    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Some(value as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const CSV: &str = "\
id,tweet,sarcasm,irony
1,Great   another #monday,1,0
2,,0,1
3,Lovely weather @alice,nan,1
4,Sure that will work,0.0,1.0
";

    #[test]
    fn drops_rows_with_missing_values() {
        let dataset = Dataset::from_reader(
            CSV.as_bytes(),
            &headers(&["tweet", "sarcasm", "irony"]),
            &headers(&["tweets", "sarcasm", "irony"]),
        )
        .unwrap();

        assert_eq!(dataset.len(), 2);

        let first = dataset.get(0).unwrap();
        assert_eq!(first.input, "Great another monday");
        assert_eq!(first.labels, vec![1, 0]);

        let second = dataset.get(1).unwrap();
        assert_eq!(second.labels, vec![0, 1]);
    }

    #[test]
    fn derives_label_columns_from_the_header() {
        let dataset = Dataset::from_reader(
            CSV.as_bytes(),
            &headers(&["tweet", "sarcasm", "irony"]),
            &headers(&["text", "sarcasm", "irony"]),
        )
        .unwrap();

        assert_eq!(dataset.text_column(), "text");
        assert_eq!(dataset.label_columns(), &headers(&["sarcasm", "irony"])[..]);
        assert_eq!(dataset.column("irony"), Some(vec![0, 1]));
        assert_eq!(dataset.column("satire"), None);
    }

    #[test]
    fn rejects_a_missing_column() {
        let result = Dataset::from_reader(
            CSV.as_bytes(),
            &headers(&["tweet", "satire"]),
            &headers(&["tweets", "satire"]),
        );

        assert!(matches!(result, Err(DatasetError::MissingColumn(c)) if c == "satire"));
    }

    #[test]
    fn rejects_non_numeric_labels() {
        let csv = "tweet,sarcasm\nhello,yes\n";

        let result = Dataset::from_reader(
            csv.as_bytes(),
            &headers(&["tweet", "sarcasm"]),
            &headers(&["tweets", "sarcasm"]),
        );

        assert!(matches!(
            result,
            Err(DatasetError::InvalidLabel { row: 1, .. })
        ));
    }

    #[test]
    fn rejects_classes_outside_the_configured_range() {
        let csv = "tweet,sarcasm,irony\nhello,1,0\nworld,0,0\nagain,0,2\n";

        let dataset = Dataset::from_reader(
            csv.as_bytes(),
            &headers(&["tweet", "sarcasm", "irony"]),
            &headers(&["tweets", "sarcasm", "irony"]),
        )
        .unwrap();

        dataset.check_classes(3).unwrap();

        let result = dataset.check_classes(2);

        assert!(matches!(
            result,
            Err(DatasetError::InvalidLabel { row: 3, column, value })
                if column == "irony" && value == "2"
        ));
    }

    #[test]
    fn reports_source_rows_after_dropping_missing_values() {
        let dataset = Dataset::from_reader(
            "tweet,sarcasm\nhello,\nworld,5\n".as_bytes(),
            &headers(&["tweet", "sarcasm"]),
            &headers(&["tweets", "sarcasm"]),
        )
        .unwrap();

        assert!(matches!(
            dataset.check_classes(2),
            Err(DatasetError::InvalidLabel { row: 2, .. })
        ));
    }

    #[test]
    fn samples_never_exceed_the_dataset() {
        let dataset = Dataset::from_reader(
            CSV.as_bytes(),
            &headers(&["tweet", "sarcasm", "irony"]),
            &headers(&["tweets", "sarcasm", "irony"]),
        )
        .unwrap();

        assert_eq!(dataset.samples(10).len(), 2);
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        std::fs::write(&path, CSV).unwrap();

        let dataset = Dataset::load(
            &path,
            &headers(&["tweet", "sarcasm", "irony"]),
            &headers(&["tweets", "sarcasm", "irony"]),
        )
        .await
        .unwrap();

        assert_eq!(dataset.len(), 2);
    }
}
