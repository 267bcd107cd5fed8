/// Batcher
pub mod batcher;

pub use batcher::Batcher;

use super::PipelineError;

/// Find the position of the label column a single-head model is trained on, defaulting to
/// the first label column
pub fn resolve_label_column(
    label_columns: &[String],
    label_column: Option<&str>,
) -> Result<usize, PipelineError> {
    match label_column {
        Some(name) => label_columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| PipelineError::MissingLabelColumn(name.to_string())),
        None if label_columns.is_empty() => {
            Err(PipelineError::MissingLabelColumn("<none>".to_string()))
        }
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_named_or_first_column() {
        let columns = vec!["sarcasm".to_string(), "irony".to_string()];

        assert_eq!(resolve_label_column(&columns, None).unwrap(), 0);
        assert_eq!(resolve_label_column(&columns, Some("irony")).unwrap(), 1);
        assert!(resolve_label_column(&columns, Some("satire")).is_err());
        assert!(resolve_label_column(&[], None).is_err());
    }
}
