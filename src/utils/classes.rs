use std::{collections::BTreeMap, hash::Hash};

use burn::data::dataset::Dataset as _;
use serde::{Deserialize, Serialize};

use crate::datasets::rhetoric;

/// Invert a map by swapping keys and values
pub fn invert_map<K, V, MK, MV>(original: MK) -> MV
where
    K: Ord + Hash + Eq,
    V: Ord + Hash + Eq + Clone,
    MK: IntoIterator<Item = (K, V)>,
    MV: FromIterator<(V, K)>,
{
    original
        .into_iter()
        .map(|(key, value)| (value, key))
        .collect()
}

/// Position of each label column among the customized headers, text column excluded
pub fn label_positions(customized_headers: &[String]) -> BTreeMap<String, usize> {
    invert_map(customized_headers.iter().skip(1).cloned().enumerate())
}

/// Balanced class weights, `n_samples / (n_classes * count)`, for classes `0..n_classes`
///
/// Classes that never occur keep a neutral weight of 1.0.
pub fn compute_class_weights(labels: &[usize], n_classes: usize) -> Vec<f32> {
    let mut counts = vec![0usize; n_classes];

    for &label in labels {
        if let Some(count) = counts.get_mut(label) {
            *count += 1;
        }
    }

    let present = counts.iter().filter(|count| **count > 0).count();
    let total: usize = counts.iter().sum();

    counts
        .into_iter()
        .map(|count| {
            if count == 0 {
                1.0
            } else {
                total as f32 / (present as f32 * count as f32)
            }
        })
        .collect()
}

/// The share of labels equal to the positive class (1)
pub fn positive_ratio(labels: &[usize]) -> f32 {
    if labels.is_empty() {
        return 0.0;
    }

    labels.iter().filter(|label| **label == 1).count() as f32 / labels.len() as f32
}

/// Loss weights and positive rates for every label column of a dataset
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassWeights {
    /// Label column name to per-class weights
    pub weights: BTreeMap<String, Vec<f32>>,

    /// Label column name to positive-class ratio
    pub positive_ratios: BTreeMap<String, f32>,
}

impl ClassWeights {
    /// Compute weights for every label column of the training set
    pub fn from_dataset(dataset: &rhetoric::Dataset, n_classes: usize) -> Self {
        let mut weights = BTreeMap::new();
        let mut positive_ratios = BTreeMap::new();

        for column in dataset.label_columns() {
            let labels = dataset.column(column).unwrap_or_default();

            weights.insert(column.clone(), compute_class_weights(&labels, n_classes));
            positive_ratios.insert(column.clone(), positive_ratio(&labels));
        }

        log::debug!("class_weights is: {:?}", weights);
        log::debug!(
            "positive ratios over {} rows: {:?}",
            dataset.len(),
            positive_ratios
        );

        Self {
            weights,
            positive_ratios,
        }
    }

    /// Weights for a label column, neutral if the column is unknown
    pub fn for_column(&self, column: &str, n_classes: usize) -> Vec<f32> {
        self.weights
            .get(column)
            .cloned()
            .unwrap_or_else(|| vec![1.0; n_classes])
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn balances_an_uneven_column() {
        let labels = [0, 0, 1, 1, 1];

        let weights = compute_class_weights(&labels, 2);

        assert!((weights[0] - 1.25).abs() < 1e-6);
        assert!((weights[1] - 5.0 / 6.0).abs() < 1e-6);
        assert!(weights[0] > weights[1]);
        assert!((positive_ratio(&labels) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn absent_classes_get_a_neutral_weight() {
        let weights = compute_class_weights(&[0, 0, 0], 2);

        assert_eq!(weights, vec![1.0, 1.0]);
        assert_eq!(positive_ratio(&[0, 0, 0]), 0.0);
        assert_eq!(positive_ratio(&[]), 0.0);
    }

    #[test]
    fn computes_weights_per_column() {
        let csv = "tweet,sarcasm,irony\na,0,1\nb,0,1\nc,1,1\nd,1,0\ne,1,1\n";
        let headers: Vec<String> = ["tweet", "sarcasm", "irony"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let dataset = rhetoric::Dataset::from_reader(csv.as_bytes(), &headers, &headers).unwrap();

        let weights = ClassWeights::from_dataset(&dataset, 2);

        assert_eq!(weights.positive_ratios["sarcasm"], 0.6);
        assert_eq!(weights.positive_ratios["irony"], 0.8);
        assert_eq!(weights.for_column("satire", 2), vec![1.0, 1.0]);
    }

    #[test]
    fn inverts_maps() {
        let id2label = HashMap::from([(0usize, "no".to_string()), (1, "yes".to_string())]);

        let label2id: BTreeMap<String, usize> = invert_map(id2label);

        assert_eq!(label2id["yes"], 1);
    }

    #[test]
    fn locates_label_columns_by_name() {
        let headers: Vec<String> = ["tweets", "sarcasm", "irony", "satire"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let positions = label_positions(&headers);

        assert_eq!(positions.len(), 3);
        assert_eq!(positions["sarcasm"], 0);
        assert_eq!(positions["satire"], 2);
        assert_eq!(positions.get("tweets"), None);
    }
}
