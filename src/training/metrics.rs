use std::{fs, path::Path};

use burn::tensor::{backend::Backend, ElementConversion};
use serde::{Deserialize, Serialize};

use crate::{pipelines::Output, utils::tensors::to_id_rows};

use super::Split;

/// Loss, accuracy and per-class scores of a checkpoint over one split
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean loss per item
    pub loss: f64,

    /// Fraction of correct predictions over every head
    pub accuracy: f64,

    /// Number of items scored
    pub items: usize,

    /// Scores of each head, in head order
    pub heads: Vec<HeadScores>,
}

impl Metrics {
    /// Support-weighted F1, averaged over the heads
    pub fn weighted_f1(&self) -> f64 {
        if self.heads.is_empty() {
            return 0.0;
        }

        self.heads.iter().map(|head| head.weighted_f1).sum::<f64>() / self.heads.len() as f64
    }
}

/// Classification scores of a single head
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadScores {
    /// The label column the head predicts
    pub name: String,

    /// Fraction of items the head got right
    pub accuracy: f64,

    /// Precision of each class
    pub precision: Vec<f64>,

    /// Recall of each class
    pub recall: Vec<f64>,

    /// F1 of each class
    pub f1: Vec<f64>,

    /// Number of items whose target is each class
    pub support: Vec<usize>,

    /// Per-class F1 averaged with support weights
    pub weighted_f1: f64,
}

impl HeadScores {
    /// Score a confusion matrix indexed as `matrix[target][predicted]`. A class that is never
    /// predicted (or never a target) scores 0 precision (or recall).
    pub fn from_confusion(name: &str, matrix: &[Vec<usize>]) -> Self {
        let n_classes = matrix.len();
        let total: usize = matrix.iter().flatten().sum();

        let support: Vec<usize> = matrix.iter().map(|row| row.iter().sum()).collect();
        let predicted: Vec<usize> = (0..n_classes)
            .map(|class| matrix.iter().map(|row| row[class]).sum())
            .collect();

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

        let precision: Vec<f64> = (0..n_classes)
            .map(|class| ratio(matrix[class][class], predicted[class]))
            .collect();

        let recall: Vec<f64> = (0..n_classes)
            .map(|class| ratio(matrix[class][class], support[class]))
            .collect();

        let f1: Vec<f64> = precision
            .iter()
            .zip(&recall)
            .map(|(p, r)| if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) })
            .collect();

        let weighted_f1 = if total == 0 {
            0.0
        } else {
            f1.iter()
                .zip(&support)
                .map(|(f1, support)| f1 * *support as f64)
                .sum::<f64>()
                / total as f64
        };

        let correct: usize = (0..n_classes).map(|class| matrix[class][class]).sum();

        Self {
            name: name.to_string(),
            accuracy: ratio(correct, total),
            precision,
            recall,
            f1,
            support,
            weighted_f1,
        }
    }
}

/// Running totals over the batches of an evaluation
#[derive(Default)]
pub(crate) struct Accumulator {
    /// Head names, in head order
    heads: Vec<String>,

    loss: f64,
    correct: usize,
    predictions: usize,
    items: usize,

    /// One confusion matrix per head, indexed `[head][target][predicted]`
    confusion: Vec<Vec<Vec<usize>>>,
}

impl Accumulator {
    /// Start an evaluation of a model whose heads predict the named columns
    pub fn new(heads: Vec<String>) -> Self {
        Self {
            heads,
            ..Self::default()
        }
    }

    /// Add the output of one batch
    pub fn update<B: Backend>(&mut self, output: Output<B>) {
        let [batch_size, n_heads, n_classes] = output.output.dims();

        let predicted = to_id_rows(output.output.argmax(2).reshape([batch_size, n_heads]));
        let targets = to_id_rows(output.targets);

        self.record(&targets, &predicted, n_classes);
        self.add(output.loss.into_scalar().elem::<f64>(), batch_size);
    }

    /// Count the predictions of a batch, one row per item and one column per head
    pub fn record(&mut self, targets: &[Vec<usize>], predicted: &[Vec<usize>], n_classes: usize) {
        for (target_row, predicted_row) in targets.iter().zip(predicted) {
            for (head, (&target, &prediction)) in target_row.iter().zip(predicted_row).enumerate() {
                let n_classes = n_classes.max(target + 1).max(prediction + 1);
                let matrix = self.matrix(head, n_classes);

                matrix[target][prediction] += 1;

                self.predictions += 1;
                if target == prediction {
                    self.correct += 1;
                }
            }
        }
    }

    /// Add the mean loss of a batch of `items` samples
    pub fn add(&mut self, loss: f64, items: usize) {
        self.loss += loss * items as f64;
        self.items += items;
    }

    /// The confusion matrix of a head, grown to hold at least `n_classes`
    fn matrix(&mut self, head: usize, n_classes: usize) -> &mut Vec<Vec<usize>> {
        if self.confusion.len() <= head {
            self.confusion.resize_with(head + 1, Vec::new);
        }

        let matrix = &mut self.confusion[head];

        if matrix.len() < n_classes {
            for row in matrix.iter_mut() {
                row.resize(n_classes, 0);
            }
            matrix.resize_with(n_classes, || vec![0; n_classes]);
        }

        matrix
    }

    /// The metrics over every batch seen so far
    pub fn finish(self) -> Metrics {
        if self.items == 0 {
            return Metrics::default();
        }

        let heads = self
            .confusion
            .iter()
            .enumerate()
            .map(|(index, matrix)| {
                let name = self
                    .heads
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| format!("head_{}", index));

                HeadScores::from_confusion(&name, matrix)
            })
            .collect();

        let accuracy = if self.predictions == 0 {
            0.0
        } else {
            self.correct as f64 / self.predictions as f64
        };

        Metrics {
            loss: self.loss / self.items as f64,
            accuracy,
            items: self.items,
            heads,
        }
    }
}

/// A line of the metrics log: one per head of an evaluated split
#[derive(Serialize)]
struct Row<'a> {
    split: String,
    checkpoint: &'a str,
    head: &'a str,
    loss: f64,
    accuracy: f64,
    items: usize,
    precision: String,
    recall: String,
    f1: String,
    weighted_f1: f64,
}

/// Join per-class scores with spaces
fn join(scores: &[f64]) -> String {
    scores
        .iter()
        .map(|score| format!("{:.4}", score))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Append the rows of an evaluation to the CSV metrics log, writing the header when the file
/// is new. Each head gets a row with its own accuracy and per-class scores; loss and item
/// counts are those of the whole split.
pub fn append(path: &Path, split: Split, checkpoint: &Path, metrics: &Metrics) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let is_new = !path.exists();

    let file = fs::OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);

    let checkpoint = checkpoint.to_string_lossy();

    for head in &metrics.heads {
        writer.serialize(Row {
            split: split.to_string(),
            checkpoint: &checkpoint,
            head: &head.name,
            loss: metrics.loss,
            accuracy: head.accuracy,
            items: metrics.items,
            precision: join(&head.precision),
            recall: join(&head.recall),
            f1: join(&head.f1),
            weighted_f1: head.weighted_f1,
        })?;
    }

    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use burn::tensor::{Int, Tensor};
    use pretty_assertions::assert_eq;

    use crate::test_utils::TestBackend;

    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn weights_batch_losses_by_size() {
        let mut accumulator = Accumulator::new(vec!["sarcasm".to_string()]);

        accumulator.record(&[vec![0], vec![1]], &[vec![0], vec![1]], 2);
        accumulator.add(1.0, 2);
        accumulator.record(&[vec![1]], &[vec![0]], 2);
        accumulator.add(4.0, 1);

        let metrics = accumulator.finish();

        assert_eq!(metrics.items, 3);
        assert!(close(metrics.loss, 2.0));
        assert!(close(metrics.accuracy, 2.0 / 3.0));
    }

    #[test]
    fn scores_each_class_from_the_confusion_matrix() {
        // targets 0 0 1 1 1, predictions 0 1 1 1 0
        let scores = HeadScores::from_confusion("irony", &[vec![1, 1], vec![1, 2]]);

        assert_eq!(scores.name, "irony");
        assert_eq!(scores.support, vec![2, 3]);
        assert!(close(scores.accuracy, 0.6));
        assert!(close(scores.precision[0], 0.5));
        assert!(close(scores.recall[0], 0.5));
        assert!(close(scores.f1[0], 0.5));
        assert!(close(scores.precision[1], 2.0 / 3.0));
        assert!(close(scores.recall[1], 2.0 / 3.0));
        assert!(close(scores.f1[1], 2.0 / 3.0));
        assert!(close(scores.weighted_f1, 0.6));
    }

    #[test]
    fn scores_unpredicted_classes_as_zero() {
        let scores = HeadScores::from_confusion("satire", &[vec![3, 0], vec![1, 0]]);

        assert_eq!(scores.precision[1], 0.0);
        assert_eq!(scores.recall[1], 0.0);
        assert_eq!(scores.f1[1], 0.0);
        assert!(close(scores.precision[0], 0.75));
        assert!(close(scores.recall[0], 1.0));
        assert!(close(scores.weighted_f1, 0.75 * (2.0 * 0.75 / 1.75)));
    }

    #[test]
    fn counts_correct_heads() {
        let device = Default::default();
        let mut accumulator =
            Accumulator::new(vec!["sarcasm".to_string(), "irony".to_string()]);

        // Two samples, two heads, two classes
        let output = Output::new(
            Tensor::<TestBackend, 1>::from_floats([0.5], &device),
            Tensor::<TestBackend, 3>::from_floats(
                [[[0.9, 0.1], [0.2, 0.8]], [[0.3, 0.7], [0.6, 0.4]]],
                &device,
            ),
            Tensor::<TestBackend, 2, Int>::from_ints([[0, 1], [0, 0]], &device),
        );

        accumulator.update(output);

        let metrics = accumulator.finish();
        assert_eq!(metrics.items, 2);
        assert!(close(metrics.accuracy, 0.75));
        assert!((metrics.loss - 0.5).abs() < 1e-6);

        // sarcasm: targets 0 0, predicted 0 1
        let sarcasm = &metrics.heads[0];
        assert_eq!(sarcasm.name, "sarcasm");
        assert_eq!(sarcasm.support, vec![2, 0]);
        assert!(close(sarcasm.accuracy, 0.5));
        assert!(close(sarcasm.f1[0], 2.0 / 3.0));

        // irony: targets 1 0, predicted 1 0
        let irony = &metrics.heads[1];
        assert!(close(irony.weighted_f1, 1.0));
        assert!(close(metrics.weighted_f1(), (irony.weighted_f1 + sarcasm.weighted_f1) / 2.0));
    }

    #[test]
    fn appends_a_row_per_head_under_a_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rhetoric/metrics.csv");
        let metrics = Metrics {
            loss: 0.5,
            accuracy: 0.5,
            items: 4,
            heads: vec![HeadScores::from_confusion("irony", &[vec![1, 1], vec![1, 1]])],
        };

        append(&path, Split::Valid, Path::new("ckpt/model-1"), &metrics).unwrap();
        append(&path, Split::Test, Path::new("ckpt/model-1"), &metrics).unwrap();

        let contents = fs::read_to_string(&path).unwrap();

        assert_eq!(
            contents,
            "split,checkpoint,head,loss,accuracy,items,precision,recall,f1,weighted_f1\n\
             val,ckpt/model-1,irony,0.5,0.5,4,0.5000 0.5000,0.5000 0.5000,0.5000 0.5000,0.5\n\
             test,ckpt/model-1,irony,0.5,0.5,4,0.5000 0.5000,0.5000 0.5000,0.5000 0.5000,0.5\n"
        );
    }
}
