use std::path::PathBuf;

use burn::LearningRate;

use crate::utils::files;

/// Define configuration struct for the experiment
///
/// Built once when the process starts and passed down to everything that needs it.
#[derive(burn::config::Config)]
pub struct Config {
    /// Hugging Face model id or local directory of the pretrained language model
    #[config(default = "\"bert-base-uncased\".to_string()")]
    pub lm_model_path: String,

    /// Start from the pretrained model's weights (`model.safetensors`, BERT checkpoints only)
    /// rather than a random initialization
    #[config(default = true)]
    pub load_pretrained: bool,

    /// Directory for CSV metric logs
    #[config(default = "\"logs\".to_string()")]
    pub csv_logger_path: String,

    /// Name of the experiment, used to namespace artifacts and logs
    #[config(default = "\"rhetoric\".to_string()")]
    pub model_name: String,

    /// Pipeline to run (e.g., "multi-label")
    #[config(default = "\"multi-label\".to_string()")]
    pub pipeline: String,

    /// Directory holding the processed CSV files
    #[config(default = "\"data/processed\".to_string()")]
    pub processed_data_dir: String,

    /// Training split file name
    #[config(default = "\"train.csv\".to_string()")]
    pub train_file: String,

    /// Validation split file name
    #[config(default = "\"val.csv\".to_string()")]
    pub val_file: String,

    /// Test split file name
    #[config(default = "\"test.csv\".to_string()")]
    pub test_file: String,

    /// Raw CSV headers to read, text column first
    #[config(default = "default_data_headers()")]
    pub multi_data_headers: Vec<String>,

    /// Names given to the columns read from `multi_data_headers`, in the same order
    #[config(default = "default_customized_headers()")]
    pub multi_customized_headers: Vec<String>,

    /// Label column used by the single-head text classification pipeline
    #[config(default = "None")]
    pub label_column: Option<String>,

    /// Number of classes per label column
    #[config(default = 2)]
    pub n_classes: usize,

    /// Maximum sequence length
    #[config(default = 128)]
    pub max_length: usize,

    /// Batch size
    #[config(default = 32)]
    pub batch_size: usize,

    /// Number of data loader workers
    #[config(default = 4)]
    pub num_workers: usize,

    /// Number of epochs
    #[config(default = 10)]
    pub n_epochs: usize,

    /// Number of recent checkpoints to keep alongside the best one
    #[config(default = 2)]
    pub save_top_k: usize,

    /// Epochs without validation loss improvement before stopping
    #[config(default = 5)]
    pub patience: usize,

    /// Directory to save model artifacts in
    #[config(default = "\"assets/saved_models\".to_string()")]
    pub saved_model_path: String,

    /// Initial learning rate
    #[config(default = 2e-5)]
    pub learning_rate: LearningRate,

    /// Adam epsilon
    #[config(default = 1e-8)]
    pub adam_epsilon: f32,

    /// Dropout rate
    #[config(default = 0.1)]
    pub dropout: f64,

    /// Seed for data shuffling
    #[config(default = 42)]
    pub seed: u64,

    /// Render training progress with the terminal UI
    #[config(default = true)]
    pub use_tui: bool,
}

fn default_data_headers() -> Vec<String> {
    [
        "tweet",
        "sarcasm",
        "irony",
        "satire",
        "understatement",
        "overstatement",
        "rhetorical_question",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_customized_headers() -> Vec<String> {
    [
        "tweets",
        "sarcasm",
        "irony",
        "satire",
        "understatement",
        "overstatement",
        "rhetorical_question",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Config {
    /// Path of the training split
    pub fn train_path(&self) -> PathBuf {
        PathBuf::from(&self.processed_data_dir).join(&self.train_file)
    }

    /// Path of the validation split
    pub fn val_path(&self) -> PathBuf {
        PathBuf::from(&self.processed_data_dir).join(&self.val_file)
    }

    /// Path of the test split
    pub fn test_path(&self) -> PathBuf {
        PathBuf::from(&self.processed_data_dir).join(&self.test_file)
    }

    /// Directory where the learner stores checkpoints and the trained model config
    pub fn artifact_dir(&self) -> PathBuf {
        PathBuf::from(&self.saved_model_path).join(&self.model_name)
    }

    /// Location of the JSON record holding the best checkpoint path
    pub fn best_model_record(&self) -> PathBuf {
        self.artifact_dir().join(files::BEST_MODEL_FILE)
    }

    /// Location of the CSV metrics log
    pub fn metrics_log(&self) -> PathBuf {
        PathBuf::from(&self.csv_logger_path)
            .join(&self.model_name)
            .join("metrics.csv")
    }
}

#[cfg(test)]
mod tests {
    use burn::config::Config as _;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn derives_paths_from_directories() {
        let config = Config::new()
            .with_processed_data_dir("data".to_string())
            .with_saved_model_path("out".to_string())
            .with_model_name("t5".to_string());

        assert_eq!(config.train_path(), PathBuf::from("data/train.csv"));
        assert_eq!(config.test_path(), PathBuf::from("data/test.csv"));
        assert_eq!(
            config.best_model_record(),
            PathBuf::from("out/t5/b_model_path.json")
        );
    }

    #[test]
    fn saves_and_loads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        Config::new().with_batch_size(8).save(&path).unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.batch_size, 8);
        assert_eq!(config.patience, 5);
        assert_eq!(config.multi_customized_headers[0], "tweets");
    }
}
