use std::sync::Arc;

use tokenizers::Tokenizer;

use crate::{
    config::Config,
    datasets::{rhetoric, DatasetError, LoadableDataset},
    utils::hugging_face,
};

use super::Split;

/// Everything the trainer needs to build data loaders
#[derive(Clone)]
pub struct DataModule {
    /// Training split
    pub train: Arc<rhetoric::Dataset>,

    /// Validation split
    pub val: Arc<rhetoric::Dataset>,

    /// Test split
    pub test: Arc<rhetoric::Dataset>,

    /// The pretrained model's tokenizer
    pub tokenizer: Tokenizer,

    /// Batch size
    pub batch_size: usize,

    /// Length of every tokenized sequence
    pub max_length: usize,

    /// Number of data loader workers
    pub num_workers: usize,

    /// Label columns of the training split, in header order
    pub label_columns: Vec<String>,
}

impl DataModule {
    /// Group already loaded splits, taking loader settings from the experiment config. Every
    /// label must be a class index below the configured `n_classes`.
    pub fn new(
        train: rhetoric::Dataset,
        val: rhetoric::Dataset,
        test: rhetoric::Dataset,
        tokenizer: Tokenizer,
        config: &Config,
    ) -> Result<Self, DatasetError> {
        for dataset in [&train, &val, &test] {
            dataset.check_classes(config.n_classes)?;
        }

        let label_columns = train.label_columns().to_vec();

        Ok(Self {
            train: Arc::new(train),
            val: Arc::new(val),
            test: Arc::new(test),
            tokenizer,
            batch_size: config.batch_size,
            max_length: config.max_length,
            num_workers: config.num_workers,
            label_columns,
        })
    }

    /// Load the three CSV splits and the tokenizer named by the experiment config
    pub async fn load(config: &Config) -> anyhow::Result<Self> {
        let headers = &config.multi_data_headers;
        let customized = &config.multi_customized_headers;

        let train = rhetoric::Dataset::load(&config.train_path(), headers, customized).await?;
        let val = rhetoric::Dataset::load(&config.val_path(), headers, customized).await?;
        let test = rhetoric::Dataset::load(&config.test_path(), headers, customized).await?;

        let tokenizer = hugging_face::load_tokenizer(&config.lm_model_path).await?;

        Ok(Self::new(train, val, test, tokenizer, config)?)
    }

    /// Log the size of every split
    pub fn setup(&self) {
        use burn::data::dataset::Dataset as _;

        log::info!("Train Dataset: {}", self.train.len());
        log::info!("Validation Dataset: {}", self.val.len());
        log::info!("Test Dataset: {}", self.test.len());
        log::info!("Label columns: {:?}", self.label_columns);
    }

    /// The dataset behind a split
    pub fn split(&self, split: Split) -> Arc<rhetoric::Dataset> {
        match split {
            Split::Train => self.train.clone(),
            Split::Valid => self.val.clone(),
            Split::Test => self.test.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::tokenizer;

    use super::*;

    fn dataset(csv: &str) -> rhetoric::Dataset {
        let headers = vec!["tweet".to_string(), "sarcasm".to_string()];

        rhetoric::Dataset::from_reader(csv.as_bytes(), &headers, &headers).unwrap()
    }

    #[test]
    fn rejects_labels_beyond_the_configured_classes() {
        let config = Config::new().with_n_classes(2);
        let valid = "tweet,sarcasm\noh great,1\nsure,0\n";
        let invalid = "tweet,sarcasm\noh great,1\nsure,3\n";

        let result = DataModule::new(
            dataset(valid),
            dataset(valid),
            dataset(invalid),
            tokenizer(),
            &config,
        );

        assert!(matches!(
            result,
            Err(DatasetError::InvalidLabel { row: 2, ref column, .. }) if column == "sarcasm"
        ));

        let data = DataModule::new(
            dataset(valid),
            dataset(valid),
            dataset(valid),
            tokenizer(),
            &config.with_n_classes(4),
        )
        .unwrap();

        assert_eq!(data.label_columns, vec!["sarcasm".to_string()]);
    }
}
