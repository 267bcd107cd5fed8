use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::{fs, io};

/// File name of the best checkpoint record within an artifact directory
pub static BEST_MODEL_FILE: &str = "b_model_path.json";

/// The persisted pointer to the best checkpoint of a training run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestModel {
    /// Path to the checkpoint with the lowest validation loss
    pub best_model_path: String,
}

impl BestModel {
    /// Wrap a checkpoint path
    pub fn new(path: &Path) -> Self {
        Self {
            best_model_path: path.to_string_lossy().into_owned(),
        }
    }

    /// The checkpoint path
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.best_model_path)
    }
}

/// Serialize `data` as JSON to `path`, creating parent directories as needed
pub async fn write_json<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let contents = serde_json::to_vec_pretty(data)?;

    fs::write(path, contents).await
}

/// Read a JSON document from `path`
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> io::Result<T> {
    let contents = fs::read(path).await?;

    Ok(serde_json::from_slice(&contents)?)
}
