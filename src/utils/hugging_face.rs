use std::path::{Path, PathBuf};

use hf_hub::api::tokio::Api;
use tokenizers::Tokenizer;

/// Resolve a file belonging to a pretrained model. `model` is either a local directory or a
/// Hugging Face Hub model id; Hub files are cached and not downloaded again.
// NOTE: Uses the async Hub client to work within an already-async context
pub async fn resolve_file(model: &str, filename: &str) -> anyhow::Result<PathBuf> {
    let local = Path::new(model).join(filename);

    if local.exists() {
        return Ok(local);
    }

    let api = Api::new().map_err(|e| anyhow!("Unable to reach the Hugging Face Hub: {}", e))?;

    api.model(model.to_string())
        .get(filename)
        .await
        .map_err(|e| anyhow!("Failed to download {} for {}: {}", filename, model, e))
}

/// Load the tokenizer of a pretrained model
pub async fn load_tokenizer(model: &str) -> anyhow::Result<Tokenizer> {
    let path = resolve_file(model, "tokenizer.json").await?;

    Tokenizer::from_file(&path)
        .map_err(|e| anyhow!("Unable to load tokenizer {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prefers_local_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();

        let model = dir.path().to_string_lossy().into_owned();
        let path = resolve_file(&model, "config.json").await.unwrap();

        assert_eq!(path, dir.path().join("config.json"));
    }
}
