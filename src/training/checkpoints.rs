use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Name of the checkpoint directory the learner writes within an artifact directory
pub static CHECKPOINT_DIR: &str = "checkpoint";

/// Prefix of model checkpoint files
static MODEL_PREFIX: &str = "model-";

/// Extension the compact recorder gives its files
static EXTENSION: &str = ".mpk";

/// A model checkpoint saved at the end of an epoch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    /// The epoch it was saved after
    pub epoch: usize,

    /// The recorder path, without extension
    pub path: PathBuf,
}

/// List the model checkpoints retained under `{artifact_dir}/checkpoint`, oldest first.
/// Optimizer and scheduler records are skipped.
pub fn list(artifact_dir: &Path) -> io::Result<Vec<Checkpoint>> {
    let dir = artifact_dir.join(CHECKPOINT_DIR);

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut checkpoints = Vec::new();

    for entry in fs::read_dir(&dir)? {
        let name = entry?.file_name();

        if let Some(epoch) = parse_epoch(&name.to_string_lossy()) {
            checkpoints.push(Checkpoint {
                epoch,
                path: dir.join(format!("{}{}", MODEL_PREFIX, epoch)),
            });
        }
    }

    checkpoints.sort_by_key(|checkpoint| checkpoint.epoch);

    Ok(checkpoints)
}

/// Remove the checkpoint directory of an earlier run, if there is one
pub fn clear(artifact_dir: &Path) -> io::Result<()> {
    let dir = artifact_dir.join(CHECKPOINT_DIR);

    if dir.exists() {
        fs::remove_dir_all(&dir)?;
    }

    Ok(())
}

fn parse_epoch(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix(MODEL_PREFIX)?
        .strip_suffix(EXTENSION)?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lists_model_checkpoints_by_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint_dir = dir.path().join(CHECKPOINT_DIR);
        fs::create_dir_all(&checkpoint_dir).unwrap();

        for name in [
            "model-10.mpk",
            "model-2.mpk",
            "optim-2.mpk",
            "scheduler-2.mpk",
            "model-x.mpk",
        ] {
            fs::write(checkpoint_dir.join(name), b"").unwrap();
        }

        let checkpoints = list(dir.path()).unwrap();

        assert_eq!(
            checkpoints,
            vec![
                Checkpoint {
                    epoch: 2,
                    path: checkpoint_dir.join("model-2"),
                },
                Checkpoint {
                    epoch: 10,
                    path: checkpoint_dir.join("model-10"),
                },
            ]
        );
    }

    #[test]
    fn clears_checkpoints_of_an_earlier_run() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint_dir = dir.path().join(CHECKPOINT_DIR);
        fs::create_dir_all(&checkpoint_dir).unwrap();
        fs::write(checkpoint_dir.join("model-7.mpk"), b"").unwrap();
        fs::write(dir.path().join("experiment.json"), b"{}").unwrap();

        clear(dir.path()).unwrap();

        assert!(list(dir.path()).unwrap().is_empty());
        assert!(dir.path().join("experiment.json").exists());

        // Nothing to clear on a first run
        clear(dir.path()).unwrap();
    }

    #[test]
    fn has_no_checkpoints_before_training() {
        let dir = tempfile::tempdir().unwrap();

        assert!(list(dir.path()).unwrap().is_empty());
    }
}
