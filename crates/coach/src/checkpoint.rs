//! Versioned network snapshots.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::error::{CoachError, Result};

/// Name of a snapshot: `iteration-NNNN` or `iteration-best`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckpointTag {
    Iteration(u32),
    Best,
}

impl fmt::Display for CheckpointTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointTag::Iteration(iteration) => write!(f, "iteration-{iteration:04}"),
            CheckpointTag::Best => write!(f, "iteration-best"),
        }
    }
}

/// Implemented by the network collaborator to persist its weights.
pub trait Checkpointed {
    fn save_checkpoint(&self, path: &Path) -> anyhow::Result<()>;

    fn load_checkpoint(&mut self, path: &Path) -> anyhow::Result<()>;
}

/// Maps tags to files under one directory. Saving a tag overwrites it.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, tag: CheckpointTag) -> PathBuf {
        self.dir.join(format!("{tag}.ckpt"))
    }

    pub fn exists(&self, tag: CheckpointTag) -> bool {
        self.path_for(tag).is_file()
    }

    pub fn save<N: Checkpointed + ?Sized>(&self, network: &N, tag: CheckpointTag) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(tag);
        network.save_checkpoint(&path).map_err(CoachError::Collaborator)?;
        debug!(%tag, path = %path.display(), "checkpoint saved");
        Ok(path)
    }

    pub fn load<N: Checkpointed + ?Sized>(&self, network: &mut N, tag: CheckpointTag) -> Result<()> {
        let path = self.path_for(tag);
        network.load_checkpoint(&path).map_err(CoachError::Collaborator)?;
        debug!(%tag, path = %path.display(), "checkpoint loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedNetwork;

    #[test]
    fn test_tag_names() {
        assert_eq!(CheckpointTag::Iteration(7).to_string(), "iteration-0007");
        assert_eq!(CheckpointTag::Iteration(12345).to_string(), "iteration-12345");
        assert_eq!(CheckpointTag::Best.to_string(), "iteration-best");
    }

    #[test]
    fn test_save_overwrites_and_load_restores() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoints"));

        let network = ScriptedNetwork::with_version(3);
        let path = store.save(&network, CheckpointTag::Best).unwrap();
        assert!(path.ends_with("iteration-best.ckpt"));
        assert!(store.exists(CheckpointTag::Best));
        assert!(!store.exists(CheckpointTag::Iteration(1)));

        store.save(&ScriptedNetwork::with_version(5), CheckpointTag::Best).unwrap();

        let mut restored = ScriptedNetwork::with_version(0);
        store.load(&mut restored, CheckpointTag::Best).unwrap();
        assert_eq!(restored.version(), 5);
    }

    #[test]
    fn test_loading_missing_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let mut network = ScriptedNetwork::with_version(0);
        assert!(matches!(
            store.load(&mut network, CheckpointTag::Iteration(2)),
            Err(CoachError::Collaborator(_))
        ));
    }
}
