//! Flat-directory artifact store
//!
//! Every story gets a fresh UUID v4 and two files named after it:
//! `{dir}/{id}.md` and `{dir}/{id}.{audio extension}`. Paths are fixed at
//! allocation time; nothing is indexed or cleaned up.

use crate::types::StoryArtifact;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    audio_extension: &'static str,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, audio_extension: &'static str) -> Self {
        Self {
            dir: dir.into(),
            audio_extension,
        }
    }

    /// New identifier with its artifact paths
    pub fn allocate(&self) -> StoryArtifact {
        let id = Uuid::new_v4();
        StoryArtifact {
            id,
            markdown_path: self.markdown_path(id),
            audio_path: self.audio_path(id),
        }
    }

    pub fn markdown_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.md", id))
    }

    pub fn audio_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}", id, self.audio_extension))
    }

    /// Create the output directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::CreateDir {
                path: self.dir.clone(),
                source,
            })
    }

    pub async fn write_text(&self, artifact: &StoryArtifact, text: &str) -> Result<PathBuf, StoreError> {
        self.write(&artifact.markdown_path, text.as_bytes()).await?;
        Ok(artifact.markdown_path.clone())
    }

    pub async fn write_audio(&self, artifact: &StoryArtifact, audio: &[u8]) -> Result<PathBuf, StoreError> {
        self.write(&artifact.audio_path, audio).await?;
        Ok(artifact.audio_path.clone())
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        self.ensure_dir().await?;
        tokio::fs::write(path, contents)
            .await
            .map_err(|source| StoreError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), bytes = contents.len(), "Artifact written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_follow_identifier() {
        let store = ArtifactStore::new("/srv/out", "wav");
        let artifact = store.allocate();
        let id = artifact.id.to_string();

        assert_eq!(artifact.markdown_path, PathBuf::from(format!("/srv/out/{}.md", id)));
        assert_eq!(artifact.audio_path, PathBuf::from(format!("/srv/out/{}.wav", id)));
        assert_eq!(store.audio_path(artifact.id), artifact.audio_path);
    }

    #[test]
    fn test_remote_extension() {
        let store = ArtifactStore::new("/srv/out", "mp3");
        assert!(store.allocate().audio_path.to_string_lossy().ends_with(".mp3"));
    }

    #[test]
    fn test_allocations_are_unique() {
        let store = ArtifactStore::new("/srv/out", "wav");
        assert_ne!(store.allocate().id, store.allocate().id);
    }

    #[tokio::test]
    async fn test_write_creates_missing_directory() {
        let root = TempDir::new().unwrap();
        let store = ArtifactStore::new(root.path().join("nested").join("out"), "wav");
        let artifact = store.allocate();

        let md = store.write_text(&artifact, "# Story").await.unwrap();
        let audio = store.write_audio(&artifact, b"RIFF").await.unwrap();

        assert_eq!(std::fs::read_to_string(md).unwrap(), "# Story");
        assert_eq!(std::fs::read(audio).unwrap(), b"RIFF");
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_error() {
        let root = TempDir::new().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, "not a dir").unwrap();

        let store = ArtifactStore::new(blocker.join("out"), "wav");
        let err = store.write_text(&store.allocate(), "x").await.unwrap_err();
        assert!(matches!(err, StoreError::CreateDir { .. }));
    }
}
