// Local filesystem adapter - Working directories and temporary artifacts

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::domain::errors::*;
use crate::ports::*;

/// Filesystem adapter backed by `tokio::fs`
#[derive(Debug, Default, Clone)]
pub struct LocalArtifactStore;

impl LocalArtifactStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn file_exists(&self, path: &Path) -> Result<bool, DomainError> {
        match fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DomainError::Io(format!(
                "Failed to stat {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn create_directory(&self, path: &Path) -> Result<(), DomainError> {
        fs::create_dir_all(path).await.map_err(|e| {
            DomainError::Io(format!(
                "Failed to create directory {}: {}",
                path.display(),
                e
            ))
        })
    }

    async fn write_text(&self, path: &Path, content: &str) -> Result<(), DomainError> {
        fs::write(path, content).await.map_err(|e| {
            DomainError::Io(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, DomainError> {
        let read_err =
            |e: std::io::Error| DomainError::Io(format!("Failed to read {}: {}", dir.display(), e));

        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_err(e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            if entry.file_type().await.map_err(read_err)?.is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }

    async fn delete_file(&self, path: &Path) -> Result<(), DomainError> {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Io(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn resolve_path(&self, path: &Path) -> Result<PathBuf, DomainError> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        let cwd = std::env::current_dir()
            .map_err(|e| DomainError::Io(format!("Failed to read working directory: {}", e)))?;
        Ok(cwd.join(path))
    }
}
