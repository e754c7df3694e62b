// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe duration, dimensions, frame rate and audio presence.
    ///
    /// Returns `DomainError::NoVideoStream` when the file has no video
    /// stream, distinct from `ProbeFailed` for engine or parse failures.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, DomainError>;
}

/// Port for per-range encoding
#[async_trait]
pub trait EncodePort: Send + Sync {
    /// Encode one render range, returning the artifact path.
    ///
    /// Failures carry the engine's diagnostic text verbatim.
    async fn encode(&self, job: &EncodeJob) -> Result<PathBuf, DomainError>;
}

/// Port for the stream-copy join
#[async_trait]
pub trait ConcatPort: Send + Sync {
    /// Join the artifacts listed in `manifest`, in listed order, into `output`
    /// without re-encoding. Video only when `has_audio` is false.
    async fn concat(
        &self,
        manifest: &Path,
        has_audio: bool,
        output: &Path,
    ) -> Result<(), DomainError>;
}

/// Port for the working directories and temporary artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Check if file exists
    async fn file_exists(&self, path: &Path) -> Result<bool, DomainError>;

    /// Create directory (including parent directories)
    async fn create_directory(&self, path: &Path) -> Result<(), DomainError>;

    /// Write a text file, replacing any existing content
    async fn write_text(&self, path: &Path, content: &str) -> Result<(), DomainError>;

    /// Regular files directly inside `dir`; a missing directory lists as empty
    async fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, DomainError>;

    /// Delete file; deleting a missing file is not an error
    async fn delete_file(&self, path: &Path) -> Result<(), DomainError>;

    /// Resolve relative path to absolute path
    async fn resolve_path(&self, path: &Path) -> Result<PathBuf, DomainError>;
}
