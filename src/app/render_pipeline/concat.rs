// Concatenation stage - Manifest assembly ahead of the stream-copy join

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::errors::*;
use crate::ports::*;

/// Writes the concat manifest and hands it to the join engine
pub struct Concatenator {
    store: Arc<dyn ArtifactStore>,
    engine: Arc<dyn ConcatPort>,
}

impl Concatenator {
    pub fn new(store: Arc<dyn ArtifactStore>, engine: Arc<dyn ConcatPort>) -> Self {
        Self { store, engine }
    }

    /// Manifest text: one `file '<path>'` line per artifact, in order
    pub fn manifest_content(artifacts: &[PathBuf]) -> String {
        artifacts
            .iter()
            .map(|path| {
                let quoted = path.to_string_lossy().replace('\'', r"'\''");
                format!("file '{}'\n", quoted)
            })
            .collect()
    }

    /// Join `artifacts` into `output` through a manifest at `manifest`.
    ///
    /// Every artifact must exist; the first missing one fails the join
    /// before the engine runs.
    pub async fn join(
        &self,
        artifacts: &[PathBuf],
        has_audio: bool,
        manifest: &Path,
        output: &Path,
    ) -> Result<(), DomainError> {
        if artifacts.is_empty() {
            return Err(DomainError::ConcatFailed(
                "No rendered ranges to join".to_string(),
            ));
        }

        let mut resolved = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            if !self.store.file_exists(artifact).await? {
                return Err(DomainError::ConcatFailed(format!(
                    "Missing artifact: {}",
                    artifact.display()
                )));
            }
            resolved.push(self.store.resolve_path(artifact).await?);
        }

        self.store
            .write_text(manifest, &Self::manifest_content(&resolved))
            .await?;
        debug!(manifest = %manifest.display(), entries = resolved.len(), "Concat manifest written");

        self.engine.concat(manifest, has_audio, output).await?;
        info!(output = %output.display(), "Ranges joined");
        Ok(())
    }
}
