// Render pipeline - Drives one task from analysis to the joined output

mod concat;

pub use concat::Concatenator;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::app::registry::TaskHandle;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

/// Per-pipeline settings fixed at construction
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub temp_dir: PathBuf,
    pub encoder: EncoderSettings,
    pub cleanup_on_error: bool,
}

/// Work item for one accepted request
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub source: PathBuf,
    pub segments: Vec<Segment>,
    pub output: PathBuf,
}

/// Sequential analyze, encode, join and cleanup stages for a single task
pub struct RenderPipeline {
    probe: Arc<dyn ProbePort>,
    encoder: Arc<dyn EncodePort>,
    store: Arc<dyn ArtifactStore>,
    concatenator: Concatenator,
    settings: PipelineSettings,
}

impl RenderPipeline {
    pub fn new(
        probe: Arc<dyn ProbePort>,
        encoder: Arc<dyn EncodePort>,
        concat: Arc<dyn ConcatPort>,
        store: Arc<dyn ArtifactStore>,
        settings: PipelineSettings,
    ) -> Self {
        let concatenator = Concatenator::new(Arc::clone(&store), concat);
        Self {
            probe,
            encoder,
            store,
            concatenator,
            settings,
        }
    }

    /// Run every stage for `job`, recording the outcome through `task`.
    ///
    /// Never returns an error: failures end up on the task record.
    pub async fn run(&self, task: TaskHandle, job: RenderJob) {
        let task_id = task.id();
        let manifest = ArtifactNaming::manifest(&self.settings.temp_dir, &task_id);
        let mut artifacts = Vec::new();

        info!(task_id = %task_id, source = %job.source.display(), "Task started");

        match self.execute(&task, &job, &manifest, &mut artifacts).await {
            Ok(()) => {
                info!(task_id = %task_id, output = %job.output.display(), "Task completed");
            }
            Err(err) => {
                error!(task_id = %task_id, code = %err.code(), "Task failed: {}", err);
                task.fail(&err);
                if self.settings.cleanup_on_error {
                    if let Err(cleanup_err) = self.remove_artifacts(&artifacts, &manifest).await {
                        warn!(task_id = %task_id, "Cleanup after failure incomplete: {}", cleanup_err);
                    }
                }
            }
        }
    }

    async fn execute(
        &self,
        task: &TaskHandle,
        job: &RenderJob,
        manifest: &Path,
        artifacts: &mut Vec<PathBuf>,
    ) -> Result<(), DomainError> {
        let task_id = task.id();

        task.advance(TaskStatus::Analyzing, ProgressSchedule::ANALYZING);
        let media = self.analyze(task, &job.source).await?;

        task.advance(TaskStatus::Processing, ProgressSchedule::PROCESSING);
        let ranges = IntervalNormalizer::normalize(&job.segments, media.duration);
        info!(task_id = %task_id, ranges = ranges.len(), duration = media.duration, "Timeline normalized");

        self.store.create_directory(&self.settings.temp_dir).await?;

        let total = ranges.len();
        for (index, range) in ranges.iter().enumerate() {
            task.advance(
                TaskStatus::ProcessingSegment(index + 1),
                ProgressSchedule::segment(index, total),
            );

            let output = ArtifactNaming::segment_artifact(&self.settings.temp_dir, &task_id, index);
            let (encode_job, warning) = EncodePlanner::plan(
                index,
                range,
                &job.source,
                output.clone(),
                media.has_audio,
                &self.settings.encoder,
            );
            if let Some(warning) = warning {
                warn!(task_id = %task_id, range = index, "{}", warning);
                task.warn(warning);
            }

            // Tracked before the encode so a partial write is still known
            artifacts.push(output);
            let artifact = self.encoder.encode(&encode_job).await?;
            if let Some(last) = artifacts.last_mut() {
                *last = artifact;
            }
        }

        task.advance(TaskStatus::Concatenating, ProgressSchedule::CONCATENATING);
        if let Some(parent) = job.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.store.create_directory(parent).await?;
        }
        self.concatenator
            .join(artifacts, media.has_audio, manifest, &job.output)
            .await?;

        task.advance(TaskStatus::Cleanup, ProgressSchedule::CONCATENATED);
        self.remove_artifacts(artifacts, manifest).await?;

        let output_filename = job
            .output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        task.complete(&output_filename);
        Ok(())
    }

    /// Probe the source, degrading to empty metadata on probe failures
    async fn analyze(&self, task: &TaskHandle, source: &Path) -> Result<MediaInfo, DomainError> {
        match self.probe.probe(source).await {
            Ok(info) => {
                info!(
                    task_id = %task.id(),
                    duration = info.duration,
                    width = info.width,
                    height = info.height,
                    has_audio = info.has_audio,
                    "Source analyzed"
                );
                Ok(info)
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(task_id = %task.id(), code = %err.code(), "Probe failed, continuing without metadata: {}", err);
                task.warn(format!("Video analysis failed: {}", err));
                Ok(MediaInfo::default())
            }
        }
    }

    async fn remove_artifacts(&self, artifacts: &[PathBuf], manifest: &Path) -> Result<(), DomainError> {
        for artifact in artifacts {
            self.store.delete_file(artifact).await?;
        }
        self.store.delete_file(manifest).await
    }
}
