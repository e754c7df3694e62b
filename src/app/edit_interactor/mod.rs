// Edit interactor - Accepts edit requests and schedules render tasks

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::app::registry::TaskRegistry;
use crate::app::render_pipeline::{RenderJob, RenderPipeline};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

/// Submission and status surface for edit tasks
pub struct EditInteractor {
    registry: TaskRegistry,
    pipeline: Arc<RenderPipeline>,
    probe: Arc<dyn ProbePort>,
    store: Arc<dyn ArtifactStore>,
    videos_dir: PathBuf,
    processed_dir: PathBuf,
    reject_overlaps: bool,
    permits: Arc<Semaphore>,
}

impl EditInteractor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: TaskRegistry,
        pipeline: Arc<RenderPipeline>,
        probe: Arc<dyn ProbePort>,
        store: Arc<dyn ArtifactStore>,
        videos_dir: PathBuf,
        processed_dir: PathBuf,
        reject_overlaps: bool,
        max_concurrent_tasks: usize,
    ) -> Self {
        Self {
            registry,
            pipeline,
            probe,
            store,
            videos_dir,
            processed_dir,
            reject_overlaps,
            permits: Arc::new(Semaphore::new(max_concurrent_tasks.max(1))),
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Validate `request`, register a `queued` task and start it in the background.
    ///
    /// Returns as soon as the task exists. Invalid input and a missing source
    /// file are rejected here, before any task is created.
    pub async fn submit(&self, request: ProcessRequest) -> Result<TaskId, DomainError> {
        request.validate()?;

        if self.reject_overlaps {
            if let Some(overlap) = IntervalNormalizer::find_overlaps(&request.segments).first() {
                return Err(DomainError::InvalidInput(format!(
                    "Segments overlap: [{}, {}) and [{}, {})",
                    overlap.first.start, overlap.first.end, overlap.second.start, overlap.second.end
                )));
            }
        }

        let source = self.source_path(&request.filename);
        if !self.store.file_exists(&source).await? {
            return Err(DomainError::NotFound(format!(
                "Video file not found: {}",
                request.filename
            )));
        }

        let output_filename = ArtifactNaming::output_filename(&request.filename, &Local::now());
        let job = RenderJob {
            source,
            output: self.processed_dir.join(&output_filename),
            segments: request.segments,
        };

        let task = self.registry.create(request.filename, output_filename);
        let task_id = task.id();
        info!(task_id = %task_id, segments = job.segments.len(), "Task accepted");

        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);
        let handle = tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    task.fail(&DomainError::Internal("Task scheduler closed".to_string()));
                    return;
                }
            };
            pipeline.run(task, job).await;
        });
        self.registry.attach(&task_id, handle);

        Ok(task_id)
    }

    /// Current record for `task_id`
    pub fn status(&self, task_id: &TaskId) -> Result<TaskSnapshot, DomainError> {
        self.registry.status(task_id)
    }

    /// Abort `task_id`; artifacts already written are left in place
    pub fn cancel(&self, task_id: &TaskId) -> Result<TaskSnapshot, DomainError> {
        let snapshot = self.registry.cancel(task_id)?;
        if snapshot.error_code != Some(ErrorCode::Cancelled) {
            warn!(task_id = %task_id, status = %snapshot.status, "Cancel requested for finished task");
        }
        Ok(snapshot)
    }

    /// Probe a file directly, without creating a task
    pub async fn inspect(&self, path: &Path) -> Result<MediaInfo, DomainError> {
        if !self.store.file_exists(path).await? {
            return Err(DomainError::NotFound(format!(
                "Video file not found: {}",
                path.display()
            )));
        }
        self.probe.probe(path).await
    }

    /// Video files in the videos directory with their metadata, sorted by name.
    ///
    /// A file that cannot be analyzed is still listed, with empty metadata.
    pub async fn list_videos(&self) -> Result<Vec<VideoEntry>, DomainError> {
        let mut entries = Vec::new();
        for path in self.store.list_files(&self.videos_dir).await? {
            let filename = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            if !VideoCatalog::is_video_file(&filename) {
                continue;
            }

            let media = match self.probe.probe(&path).await {
                Ok(media) => media,
                Err(err) => {
                    warn!(file = %filename, code = %err.code(), "Analysis failed, listing without metadata: {}", err);
                    MediaInfo::default()
                }
            };
            entries.push(VideoEntry {
                filename,
                size: VideoCatalog::format_file_size(media.size),
                duration: media.duration,
                width: media.width,
                height: media.height,
            });
        }

        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        info!(videos = entries.len(), dir = %self.videos_dir.display(), "Videos listed");
        Ok(entries)
    }

    fn source_path(&self, filename: &str) -> PathBuf {
        self.videos_dir.join(filename)
    }
}
