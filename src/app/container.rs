use std::sync::Arc;

use crate::adapters::{AppConfig, FFmpegAdapter, FFprobeAdapter, LocalArtifactStore};
use crate::app::edit_interactor::EditInteractor;
use crate::app::registry::TaskRegistry;
use crate::app::render_pipeline::{PipelineSettings, RenderPipeline};
use crate::ports::{ArtifactStore, ConcatPort, EncodePort, ProbePort};

pub trait AppContainer: Send + Sync {
    fn edit_interactor(&self) -> Arc<EditInteractor>;
    fn registry(&self) -> TaskRegistry;
}

/// Wires the ffmpeg/ffprobe adapters and the local filesystem into the app layer
pub struct DefaultAppContainer {
    registry: TaskRegistry,
    edit_interactor: Arc<EditInteractor>,
}

impl DefaultAppContainer {
    pub fn new(config: &AppConfig) -> Self {
        let probe_port = Arc::new(FFprobeAdapter::new(config.encoder.ffprobe_path.clone()));
        let ffmpeg = Arc::new(FFmpegAdapter::new(config.encoder.ffmpeg_path.clone()));
        let store = Arc::new(LocalArtifactStore::new());

        Self::with_ports(
            config,
            probe_port,
            Arc::clone(&ffmpeg) as Arc<dyn EncodePort>,
            ffmpeg as Arc<dyn ConcatPort>,
            store,
        )
    }

    /// Build the app layer over arbitrary port implementations
    pub fn with_ports(
        config: &AppConfig,
        probe_port: Arc<dyn ProbePort>,
        encode_port: Arc<dyn EncodePort>,
        concat_port: Arc<dyn ConcatPort>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        let registry = TaskRegistry::new();

        let pipeline = Arc::new(RenderPipeline::new(
            Arc::clone(&probe_port),
            encode_port,
            concat_port,
            Arc::clone(&store),
            PipelineSettings {
                temp_dir: config.paths.temp_dir.clone(),
                encoder: config.encoder.settings(),
                cleanup_on_error: config.pipeline.cleanup_on_error,
            },
        ));

        let edit_interactor = Arc::new(EditInteractor::new(
            registry.clone(),
            pipeline,
            probe_port,
            store,
            config.paths.videos_dir.clone(),
            config.paths.processed_dir.clone(),
            config.pipeline.reject_overlaps,
            config.pipeline.max_concurrent_tasks,
        ));

        Self {
            registry,
            edit_interactor,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn edit_interactor(&self) -> Arc<EditInteractor> {
        Arc::clone(&self.edit_interactor)
    }

    fn registry(&self) -> TaskRegistry {
        self.registry.clone()
    }
}
