// Application layer - Use case interactors

pub mod container;
pub mod edit_interactor;
pub mod registry;
pub mod render_pipeline;

// Re-export interactors
pub use edit_interactor::EditInteractor;
pub use registry::{TaskHandle, TaskRegistry};
pub use render_pipeline::{Concatenator, PipelineSettings, RenderJob, RenderPipeline};
