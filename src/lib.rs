//! speedtrim video speed/trim compiler library
//!
//! Turns a list of marked spans (retime or cut) into an ordered set of render
//! ranges, encodes each range with an external ffmpeg, and joins the results
//! into one output file. Work runs as background tasks whose progress can be
//! polled through a shared registry.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use app::container::{AppContainer, DefaultAppContainer};
pub use app::{EditInteractor, TaskRegistry};
pub use domain::errors::{DomainError, ErrorCode};
pub use domain::model::{
    MediaInfo, ProcessRequest, RenderRange, Segment, SegmentAction, TaskId, TaskSnapshot,
    TaskStatus, VideoEntry,
};
pub use error::{SpeedTrimError, SpeedTrimResult};
