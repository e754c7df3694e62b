//! Command-line argument definitions

use std::path::PathBuf;

use clap::{ArgGroup, Args};

/// Arguments for the render command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("segment_source").required(true).args(["segments", "segments_file"])))]
pub struct RenderArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Segments as a JSON array, e.g. '[{"start":2,"end":4,"speed":3}]'
    #[arg(short, long)]
    pub segments: Option<String>,

    /// Read the segments JSON array from a file
    #[arg(long)]
    pub segments_file: Option<PathBuf>,

    /// Directory for the finished output
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Tasks allowed to run at once
    #[arg(long)]
    pub max_tasks: Option<usize>,

    /// Remove temporary artifacts when the task fails
    #[arg(long)]
    pub cleanup_on_error: bool,

    /// Accept overlapping segments instead of rejecting them
    #[arg(long)]
    pub allow_overlaps: bool,

    /// Status polling interval in milliseconds
    #[arg(long, default_value = "500")]
    pub poll_ms: u64,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("segment_source").required(true).args(["segments", "segments_file"])))]
pub struct PlanArgs {
    /// Segments as a JSON array
    #[arg(short, long)]
    pub segments: Option<String>,

    /// Read the segments JSON array from a file
    #[arg(long)]
    pub segments_file: Option<PathBuf>,

    /// Source duration in seconds
    #[arg(short, long)]
    pub duration: f64,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Directory to list instead of the configured videos directory
    #[arg(long)]
    pub videos_dir: Option<PathBuf>,
}
