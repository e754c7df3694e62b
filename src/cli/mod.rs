//! CLI module for speedtrim
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// speedtrim - retime and trim spans of a video, then join the result
#[derive(Parser, Debug)]
#[command(name = "speedtrim")]
#[command(about = "Speed up, slow down and cut spans of a video in one pass")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Config file (default: speedtrim.toml or config/speedtrim.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render an edited copy of a video
    Render(args::RenderArgs),
    /// Print the normalized render ranges without encoding
    Plan(args::PlanArgs),
    /// Print media information for a video file
    Probe(args::ProbeArgs),
    /// List videos in the videos directory with duration, resolution and size
    List(args::ListArgs),
}
