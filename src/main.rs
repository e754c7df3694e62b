//! speedtrim CLI
//!
//! Retime and trim spans of a video in one pass, driving ffmpeg for the
//! per-range encodes and the final join.
//!
//! # Usage
//!
//! ```bash
//! speedtrim render --input videos/talk.mp4 --segments '[{"start":0,"end":5,"action":"trim"},{"start":5,"end":10,"speed":2}]'
//! speedtrim plan --segments '[{"start":2,"end":4,"speed":3}]' --duration 10
//! speedtrim probe --input videos/talk.mp4
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use speedtrim::adapters::tracing_log::init_logging;
use speedtrim::cli::{commands, Cli, Commands};
use speedtrim::config_initialization::resolve_config;

/// Main entry point for the speedtrim CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = resolve_config(&cli)?;
    init_logging(&resolved.config.logging);

    info!("Starting speedtrim");
    resolved.log_summary();
    let config = resolved.config;

    let result = match cli.command {
        Commands::Render(args) => commands::render(args, &config).await,
        Commands::Plan(args) => commands::plan(args),
        Commands::Probe(args) => commands::probe(args, &config).await,
        Commands::List(args) => commands::list(args, &config).await,
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
