//! Command implementations

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::AppConfig;
use crate::app::container::{AppContainer, DefaultAppContainer};
use crate::app::edit_interactor::EditInteractor;
use crate::cli::args::{ListArgs, PlanArgs, ProbeArgs, RenderArgs};
use crate::domain::model::{
    ProcessRequest, RenderRange, Segment, TaskId, TaskSnapshot, TaskStatus, VideoEntry,
};
use crate::domain::rules::IntervalNormalizer;

/// Execute the render command
///
/// A bare file name is looked up in the configured videos directory; a path
/// with a directory component overrides it.
pub async fn render(args: RenderArgs, config: &AppConfig) -> Result<()> {
    let segments = load_segments(args.segments.as_deref(), args.segments_file.as_deref())?;

    let mut config = config.clone();
    let filename = split_input(&args.input, &mut config)?;
    info!(input = %args.input.display(), segments = segments.len(), "Starting render");

    let container = DefaultAppContainer::new(&config);
    let interactor = container.edit_interactor();
    let task_id = interactor
        .submit(ProcessRequest::new(filename, segments))
        .await
        .context("Render request rejected")?;
    println!("task {}", task_id);

    let snapshot = wait_for_task(
        &interactor,
        &task_id,
        Duration::from_millis(args.poll_ms.max(10)),
        tokio::signal::ctrl_c(),
    )
    .await?;

    for warning in &snapshot.warnings {
        eprintln!("warning: {}", warning);
    }

    match snapshot.status {
        TaskStatus::Completed => {
            let output = config.paths.processed_dir.join(&snapshot.output_filename);
            println!("{}", output.display());
            info!(output = %output.display(), "Render completed");
            Ok(())
        }
        _ => {
            let code = snapshot
                .error_code
                .map(|code| code.to_string())
                .unwrap_or_else(|| "internal".to_string());
            bail!(
                "Render failed [{}]: {}",
                code,
                snapshot.error.unwrap_or_else(|| "unknown error".to_string())
            )
        }
    }
}

/// Poll `task_id` until it is terminal, printing each status change.
///
/// The first time `interrupt` resolves the task is cancelled; polling then
/// continues until the record settles.
pub async fn wait_for_task<F>(
    interactor: &EditInteractor,
    task_id: &TaskId,
    poll: Duration,
    interrupt: F,
) -> Result<TaskSnapshot>
where
    F: Future,
{
    tokio::pin!(interrupt);
    let mut interrupted = false;
    let mut ticker = tokio::time::interval(poll);
    let mut last_seen: Option<(TaskStatus, u8)> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut interrupt, if !interrupted => {
                interrupted = true;
                warn!(task_id = %task_id, "Interrupted, cancelling task");
                interactor.cancel(task_id)?;
            }
        }

        let snapshot = interactor.status(task_id)?;
        if last_seen != Some((snapshot.status, snapshot.progress)) {
            println!("{:>3}% {}", snapshot.progress, snapshot.status);
            last_seen = Some((snapshot.status, snapshot.progress));
        }
        if snapshot.status.is_terminal() {
            return Ok(snapshot);
        }
    }
}

#[derive(Serialize)]
struct PlanOutput {
    duration: f64,
    output_duration: f64,
    ranges: Vec<RenderRange>,
}

/// Execute the plan command
pub fn plan(args: PlanArgs) -> Result<()> {
    if !args.duration.is_finite() || args.duration < 0.0 {
        bail!("Duration must be a non-negative number of seconds");
    }

    let segments = load_segments(args.segments.as_deref(), args.segments_file.as_deref())?;
    for (index, segment) in segments.iter().enumerate() {
        segment
            .validate(index)
            .with_context(|| format!("Invalid segment at position {}", index))?;
    }
    let overlaps = IntervalNormalizer::find_overlaps(&segments);
    if !overlaps.is_empty() {
        warn!(count = overlaps.len(), "Segments overlap; ranges will overlap too");
    }

    let ranges = IntervalNormalizer::normalize(&segments, args.duration);
    let output = PlanOutput {
        duration: args.duration,
        output_duration: ranges.iter().map(RenderRange::output_duration).sum(),
        ranges,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to serialize plan")?
    );
    Ok(())
}

/// Execute the probe command
pub async fn probe(args: ProbeArgs, config: &AppConfig) -> Result<()> {
    info!(input = %args.input.display(), "Probing");
    let container = DefaultAppContainer::new(config);
    let media = container
        .edit_interactor()
        .inspect(&args.input)
        .await
        .with_context(|| format!("Failed to probe {}", args.input.display()))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&media).context("Failed to serialize media info")?
    );
    Ok(())
}

#[derive(Serialize)]
struct VideoListing {
    videos: Vec<VideoEntry>,
}

/// Execute the list command
pub async fn list(args: ListArgs, config: &AppConfig) -> Result<()> {
    let mut config = config.clone();
    if let Some(dir) = args.videos_dir {
        config.paths.videos_dir = dir;
    }

    let container = DefaultAppContainer::new(&config);
    let videos = container
        .edit_interactor()
        .list_videos()
        .await
        .with_context(|| format!("Failed to list {}", config.paths.videos_dir.display()))?;

    let listing = VideoListing { videos };
    println!(
        "{}",
        serde_json::to_string_pretty(&listing).context("Failed to serialize video list")?
    );
    Ok(())
}

/// Parse segments from inline JSON or a JSON file
fn load_segments(inline: Option<&str>, file: Option<&Path>) -> Result<Vec<Segment>> {
    let text = match (inline, file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read segments file {}", path.display()))?,
        (None, None) => bail!("Either --segments or --segments-file is required"),
    };
    serde_json::from_str(&text).context("Segments must be a JSON array of {start, end, action, speed}")
}

/// Split the input path into the videos directory and the file name
fn split_input(input: &Path, config: &mut AppConfig) -> Result<String> {
    let filename = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("Input has no file name: {}", input.display()))?;

    if let Some(parent) = input.parent().filter(|p| !p.as_os_str().is_empty()) {
        config.paths.videos_dir = PathBuf::from(parent);
    }
    Ok(filename)
}
