//! FFprobe adapter for media file probing
//!
//! Runs `ffprobe` as a subprocess and maps its JSON report onto `MediaInfo`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    size: Option<String>,
}

/// FFprobe-based probe adapter
pub struct FFprobeAdapter {
    ffprobe_path: PathBuf,
}

impl FFprobeAdapter {
    /// Create new FFprobe adapter
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Map an `ffprobe -print_format json` report onto `MediaInfo`
    pub fn parse_report(json: &str, path: &Path) -> Result<MediaInfo, DomainError> {
        let report: ProbeReport = serde_json::from_str(json)
            .map_err(|e| DomainError::ProbeFailed(format!("Unreadable ffprobe output: {}", e)))?;

        let video = report
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| DomainError::NoVideoStream(path.display().to_string()))?;
        let has_audio = report
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));

        let format = report
            .format
            .ok_or_else(|| DomainError::ProbeFailed("ffprobe reported no format section".into()))?;
        let duration = format
            .duration
            .as_deref()
            .ok_or_else(|| DomainError::ProbeFailed("ffprobe reported no duration".into()))?
            .parse::<f64>()
            .map_err(|e| DomainError::ProbeFailed(format!("Invalid duration: {}", e)))?;
        let size = format
            .size
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let frame_rate = match video.r_frame_rate.as_deref() {
            Some(rate) => rate.parse::<Rational>()?,
            None => Rational::default(),
        };

        Ok(MediaInfo {
            duration,
            size,
            width: video.width.unwrap_or(0),
            height: video.height.unwrap_or(0),
            frame_rate,
            has_audio,
        })
    }
}

#[async_trait]
impl ProbePort for FFprobeAdapter {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, DomainError> {
        debug!(path = %path.display(), "Running ffprobe");

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DomainError::ProbeFailed(format!("Failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(DomainError::ProbeFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Self::parse_report(&String::from_utf8_lossy(&output.stdout), path)
    }
}
