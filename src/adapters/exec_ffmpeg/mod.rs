//! FFmpeg execution adapter
//!
//! Encodes render ranges and performs the stream-copy join by running
//! `ffmpeg` as a subprocess. Stderr of a failed run is surfaced verbatim.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// FFmpeg-based execution adapter
pub struct FFmpegAdapter {
    ffmpeg_path: PathBuf,
}

impl FFmpegAdapter {
    /// Create new FFmpeg adapter
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// Arguments for encoding one range
    pub fn encode_args(job: &EncodeJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-y".into(),
            "-ss".into(),
            job.start.to_string().into(),
            "-t".into(),
            job.duration.to_string().into(),
            "-i".into(),
            job.input.clone().into_os_string(),
        ];

        let mut graph = format!("[0:v]{}[v]", job.video_filter);
        if let Some(audio_filter) = job.audio.filter() {
            graph.push_str(&format!(";[0:a]{}[a]", audio_filter));
        }
        args.push("-filter_complex".into());
        args.push(graph.into());
        args.push("-map".into());
        args.push("[v]".into());

        match job.audio {
            AudioPlan::Tempo(_) => {
                args.push("-map".into());
                args.push("[a]".into());
            }
            AudioPlan::Passthrough => {
                args.push("-map".into());
                args.push("0:a".into());
            }
            AudioPlan::None => {}
        }

        args.push("-c:v".into());
        args.push(job.settings.video_codec.clone().into());
        args.push("-preset".into());
        args.push(job.settings.preset.clone().into());
        args.push("-crf".into());
        args.push(job.settings.crf.to_string().into());
        if job.audio.has_audio() {
            args.push("-c:a".into());
            args.push(job.settings.audio_codec.clone().into());
        }

        args.push(job.output.clone().into_os_string());
        args
    }

    /// Arguments for the stream-copy join of a concat manifest
    pub fn concat_args(manifest: &Path, has_audio: bool, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-y".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            manifest.as_os_str().to_owned(),
            "-map".into(),
            "0:v".into(),
            "-c:v".into(),
            "copy".into(),
        ];
        if has_audio {
            for arg in ["-map", "0:a", "-c:a", "copy"] {
                args.push(arg.into());
            }
        }
        args.push(output.as_os_str().to_owned());
        args
    }

    /// Run ffmpeg, returning stderr text on a non-zero exit
    async fn run(&self, args: &[OsString]) -> Result<(), String> {
        debug!(?args, "Running ffmpeg");
        let output = Command::new(&self.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("Failed to run {}: {}", self.ffmpeg_path.display(), e))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).into_owned())
        }
    }
}

#[async_trait]
impl EncodePort for FFmpegAdapter {
    async fn encode(&self, job: &EncodeJob) -> Result<PathBuf, DomainError> {
        info!(
            range = job.range_index,
            start = job.start,
            duration = job.duration,
            output = %job.output.display(),
            "Encoding range"
        );
        self.run(&Self::encode_args(job))
            .await
            .map_err(|stderr| DomainError::EncodeFailed {
                range_index: job.range_index,
                stderr,
            })?;
        Ok(job.output.clone())
    }
}

#[async_trait]
impl ConcatPort for FFmpegAdapter {
    async fn concat(
        &self,
        manifest: &Path,
        has_audio: bool,
        output: &Path,
    ) -> Result<(), DomainError> {
        info!(output = %output.display(), has_audio, "Concatenating ranges");
        self.run(&Self::concat_args(manifest, has_audio, output))
            .await
            .map_err(|stderr| DomainError::ConcatFailed(format!("FFmpeg error: {}", stderr)))
    }
}
