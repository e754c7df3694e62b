// Business rules - Timeline normalization, encode planning and progress schedule

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use tracing::{debug, warn};

use crate::domain::model::*;

/// Lowest speed the audio tempo filter accepts
pub const MIN_AUDIO_TEMPO: f64 = 0.5;
/// Highest speed the audio tempo filter accepts
pub const MAX_AUDIO_TEMPO: f64 = 100.0;

/// Two input segments whose spans intersect, by position in the sorted list
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentOverlap {
    pub first: Segment,
    pub second: Segment,
}

/// Turns raw user segments into ordered render ranges
pub struct IntervalNormalizer;

impl IntervalNormalizer {
    /// Normalize `segments` over a source of `total_duration` seconds.
    ///
    /// Segments are stable-sorted by start, so ties keep their input order.
    /// An empty list keeps the whole source as one speed 1.0 range. Otherwise
    /// gaps before, between and after segments become speed 1.0 ranges; trim
    /// segments emit nothing but still consume their span. Zero-length
    /// ranges are dropped.
    ///
    /// Overlapping segments are not merged: each one still emits its own
    /// range, so the output overlaps too. Callers that care should reject
    /// such input first (see [`IntervalNormalizer::find_overlaps`]).
    pub fn normalize(segments: &[Segment], total_duration: f64) -> Vec<RenderRange> {
        let sorted = Self::sorted(segments);

        let overlaps = Self::find_overlaps(segments);
        if !overlaps.is_empty() {
            warn!(
                count = overlaps.len(),
                "Overlapping segments produce overlapping render ranges"
            );
        }

        let mut ranges = Vec::with_capacity(sorted.len() * 2 + 1);
        let mut last_end = 0.0_f64;

        for segment in &sorted {
            if segment.start > last_end {
                ranges.push(RenderRange::gap(last_end, segment.start));
            }
            if !segment.is_trim() {
                ranges.push(RenderRange::kept(segment.start, segment.end, segment.speed));
            }
            last_end = segment.end;
        }

        if sorted.is_empty() {
            ranges.push(RenderRange::kept(0.0, total_duration, 1.0));
        } else if last_end < total_duration {
            ranges.push(RenderRange::gap(last_end, total_duration));
        }

        ranges.retain(|range| !range.is_degenerate());
        debug!(segments = segments.len(), ranges = ranges.len(), "Normalized timeline");
        ranges
    }

    /// Segments starting inside an earlier segment's span, paired with the
    /// earlier segment that reaches furthest
    pub fn find_overlaps(segments: &[Segment]) -> Vec<SegmentOverlap> {
        let sorted = Self::sorted(segments);
        let mut overlaps = Vec::new();
        let mut furthest: Option<&Segment> = None;

        for segment in &sorted {
            if let Some(previous) = furthest {
                if segment.start < previous.end {
                    overlaps.push(SegmentOverlap {
                        first: previous.clone(),
                        second: segment.clone(),
                    });
                }
            }
            if furthest.map_or(true, |previous| segment.end > previous.end) {
                furthest = Some(segment);
            }
        }

        overlaps
    }

    fn sorted(segments: &[Segment]) -> Vec<Segment> {
        let mut sorted = segments.to_vec();
        sorted.sort_by(|a, b| a.start.total_cmp(&b.start));
        sorted
    }
}

/// Builds one encoder invocation per render range
pub struct EncodePlanner;

impl EncodePlanner {
    /// Whether the audio tempo filter can retime at `speed`
    pub fn tempo_in_band(speed: f64) -> bool {
        (MIN_AUDIO_TEMPO..=MAX_AUDIO_TEMPO).contains(&speed)
    }

    /// Video timestamp-scaling filter for `speed`
    pub fn video_filter(speed: f64) -> String {
        format!("setpts={}*PTS", 1.0 / speed)
    }

    /// Decide audio handling; out-of-band speeds pass audio through with a warning
    pub fn audio_plan(speed: f64, has_audio: bool) -> (AudioPlan, Option<String>) {
        if !has_audio {
            return (AudioPlan::None, None);
        }
        if Self::tempo_in_band(speed) {
            return (AudioPlan::Tempo(speed), None);
        }
        let warning = format!(
            "Audio speed of {}x is outside the tempo range [{}, {}]. Audio for this range will not match the video speed.",
            speed, MIN_AUDIO_TEMPO, MAX_AUDIO_TEMPO
        );
        (AudioPlan::Passthrough, Some(warning))
    }

    /// Full encode job for range `range_index` of the timeline
    pub fn plan(
        range_index: usize,
        range: &RenderRange,
        input: &Path,
        output: PathBuf,
        has_audio: bool,
        settings: &EncoderSettings,
    ) -> (EncodeJob, Option<String>) {
        let (audio, warning) = Self::audio_plan(range.speed, has_audio);
        let job = EncodeJob {
            range_index,
            input: input.to_path_buf(),
            output,
            start: range.start,
            duration: range.duration(),
            video_filter: Self::video_filter(range.speed),
            audio,
            settings: settings.clone(),
        };
        (job, warning)
    }
}

/// Progress values reported at each pipeline stage
pub struct ProgressSchedule;

impl ProgressSchedule {
    pub const QUEUED: u8 = 0;
    pub const ANALYZING: u8 = 10;
    pub const PROCESSING: u8 = 20;
    pub const CONCATENATING: u8 = 85;
    pub const CONCATENATED: u8 = 95;
    pub const COMPLETED: u8 = 100;

    /// Linear interpolation between 20 and 80 over `completed` of `total` ranges
    pub fn segment(completed: usize, total: usize) -> u8 {
        if total == 0 {
            return Self::PROCESSING;
        }
        let completed = completed.min(total);
        Self::PROCESSING + (60 * completed / total) as u8
    }
}

/// File naming for task outputs and temporary artifacts
pub struct ArtifactNaming;

impl ArtifactNaming {
    /// `<base>_processed_<YYYYmmdd_HHMMSS>.mp4`
    pub fn output_filename<Tz: TimeZone>(filename: &str, at: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let base = Path::new(filename)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string());
        format!("{}_processed_{}.mp4", base, at.format("%Y%m%d_%H%M%S"))
    }

    /// Temporary artifact for range `index` (0-based)
    pub fn segment_artifact(temp_dir: &Path, task_id: &TaskId, index: usize) -> PathBuf {
        temp_dir.join(format!("segment_{}_{}.mp4", task_id, index))
    }

    /// Concat manifest for the task
    pub fn manifest(temp_dir: &Path, task_id: &TaskId) -> PathBuf {
        temp_dir.join(format!("concat_{}.txt", task_id))
    }
}

/// Which files in the videos directory are listed, and how sizes read
pub struct VideoCatalog;

impl VideoCatalog {
    pub const EXTENSIONS: &'static [&'static str] = &["mp4", "avi", "mov", "mkv", "webm", "ogg"];

    /// Extension check, ignoring case
    pub fn is_video_file(name: &str) -> bool {
        Path::new(name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| Self::EXTENSIONS.contains(&ext.as_str()))
    }

    /// Binary units up to GB with one decimal, e.g. `1.5 MB`
    pub fn format_file_size(bytes: u64) -> String {
        if bytes == 0 {
            return "0 B".to_string();
        }
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let mut size = bytes as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        format!("{:.1} {}", size, UNITS[unit])
    }
}
