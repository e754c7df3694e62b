// Domain models - Core types and data structures

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::domain::errors::{DomainError, ErrorCode};

/// What to do with a marked span of the source timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentAction {
    /// Keep the span, played back at the segment's speed
    #[default]
    #[serde(alias = "keep")]
    Speed,
    /// Remove the span from the output
    Trim,
}

fn default_speed() -> f64 {
    1.0
}

/// A user-marked span of the source timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub action: SegmentAction,
    #[serde(default = "default_speed")]
    pub speed: f64,
}

impl Segment {
    /// Kept segment played back at `speed`
    pub fn with_speed(start: f64, end: f64, speed: f64) -> Self {
        Self {
            start,
            end,
            action: SegmentAction::Speed,
            speed,
        }
    }

    /// Segment removed from the output
    pub fn trim(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            action: SegmentAction::Trim,
            speed: 1.0,
        }
    }

    pub fn is_trim(&self) -> bool {
        self.action == SegmentAction::Trim
    }

    /// Check the segment is well formed; `index` is only used in the message
    pub fn validate(&self, index: usize) -> Result<(), DomainError> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(DomainError::InvalidInput(format!(
                "segment {}: start and end must be finite numbers",
                index
            )));
        }
        if self.start < 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "segment {}: start ({}) cannot be negative",
                index, self.start
            )));
        }
        if self.start >= self.end {
            return Err(DomainError::InvalidInput(format!(
                "segment {}: start ({}) must be less than end ({})",
                index, self.start, self.end
            )));
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "segment {}: speed ({}) must be greater than zero",
                index, self.speed
            )));
        }
        Ok(())
    }
}

/// Where a render range came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeOrigin {
    /// A non-trim user segment
    Kept,
    /// Unmarked timeline between or after user segments
    InsertedGap,
}

/// A normalized timeline interval, the unit of independent encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRange {
    pub start: f64,
    pub end: f64,
    pub speed: f64,
    pub origin: RangeOrigin,
}

impl RenderRange {
    pub fn kept(start: f64, end: f64, speed: f64) -> Self {
        Self {
            start,
            end,
            speed,
            origin: RangeOrigin::Kept,
        }
    }

    pub fn gap(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            speed: 1.0,
            origin: RangeOrigin::InsertedGap,
        }
    }

    /// Source duration of the range in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Duration of the range once retimed
    pub fn output_duration(&self) -> f64 {
        self.duration() / self.speed
    }

    pub fn is_degenerate(&self) -> bool {
        self.start >= self.end
    }
}

/// Rational number, used for frame rates reported as `num/den`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub num: i64,
    pub den: i64,
}

impl Rational {
    pub fn new(num: i64, den: i64) -> Self {
        Self { num, den }
    }

    pub fn to_f64(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self { num: 0, den: 1 }
    }
}

impl FromStr for Rational {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || DomainError::ProbeFailed(format!("Invalid rational value: {}", s));
        match s.trim().split_once('/') {
            Some((num, den)) => Ok(Self {
                num: num.trim().parse().map_err(|_| bad())?,
                den: den.trim().parse().map_err(|_| bad())?,
            }),
            None => Ok(Self {
                num: s.trim().parse().map_err(|_| bad())?,
                den: 1,
            }),
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Source metadata gathered by the probe stage
///
/// `Default` is the degraded, zero-valued record used when probing fails.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration: f64,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Rational,
    pub has_audio: bool,
}

/// One row of the videos directory listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoEntry {
    pub filename: String,
    /// Human-readable size, e.g. `12.4 MB`
    pub size: String,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

/// Opaque task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| DomainError::NotFound(format!("Task not found: {}", s)))
    }
}

/// Lifecycle of a processing task
///
/// Statuses are ordered; a task only ever moves forward, except that any
/// non-terminal status may divert to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Analyzing,
    Processing,
    /// Encoding range `k` (1-based)
    ProcessingSegment(usize),
    Concatenating,
    Cleanup,
    Completed,
    Error,
}

impl TaskStatus {
    fn rank(&self) -> (u8, usize) {
        match self {
            TaskStatus::Queued => (0, 0),
            TaskStatus::Analyzing => (1, 0),
            TaskStatus::Processing => (2, 0),
            TaskStatus::ProcessingSegment(k) => (3, *k),
            TaskStatus::Concatenating => (4, 0),
            TaskStatus::Cleanup => (5, 0),
            TaskStatus::Completed => (6, 0),
            TaskStatus::Error => (7, 0),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic
    pub fn can_advance_to(&self, next: TaskStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == TaskStatus::Error || next.rank() >= self.rank()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Queued => f.write_str("queued"),
            TaskStatus::Analyzing => f.write_str("analyzing"),
            TaskStatus::Processing => f.write_str("processing"),
            TaskStatus::ProcessingSegment(k) => write!(f, "processing_segment_{}", k),
            TaskStatus::Concatenating => f.write_str("concatenating"),
            TaskStatus::Cleanup => f.write_str("cleanup"),
            TaskStatus::Completed => f.write_str("completed"),
            TaskStatus::Error => f.write_str("error"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "queued" => TaskStatus::Queued,
            "analyzing" => TaskStatus::Analyzing,
            "processing" => TaskStatus::Processing,
            "concatenating" => TaskStatus::Concatenating,
            "cleanup" => TaskStatus::Cleanup,
            "completed" => TaskStatus::Completed,
            "error" => TaskStatus::Error,
            other => {
                let k = other
                    .strip_prefix("processing_segment_")
                    .and_then(|k| k.parse::<usize>().ok())
                    .filter(|k| *k > 0)
                    .ok_or_else(|| {
                        DomainError::InvalidInput(format!("Unknown task status: {}", other))
                    })?;
                TaskStatus::ProcessingSegment(k)
            }
        };
        Ok(status)
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Point-in-time view of a task, as returned to status queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub status: TaskStatus,
    pub progress: u8,
    pub filename: String,
    pub output_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl TaskSnapshot {
    /// Fresh record in the `queued` state
    pub fn queued(id: TaskId, filename: String, output_filename: String) -> Self {
        Self {
            id,
            status: TaskStatus::Queued,
            progress: 0,
            filename,
            output_filename,
            error: None,
            error_code: None,
            warnings: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Validated processing request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl ProcessRequest {
    pub fn new(filename: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            filename: filename.into(),
            segments,
        }
    }

    /// Required-field and per-segment checks
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.filename.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "Filename and segments are required".to_string(),
            ));
        }
        if self.segments.is_empty() {
            return Err(DomainError::InvalidInput(
                "Filename and segments are required".to_string(),
            ));
        }
        for (index, segment) in self.segments.iter().enumerate() {
            segment.validate(index)?;
        }
        Ok(())
    }
}

/// Fixed re-encode configuration applied to every range of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
        }
    }
}

/// How the audio stream of one range is treated
#[derive(Debug, Clone, PartialEq)]
pub enum AudioPlan {
    /// Source has no audio stream
    None,
    /// Retime audio with the engine's tempo filter
    Tempo(f64),
    /// Re-encode audio without retiming
    Passthrough,
}

impl AudioPlan {
    /// Audio filter expression, if any
    pub fn filter(&self) -> Option<String> {
        match self {
            AudioPlan::Tempo(speed) => Some(format!("atempo={}", speed)),
            AudioPlan::None | AudioPlan::Passthrough => None,
        }
    }

    pub fn has_audio(&self) -> bool {
        !matches!(self, AudioPlan::None)
    }
}

/// One external encoder invocation
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub range_index: usize,
    pub input: PathBuf,
    pub output: PathBuf,
    pub start: f64,
    pub duration: f64,
    pub video_filter: String,
    pub audio: AudioPlan,
    pub settings: EncoderSettings,
}
