// Domain errors - Error types for the domain layer

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Domain-specific error types
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// Request rejected before a task was created
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Source file or task not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Probe invocation or output parsing failed
    #[error("Probe failed: {0}")]
    ProbeFailed(String),
    /// Probe succeeded but the file carries no video stream
    #[error("No video stream found in {0}")]
    NoVideoStream(String),
    /// Encoder invocation failed for one render range
    #[error("FFmpeg error on range {range_index}: {stderr}")]
    EncodeFailed { range_index: usize, stderr: String },
    /// Stream-copy join failed
    #[error("Concatenation failed: {0}")]
    ConcatFailed(String),
    /// File system failure
    #[error("I/O error: {0}")]
    Io(String),
    /// Task was aborted before finishing
    #[error("Task cancelled")]
    Cancelled,
    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            DomainError::InvalidInput(_) => ErrorCode::InvalidInput,
            DomainError::NotFound(_) => ErrorCode::NotFound,
            DomainError::ProbeFailed(_) => ErrorCode::ProbeFailed,
            DomainError::NoVideoStream(_) => ErrorCode::NoVideoStream,
            DomainError::EncodeFailed { .. } => ErrorCode::EncodeFailed,
            DomainError::ConcatFailed(_) => ErrorCode::ConcatFailed,
            DomainError::Io(_) => ErrorCode::Io,
            DomainError::Cancelled => ErrorCode::Cancelled,
            DomainError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Whether the pipeline must stop on this error
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            DomainError::ProbeFailed(_) | DomainError::NoVideoStream(_)
        )
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

/// Error codes exposed on task records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidInput,
    NotFound,
    ProbeFailed,
    NoVideoStream,
    EncodeFailed,
    ConcatFailed,
    Io,
    Cancelled,
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::NotFound => "not_found",
            ErrorCode::ProbeFailed => "probe_failed",
            ErrorCode::NoVideoStream => "no_video_stream",
            ErrorCode::EncodeFailed => "encode_failed",
            ErrorCode::ConcatFailed => "concat_failed",
            ErrorCode::Io => "io",
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::Internal => "internal",
        };
        f.write_str(name)
    }
}
