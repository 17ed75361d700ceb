//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Staging failed: {0}")]
    Staging(String),

    #[error("Probe failed: {message}")]
    Probe {
        message: String,
        stderr: Option<String>,
    },

    #[error("Transcode failed: {message}")]
    Transcode {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a staging failure error.
    pub fn staging(message: impl Into<String>) -> Self {
        Self::Staging(message.into())
    }

    /// Create a probe failure error.
    pub fn probe(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::Probe {
            message: message.into(),
            stderr,
        }
    }

    /// Create a transcode failure error.
    pub fn transcode(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::Transcode {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Fold any error raised while probing into `Probe`.
    pub fn into_probe(self) -> Self {
        match self {
            e @ MediaError::Probe { .. } => e,
            other => MediaError::probe(other.to_string(), None),
        }
    }

    /// Fold any error raised while transcoding into `Transcode`.
    pub fn into_transcode(self) -> Self {
        match self {
            e @ MediaError::Transcode { .. } => e,
            other => MediaError::transcode(other.to_string(), None, None),
        }
    }

    /// Engine stderr captured with the failure, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            MediaError::Probe { stderr, .. } | MediaError::Transcode { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_transcode_keeps_details() {
        let err = MediaError::transcode("bad filter", Some("Invalid argument".into()), Some(1));
        match err.into_transcode() {
            MediaError::Transcode { exit_code, stderr, .. } => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(stderr.as_deref(), Some("Invalid argument"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_into_probe_wraps_other_errors() {
        let err = MediaError::FfprobeNotFound.into_probe();
        assert!(matches!(err, MediaError::Probe { .. }));
        assert!(err.to_string().contains("FFprobe not found"));
    }
}
