//! Worker error types.

use std::fmt;

use thiserror::Error;

use faceblur_detection::DetectionError;
use faceblur_media::MediaError;
use faceblur_storage::StorageError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Failure classes reported by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Download,
    DetectionNotReady,
    DetectionFailed,
    Detection,
    Staging,
    Probe,
    Transcode,
    Upload,
    Timeout,
    Config,
    InvalidEvent,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Download => "download",
            ErrorKind::DetectionNotReady => "detection_not_ready",
            ErrorKind::DetectionFailed => "detection_failed",
            ErrorKind::Detection => "detection",
            ErrorKind::Staging => "staging",
            ErrorKind::Probe => "probe",
            ErrorKind::Transcode => "transcode",
            ErrorKind::Upload => "upload",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Config => "config",
            ErrorKind::InvalidEvent => "invalid_event",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Download failed: {0}")]
    Download(#[source] StorageError),

    #[error("Upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("Detection job {job_id} has not finished")]
    DetectionNotReady { job_id: String },

    #[error("Detection job {job_id} failed: {message}")]
    DetectionFailed { job_id: String, message: String },

    #[error("Detection service error: {0}")]
    Detection(#[from] DetectionError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Job timed out after {0} seconds")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_event(msg: impl Into<String>) -> Self {
        Self::InvalidEvent(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::Download(_) => ErrorKind::Download,
            WorkerError::Upload(_) => ErrorKind::Upload,
            WorkerError::DetectionNotReady { .. } => ErrorKind::DetectionNotReady,
            WorkerError::DetectionFailed { .. } => ErrorKind::DetectionFailed,
            WorkerError::Detection(DetectionError::NotReady { .. }) => ErrorKind::DetectionNotReady,
            WorkerError::Detection(DetectionError::JobFailed { .. }) => ErrorKind::DetectionFailed,
            WorkerError::Detection(DetectionError::ConfigError(_)) => ErrorKind::Config,
            WorkerError::Detection(_) => ErrorKind::Detection,
            WorkerError::Media(MediaError::Probe { .. }) => ErrorKind::Probe,
            WorkerError::Media(MediaError::Transcode { .. }) => ErrorKind::Transcode,
            WorkerError::Media(_) => ErrorKind::Staging,
            WorkerError::Timeout(_) => ErrorKind::Timeout,
            WorkerError::ConfigError(_) => ErrorKind::Config,
            WorkerError::InvalidEvent(_) => ErrorKind::InvalidEvent,
        }
    }

    /// Check if re-running the whole blur from scratch may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Download(e) | WorkerError::Upload(e) => e.is_retryable(),
            _ => self.kind() == ErrorKind::Staging,
        }
    }
}
