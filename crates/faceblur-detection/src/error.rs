//! Detection error types.

use thiserror::Error;

pub type DetectionResult<T> = Result<T, DetectionError>;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Failed to configure detection client: {0}")]
    ConfigError(String),

    #[error("Failed to start detection job: {0}")]
    StartFailed(String),

    #[error("Detection request failed: {0}")]
    RequestFailed(String),

    #[error("Detection job {job_id} not found")]
    JobNotFound { job_id: String },

    #[error("Detection job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("Detection job {job_id} not finished after {waited_secs} seconds")]
    NotReady { job_id: String, waited_secs: u64 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl DetectionError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DetectionError::StartFailed(_) | DetectionError::RequestFailed(_)
        )
    }
}
