//! Face detection job identifiers, status and results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::BoundingBox;

/// Identifier of a video face detection job issued by the detection service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DetectionJobId(pub String);

impl DetectionJobId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DetectionJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a detection job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionJobStatus {
    /// Job is still running
    #[default]
    InProgress,
    /// Job finished and faces are available
    Succeeded,
    /// Job failed on the service side
    Failed,
}

impl DetectionJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionJobStatus::InProgress => "IN_PROGRESS",
            DetectionJobStatus::Succeeded => "SUCCEEDED",
            DetectionJobStatus::Failed => "FAILED",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, DetectionJobStatus::Succeeded | DetectionJobStatus::Failed)
    }
}

impl fmt::Display for DetectionJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single detected face at a point in the video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FaceDetection {
    /// Milliseconds from the start of the video
    pub timestamp_ms: i64,
    pub bounding_box: BoundingBox,
}

impl FaceDetection {
    pub fn new(timestamp_ms: i64, bounding_box: BoundingBox) -> Self {
        Self {
            timestamp_ms,
            bounding_box,
        }
    }
}

/// Video metadata as reported by the detection service.
///
/// Informational only; frame sizes used for blurring always come from probing
/// the staged file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ReportedVideoMetadata {
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    pub frame_rate: Option<f64>,
    pub duration_ms: Option<i64>,
    pub codec: Option<String>,
}

/// Result of querying a detection job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionJobResult {
    pub job_id: DetectionJobId,
    pub status: DetectionJobStatus,
    /// Service-provided explanation, usually set for failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Detected faces; empty unless `status` is succeeded
    #[serde(default)]
    pub faces: Vec<FaceDetection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<ReportedVideoMetadata>,
}

impl DetectionJobResult {
    /// Result for a job that is still running.
    pub fn in_progress(job_id: DetectionJobId) -> Self {
        Self {
            job_id,
            status: DetectionJobStatus::InProgress,
            status_message: None,
            faces: Vec::new(),
            video: None,
        }
    }

    /// Bounding boxes of every detection, in service order.
    pub fn bounding_boxes(&self) -> Vec<BoundingBox> {
        self.faces.iter().map(|f| f.bounding_box).collect()
    }
}
