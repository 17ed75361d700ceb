//! Handler events and the status/body response contract.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::detection::DetectionJobId;

/// Location of an object in storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct VideoRef {
    pub bucket: String,
    pub key: String,
}

impl VideoRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// File extension of the key including the dot, e.g. `.mov`.
    pub fn extension(&self) -> Option<String> {
        let name = self.key.rsplit('/').next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(format!(".{}", ext.to_ascii_lowercase()))
    }
}

/// Event that starts a detection job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StartDetectionEvent {
    pub bucket: String,
    pub key: String,
}

/// Event that polls a detection job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectionStatusEvent {
    pub job_id: DetectionJobId,
    /// Keep polling until the job finishes or the worker's wait limit passes
    #[serde(default)]
    pub wait: bool,
}

impl DetectionStatusEvent {
    pub fn new(job_id: DetectionJobId) -> Self {
        Self {
            job_id,
            wait: false,
        }
    }
}

/// Event that blurs the faces found by a finished detection job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BlurFacesEvent {
    pub bucket: String,
    pub input_key: String,
    /// Destination key; defaults to the configured prefix plus `input_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
    /// Destination bucket; defaults to `bucket`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_bucket: Option<String>,
    pub job_id: DetectionJobId,
}

impl BlurFacesEvent {
    pub fn source(&self) -> VideoRef {
        VideoRef::new(&self.bucket, &self.input_key)
    }

    /// Destination object, applying `prefix` when no explicit key was given.
    pub fn destination(&self, prefix: &str) -> VideoRef {
        let bucket = self.output_bucket.clone().unwrap_or_else(|| self.bucket.clone());
        let key = self
            .output_key
            .clone()
            .unwrap_or_else(|| prefixed_key(prefix, &self.input_key));
        VideoRef::new(bucket, key)
    }
}

/// Put `prefix` in front of the file name part of `key`.
fn prefixed_key(prefix: &str, key: &str) -> String {
    match key.rsplit_once('/') {
        Some((dir, name)) => format!("{}/{}{}", dir, prefix, name),
        None => format!("{}{}", prefix, key),
    }
}

/// Any handler event, tagged by `action`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HandlerEvent {
    StartDetection(StartDetectionEvent),
    DetectionStatus(DetectionStatusEvent),
    BlurFaces(BlurFacesEvent),
}

impl HandlerEvent {
    pub fn action(&self) -> &'static str {
        match self {
            HandlerEvent::StartDetection(_) => "start_detection",
            HandlerEvent::DetectionStatus(_) => "detection_status",
            HandlerEvent::BlurFaces(_) => "blur_faces",
        }
    }
}

/// Handler exit value: an HTTP-like status code plus a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            body: body.into(),
        }
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: body.into(),
        }
    }

    /// 200 response whose body is `value` as JSON.
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::ok(body),
            Err(e) => Self::error(format!("Failed to serialize response: {}", e)),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
