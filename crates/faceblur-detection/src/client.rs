//! Rekognition video face detection client.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_rekognition::config::{Builder, Region};
use aws_sdk_rekognition::error::DisplayErrorContext;
use aws_sdk_rekognition::types::{FaceAttributes, S3Object, Video};
use aws_sdk_rekognition::Client;
use tracing::{debug, info};

use faceblur_models::{DetectionJobId, DetectionJobResult, DetectionJobStatus, VideoRef};

use crate::convert;
use crate::error::{DetectionError, DetectionResult};
use crate::service::FaceDetectionService;

/// Largest page the service accepts.
pub const MAX_PAGE_SIZE: i32 = 1000;

/// Configuration for the detection client.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Custom endpoint; AWS when unset
    pub endpoint_url: Option<String>,
    /// Region
    pub region: String,
    /// Static credentials as (access key ID, secret); default provider chain when unset
    pub credentials: Option<(String, String)>,
    /// Tag attached to every started job
    pub job_tag: String,
    /// Detections requested per result page
    pub page_size: i32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            region: "us-east-1".to_string(),
            credentials: None,
            job_tag: "FaceDetectionJob".to_string(),
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl DetectionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let credentials = match (
            std::env::var("REKOGNITION_ACCESS_KEY_ID").ok(),
            std::env::var("REKOGNITION_SECRET_ACCESS_KEY").ok(),
        ) {
            (Some(key_id), Some(secret)) => Some((key_id, secret)),
            _ => None,
        };

        Self {
            endpoint_url: std::env::var("REKOGNITION_ENDPOINT_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            region: std::env::var("AWS_REGION").unwrap_or(defaults.region),
            credentials,
            job_tag: std::env::var("DETECTION_JOB_TAG").unwrap_or(defaults.job_tag),
            page_size: std::env::var("DETECTION_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse::<i32>().ok())
                .map(|n| n.clamp(1, MAX_PAGE_SIZE))
                .unwrap_or(defaults.page_size),
        }
    }
}

/// Client for Rekognition video face detection.
#[derive(Clone)]
pub struct DetectionClient {
    client: Client,
    config: DetectionConfig,
}

impl DetectionClient {
    /// Create a new detection client.
    pub async fn new(config: DetectionConfig) -> DetectionResult<Self> {
        if config.page_size < 1 {
            return Err(DetectionError::config_error("page size must be positive"));
        }

        let region = Region::new(config.region.clone());
        let mut builder = match &config.credentials {
            Some((key_id, secret)) => Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .region(region)
                .credentials_provider(Credentials::new(
                    key_id,
                    secret,
                    None,
                    None,
                    "faceblur-static",
                )),
            None => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                Builder::from(&shared)
            }
        };

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            config,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> DetectionResult<Self> {
        Self::new(DetectionConfig::from_env()).await
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }
}

#[async_trait]
impl FaceDetectionService for DetectionClient {
    async fn start_job(&self, video: &VideoRef) -> DetectionResult<DetectionJobId> {
        let s3_object = S3Object::builder()
            .bucket(&video.bucket)
            .name(&video.key)
            .build();

        let output = self
            .client
            .start_face_detection()
            .video(Video::builder().s3_object(s3_object).build())
            .face_attributes(FaceAttributes::Default)
            .job_tag(&self.config.job_tag)
            .send()
            .await
            .map_err(|e| DetectionError::StartFailed(DisplayErrorContext(&e).to_string()))?;

        let job_id = output
            .job_id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DetectionError::InvalidResponse("Response has no job id".to_string()))?;

        info!(job_id, bucket = %video.bucket, key = %video.key, "Started face detection job");
        Ok(DetectionJobId::from_string(job_id))
    }

    async fn get_job_result(&self, job_id: &DetectionJobId) -> DetectionResult<DetectionJobResult> {
        let mut result = DetectionJobResult::in_progress(job_id.clone());
        let mut next_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = self
                .client
                .get_face_detection()
                .job_id(job_id.as_str())
                .max_results(self.config.page_size)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| {
                    let missing = e.as_service_error().is_some_and(|se| {
                        se.is_resource_not_found_exception() || se.is_invalid_parameter_exception()
                    });
                    if missing {
                        DetectionError::JobNotFound {
                            job_id: job_id.to_string(),
                        }
                    } else {
                        DetectionError::RequestFailed(DisplayErrorContext(&e).to_string())
                    }
                })?;
            pages += 1;

            result.status = convert::job_status(page.job_status())?;
            result.status_message = page.status_message().map(str::to_string);
            if result.status != DetectionJobStatus::Succeeded {
                result.faces.clear();
                return Ok(result);
            }

            if result.video.is_none() {
                result.video = page.video_metadata().map(convert::video_metadata);
            }
            result.faces.extend(convert::face_detections(page.faces()));

            match page.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(
            job_id = %job_id,
            pages,
            faces = result.faces.len(),
            video = ?result.video,
            "Fetched face detection results"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GET_TARGET: &str = "RekognitionService.GetFaceDetection";
    const START_TARGET: &str = "RekognitionService.StartFaceDetection";

    fn amz_json(body: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/x-amz-json-1.1")
    }

    fn face(timestamp: i64, left: f64) -> serde_json::Value {
        json!({
            "Timestamp": timestamp,
            "Face": {
                "BoundingBox": {"Left": left, "Top": 0.2, "Width": 0.1, "Height": 0.1},
                "Confidence": 99.5
            }
        })
    }

    async fn client_for(server: &MockServer, page_size: i32) -> DetectionClient {
        DetectionClient::new(DetectionConfig {
            endpoint_url: Some(server.uri()),
            credentials: Some(("test-key".to_string(), "test-secret".to_string())),
            page_size,
            ..Default::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_start_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", START_TARGET))
            .and(body_partial_json(json!({
                "Video": {"S3Object": {"Bucket": "videos", "Name": "in/people.mp4"}},
                "JobTag": "FaceDetectionJob"
            })))
            .respond_with(amz_json(json!({"JobId": "job-123"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, MAX_PAGE_SIZE).await;
        let job_id = client
            .start_job(&VideoRef::new("videos", "in/people.mp4"))
            .await
            .unwrap();
        assert_eq!(job_id.as_str(), "job-123");
    }

    #[tokio::test]
    async fn test_results_follow_next_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", GET_TARGET))
            .and(body_partial_json(json!({"JobId": "job-123", "NextToken": "page-2"})))
            .respond_with(amz_json(json!({
                "JobStatus": "SUCCEEDED",
                "Faces": [face(400, 0.5)]
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", GET_TARGET))
            .and(body_partial_json(json!({"JobId": "job-123", "MaxResults": 2})))
            .respond_with(amz_json(json!({
                "JobStatus": "SUCCEEDED",
                "VideoMetadata": {"FrameWidth": 640, "FrameHeight": 480, "Codec": "h264"},
                "Faces": [face(0, 0.1), face(200, 0.3)],
                "NextToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 2).await;
        let result = client
            .get_job_result(&DetectionJobId::from_string("job-123"))
            .await
            .unwrap();

        assert_eq!(result.status, DetectionJobStatus::Succeeded);
        let timestamps: Vec<i64> = result.faces.iter().map(|f| f.timestamp_ms).collect();
        assert_eq!(timestamps, vec![0, 200, 400]);
        assert_eq!(result.video.unwrap().frame_width, Some(640));
    }

    #[tokio::test]
    async fn test_in_progress_has_no_faces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", GET_TARGET))
            .respond_with(amz_json(json!({"JobStatus": "IN_PROGRESS"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, MAX_PAGE_SIZE).await;
        let result = client
            .get_job_result(&DetectionJobId::from_string("job-123"))
            .await
            .unwrap();

        assert_eq!(result.status, DetectionJobStatus::InProgress);
        assert!(result.faces.is_empty());
    }

    #[tokio::test]
    async fn test_failed_job_keeps_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", GET_TARGET))
            .respond_with(amz_json(json!({
                "JobStatus": "FAILED",
                "StatusMessage": "Unsupported codec"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, MAX_PAGE_SIZE).await;
        let result = client
            .get_job_result(&DetectionJobId::from_string("job-123"))
            .await
            .unwrap();

        assert_eq!(result.status, DetectionJobStatus::Failed);
        assert_eq!(result.status_message.as_deref(), Some("Unsupported codec"));
    }

    #[tokio::test]
    async fn test_unknown_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", GET_TARGET))
            .respond_with(
                ResponseTemplate::new(400).set_body_raw(
                    json!({
                        "__type": "ResourceNotFoundException",
                        "Message": "Job not found"
                    })
                    .to_string(),
                    "application/x-amz-json-1.1",
                ),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, MAX_PAGE_SIZE).await;
        let err = client
            .get_job_result(&DetectionJobId::from_string("missing"))
            .await
            .unwrap_err();

        assert!(matches!(err, DetectionError::JobNotFound { .. }), "{err:?}");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_config_defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.job_tag, "FaceDetectionJob");
        assert_eq!(config.page_size, 1000);
    }
}
