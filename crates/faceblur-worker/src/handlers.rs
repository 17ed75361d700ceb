//! Event handlers.
//!
//! Each handler turns a processor call into a [`HandlerResponse`]; errors are
//! reported in the body rather than returned.

use async_trait::async_trait;
use serde_json::json;
use tracing::error;

use faceblur_detection::FaceDetectionService;
use faceblur_media::FilterEngine;
use faceblur_models::{
    BlurFacesEvent, DetectionJobId, DetectionJobStatus, DetectionStatusEvent, HandlerEvent,
    HandlerResponse, StartDetectionEvent,
};
use faceblur_storage::ObjectStore;

use crate::error::WorkerError;
use crate::processor::BlurJobProcessor;

pub const DETECTION_SUCCEEDED_MESSAGE: &str = "Face detection completed successfully";
pub const DETECTION_IN_PROGRESS_MESSAGE: &str = "Face detection is still in progress";

/// Body of a successful blur response.
pub const BLUR_SUCCESS_BODY: &str = "success";

/// Anything that can answer handler events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &HandlerEvent) -> HandlerResponse;
}

#[async_trait]
impl<S, D, E> EventHandler for BlurJobProcessor<S, D, E>
where
    S: ObjectStore,
    D: FaceDetectionService,
    E: FilterEngine,
{
    async fn handle(&self, event: &HandlerEvent) -> HandlerResponse {
        dispatch(self, event).await
    }
}

/// Parse a raw event; a malformed one becomes the 500 response to print.
pub fn parse_event(raw: &str) -> Result<HandlerEvent, HandlerResponse> {
    serde_json::from_str(raw).map_err(|e| {
        let err = WorkerError::invalid_event(e.to_string());
        error!("Rejected event: {}", err);
        HandlerResponse::error(err.to_string())
    })
}

/// Route an event to its handler.
pub async fn dispatch<S, D, E>(
    processor: &BlurJobProcessor<S, D, E>,
    event: &HandlerEvent,
) -> HandlerResponse
where
    S: ObjectStore,
    D: FaceDetectionService,
    E: FilterEngine,
{
    match event {
        HandlerEvent::StartDetection(event) => start_detection(processor, event).await,
        HandlerEvent::DetectionStatus(event) => detection_status(processor, event).await,
        HandlerEvent::BlurFaces(event) => blur_faces(processor, event).await,
    }
}

/// 200 with `{"job_id": ...}`.
pub async fn start_detection<S, D, E>(
    processor: &BlurJobProcessor<S, D, E>,
    event: &StartDetectionEvent,
) -> HandlerResponse
where
    S: ObjectStore,
    D: FaceDetectionService,
    E: FilterEngine,
{
    match processor.start_detection(event).await {
        Ok(job_id) => HandlerResponse::json(&json!({ "job_id": job_id })),
        Err(e) => {
            error!(bucket = %event.bucket, key = %event.key, "Failed to start face detection: {}", e);
            message_response(500, &e.to_string())
        }
    }
}

/// 200 with the faces once the job succeeded, 200 while it runs, 500 when
/// it failed. A waiting event polls until the job finishes first.
pub async fn detection_status<S, D, E>(
    processor: &BlurJobProcessor<S, D, E>,
    event: &DetectionStatusEvent,
) -> HandlerResponse
where
    S: ObjectStore,
    D: FaceDetectionService,
    E: FilterEngine,
{
    status_response(processor, &event.job_id, event.wait).await
}

async fn status_response<S, D, E>(
    processor: &BlurJobProcessor<S, D, E>,
    job_id: &DetectionJobId,
    wait: bool,
) -> HandlerResponse
where
    S: ObjectStore,
    D: FaceDetectionService,
    E: FilterEngine,
{
    let result = match processor.detection_status(job_id, wait).await {
        Ok(result) => result,
        Err(e) => {
            error!(job_id = %job_id, "Failed to get detection status: {}", e);
            return message_response(500, &e.to_string());
        }
    };

    match result.status {
        DetectionJobStatus::Succeeded => HandlerResponse::json(&json!({
            "message": DETECTION_SUCCEEDED_MESSAGE,
            "status": result.status,
            "faces": result.faces,
        })),
        DetectionJobStatus::InProgress => HandlerResponse::json(&json!({
            "message": DETECTION_IN_PROGRESS_MESSAGE,
            "status": result.status,
        })),
        DetectionJobStatus::Failed => message_response(
            500,
            &format!("Face detection job failed with status: {}", result.status),
        ),
    }
}

/// 200 `success`, or 500 with the error message.
pub async fn blur_faces<S, D, E>(
    processor: &BlurJobProcessor<S, D, E>,
    event: &BlurFacesEvent,
) -> HandlerResponse
where
    S: ObjectStore,
    D: FaceDetectionService,
    E: FilterEngine,
{
    match processor.blur_faces(event).await {
        Ok(_) => HandlerResponse::ok(BLUR_SUCCESS_BODY),
        Err(e) => HandlerResponse::error(e.to_string()),
    }
}

fn message_response(status_code: u16, message: &str) -> HandlerResponse {
    let mut response = HandlerResponse::json(&json!({ "message": message }));
    response.status_code = status_code;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::tests::{
        blur_event, test_config, two_faces, FixedDetection, MarkerEngine, MemoryStore,
    };
    use serde_json::Value;

    fn processor(
        dir: &std::path::Path,
        detection: FixedDetection,
    ) -> BlurJobProcessor<MemoryStore, FixedDetection, MarkerEngine> {
        BlurJobProcessor::new(
            test_config(dir),
            MemoryStore::with_object("videos", "in/walking.mov", b"source"),
            detection,
            MarkerEngine::default(),
        )
    }

    fn body(response: &HandlerResponse) -> Value {
        serde_json::from_str(&response.body).unwrap()
    }

    fn status_event() -> HandlerEvent {
        HandlerEvent::DetectionStatus(DetectionStatusEvent::new(DetectionJobId::from_string("job-1")))
    }

    #[test]
    fn test_parse_event() {
        let event = parse_event(r#"{"action":"detection_status","job_id":"job-1"}"#).unwrap();
        assert_eq!(event.action(), "detection_status");
    }

    #[test]
    fn test_malformed_event_is_error_response() {
        for raw in ["", "{not json", r#"{"action":"resize"}"#, r#"{"action":"blur_faces"}"#] {
            let response = parse_event(raw).unwrap_err();
            assert_eq!(response.status_code, 500, "{raw}");
            assert!(response.body.starts_with("Invalid event: "), "{}", response.body);

            // The response itself must print as JSON
            let printed: Value = serde_json::from_str(&serde_json::to_string(&response).unwrap()).unwrap();
            assert_eq!(printed["statusCode"], 500);
        }
    }

    #[tokio::test]
    async fn test_start_returns_job_id() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(dir.path(), FixedDetection::succeeded(Vec::new()));
        let event = HandlerEvent::StartDetection(StartDetectionEvent {
            bucket: "videos".into(),
            key: "in/walking.mov".into(),
        });

        let response = dispatch(&processor, &event).await;

        assert_eq!(response.status_code, 200);
        assert_eq!(body(&response)["job_id"], "job-1");
    }

    #[tokio::test]
    async fn test_start_failure_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(dir.path(), FixedDetection::succeeded(Vec::new()));
        let event = HandlerEvent::StartDetection(StartDetectionEvent {
            bucket: "videos".into(),
            key: String::new(),
        });

        let response = dispatch(&processor, &event).await;

        assert_eq!(response.status_code, 500);
        assert!(body(&response)["message"].as_str().unwrap().contains("empty key"));
    }

    #[tokio::test]
    async fn test_status_succeeded_lists_faces() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(dir.path(), FixedDetection::succeeded(two_faces()));

        let response = dispatch(&processor, &status_event()).await;

        assert_eq!(response.status_code, 200);
        let body = body(&response);
        assert_eq!(body["message"], DETECTION_SUCCEEDED_MESSAGE);
        assert_eq!(body["status"], "SUCCEEDED");
        assert_eq!(body["faces"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_status_in_progress() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(
            dir.path(),
            FixedDetection::with_status(DetectionJobStatus::InProgress),
        );

        let response = dispatch(&processor, &status_event()).await;

        assert_eq!(response.status_code, 200);
        assert_eq!(body(&response)["message"], DETECTION_IN_PROGRESS_MESSAGE);
        assert!(body(&response).get("faces").is_none());
    }

    #[tokio::test]
    async fn test_status_failed_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(dir.path(), FixedDetection::with_status(DetectionJobStatus::Failed));

        let response = dispatch(&processor, &status_event()).await;

        assert_eq!(response.status_code, 500);
        assert_eq!(
            body(&response)["message"],
            "Face detection job failed with status: FAILED"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_status_returns_faces() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(dir.path(), FixedDetection::succeeded(two_faces()).after_polls(2));
        let event = HandlerEvent::DetectionStatus(DetectionStatusEvent {
            job_id: DetectionJobId::from_string("job-1"),
            wait: true,
        });

        let response = dispatch(&processor, &event).await;

        assert_eq!(response.status_code, 200);
        assert_eq!(body(&response)["status"], "SUCCEEDED");
        assert_eq!(body(&response)["faces"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_blur_success_body() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(dir.path(), FixedDetection::succeeded(two_faces()));

        let response = dispatch(&processor, &HandlerEvent::BlurFaces(blur_event())).await;

        assert_eq!(response, HandlerResponse::ok("success"));
    }

    #[tokio::test]
    async fn test_event_handler_object() {
        let dir = tempfile::tempdir().unwrap();
        let handler: Box<dyn EventHandler> =
            Box::new(processor(dir.path(), FixedDetection::succeeded(two_faces())));

        let response = handler.handle(&status_event()).await;

        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_blur_not_ready_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(
            dir.path(),
            FixedDetection::with_status(DetectionJobStatus::InProgress),
        );

        let response = dispatch(&processor, &HandlerEvent::BlurFaces(blur_event())).await;

        assert_eq!(response.status_code, 500);
        assert!(response.body.contains("has not finished"), "{}", response.body);
    }
}
