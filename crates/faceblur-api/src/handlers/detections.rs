//! Detection job handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use faceblur_models::{DetectionJobId, DetectionStatusEvent, HandlerEvent, StartDetectionEvent};

use crate::error::{ApiError, ApiResult};
use crate::handlers::into_http;
use crate::state::AppState;

const MAX_JOB_ID_LEN: usize = 64;

#[derive(Debug, Deserialize, Validate)]
pub struct StartDetectionRequest {
    #[validate(length(min = 3, max = 63))]
    pub bucket: String,
    #[validate(length(min = 1, max = 1024))]
    pub key: String,
}

/// `POST /detections`
pub async fn start_detection(
    State(state): State<AppState>,
    body: Result<Json<StartDetectionRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    request.validate()?;

    let event = HandlerEvent::StartDetection(StartDetectionEvent {
        bucket: request.bucket,
        key: request.key,
    });
    Ok(into_http(state.handler.handle(&event).await))
}

#[derive(Debug, Default, Deserialize)]
pub struct DetectionStatusQuery {
    /// Block until the job finishes
    #[serde(default)]
    pub wait: bool,
}

/// `GET /detections/:job_id[?wait=true]`
pub async fn get_detection(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<DetectionStatusQuery>,
) -> ApiResult<Response> {
    validate_job_id(&job_id)?;

    let event = HandlerEvent::DetectionStatus(DetectionStatusEvent {
        job_id: DetectionJobId::from_string(job_id),
        wait: query.wait,
    });
    Ok(into_http(state.handler.handle(&event).await))
}

/// Detection job ids are short runs of ASCII letters, digits, `-` and `_`.
pub(crate) fn validate_job_id(job_id: &str) -> ApiResult<()> {
    let valid = !job_id.is_empty()
        && job_id.len() <= MAX_JOB_ID_LEN
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("Invalid job id: {}", job_id)))
    }
}
