//! Blur handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use faceblur_models::{BlurFacesEvent, DetectionJobId, HandlerEvent};

use crate::error::ApiResult;
use crate::handlers::detections::validate_job_id;
use crate::handlers::into_http;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct BlurRequest {
    #[validate(length(min = 3, max = 63))]
    pub bucket: String,
    #[validate(length(min = 1, max = 1024))]
    pub input_key: String,
    #[validate(length(min = 1, max = 1024))]
    pub output_key: Option<String>,
    #[validate(length(min = 3, max = 63))]
    pub output_bucket: Option<String>,
    pub job_id: String,
}

/// `POST /blur`
///
/// Runs the whole blur before answering; the response is `success` or the
/// failure message.
pub async fn blur_faces(
    State(state): State<AppState>,
    body: Result<Json<BlurRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    request.validate()?;
    validate_job_id(&request.job_id)?;

    let event = HandlerEvent::BlurFaces(BlurFacesEvent {
        bucket: request.bucket,
        input_key: request.input_key,
        output_key: request.output_key,
        output_bucket: request.output_bucket,
        job_id: DetectionJobId::from_string(request.job_id),
    });
    Ok(into_http(state.handler.handle(&event).await))
}
