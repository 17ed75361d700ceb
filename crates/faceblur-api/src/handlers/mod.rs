//! HTTP handlers.

pub mod blur;
pub mod detections;
pub mod health;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use faceblur_models::HandlerResponse;

pub use blur::blur_faces;
pub use detections::{get_detection, start_detection};
pub use health::health;

/// Map a handler response onto HTTP, keeping its status code. JSON object
/// bodies are sent as JSON, anything else as plain text.
pub(crate) fn into_http(response: HandlerResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match serde_json::from_str::<serde_json::Value>(&response.body) {
        Ok(value) if value.is_object() => (status, Json(value)).into_response(),
        _ => (status, response.body).into_response(),
    }
}
