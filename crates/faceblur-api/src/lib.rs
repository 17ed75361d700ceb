//! Axum HTTP API for face detection and blurring.
//!
//! Exposes the worker's event handlers over HTTP:
//! - `POST /detections` starts a detection job
//! - `GET /detections/:job_id` reports its status and faces
//! - `POST /blur` blurs the faces of a finished job
//! - `GET /health` and `GET /metrics`

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
