//! Face blur job orchestrator.
//!
//! This crate provides:
//! - The blur job processor (detection precondition, download, pipeline, upload)
//! - Event handlers with the status code and body contract
//! - Retries with backoff, job logging and metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod retry;

pub use config::WorkerConfig;
pub use error::{ErrorKind, WorkerError, WorkerResult};
pub use handlers::{dispatch, parse_event, EventHandler};
pub use logging::JobLogger;
pub use processor::{BlurJobProcessor, BlurOutcome, DefaultProcessor};
pub use retry::{retry_async, RetryConfig, RetryResult};
