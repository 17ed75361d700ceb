//! Video face detection client.
//!
//! This crate provides:
//! - Starting asynchronous face detection jobs on stored videos
//! - Paginated retrieval of job results
//! - Polling until a job finishes
//! - The [`FaceDetectionService`] seam used by the worker

pub mod client;
pub mod convert;
pub mod error;
pub mod service;

pub use client::{DetectionClient, DetectionConfig};
pub use error::{DetectionError, DetectionResult};
pub use service::FaceDetectionService;
