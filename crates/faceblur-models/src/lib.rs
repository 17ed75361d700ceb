//! Shared data models for the face blur service.
//!
//! This crate provides Serde-serializable types for:
//! - Normalized bounding boxes, probed frame sizes and pixel regions
//! - Face detection jobs and their results
//! - Blur strength and encoding settings
//! - Handler events and responses

pub mod blur;
pub mod detection;
pub mod encoding;
pub mod geometry;
pub mod handler;

// Re-export common types
pub use blur::BlurStrength;
pub use detection::{
    DetectionJobId, DetectionJobResult, DetectionJobStatus, FaceDetection, ReportedVideoMetadata,
};
pub use encoding::EncodingConfig;
pub use geometry::{BoundingBox, FrameDimensions, PixelRegion};
pub use handler::{
    BlurFacesEvent, DetectionStatusEvent, HandlerEvent, HandlerResponse, StartDetectionEvent, VideoRef,
};
