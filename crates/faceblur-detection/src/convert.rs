//! Conversion from Rekognition response types to service models.
//!
//! Results follow the video `GetFaceDetection` shape, where every entry
//! nests its box under `Face.BoundingBox` next to a `Timestamp`. Entries
//! without a complete box are skipped.

use aws_sdk_rekognition::types::{
    BoundingBox as SdkBoundingBox, FaceDetection as SdkFaceDetection, VideoJobStatus,
    VideoMetadata,
};

use faceblur_models::{BoundingBox, DetectionJobStatus, FaceDetection, ReportedVideoMetadata};

use crate::error::{DetectionError, DetectionResult};

pub fn job_status(status: Option<&VideoJobStatus>) -> DetectionResult<DetectionJobStatus> {
    match status {
        Some(VideoJobStatus::InProgress) => Ok(DetectionJobStatus::InProgress),
        Some(VideoJobStatus::Succeeded) => Ok(DetectionJobStatus::Succeeded),
        Some(VideoJobStatus::Failed) => Ok(DetectionJobStatus::Failed),
        Some(other) => Err(DetectionError::InvalidResponse(format!(
            "Unknown job status {}",
            other.as_str()
        ))),
        None => Err(DetectionError::InvalidResponse(
            "Response has no job status".to_string(),
        )),
    }
}

pub fn bounding_box(bbox: &SdkBoundingBox) -> Option<BoundingBox> {
    Some(BoundingBox::new(
        f64::from(bbox.left()?),
        f64::from(bbox.top()?),
        f64::from(bbox.width()?),
        f64::from(bbox.height()?),
    ))
}

pub fn face_detection(detection: &SdkFaceDetection) -> Option<FaceDetection> {
    let bbox = detection.face()?.bounding_box()?;
    Some(FaceDetection::new(detection.timestamp(), bounding_box(bbox)?))
}

pub fn face_detections(detections: &[SdkFaceDetection]) -> Vec<FaceDetection> {
    detections.iter().filter_map(face_detection).collect()
}

pub fn video_metadata(meta: &VideoMetadata) -> ReportedVideoMetadata {
    ReportedVideoMetadata {
        frame_width: meta.frame_width().and_then(|w| u32::try_from(w).ok()),
        frame_height: meta.frame_height().and_then(|h| u32::try_from(h).ok()),
        frame_rate: meta.frame_rate().map(f64::from),
        duration_ms: meta.duration_millis(),
        codec: meta.codec().map(str::to_string),
    }
}
