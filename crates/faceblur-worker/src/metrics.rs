//! Job metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host process installs a recorder.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_TOTAL: &str = "faceblur_jobs_total";
    pub const JOB_DURATION_SECONDS: &str = "faceblur_job_duration_seconds";
    pub const TRANSCODE_DURATION_SECONDS: &str = "faceblur_transcode_duration_seconds";
    pub const REGIONS_BLURRED_TOTAL: &str = "faceblur_regions_blurred_total";
    pub const DETECTION_JOBS_STARTED_TOTAL: &str = "faceblur_detection_jobs_started_total";
}

/// Record a finished blur job; `status` is `success` or an error kind.
pub fn record_job(status: &str, duration_secs: f64) {
    let labels = [("status", status.to_string())];
    counter!(names::JOBS_TOTAL, &labels).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_transcode(passthrough: bool, duration_secs: f64) {
    let labels = [("passthrough", passthrough.to_string())];
    histogram!(names::TRANSCODE_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_regions_blurred(count: usize) {
    counter!(names::REGIONS_BLURRED_TOTAL).increment(count as u64);
}

pub fn record_detection_started() {
    counter!(names::DETECTION_JOBS_STARTED_TOTAL).increment(1);
}
