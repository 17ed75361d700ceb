//! Face detection seam.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use faceblur_models::{DetectionJobId, DetectionJobResult, DetectionJobStatus, VideoRef};

use crate::error::{DetectionError, DetectionResult};

/// Asynchronous video face detection jobs.
#[async_trait]
pub trait FaceDetectionService: Send + Sync {
    /// Start a detection job for `video`.
    async fn start_job(&self, video: &VideoRef) -> DetectionResult<DetectionJobId>;

    /// Current state of a job, with every detection once it has succeeded.
    async fn get_job_result(&self, job_id: &DetectionJobId) -> DetectionResult<DetectionJobResult>;

    /// Poll every `interval` until the job succeeds.
    ///
    /// A failed job is returned as [`DetectionError::JobFailed`]; a job still
    /// running after `timeout` as [`DetectionError::NotReady`].
    async fn wait_for_result(
        &self,
        job_id: &DetectionJobId,
        interval: Duration,
        timeout: Duration,
    ) -> DetectionResult<DetectionJobResult> {
        let started = Instant::now();

        loop {
            let result = self.get_job_result(job_id).await?;
            match result.status {
                DetectionJobStatus::Succeeded => return Ok(result),
                DetectionJobStatus::Failed => {
                    return Err(DetectionError::JobFailed {
                        job_id: job_id.to_string(),
                        message: result
                            .status_message
                            .unwrap_or_else(|| "no status message".to_string()),
                    })
                }
                DetectionJobStatus::InProgress => {}
            }

            if started.elapsed() + interval > timeout {
                return Err(DetectionError::NotReady {
                    job_id: job_id.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }

            debug!(job_id = %job_id, "Detection job in progress, polling again in {:?}", interval);
            tokio::time::sleep(interval).await;
        }
    }
}
