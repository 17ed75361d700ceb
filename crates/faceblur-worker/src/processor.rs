//! Blur job orchestration.
//!
//! A blur job checks that its detection job has succeeded, then streams the
//! source object through the staged pipeline and uploads the result. The
//! download, pipeline and upload sequence is retried from scratch for
//! retryable failures, with the whole job bounded by the configured timeout.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn, Instrument};

use faceblur_detection::{DetectionClient, DetectionError, FaceDetectionService};
use faceblur_media::{BlurOptions, BlurPipeline, FfmpegEngine, FilterEngine};
use faceblur_models::{
    BlurFacesEvent, DetectionJobId, DetectionJobResult, DetectionJobStatus, FaceDetection,
    FrameDimensions, StartDetectionEvent, VideoRef,
};
use faceblur_storage::{ObjectStore, S3Client, DEFAULT_CONTENT_TYPE};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::retry::{retry_async, RetryConfig, RetryResult};

/// Processor wired to S3, Rekognition and ffmpeg.
pub type DefaultProcessor = BlurJobProcessor<S3Client, DetectionClient, FfmpegEngine>;

/// Summary of a finished blur job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlurOutcome {
    pub source: VideoRef,
    pub destination: VideoRef,
    pub frame: FrameDimensions,
    pub detections: usize,
    pub regions: usize,
    pub attempts: u32,
}

pub struct BlurJobProcessor<S, D, E> {
    config: WorkerConfig,
    storage: S,
    detection: D,
    pipeline: BlurPipeline<E>,
}

impl DefaultProcessor {
    /// Build the processor and its clients from environment variables.
    pub async fn from_env(config: WorkerConfig) -> WorkerResult<Self> {
        let storage = S3Client::from_env()
            .await
            .map_err(|e| WorkerError::config_error(format!("storage client: {}", e)))?;
        let detection = DetectionClient::from_env().await?;
        let engine =
            FfmpegEngine::new(config.encoding.clone()).with_timeout(config.job_timeout.as_secs());

        Ok(Self::new(config, storage, detection, engine))
    }
}

impl<S, D, E> BlurJobProcessor<S, D, E>
where
    S: ObjectStore,
    D: FaceDetectionService,
    E: FilterEngine,
{
    pub fn new(config: WorkerConfig, storage: S, detection: D, engine: E) -> Self {
        let pipeline = BlurPipeline::new(engine, config.work_dir.clone());
        Self {
            config,
            storage,
            detection,
            pipeline,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Start face detection on the object named by `event`.
    pub async fn start_detection(&self, event: &StartDetectionEvent) -> WorkerResult<DetectionJobId> {
        let video = VideoRef::new(&event.bucket, &event.key);
        let job_id = self.detection.start_job(&video).await?;

        metrics::record_detection_started();
        info!(
            job_id = %job_id,
            bucket = %video.bucket,
            key = %video.key,
            "Started face detection"
        );
        Ok(job_id)
    }

    /// Current state of a detection job.
    ///
    /// With `wait` set the job is polled until it finishes. A job still
    /// running after `detection_wait_timeout` is reported in progress.
    pub async fn detection_status(
        &self,
        job_id: &DetectionJobId,
        wait: bool,
    ) -> WorkerResult<DetectionJobResult> {
        if !wait {
            return Ok(self.detection.get_job_result(job_id).await?);
        }

        let waited = self
            .detection
            .wait_for_result(
                job_id,
                self.config.detection_poll_interval,
                self.config.detection_wait_timeout,
            )
            .await;

        match waited {
            Ok(result) => Ok(result),
            Err(DetectionError::NotReady { waited_secs, .. }) => {
                info!(job_id = %job_id, waited_secs, "Detection job still running after wait");
                Ok(DetectionJobResult::in_progress(job_id.clone()))
            }
            Err(DetectionError::JobFailed { message, .. }) => {
                let mut result = DetectionJobResult::in_progress(job_id.clone());
                result.status = DetectionJobStatus::Failed;
                result.status_message = Some(message);
                Ok(result)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Blur every face found by the detection job in `event`.
    pub async fn blur_faces(&self, event: &BlurFacesEvent) -> WorkerResult<BlurOutcome> {
        let logger = JobLogger::new(event.job_id.as_str(), "blur_faces");
        let started = Instant::now();

        let result = self
            .run_blur(event, &logger)
            .instrument(logger.create_span())
            .await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(outcome) => {
                metrics::record_job("success", elapsed);
                metrics::record_regions_blurred(outcome.regions);
                logger.log_completion(&format!(
                    "{} regions written to s3://{}/{}",
                    outcome.regions, outcome.destination.bucket, outcome.destination.key
                ));
            }
            Err(e) => {
                metrics::record_job(e.kind().as_str(), elapsed);
                logger.log_error(e.kind().as_str(), &e.to_string());
            }
        }

        result
    }

    async fn run_blur(&self, event: &BlurFacesEvent, logger: &JobLogger) -> WorkerResult<BlurOutcome> {
        let source = event.source();
        let destination = event.destination(&self.config.output_key_prefix);
        logger.log_start(&format!(
            "s3://{}/{} -> s3://{}/{}",
            source.bucket, source.key, destination.bucket, destination.key
        ));

        let faces = self.finished_detections(&event.job_id).await?;
        logger.log_progress(&format!("{} face detections", faces.len()));

        let content_type = self.source_content_type(&source, logger).await;
        let options = self.config.blur_options(source.extension());
        let retry = RetryConfig::new("blur_faces")
            .with_max_retries(self.config.max_retries)
            .with_base_delay(self.config.retry_base_delay);

        let mut attempts = 0u32;
        let blur = retry_async(&retry, WorkerError::is_retryable, || {
            attempts += 1;
            self.blur_once(&source, &destination, &faces, &options, &content_type)
        });

        let timeout = self.config.job_timeout;
        let (frame, regions) = match tokio::time::timeout(timeout, blur).await {
            Err(_) => return Err(WorkerError::Timeout(timeout.as_secs())),
            Ok(RetryResult::Failed { error, .. }) => return Err(error),
            Ok(RetryResult::Success(done)) => done,
        };

        Ok(BlurOutcome {
            source,
            destination,
            frame,
            detections: faces.len(),
            regions,
            attempts,
        })
    }

    /// Detections of a succeeded job; anything else fails the precondition.
    async fn finished_detections(&self, job_id: &DetectionJobId) -> WorkerResult<Vec<FaceDetection>> {
        let result = self.detection.get_job_result(job_id).await?;
        match result.status {
            DetectionJobStatus::Succeeded => Ok(result.faces),
            DetectionJobStatus::InProgress => Err(WorkerError::DetectionNotReady {
                job_id: job_id.to_string(),
            }),
            DetectionJobStatus::Failed => Err(WorkerError::DetectionFailed {
                job_id: job_id.to_string(),
                message: result
                    .status_message
                    .unwrap_or_else(|| "no status message".to_string()),
            }),
        }
    }

    async fn source_content_type(&self, source: &VideoRef, logger: &JobLogger) -> String {
        match self.storage.content_type(source).await {
            Ok(Some(content_type)) => content_type,
            Ok(None) => DEFAULT_CONTENT_TYPE.to_string(),
            Err(e) => {
                logger.log_warning(&format!("Could not read source content type: {}", e));
                DEFAULT_CONTENT_TYPE.to_string()
            }
        }
    }

    /// One download, pipeline and upload attempt.
    async fn blur_once(
        &self,
        source: &VideoRef,
        destination: &VideoRef,
        faces: &[FaceDetection],
        options: &BlurOptions,
        content_type: &str,
    ) -> WorkerResult<(FrameDimensions, usize)> {
        let mut reader = self
            .storage
            .download(source)
            .await
            .map_err(WorkerError::Download)?;

        let started = Instant::now();
        let output = self.pipeline.run(&mut reader, faces, options).await?;
        metrics::record_transcode(output.regions == 0, started.elapsed().as_secs_f64());

        self.storage
            .upload(destination, output.path(), content_type)
            .await
            .map_err(WorkerError::Upload)?;

        let frame = output.frame;
        let regions = output.regions;
        if let Err(e) = output.close() {
            warn!("Failed to remove staged output: {}", e);
        }

        Ok((frame, regions))
    }
}
