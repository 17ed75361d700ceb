//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use faceblur_media::{BlurMode, BlurOptions};
use faceblur_models::{BlurStrength, EncodingConfig};

/// Default prefix for blurred output keys.
pub const DEFAULT_OUTPUT_KEY_PREFIX: &str = "blurred-";

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory for staging files
    pub work_dir: PathBuf,
    /// Blur applied to every face region
    pub blur: BlurStrength,
    /// Blur each face only around its detection timestamp
    pub time_windowed: bool,
    /// How long a windowed blur stays on after its timestamp
    pub hold_ms: u64,
    /// Prefix for the output key when the event has none
    pub output_key_prefix: String,
    /// Re-encode settings
    pub encoding: EncodingConfig,
    /// Limit for the whole blur, including every retry and backoff delay
    pub job_timeout: Duration,
    /// Attempts after the first one for retryable failures
    pub max_retries: u32,
    /// Base delay for exponential backoff between attempts
    pub retry_base_delay: Duration,
    /// Delay between status polls of a waiting status request
    pub detection_poll_interval: Duration,
    /// Longest a waiting status request polls before answering in progress
    pub detection_wait_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("faceblur"),
            blur: BlurStrength::default(),
            time_windowed: false,
            hold_ms: 500,
            output_key_prefix: DEFAULT_OUTPUT_KEY_PREFIX.to_string(),
            encoding: EncodingConfig::default(),
            job_timeout: Duration::from_secs(900), // 15 minutes
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
            detection_poll_interval: Duration::from_secs(5),
            detection_wait_timeout: Duration::from_secs(900),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let encoding = EncodingConfig::default()
            .with_codec(std::env::var("ENCODE_CODEC").unwrap_or(defaults.encoding.codec))
            .with_preset(std::env::var("ENCODE_PRESET").unwrap_or(defaults.encoding.preset))
            .with_crf(
                std::env::var("ENCODE_CRF")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.encoding.crf),
            );

        Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            blur: BlurStrength::new(
                std::env::var("BLUR_RADIUS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.blur.radius),
                std::env::var("BLUR_PASSES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.blur.passes),
            ),
            time_windowed: std::env::var("BLUR_TIME_WINDOWED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.time_windowed),
            hold_ms: std::env::var("BLUR_HOLD_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.hold_ms),
            output_key_prefix: std::env::var("OUTPUT_KEY_PREFIX")
                .unwrap_or(defaults.output_key_prefix),
            encoding,
            job_timeout: Duration::from_secs(
                std::env::var("WORKER_JOB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.job_timeout.as_secs()),
            ),
            max_retries: std::env::var("WORKER_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_base_delay: defaults.retry_base_delay,
            detection_poll_interval: std::env::var("DETECTION_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.detection_poll_interval),
            detection_wait_timeout: std::env::var("DETECTION_WAIT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.detection_wait_timeout),
        }
    }

    pub fn blur_mode(&self) -> BlurMode {
        if self.time_windowed {
            BlurMode::TimeWindowed {
                hold_ms: self.hold_ms,
            }
        } else {
            BlurMode::WholeVideo
        }
    }

    /// Pipeline options for a source with the given extension.
    pub fn blur_options(&self, extension: Option<String>) -> BlurOptions {
        BlurOptions::new(self.blur)
            .with_mode(self.blur_mode())
            .with_extension(extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.output_key_prefix, "blurred-");
        assert_eq!(config.blur, BlurStrength::new(10, 2));
        assert_eq!(config.blur_mode(), BlurMode::WholeVideo);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.detection_poll_interval, Duration::from_secs(5));
        assert_eq!(config.detection_wait_timeout, Duration::from_secs(900));
    }

    #[test]
    fn test_windowed_options() {
        let config = WorkerConfig {
            time_windowed: true,
            hold_ms: 750,
            ..Default::default()
        };

        let options = config.blur_options(Some(".mov".to_string()));
        assert_eq!(options.mode, BlurMode::TimeWindowed { hold_ms: 750 });
        assert_eq!(options.extension.as_deref(), Some(".mov"));
    }
}
