//! Application state.

use std::sync::Arc;

use faceblur_worker::{DefaultProcessor, EventHandler, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub handler: Arc<dyn EventHandler>,
}

impl AppState {
    /// Create state backed by S3, Rekognition and ffmpeg.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let processor = DefaultProcessor::from_env(WorkerConfig::from_env()).await?;
        Ok(Self::with_handler(config, Arc::new(processor)))
    }

    pub fn with_handler(config: ApiConfig, handler: Arc<dyn EventHandler>) -> Self {
        Self { config, handler }
    }
}
