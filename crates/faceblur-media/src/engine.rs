//! Filter engine seam and its FFmpeg implementation.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use faceblur_models::{EncodingConfig, FrameDimensions};

use crate::command::{FfmpegCommand, FfmpegRunner, FilterScriptOption};
use crate::error::MediaResult;
use crate::filters::build_blur_filter_graph;
use crate::plan::FilterDirective;
use crate::probe::probe_frame_dimensions;

/// External engine that reads frame sizes and applies blur directives.
#[async_trait]
pub trait FilterEngine: Send + Sync {
    /// Frame size of `input` as the engine's filters will see it.
    async fn probe(&self, input: &Path) -> MediaResult<FrameDimensions>;

    /// Write `input` with every directive applied to `output`.
    ///
    /// The filter graph is written to `filter_script` rather than passed on
    /// the command line, so the number of regions is not bounded by the
    /// argument size limit. An empty directive list copies the input
    /// unchanged.
    async fn transcode(
        &self,
        input: &Path,
        directives: &[FilterDirective],
        filter_script: &Path,
        output: &Path,
    ) -> MediaResult<()>;
}

/// Byte-for-byte copy used when there is nothing to blur.
pub async fn copy_passthrough(input: &Path, output: &Path) -> MediaResult<u64> {
    let bytes = tokio::fs::copy(input, output).await?;
    debug!(bytes, "Copied input without filtering");
    Ok(bytes)
}

/// FFmpeg-backed [`FilterEngine`].
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    encoding: EncodingConfig,
    runner: FfmpegRunner,
}

impl FfmpegEngine {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            runner: FfmpegRunner::new(),
        }
    }

    /// Kill the transcode if it runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }

    fn blur_command(
        &self,
        input: &Path,
        script: &Path,
        option: FilterScriptOption,
        label: &str,
        output: &Path,
    ) -> FfmpegCommand {
        FfmpegCommand::new(input, output)
            .filter_complex_script(script, option)
            .map(label)
            .map("0:a?")
            .video_codec(&self.encoding.codec)
            .preset(&self.encoding.preset)
            .crf(self.encoding.crf)
            .audio_codec("copy")
            .output_args(["-map_metadata", "0"])
    }
}

#[async_trait]
impl FilterEngine for FfmpegEngine {
    async fn probe(&self, input: &Path) -> MediaResult<FrameDimensions> {
        probe_frame_dimensions(input).await
    }

    async fn transcode(
        &self,
        input: &Path,
        directives: &[FilterDirective],
        filter_script: &Path,
        output: &Path,
    ) -> MediaResult<()> {
        let Some(graph) = build_blur_filter_graph(directives) else {
            copy_passthrough(input, output).await?;
            return Ok(());
        };

        tokio::fs::write(filter_script, &graph.expression).await?;
        info!(
            regions = graph.regions,
            graph_bytes = graph.expression.len(),
            codec = %self.encoding.codec,
            "Blurring face regions"
        );

        let option = FilterScriptOption::detect().await;
        let cmd = self.blur_command(input, filter_script, option, &graph.output_label, output);
        self.runner
            .run_with_progress(&cmd, |progress| {
                debug!(
                    frame = progress.frame,
                    out_time_ms = progress.out_time_ms,
                    speed = progress.speed,
                    "Transcode progress"
                );
            })
            .await
    }
}
