//! Staged blur pipeline.
//!
//! One run goes through:
//!
//! 1. **Acquire** temporary input and output files
//! 2. **Stage** the input stream into the temporary input
//! 3. **Probe** the staged file for its frame size
//! 4. **Plan** one blur directive per face region
//! 5. **Transcode** with every directive, or copy when there are none
//! 6. **Publish** the temporary output to the caller
//!
//! Failures surface as [`MediaError::Staging`], [`MediaError::Probe`] or
//! [`MediaError::Transcode`]. Every temporary is gone by the time an error
//! is returned, and all but the output are gone by the time a result is
//! returned.
//! Retries are left to the caller.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use tracing::{debug, info};

use faceblur_models::{BlurStrength, FaceDetection, FrameDimensions};

use crate::engine::{copy_passthrough, FilterEngine};
use crate::error::{MediaError, MediaResult};
use crate::mapping::map_regions;
use crate::plan::{build_filter_plan, build_windowed_filter_plan, FilterDirective};
use crate::staging::{StagedOutput, StagingSession};

/// How detections turn into blur directives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum BlurMode {
    /// Every detected box is blurred on every frame
    #[default]
    WholeVideo,
    /// Each box is blurred from its timestamp for `hold_ms`
    TimeWindowed { hold_ms: u64 },
}

/// Per-run blur settings.
#[derive(Debug, Clone, Default)]
pub struct BlurOptions {
    pub strength: BlurStrength,
    pub mode: BlurMode,
    /// Source file extension, kept on the temporaries so the output container matches
    pub extension: Option<String>,
}

impl BlurOptions {
    pub fn new(strength: BlurStrength) -> Self {
        Self {
            strength,
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: BlurMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_extension(mut self, extension: Option<String>) -> Self {
        self.extension = extension;
        self
    }

    /// Directives for `detections` on a frame of size `frame`.
    pub fn plan(&self, detections: &[FaceDetection], frame: FrameDimensions) -> Vec<FilterDirective> {
        match self.mode {
            BlurMode::WholeVideo => {
                let boxes = detections.iter().map(|d| &d.bounding_box);
                build_filter_plan(&map_regions(boxes, frame), self.strength)
            }
            BlurMode::TimeWindowed { hold_ms } => {
                build_windowed_filter_plan(detections, frame, self.strength, hold_ms)
            }
        }
    }
}

/// Runs staged blurs against a [`FilterEngine`].
#[derive(Debug, Clone)]
pub struct BlurPipeline<E> {
    engine: E,
    work_dir: PathBuf,
}

impl<E: FilterEngine> BlurPipeline<E> {
    pub fn new(engine: E, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Blur `detections` in the video read from `input`.
    ///
    /// The returned [`StagedOutput`] deletes itself on drop; persist or upload
    /// it before letting it go.
    pub async fn run<R>(
        &self,
        input: &mut R,
        detections: &[FaceDetection],
        options: &BlurOptions,
    ) -> MediaResult<StagedOutput>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let session = StagingSession::acquire(&self.work_dir, options.extension.as_deref()).await?;

        let bytes = session.stage(input).await?;
        debug!(bytes, path = %session.input_path().display(), "Staged input");

        let frame = self
            .engine
            .probe(session.input_path())
            .await
            .map_err(MediaError::into_probe)?;
        if frame.is_empty() {
            return Err(MediaError::probe(format!("Invalid frame size {}", frame), None));
        }

        let directives = options.plan(detections, frame);
        info!(
            frame = %frame,
            detections = detections.len(),
            regions = directives.len(),
            "Planned face blur"
        );

        if directives.is_empty() {
            copy_passthrough(session.input_path(), session.output_path())
                .await
                .map_err(MediaError::into_transcode)?;
        } else {
            self.engine
                .transcode(
                    session.input_path(),
                    &directives,
                    session.script_path(),
                    session.output_path(),
                )
                .await
                .map_err(MediaError::into_transcode)?;
        }

        Ok(session.publish(frame, directives.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use faceblur_models::BoundingBox;
    use std::io;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    use crate::command::FfmpegCommand;
    use crate::engine::FfmpegEngine;

    #[derive(Default)]
    struct FakeEngine {
        frame: Option<FrameDimensions>,
        fail_transcode: bool,
        calls: Mutex<Vec<Vec<FilterDirective>>>,
        /// Size of the graph each call wrote to its script
        script_bytes: Mutex<Vec<usize>>,
    }

    impl FakeEngine {
        fn with_frame(width: u32, height: u32) -> Self {
            Self {
                frame: Some(FrameDimensions::new(width, height)),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl FilterEngine for FakeEngine {
        async fn probe(&self, input: &Path) -> MediaResult<FrameDimensions> {
            assert!(input.exists());
            self.frame
                .ok_or_else(|| MediaError::probe("No video stream found", None))
        }

        async fn transcode(
            &self,
            input: &Path,
            directives: &[FilterDirective],
            filter_script: &Path,
            output: &Path,
        ) -> MediaResult<()> {
            self.calls.lock().unwrap().push(directives.to_vec());
            let graph = crate::filters::build_blur_filter_graph(directives)
                .ok_or_else(|| MediaError::transcode("empty plan", None, None))?;
            std::fs::write(filter_script, &graph.expression)?;
            self.script_bytes.lock().unwrap().push(graph.expression.len());
            if self.fail_transcode {
                return Err(MediaError::transcode("engine exited", Some("boom".into()), Some(1)));
            }
            let mut data = std::fs::read(input)?;
            data.extend_from_slice(b"-blurred");
            std::fs::write(output, data)?;
            Ok(())
        }
    }

    /// Reader that yields some bytes and then fails.
    struct BrokenReader {
        sent: bool,
    }

    impl AsyncRead for BrokenReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")));
            }
            self.sent = true;
            buf.put_slice(b"partial");
            Poll::Ready(Ok(()))
        }
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    fn faces(boxes: &[BoundingBox]) -> Vec<FaceDetection> {
        boxes
            .iter()
            .enumerate()
            .map(|(i, b)| FaceDetection::new(i as i64 * 200, *b))
            .collect()
    }

    #[tokio::test]
    async fn test_no_faces_copies_input() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = BlurPipeline::new(FakeEngine::with_frame(640, 480), dir.path());

        let source = b"\x00\x00\x00\x18ftypmp42 some video payload".to_vec();
        let output = pipeline
            .run(&mut source.as_slice(), &[], &BlurOptions::default())
            .await
            .unwrap();

        assert_eq!(std::fs::read(output.path()).unwrap(), source);
        assert_eq!(output.regions, 0);
        assert!(pipeline.engine().calls.lock().unwrap().is_empty());
        assert_eq!(entries(dir.path()), 1);

        drop(output);
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_every_face_reaches_engine_in_one_call() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = BlurPipeline::new(FakeEngine::with_frame(640, 480), dir.path());

        let detections = faces(&[
            BoundingBox::new(0.1, 0.2, 0.1, 0.1),
            BoundingBox::new(0.5, 0.5, 0.2, 0.2),
            BoundingBox::new(0.5, 0.5, 0.0, 0.2),
            BoundingBox::new(0.9, 0.9, 0.3, 0.3),
        ]);

        let output = pipeline
            .run(&mut &b"video"[..], &detections, &BlurOptions::default())
            .await
            .unwrap();

        let calls = pipeline.engine().calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 3);
        assert_eq!(calls[0][0].region, faceblur_models::PixelRegion::new(64, 96, 64, 48));
        assert!(calls[0].iter().all(|d| d.window.is_none()));
        assert_eq!(output.regions, 3);
        assert_eq!(output.frame, FrameDimensions::new(640, 480));
        assert_eq!(std::fs::read(output.path()).unwrap(), b"video-blurred");
    }

    #[tokio::test]
    async fn test_time_windowed_mode() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = BlurPipeline::new(FakeEngine::with_frame(100, 100), dir.path());
        let options = BlurOptions::default().with_mode(BlurMode::TimeWindowed { hold_ms: 500 });

        let detections = faces(&[BoundingBox::new(0.1, 0.1, 0.2, 0.2)]);
        pipeline
            .run(&mut &b"video"[..], &detections, &options)
            .await
            .unwrap();

        let calls = pipeline.engine().calls.lock().unwrap();
        let window = calls[0][0].window.unwrap();
        assert_eq!((window.start_ms, window.end_ms), (0, 500));
    }

    #[tokio::test]
    async fn test_staging_failure_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = BlurPipeline::new(FakeEngine::with_frame(640, 480), dir.path());

        let err = pipeline
            .run(&mut BrokenReader { sent: false }, &[], &BlurOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::Staging(_)), "{err:?}");
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = BlurPipeline::new(FakeEngine::default(), dir.path());

        let err = pipeline
            .run(&mut &b"text"[..], &[], &BlurOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::Probe { .. }), "{err:?}");
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_transcode_failure_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine {
            fail_transcode: true,
            ..FakeEngine::with_frame(640, 480)
        };
        let pipeline = BlurPipeline::new(engine, dir.path());
        let detections = faces(&[BoundingBox::new(0.1, 0.1, 0.2, 0.2)]);

        let err = pipeline
            .run(&mut &b"video"[..], &detections, &BlurOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.stderr(), Some("boom"));
        assert!(matches!(err, MediaError::Transcode { exit_code: Some(1), .. }));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_cancelled_run_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = BlurPipeline::new(FakeEngine::with_frame(640, 480), dir.path());

        // Input that never finishes; the run is dropped mid-stage
        let (_writer, mut reader) = tokio::io::duplex(64);
        let options = BlurOptions::default();
        let run = pipeline.run(&mut reader, &[], &options);
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(50), run).await;

        assert!(timed_out.is_err());
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_thousands_of_detections() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = BlurPipeline::new(FakeEngine::with_frame(1920, 1080), dir.path());

        // One face sampled 3000 times, drifting slightly between samples
        let detections: Vec<FaceDetection> = (0..3000)
            .map(|i| {
                let drift = f64::from(i % 300) / 10_000.0;
                FaceDetection::new(i64::from(i) * 200, BoundingBox::new(0.4 + drift, 0.3, 0.1, 0.2))
            })
            .collect();

        let output = pipeline
            .run(&mut &b"video"[..], &detections, &BlurOptions::default())
            .await
            .unwrap();

        let calls = pipeline.engine().calls.lock().unwrap();
        let distinct: std::collections::HashSet<_> = calls[0].iter().map(|d| d.region).collect();
        assert_eq!(calls[0].len(), distinct.len());
        assert!(output.regions < 3000);
        assert_eq!(output.regions, calls[0].len());

        // The graph went through the script file, which is gone after publish
        assert!(pipeline.engine().script_bytes.lock().unwrap()[0] > 0);
        assert_eq!(entries(dir.path()), 1);
    }

    #[tokio::test]
    async fn test_extension_kept_on_output() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = BlurPipeline::new(FakeEngine::with_frame(640, 480), dir.path());
        let options = BlurOptions::default().with_extension(Some(".mov".into()));

        let output = pipeline.run(&mut &b"v"[..], &[], &options).await.unwrap();
        assert_eq!(output.path().extension().unwrap(), "mov");
    }

    async fn has_encoder(name: &str) -> bool {
        match tokio::process::Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .output()
            .await
        {
            Ok(out) => String::from_utf8_lossy(&out.stdout).contains(name),
            Err(_) => false,
        }
    }

    async fn frame_hashes(path: &Path) -> String {
        let out = tokio::process::Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-map", "0:v", "-f", "framemd5", "-"])
            .output()
            .await
            .unwrap();
        assert!(out.status.success());
        String::from_utf8(out.stdout).unwrap()
    }

    #[tokio::test]
    async fn test_ffmpeg_blur_is_repeatable() {
        if crate::command::check_ffmpeg().is_err()
            || crate::command::check_ffprobe().is_err()
            || !has_encoder("libx264").await
        {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.mp4");
        let work_dir = dir.path().join("work");

        // Generate a short test clip
        let generate = FfmpegCommand::new("testsrc=size=320x240:rate=10:duration=1", &source)
            .input_arg("-f")
            .input_arg("lavfi")
            .video_codec("mpeg4");
        crate::command::FfmpegRunner::new().run(&generate).await.unwrap();

        let pipeline = BlurPipeline::new(FfmpegEngine::default().with_timeout(60), &work_dir);
        let options = BlurOptions::default().with_extension(Some("mp4".into()));
        let detections = faces(&[
            BoundingBox::new(0.1, 0.2, 0.1, 0.1),
            BoundingBox::new(0.6, 0.4, 0.3, 0.3),
        ]);

        let mut first_in = tokio::fs::File::open(&source).await.unwrap();
        let first = pipeline.run(&mut first_in, &detections, &options).await.unwrap();
        let mut second_in = tokio::fs::File::open(&source).await.unwrap();
        let second = pipeline.run(&mut second_in, &detections, &options).await.unwrap();

        assert_eq!(first.frame, FrameDimensions::new(320, 240));
        assert_eq!(first.regions, 2);
        assert_eq!(frame_hashes(first.path()).await, frame_hashes(second.path()).await);
        assert_ne!(frame_hashes(first.path()).await, frame_hashes(&source).await);

        drop(first);
        drop(second);
        assert_eq!(entries(&work_dir), 0);
    }
}
