#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper and staged face blur pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Timeouts via tokio, and process kill when a run is dropped
//! - Mapping of normalized face boxes onto probed frame sizes
//! - A single-pass blur filter graph for any number of faces
//! - Scoped temporary files that never outlive a run

pub mod command;
pub mod engine;
pub mod error;
pub mod filters;
pub mod mapping;
pub mod pipeline;
pub mod plan;
pub mod probe;
pub mod progress;
pub mod staging;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner, FilterScriptOption};
pub use engine::{copy_passthrough, FfmpegEngine, FilterEngine};
pub use error::{MediaError, MediaResult};
pub use filters::{build_blur_filter_graph, FilterGraph};
pub use mapping::{map_region, map_regions};
pub use pipeline::{BlurMode, BlurOptions, BlurPipeline};
pub use plan::{
    build_filter_plan, build_windowed_filter_plan, merge_directives, FilterDirective, TimeWindow,
};
pub use probe::{probe_frame_dimensions, probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressParser};
pub use staging::{StagedOutput, StagingSession};
