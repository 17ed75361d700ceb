//! Parsing of FFmpeg `-progress pipe:2` output.

use serde::{Deserialize, Serialize};

/// Snapshot of a running transcode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Frames written so far
    pub frame: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime (0.0 when unknown)
    pub speed: f64,
    /// Set on the final `progress=end` block
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Progress percentage given total duration in milliseconds.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).clamp(0.0, 100.0)
    }
}

/// Result of feeding one stderr line to [`ProgressParser`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    /// Key/value that belongs to a progress block still being read
    Field,
    /// End of a progress block
    Block(FfmpegProgress),
    /// Anything else FFmpeg printed (warnings, errors)
    Message(String),
}

/// Incremental parser for the key=value blocks FFmpeg emits with `-progress`.
#[derive(Debug, Default)]
pub struct ProgressParser {
    current: FfmpegProgress,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, line: &str) -> ProgressLine {
        let line = line.trim();

        let Some((key, value)) = line.split_once('=') else {
            return ProgressLine::Message(line.to_string());
        };

        match key {
            "frame" => {
                if let Ok(frame) = value.trim().parse() {
                    self.current.frame = frame;
                }
            }
            // Both keys carry microseconds despite the name of the first one
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.out_time_ms = us / 1000;
                }
            }
            "speed" => {
                self.current.speed = value
                    .trim()
                    .strip_suffix('x')
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.0);
            }
            "progress" => {
                self.current.is_complete = value == "end";
                return ProgressLine::Block(self.current.clone());
            }
            k if is_progress_key(k) => {}
            _ => return ProgressLine::Message(line.to_string()),
        }

        ProgressLine::Field
    }
}

fn is_progress_key(key: &str) -> bool {
    matches!(
        key,
        "fps"
            | "bitrate"
            | "total_size"
            | "out_time"
            | "dup_frames"
            | "drop_frames"
            | "stream_0_0_q"
    ) || key.starts_with("stream_")
}
