//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use faceblur_models::FrameDimensions;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Video file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Coded width in pixels
    pub width: u32,
    /// Coded height in pixels
    pub height: u32,
    /// Display rotation in degrees, normalized to 0, 90, 180 or 270
    pub rotation: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec
    pub codec: String,
    /// Whether the file also carries audio
    pub has_audio: bool,
}

impl VideoInfo {
    /// Frame size as seen by FFmpeg filters.
    ///
    /// FFmpeg autorotates before filtering, so a 90/270 degree rotation swaps
    /// the coded sides.
    pub fn frame_dimensions(&self) -> FrameDimensions {
        match self.rotation {
            90 | 270 => FrameDimensions::new(self.height, self.width),
            _ => FrameDimensions::new(self.width, self.height),
        }
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

/// Probe a video file for information.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::probe(
            format!("FFprobe could not read {}", path.display()),
            Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
        ));
    }

    parse_probe_output(&output.stdout)
}

/// Probe the frame size FFmpeg filters will see for this file.
pub async fn probe_frame_dimensions(path: impl AsRef<Path>) -> MediaResult<FrameDimensions> {
    let info = probe_video(path).await?;
    Ok(info.frame_dimensions())
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::probe("No video stream found", None))?;

    let (width, height) = match (video_stream.width, video_stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(MediaError::probe("Video stream has no frame size", None)),
    };

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .and_then(|r| parse_frame_rate(r))
        .or_else(|| video_stream.r_frame_rate.as_ref().and_then(|r| parse_frame_rate(r)))
        .unwrap_or(30.0);

    Ok(VideoInfo {
        duration,
        width,
        height,
        rotation: stream_rotation(video_stream),
        fps,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
        has_audio: probe.streams.iter().any(|s| s.codec_type == "audio"),
    })
}

/// Rotation from the display matrix side data, falling back to the legacy `rotate` tag.
fn stream_rotation(stream: &FfprobeStream) -> u32 {
    let degrees = stream
        .side_data_list
        .iter()
        .find_map(|sd| sd.rotation)
        .or_else(|| stream.tags.get("rotate").and_then(|r| r.parse::<f64>().ok()))
        .unwrap_or(0.0);

    (degrees.round() as i64).rem_euclid(360) as u32
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok().filter(|fps: &f64| *fps > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 640, "height": 480,
                 "avg_frame_rate": "25/1", "r_frame_rate": "25/1"}
            ],
            "format": {"duration": "12.5"}
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.frame_dimensions(), FrameDimensions::new(640, 480));
        assert_eq!(info.codec, "h264");
        assert!(info.has_audio);
        assert!((info.duration - 12.5).abs() < 0.001);
        assert!((info.fps - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_rotated_stream_swaps_dimensions() {
        let json = br#"{
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080,
                 "side_data_list": [{"side_data_type": "Display Matrix", "rotation": -90}]}
            ]
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.rotation, 270);
        assert_eq!(info.frame_dimensions(), FrameDimensions::new(1080, 1920));
        assert!(!info.has_audio);
    }

    #[test]
    fn test_legacy_rotate_tag() {
        let json = br#"{
            "streams": [
                {"codec_type": "video", "width": 1280, "height": 720, "tags": {"rotate": "90"}}
            ]
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.frame_dimensions(), FrameDimensions::new(720, 1280));
    }

    #[test]
    fn test_no_video_stream() {
        let json = br#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        let err = parse_probe_output(json).unwrap_err();
        assert!(matches!(err, MediaError::Probe { .. }));
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_video("/nonexistent/input.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
