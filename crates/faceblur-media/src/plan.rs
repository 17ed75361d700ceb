//! Filter plan: one blur directive per face region.
//!
//! Directives are engine-agnostic. The FFmpeg syntax for them is produced
//! by [`crate::filters`] when the transcode is issued.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use faceblur_models::{BlurStrength, FaceDetection, FrameDimensions, PixelRegion};

use crate::mapping::map_region;

/// Time range during which a directive is active, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeWindow {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self {
            start_ms: start_ms.max(0),
            end_ms: end_ms.max(start_ms.max(0)),
        }
    }

    /// Window starting at `timestamp_ms` and lasting `hold_ms`.
    pub fn held(timestamp_ms: i64, hold_ms: u64) -> Self {
        let hold = i64::try_from(hold_ms).unwrap_or(i64::MAX);
        Self::new(timestamp_ms, timestamp_ms.saturating_add(hold))
    }

    pub fn start_secs(&self) -> f64 {
        self.start_ms as f64 / 1000.0
    }

    pub fn end_secs(&self) -> f64 {
        self.end_ms as f64 / 1000.0
    }
}

/// Blur one pixel region, optionally only inside a time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterDirective {
    pub region: PixelRegion,
    pub strength: BlurStrength,
    /// `None` blurs the region on every frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<TimeWindow>,
}

impl FilterDirective {
    pub fn new(region: PixelRegion, strength: BlurStrength) -> Self {
        Self {
            region,
            strength,
            window: None,
        }
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Blur radius that the region can actually hold.
    ///
    /// A box blur needs `2 * radius` to fit in the smallest plane of the
    /// region, and with 4:2:0 chroma that plane is half the luma size
    /// rounded up. Every region of 3 pixels or more gets at least radius 1;
    /// below that no box blur fits and the radius is 0.
    pub fn effective_radius(&self) -> u32 {
        let chroma_side = self.region.w.min(self.region.h).div_ceil(2);
        self.strength.radius.min(chroma_side / 2)
    }
}

/// Build one whole-video directive per distinct region, in input order.
///
/// An empty region list yields an empty plan, which the pipeline treats as
/// a pass-through copy.
pub fn build_filter_plan(regions: &[PixelRegion], strength: BlurStrength) -> Vec<FilterDirective> {
    let directives: Vec<FilterDirective> = regions
        .iter()
        .map(|region| FilterDirective::new(*region, strength))
        .collect();
    merge_directives(&directives)
}

/// Collapse directives that blur the same region with the same strength.
///
/// Regions keep the order of their first occurrence. A whole-video
/// directive absorbs every windowed one for its region, and overlapping or
/// touching windows of one region become a single window.
pub fn merge_directives(directives: &[FilterDirective]) -> Vec<FilterDirective> {
    let mut order: Vec<(PixelRegion, BlurStrength)> = Vec::new();
    // `None` marks a region blurred on every frame
    let mut windows: HashMap<(PixelRegion, BlurStrength), Option<Vec<TimeWindow>>> = HashMap::new();

    for directive in directives {
        let key = (directive.region, directive.strength);
        let entry = windows.entry(key).or_insert_with(|| {
            order.push(key);
            Some(Vec::new())
        });
        match directive.window {
            None => *entry = None,
            Some(window) => {
                if let Some(list) = entry {
                    list.push(window);
                }
            }
        }
    }

    let mut merged = Vec::with_capacity(order.len());
    for key in order {
        let (region, strength) = key;
        match windows.remove(&key).flatten() {
            Some(list) => merged.extend(
                merge_windows(list)
                    .into_iter()
                    .map(|window| FilterDirective::new(region, strength).with_window(window)),
            ),
            None => merged.push(FilterDirective::new(region, strength)),
        }
    }
    merged
}

fn merge_windows(mut list: Vec<TimeWindow>) -> Vec<TimeWindow> {
    list.sort_by_key(|w| (w.start_ms, w.end_ms));

    let mut merged: Vec<TimeWindow> = Vec::with_capacity(list.len());
    for window in list {
        match merged.last_mut() {
            Some(last) if window.start_ms <= last.end_ms => {
                last.end_ms = last.end_ms.max(window.end_ms);
            }
            _ => merged.push(window),
        }
    }
    merged
}

/// Build one time-windowed directive per detection.
///
/// Each face stays blurred from its detection timestamp for `hold_ms`,
/// which covers the frames between two sampled detections.
pub fn build_windowed_filter_plan(
    detections: &[FaceDetection],
    frame: FrameDimensions,
    strength: BlurStrength,
    hold_ms: u64,
) -> Vec<FilterDirective> {
    let directives: Vec<FilterDirective> = detections
        .iter()
        .filter_map(|detection| {
            let region = map_region(&detection.bounding_box, frame)?;
            Some(
                FilterDirective::new(region, strength)
                    .with_window(TimeWindow::held(detection.timestamp_ms, hold_ms)),
            )
        })
        .collect();
    merge_directives(&directives)
}
