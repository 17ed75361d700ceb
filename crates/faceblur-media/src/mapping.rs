//! Coordinate mapping from normalized face boxes to pixel regions.
//!
//! Detection results describe faces as fractions of the frame. Before a
//! blur can be applied they are scaled by the probed frame size:
//!
//! ```text
//! x = round(left * W)    clamped to [0, W-1]
//! y = round(top * H)     clamped to [0, H-1]
//! w = round(width * W)   clamped so x + w <= W
//! h = round(height * H)  clamped so y + h <= H
//! ```
//!
//! Boxes that end up with zero area are dropped rather than passed on,
//! since a zero-sized crop is rejected by the filter engine.
//!
//! # Usage
//! ```rust
//! use faceblur_media::mapping::map_regions;
//! use faceblur_models::{BoundingBox, FrameDimensions, PixelRegion};
//!
//! let boxes = [BoundingBox::new(0.1, 0.2, 0.1, 0.1)];
//! let regions = map_regions(&boxes, FrameDimensions::new(640, 480));
//! assert_eq!(regions, vec![PixelRegion::new(64, 96, 64, 48)]);
//! ```

use faceblur_models::{BoundingBox, FrameDimensions, PixelRegion};

/// Map every box to a pixel region inside `frame`, dropping degenerate ones.
pub fn map_regions<'a, I>(boxes: I, frame: FrameDimensions) -> Vec<PixelRegion>
where
    I: IntoIterator<Item = &'a BoundingBox>,
{
    boxes
        .into_iter()
        .filter_map(|b| map_region(b, frame))
        .collect()
}

/// Map a single box; `None` when the clamped region has no area.
pub fn map_region(bbox: &BoundingBox, frame: FrameDimensions) -> Option<PixelRegion> {
    if frame.is_empty() {
        return None;
    }

    let fw = i64::from(frame.width);
    let fh = i64::from(frame.height);

    let x = scale(bbox.left, frame.width).clamp(0, fw - 1);
    let y = scale(bbox.top, frame.height).clamp(0, fh - 1);
    let w = scale(bbox.width, frame.width).min(fw - x);
    let h = scale(bbox.height, frame.height).min(fh - y);

    if w <= 0 || h <= 0 {
        return None;
    }

    // All four values are within [0, frame] here
    Some(PixelRegion::new(x as u32, y as u32, w as u32, h as u32))
}

/// Scale a normalized coordinate, saturating on NaN and infinities.
#[inline]
fn scale(fraction: f64, extent: u32) -> i64 {
    (fraction * f64::from(extent)).round() as i64
}
