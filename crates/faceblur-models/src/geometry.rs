//! Frame geometry: normalized boxes, probed frame sizes and pixel regions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized rectangle (0.0 to 1.0) describing where a face lies in a frame.
///
/// Origin is the top-left corner. Detection services occasionally report boxes
/// that spill past the frame edge, so nothing here enforces the unit range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// Left edge as a fraction of frame width
    pub left: f64,
    /// Top edge as a fraction of frame height
    pub top: f64,
    /// Width as a fraction of frame width
    pub width: f64,
    /// Height as a fraction of frame height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Frame size in pixels, as reported by probing the actual video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for FrameDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Integer pixel rectangle inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl PixelRegion {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    /// Check that the region has area and fits in `frame`.
    pub fn fits(&self, frame: FrameDimensions) -> bool {
        self.w > 0
            && self.h > 0
            && self.x < frame.width
            && self.y < frame.height
            && self.right() <= frame.width
            && self.bottom() <= frame.height
    }
}

impl fmt::Display for PixelRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.w, self.h, self.x, self.y)
    }
}
