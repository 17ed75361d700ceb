//! Blur strength settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default box blur radius in pixels.
pub const DEFAULT_BLUR_RADIUS: u32 = 10;
/// Default number of box blur passes.
pub const DEFAULT_BLUR_PASSES: u32 = 2;

/// Box blur strength applied to every face region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct BlurStrength {
    /// Blur radius in pixels (upper bound; small regions get a smaller one)
    #[serde(default = "default_radius")]
    pub radius: u32,
    /// Number of times the blur is applied
    #[serde(default = "default_passes")]
    pub passes: u32,
}

fn default_radius() -> u32 {
    DEFAULT_BLUR_RADIUS
}

fn default_passes() -> u32 {
    DEFAULT_BLUR_PASSES
}

impl Default for BlurStrength {
    fn default() -> Self {
        Self {
            radius: DEFAULT_BLUR_RADIUS,
            passes: DEFAULT_BLUR_PASSES,
        }
    }
}

impl BlurStrength {
    pub fn new(radius: u32, passes: u32) -> Self {
        Self {
            radius,
            passes: passes.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_at_least_one() {
        assert_eq!(BlurStrength::new(8, 0).passes, 1);
    }

    #[test]
    fn test_defaults_from_empty_json() {
        let strength: BlurStrength = serde_json::from_str("{}").unwrap();
        assert_eq!(strength, BlurStrength::default());
    }
}
