//! FFmpeg filter graph for region blurs.
//!
//! Every directive becomes its own crop/boxblur/overlay branch off a single
//! `split`, so all faces are blurred in one pass over the frames:
//!
//! ```text
//! [0:v]split=3[base][c0][c1];
//! [c0]crop=64:48:64:96:exact=1,boxblur=luma_radius=10:luma_power=2[b0];
//! [c1]crop=...[b1];
//! [base][b0]overlay=x=64:y=96[v0];
//! [v0][b1]overlay=...[vout]
//! ```
//!
//! Duplicate directives are merged first. The expression can still run to
//! hundreds of kilobytes, so the engine hands it to FFmpeg as a script file.

use std::fmt::Write;

use crate::plan::{merge_directives, FilterDirective};

/// Label of the video stream produced by the graph.
pub const OUTPUT_LABEL: &str = "[vout]";

/// A `-filter_complex` expression and the label to map from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGraph {
    pub expression: String,
    pub output_label: String,
    /// Number of blurred regions in the graph
    pub regions: usize,
}

/// Translate directives to an FFmpeg filter graph.
///
/// Returns `None` for an empty plan; the caller copies the input instead.
pub fn build_blur_filter_graph(directives: &[FilterDirective]) -> Option<FilterGraph> {
    if directives.is_empty() {
        return None;
    }
    let directives = merge_directives(directives);

    let count = directives.len();
    let mut expr = String::new();

    // Fan the decoded frames out to the base plus one branch per region
    let _ = write!(expr, "[0:v]split={}[base]", count + 1);
    for i in 0..count {
        let _ = write!(expr, "[c{}]", i);
    }
    expr.push(';');

    for (i, directive) in directives.iter().enumerate() {
        let region = directive.region;
        let _ = write!(
            expr,
            "[c{i}]crop={}:{}:{}:{}:exact=1,boxblur=luma_radius={}:luma_power={}[b{i}];",
            region.w,
            region.h,
            region.x,
            region.y,
            directive.effective_radius(),
            directive.strength.passes.max(1),
        );
    }

    for (i, directive) in directives.iter().enumerate() {
        let input = if i == 0 {
            "[base]".to_string()
        } else {
            format!("[v{}]", i - 1)
        };
        let output = if i + 1 == count {
            OUTPUT_LABEL.to_string()
        } else {
            format!("[v{}]", i)
        };

        let _ = write!(
            expr,
            "{input}[b{i}]overlay=x={}:y={}",
            directive.region.x, directive.region.y
        );
        if let Some(window) = directive.window {
            let _ = write!(
                expr,
                ":enable='between(t,{:.3},{:.3})'",
                window.start_secs(),
                window.end_secs()
            );
        }
        expr.push_str(&output);
        if i + 1 < count {
            expr.push(';');
        }
    }

    Some(FilterGraph {
        expression: expr,
        output_label: OUTPUT_LABEL.to_string(),
        regions: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{build_filter_plan, TimeWindow};
    use faceblur_models::{BlurStrength, PixelRegion};
    use std::collections::HashSet;

    fn crops(expr: &str) -> Vec<&str> {
        expr.split(';')
            .filter_map(|chain| chain.split_once("crop=").map(|(_, rest)| rest))
            .filter_map(|rest| rest.split(',').next())
            .collect()
    }

    #[test]
    fn test_empty_plan_has_no_graph() {
        assert!(build_blur_filter_graph(&[]).is_none());
    }

    #[test]
    fn test_single_region() {
        let plan = build_filter_plan(&[PixelRegion::new(64, 96, 64, 48)], BlurStrength::new(10, 2));
        let graph = build_blur_filter_graph(&plan).unwrap();

        assert_eq!(
            graph.expression,
            "[0:v]split=2[base][c0];\
             [c0]crop=64:48:64:96:exact=1,boxblur=luma_radius=10:luma_power=2[b0];\
             [base][b0]overlay=x=64:y=96[vout]"
        );
        assert_eq!(graph.output_label, "[vout]");
        assert_eq!(graph.regions, 1);
    }

    #[test]
    fn test_every_region_gets_its_own_branch() {
        let regions = [
            PixelRegion::new(0, 0, 40, 40),
            PixelRegion::new(100, 50, 80, 60),
            PixelRegion::new(300, 200, 32, 32),
            PixelRegion::new(10, 400, 120, 64),
        ];
        let plan = build_filter_plan(&regions, BlurStrength::default());
        let graph = build_blur_filter_graph(&plan).unwrap();
        let expr = &graph.expression;

        assert!(expr.starts_with("[0:v]split=5[base][c0][c1][c2][c3];"));

        let found: HashSet<&str> = crops(expr).into_iter().collect();
        assert_eq!(found.len(), regions.len());
        for region in &regions {
            let crop = format!("{}:{}:{}:{}:exact=1", region.w, region.h, region.x, region.y);
            assert!(found.contains(crop.as_str()), "missing {crop}");
        }

        assert_eq!(expr.matches("overlay=").count(), regions.len());
        for i in 0..regions.len() {
            assert_eq!(expr.matches(&format!("[b{i}]")).count(), 2);
        }
        assert!(expr.ends_with("[vout]"));
        assert_eq!(expr.matches("[vout]").count(), 1);
    }

    #[test]
    fn test_overlay_chain_is_linear() {
        let plan = build_filter_plan(
            &[PixelRegion::new(0, 0, 40, 40), PixelRegion::new(50, 50, 40, 40)],
            BlurStrength::default(),
        );
        let expr = build_blur_filter_graph(&plan).unwrap().expression;

        assert!(expr.contains("[base][b0]overlay=x=0:y=0[v0];"));
        assert!(expr.contains("[v0][b1]overlay=x=50:y=50[vout]"));
    }

    #[test]
    fn test_windowed_overlay_enable() {
        let plan = vec![FilterDirective::new(PixelRegion::new(8, 8, 40, 40), BlurStrength::default())
            .with_window(TimeWindow::new(1000, 1500))];
        let expr = build_blur_filter_graph(&plan).unwrap().expression;

        assert!(expr.ends_with("overlay=x=8:y=8:enable='between(t,1.000,1.500)'[vout]"));
    }

    #[test]
    fn test_repeated_detections_share_one_branch() {
        let region = PixelRegion::new(900, 300, 180, 240);
        let plan = vec![FilterDirective::new(region, BlurStrength::default()); 2500];
        let graph = build_blur_filter_graph(&plan).unwrap();

        assert_eq!(graph.regions, 1);
        assert_eq!(graph.expression.matches("overlay=").count(), 1);
        assert!(graph.expression.starts_with("[0:v]split=2[base][c0];"));
    }

    #[test]
    fn test_repeated_windows_merge() {
        let region = PixelRegion::new(8, 8, 40, 40);
        // A sample every 200 ms, each held for 500 ms
        let plan: Vec<FilterDirective> = (0..2500)
            .map(|i| {
                FilterDirective::new(region, BlurStrength::default())
                    .with_window(TimeWindow::held(i * 200, 500))
            })
            .collect();
        let graph = build_blur_filter_graph(&plan).unwrap();

        assert_eq!(graph.regions, 1);
        assert!(graph
            .expression
            .ends_with("overlay=x=8:y=8:enable='between(t,0.000,500.300)'[vout]"));
    }

    #[test]
    fn test_three_pixel_region_is_blurred() {
        let plan = build_filter_plan(&[PixelRegion::new(5, 5, 3, 3)], BlurStrength::new(10, 2));
        let expr = build_blur_filter_graph(&plan).unwrap().expression;
        assert!(expr.contains("crop=3:3:5:5:exact=1,boxblur=luma_radius=1:luma_power=2"));
    }

    #[test]
    fn test_small_region_radius_clamped() {
        let plan = build_filter_plan(&[PixelRegion::new(5, 5, 6, 9)], BlurStrength::new(10, 1));
        let expr = build_blur_filter_graph(&plan).unwrap().expression;
        assert!(expr.contains("boxblur=luma_radius=1:luma_power=1"));
    }
}
