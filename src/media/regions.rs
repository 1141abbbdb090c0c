use crate::config::RegionConfig;

/// Rectangle to redact, expressed as fractions of frame width/height.
///
/// Proportional coordinates survive resolution changes; pixel offsets from a
/// frame edge do not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurRegion {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl From<&RegionConfig> for BlurRegion {
    fn from(region: &RegionConfig) -> Self {
        Self {
            left: region.left,
            top: region.top,
            width: region.width,
            height: region.height,
        }
    }
}

/// A region resolved against a concrete frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BlurRegion {
    /// Resolve to pixel coordinates, clipped to the frame.
    ///
    /// A rectangle whose intersection with the frame has zero area resolves
    /// to `None`; the caller skips it silently rather than failing the run.
    pub fn resolve(&self, frame_width: u32, frame_height: u32) -> Option<PixelRect> {
        if frame_width == 0 || frame_height == 0 {
            return None;
        }

        let fw = frame_width as f64;
        let fh = frame_height as f64;

        let x0 = (self.left * fw).max(0.0);
        let y0 = (self.top * fh).max(0.0);
        let x1 = ((self.left + self.width) * fw).min(fw);
        let y1 = ((self.top + self.height) * fh).min(fh);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let x = x0.floor() as u32;
        let y = y0.floor() as u32;
        let width = (x1.ceil() as u32).min(frame_width) - x;
        let height = (y1.ceil() as u32).min(frame_height) - y;

        if width == 0 || height == 0 {
            return None;
        }

        Some(PixelRect { x, y, width, height })
    }
}

/// Build the ffmpeg filter graph that blurs every effective region.
///
/// The stream is split once, each split leg is cropped to its region and
/// blurred, then the legs are composited back over the base in order. One
/// video stream in, one out: the frame count and timing are untouched.
///
/// Returns `None` when no region survives resolution, in which case the
/// caller copies the stream through unfiltered.
pub fn blur_filter_graph(
    regions: &[BlurRegion],
    frame_width: u32,
    frame_height: u32,
    sigma: f64,
) -> Option<String> {
    let rects: Vec<PixelRect> = regions
        .iter()
        .filter_map(|r| r.resolve(frame_width, frame_height))
        .collect();

    if rects.is_empty() {
        return None;
    }

    let mut parts = Vec::new();

    let split_labels: Vec<String> = (0..rects.len()).map(|i| format!("[c{}]", i)).collect();
    parts.push(format!(
        "[0:v]split={}[base]{}",
        rects.len() + 1,
        split_labels.concat()
    ));

    for (i, rect) in rects.iter().enumerate() {
        parts.push(format!(
            "[c{}]crop={}:{}:{}:{},gblur=sigma={}[b{}]",
            i, rect.width, rect.height, rect.x, rect.y, sigma, i
        ));
    }

    let mut current = "[base]".to_string();
    for (i, rect) in rects.iter().enumerate() {
        let next = if i == rects.len() - 1 {
            "[vout]".to_string()
        } else {
            format!("[v{}]", i)
        };
        parts.push(format!(
            "{}[b{}]overlay={}:{}{}",
            current, i, rect.x, rect.y, next
        ));
        current = next;
    }

    Some(parts.join(";"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_inside_frame() {
        let region = BlurRegion { left: 0.5, top: 0.5, width: 0.25, height: 0.25 };
        let rect = region.resolve(1920, 1080).unwrap();
        assert_eq!(rect, PixelRect { x: 960, y: 540, width: 480, height: 270 });
    }

    #[test]
    fn test_resolve_clips_overhanging_region() {
        let region = BlurRegion { left: 0.9, top: 0.9, width: 0.5, height: 0.5 };
        let rect = region.resolve(1000, 1000).unwrap();
        assert_eq!(rect.x, 900);
        assert_eq!(rect.y, 900);
        assert_eq!(rect.width, 100);
        assert_eq!(rect.height, 100);
    }

    #[test]
    fn test_resolve_fully_outside_is_none() {
        let region = BlurRegion { left: 1.2, top: 0.1, width: 0.3, height: 0.3 };
        assert!(region.resolve(1920, 1080).is_none());
    }

    #[test]
    fn test_resolve_zero_area_is_none() {
        let region = BlurRegion { left: 0.1, top: 0.1, width: 0.0, height: 0.2 };
        assert!(region.resolve(1920, 1080).is_none());
    }

    #[test]
    fn test_resolve_zero_frame_is_none() {
        let region = BlurRegion { left: 0.1, top: 0.1, width: 0.5, height: 0.5 };
        assert!(region.resolve(0, 1080).is_none());
    }

    #[test]
    fn test_graph_empty_regions() {
        assert!(blur_filter_graph(&[], 1920, 1080, 20.0).is_none());
    }

    #[test]
    fn test_graph_all_regions_outside() {
        let regions = [BlurRegion { left: 2.0, top: 2.0, width: 0.5, height: 0.5 }];
        assert!(blur_filter_graph(&regions, 1920, 1080, 20.0).is_none());
    }

    #[test]
    fn test_graph_single_region() {
        let regions = [BlurRegion { left: 0.0, top: 0.0, width: 0.5, height: 0.5 }];
        let graph = blur_filter_graph(&regions, 1000, 1000, 20.0).unwrap();
        assert_eq!(
            graph,
            "[0:v]split=2[base][c0];\
             [c0]crop=500:500:0:0,gblur=sigma=20[b0];\
             [base][b0]overlay=0:0[vout]"
        );
    }

    #[test]
    fn test_graph_skips_out_of_frame_region() {
        let regions = [
            BlurRegion { left: 0.0, top: 0.0, width: 0.5, height: 0.5 },
            BlurRegion { left: 1.5, top: 0.0, width: 0.5, height: 0.5 },
        ];
        let graph = blur_filter_graph(&regions, 1000, 1000, 20.0).unwrap();
        // The clipped-out region contributes nothing to the chain
        assert!(graph.contains("split=2"));
        assert!(!graph.contains("[c1]"));
    }

    #[test]
    fn test_graph_single_input_single_output() {
        let regions = [
            BlurRegion { left: 0.0, top: 0.0, width: 0.3, height: 0.3 },
            BlurRegion { left: 0.6, top: 0.6, width: 0.3, height: 0.3 },
        ];
        let graph = blur_filter_graph(&regions, 1920, 1080, 15.5).unwrap();
        assert_eq!(graph.matches("[0:v]").count(), 1);
        assert_eq!(graph.matches("[vout]").count(), 1);
        assert!(graph.contains("split=3"));
    }
}
