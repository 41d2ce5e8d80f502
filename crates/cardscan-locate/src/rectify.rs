use cardscan_core::{homography_from_4pt, warp_perspective_rgb, Quad};
use image::RgbImage;
use nalgebra::Point2;

/// Warp the region inside `quad` to an upright rectangle.
///
/// The output is as wide as the longer of the top and bottom edges and as
/// tall as the longer of the side edges (both truncated to whole pixels),
/// so it depends only on the quad, not on the frame size. Corners map to
/// `(0, 0)`, `(w - 1, 0)`, `(w - 1, h - 1)` and `(0, h - 1)` in quad order.
///
/// Returns `None` for quads too small or too degenerate to warp.
pub fn rectify_quad(src: &RgbImage, quad: &Quad) -> Option<RgbImage> {
    let (width, height) = quad.max_edge_lengths();
    let (w, h) = (width as u32, height as u32);
    if w < 2 || h < 2 {
        return None;
    }
    let (wf, hf) = ((w - 1) as f64, (h - 1) as f64);
    let dst = [
        Point2::new(0.0, 0.0),
        Point2::new(wf, 0.0),
        Point2::new(wf, hf),
        Point2::new(0.0, hf),
    ];
    let h_src_from_dst = homography_from_4pt(&dst, &quad.corners)?;
    Some(warp_perspective_rgb(src, h_src_from_dst, w, h))
}
