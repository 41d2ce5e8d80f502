use cardscan_core::{clip_convex, clip_segment_convex, Polygon, Quad};
use nalgebra::Vector2;

/// Fraction of the quad's corner regions that the hull leaves uncovered.
///
/// Each corner region is the triangle cut from the quad by the line through
/// `centroid + region * (corner - centroid)` perpendicular to the corner's
/// direction from the vertex centroid. `0` means the hull fills every corner
/// (sharp corners); values near `1` mean strongly rounded corners.
///
/// Returns `None` when the quad is not convex or the corner regions have no
/// area.
pub fn corner_diff_score(hull: &Polygon, quad: &Quad, region: f64) -> Option<f64> {
    let quad_poly = quad.polygon();
    if !quad_poly.is_convex() || hull.len() < 3 {
        return None;
    }
    let c = quad.vertex_centroid();

    let mut quad_area = 0.0;
    let mut hull_area = 0.0;
    for corner in quad.corners {
        let d = corner - c;
        let interior = c + d * region;
        let normal = Vector2::new(d.y, -d.x);
        let Some((a, b)) = clip_segment_convex(interior + normal, interior - normal, &quad_poly)
        else {
            log::trace!("corner region at ({:.1}, {:.1}) is empty", corner.x, corner.y);
            continue;
        };
        let tri = Polygon::new(vec![a, b, corner]);
        quad_area += tri.area();
        hull_area += clip_convex(&tri, hull).area();
    }

    if quad_area <= f64::EPSILON {
        return None;
    }
    Some((1.0 - hull_area / quad_area).clamp(0.0, 1.0))
}
