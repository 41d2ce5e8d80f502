//! Minimum-area bounding quadrilateral of a convex hull.

use cardscan_core::{line_intersection, Polygon, Quad};

use crate::QuadFitParams;

/// Drop short edges of a convex polygon by extending their neighbours.
///
/// While more than four vertices remain and the shortest edge `k` is
/// shorter than `length_cutoff` times the current perimeter, vertex `k` is
/// moved to the intersection of edges `k - 1` and `k + 1` and vertex `k + 1`
/// is removed. Stops early when those neighbouring edges are parallel.
pub fn simplify_polygon(poly: &Polygon, length_cutoff: f64) -> Polygon {
    let mut pts = poly.points.clone();
    while pts.len() > 4 {
        let n = pts.len();
        let lengths: Vec<f64> = (0..n).map(|i| (pts[(i + 1) % n] - pts[i]).norm()).collect();
        let perimeter: f64 = lengths.iter().sum();
        let Some((k, &shortest)) = lengths
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
        else {
            break;
        };
        if shortest >= length_cutoff * perimeter {
            break;
        }
        let Some(x) = line_intersection(
            pts[(k + n - 1) % n],
            pts[k],
            pts[(k + 1) % n],
            pts[(k + 2) % n],
        ) else {
            log::trace!("simplification stopped at parallel edges around {k}");
            break;
        };
        pts[k] = x;
        pts.remove((k + 1) % n);
    }
    Polygon::new(pts)
}

/// Every quadrilateral formed by four extended edges `i < j < k < l` of
/// `poly` that contains `poly` shrunk by `hull_shrink` about its vertex mean.
///
/// Corner `m` of a candidate is the intersection of two consecutive chosen
/// edges, where edge `e` runs from vertex `e` to vertex `e + 1`.
pub fn bounding_quad_candidates(poly: &Polygon, hull_shrink: f64) -> Vec<Quad> {
    let ordered = poly.ordered_ccw();
    let n = ordered.len();
    if n < 4 {
        return Vec::new();
    }
    let shrunk = ordered.scaled_about(ordered.vertex_centroid(), hull_shrink);
    let pts = &ordered.points;
    let corner = |a: usize, b: usize| {
        line_intersection(pts[a % n], pts[(a + 1) % n], pts[b % n], pts[(b + 1) % n])
    };

    let mut out = Vec::new();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                for l in k + 1..n {
                    let (Some(c0), Some(c1), Some(c2), Some(c3)) =
                        (corner(i, j), corner(j, k), corner(k, l), corner(l, i))
                    else {
                        continue;
                    };
                    let quad = Quad::new([c0, c1, c2, c3]);
                    if quad.polygon().contains_polygon(&shrunk) {
                        out.push(quad);
                    }
                }
            }
        }
    }
    out
}

/// Smallest-area enclosing quad of the simplified hull, if any exists.
pub fn fit_bounding_quad(hull: &Polygon, params: &QuadFitParams) -> Option<Quad> {
    let simplified = simplify_polygon(hull, params.length_cutoff);
    bounding_quad_candidates(&simplified, params.hull_shrink)
        .into_iter()
        .min_by(|a, b| a.area().total_cmp(&b.area()))
}
