//! Planar polygon helpers in image coordinates (x right, y down).
//!
//! "Counterclockwise" throughout means ascending polar angle `atan2(dy, dx)`
//! around the vertex centroid. With y pointing down this visits an upright
//! card as top-left, top-right, bottom-right, bottom-left.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

const AREA_EPS: f64 = 1e-9;

#[inline]
fn cross(o: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Intersection of the infinite line through `a0, a1` with the one through
/// `b0, b1`. Returns `None` for parallel lines or non-finite results.
pub fn line_intersection(
    a0: Point2<f64>,
    a1: Point2<f64>,
    b0: Point2<f64>,
    b1: Point2<f64>,
) -> Option<Point2<f64>> {
    let denom = (a0.x - a1.x) * (b0.y - b1.y) - (a0.y - a1.y) * (b0.x - b1.x);
    if denom == 0.0 {
        return None;
    }
    let xy_a = a0.x * a1.y - a0.y * a1.x;
    let xy_b = b0.x * b1.y - b0.y * b1.x;
    let x = (xy_a * (b0.x - b1.x) - (a0.x - a1.x) * xy_b) / denom;
    let y = (xy_a * (b0.y - b1.y) - (a0.y - a1.y) * xy_b) / denom;
    (x.is_finite() && y.is_finite()).then(|| Point2::new(x, y))
}

/// True when the two segments cross at a single interior point of both.
/// Touching endpoints and collinear overlaps do not count.
pub fn segments_cross(
    p0: Point2<f64>,
    p1: Point2<f64>,
    q0: Point2<f64>,
    q1: Point2<f64>,
) -> bool {
    let d0 = cross(q0, q1, p0);
    let d1 = cross(q0, q1, p1);
    let d2 = cross(p0, p1, q0);
    let d3 = cross(p0, p1, q1);
    d0 * d1 < 0.0 && d2 * d3 < 0.0
}

/// Convex hull (Andrew's monotone chain) without collinear points.
///
/// Fewer than three distinct input points yield a degenerate polygon with
/// the distinct points only; callers filter on `len() >= 3`.
pub fn convex_hull(points: &[Point2<f64>]) -> Polygon {
    let mut pts: Vec<Point2<f64>> = points
        .iter()
        .copied()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return Polygon::new(pts);
    }

    let mut hull: Vec<Point2<f64>> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    Polygon::new(hull)
}

/// Sutherland-Hodgman clip of `subject` against the convex polygon `clip`.
///
/// Works for either orientation of `clip`; the result may be empty.
pub fn clip_convex(subject: &Polygon, clip: &Polygon) -> Polygon {
    let sign = clip.signed_area().signum();
    if sign == 0.0 || subject.len() < 3 {
        return Polygon::default();
    }

    let mut output = subject.points.clone();
    for (a, b) in clip.edges() {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        let side = |p: Point2<f64>| sign * cross(a, b, p);
        let mut prev = input[input.len() - 1];
        let mut prev_side = side(prev);
        for &cur in &input {
            let cur_side = side(cur);
            if cur_side >= 0.0 {
                if prev_side < 0.0 {
                    output.push(lerp_at_crossing(prev, cur, prev_side, cur_side));
                }
                output.push(cur);
            } else if prev_side >= 0.0 {
                output.push(lerp_at_crossing(prev, cur, prev_side, cur_side));
            }
            prev = cur;
            prev_side = cur_side;
        }
    }
    Polygon::new(output)
}

#[inline]
fn lerp_at_crossing(s: Point2<f64>, e: Point2<f64>, fs: f64, fe: f64) -> Point2<f64> {
    let t = fs / (fs - fe);
    s + (e - s) * t
}

/// Cyrus-Beck clip of segment `a..b` against the convex polygon `poly`.
///
/// Returns the clipped endpoints, or `None` when the segment misses the
/// polygon or only touches it in a single point.
pub fn clip_segment_convex(
    a: Point2<f64>,
    b: Point2<f64>,
    poly: &Polygon,
) -> Option<(Point2<f64>, Point2<f64>)> {
    let sign = poly.signed_area().signum();
    if sign == 0.0 {
        return None;
    }
    let (mut t_lo, mut t_hi) = (0.0_f64, 1.0_f64);
    for (p, q) in poly.edges() {
        let f0 = sign * cross(p, q, a);
        let f1 = sign * cross(p, q, b);
        let denom = f1 - f0;
        if denom == 0.0 {
            if f0 < 0.0 {
                return None;
            }
            continue;
        }
        let t = -f0 / denom;
        if denom > 0.0 {
            t_lo = t_lo.max(t);
        } else {
            t_hi = t_hi.min(t);
        }
        if t_lo >= t_hi {
            return None;
        }
    }
    let d = b - a;
    Some((a + d * t_lo, a + d * t_hi))
}

/// An ordered, implicitly closed polygon.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point2<f64>>,
}

impl Polygon {
    pub fn new(points: Vec<Point2<f64>>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Closed edge list `(p[i], p[i + 1 mod n])`.
    pub fn edges(&self) -> impl Iterator<Item = (Point2<f64>, Point2<f64>)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Mean of the vertices (origin for an empty polygon).
    pub fn vertex_centroid(&self) -> Point2<f64> {
        if self.points.is_empty() {
            return Point2::origin();
        }
        let n = self.points.len() as f64;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point2::new(sx / n, sy / n)
    }

    /// Shoelace area; positive when the vertices ascend in polar angle.
    pub fn signed_area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        0.5 * self
            .edges()
            .map(|(p, q)| p.x * q.y - q.x * p.y)
            .sum::<f64>()
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Area centroid, falling back to the vertex mean for degenerate polygons.
    pub fn centroid(&self) -> Point2<f64> {
        let a = self.signed_area();
        if a.abs() < AREA_EPS {
            return self.vertex_centroid();
        }
        // Shift to the first vertex to keep the products small.
        let o = self.points[0];
        let (mut cx, mut cy) = (0.0, 0.0);
        for (p, q) in self.edges() {
            let (px, py, qx, qy) = (p.x - o.x, p.y - o.y, q.x - o.x, q.y - o.y);
            let w = px * qy - qx * py;
            cx += (px + qx) * w;
            cy += (py + qy) * w;
        }
        Point2::new(o.x + cx / (6.0 * a), o.y + cy / (6.0 * a))
    }

    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.edges().map(|(p, q)| (q - p).norm()).sum()
    }

    /// Copy sorted by ascending polar angle around the vertex centroid.
    pub fn ordered_ccw(&self) -> Polygon {
        let c = self.vertex_centroid();
        let mut keyed: Vec<(f64, Point2<f64>)> = self
            .points
            .iter()
            .map(|p| ((p.y - c.y).atan2(p.x - c.x), *p))
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        Polygon::new(keyed.into_iter().map(|(_, p)| p).collect())
    }

    /// Scale every vertex toward (`factor < 1`) or away from `origin`.
    pub fn scaled_about(&self, origin: Point2<f64>, factor: f64) -> Polygon {
        Polygon::new(
            self.points
                .iter()
                .map(|p| origin + (p - origin) * factor)
                .collect(),
        )
    }

    /// Even-odd point-in-polygon test. Boundary points are unspecified.
    pub fn contains_point(&self, p: Point2<f64>) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_at = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_at {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// True when every vertex of `inner` lies inside `self` and no pair of
    /// edges cross.
    pub fn contains_polygon(&self, inner: &Polygon) -> bool {
        if self.points.len() < 3 || inner.is_empty() {
            return false;
        }
        if !inner.points.iter().all(|&p| self.contains_point(p)) {
            return false;
        }
        !self
            .edges()
            .any(|(a, b)| inner.edges().any(|(c, d)| segments_cross(a, b, c, d)))
    }

    pub fn is_convex(&self) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut sign = 0.0_f64;
        for i in 0..n {
            let c = cross(self.points[i], self.points[(i + 1) % n], self.points[(i + 2) % n]);
            if c == 0.0 {
                continue;
            }
            if sign == 0.0 {
                sign = c.signum();
            } else if c.signum() != sign {
                return false;
            }
        }
        sign != 0.0
    }
}

/// Exactly four corners in counterclockwise order starting from the
/// smallest polar angle around their centroid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub corners: [Point2<f64>; 4],
}

impl Quad {
    /// Build a quad from corners in any order.
    pub fn new(corners: [Point2<f64>; 4]) -> Self {
        let ordered = Polygon::new(corners.to_vec()).ordered_ccw();
        let mut out = corners;
        out.copy_from_slice(&ordered.points);
        Self { corners: out }
    }

    pub fn from_xy(corners: [(f64, f64); 4]) -> Self {
        Self::new(corners.map(|(x, y)| Point2::new(x, y)))
    }

    pub fn polygon(&self) -> Polygon {
        Polygon::new(self.corners.to_vec())
    }

    pub fn area(&self) -> f64 {
        self.polygon().area()
    }

    pub fn centroid(&self) -> Point2<f64> {
        self.polygon().centroid()
    }

    pub fn vertex_centroid(&self) -> Point2<f64> {
        self.polygon().vertex_centroid()
    }

    /// Scale toward the area centroid; corner order is preserved.
    pub fn scaled(&self, factor: f64) -> Quad {
        let c = self.centroid();
        Quad {
            corners: self.corners.map(|p| c + (p - c) * factor),
        }
    }

    /// Euclidean distance between corresponding corners.
    pub fn corner_distances(&self, other: &Quad) -> [f64; 4] {
        std::array::from_fn(|i| (self.corners[i] - other.corners[i]).norm())
    }

    /// `(width, height)`: the longer of each pair of opposite edges.
    pub fn max_edge_lengths(&self) -> (f64, f64) {
        let [p0, p1, p2, p3] = self.corners;
        let width = (p1 - p0).norm().max((p3 - p2).norm());
        let height = (p0 - p3).norm().max((p1 - p2).norm());
        (width, height)
    }

    pub fn is_degenerate(&self) -> bool {
        self.area() < AREA_EPS
    }
}
