use crate::sample_bilinear_rgb;
use image::RgbImage;
use nalgebra::{Matrix3, Point2, Vector3};

/// Planar projective transform acting on homogeneous image points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0] / v[2], v[1] / v[2])
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Projective map taking the unit square corners `(0,0)`, `(1,0)`, `(1,1)`,
/// `(0,1)` onto `quad` in order (Heckbert's closed form).
fn unit_square_to(quad: &[Point2<f64>; 4]) -> Option<Matrix3<f64>> {
    let [p0, p1, p2, p3] = *quad;
    let (dx1, dy1) = (p1.x - p2.x, p1.y - p2.y);
    let (dx2, dy2) = (p3.x - p2.x, p3.y - p2.y);
    let (dx3, dy3) = (p0.x - p1.x + p2.x - p3.x, p0.y - p1.y + p2.y - p3.y);

    let den = dx1 * dy2 - dx2 * dy1;
    if den.abs() < 1e-12 {
        return None;
    }
    // Both terms vanish for parallelograms, leaving an affine map.
    let g = (dx3 * dy2 - dx2 * dy3) / den;
    let h = (dx1 * dy3 - dx3 * dy1) / den;

    let m = Matrix3::new(
        p1.x - p0.x + g * p1.x,
        p3.x - p0.x + h * p3.x,
        p0.x, //
        p1.y - p0.y + g * p1.y,
        p3.y - p0.y + h * p3.y,
        p0.y, //
        g,
        h,
        1.0,
    );
    // Three collinear corners collapse a whole row.
    (m.determinant().abs() > 1e-12).then_some(m)
}

/// Compute H such that `dst ~ H * src` for four corresponding corners.
///
/// Both quads go through the unit square: `H = S_dst * S_src^-1`. Corner
/// order must agree between `src` and `dst`. Returns `None` when either
/// quad is degenerate (three collinear corners, coincident corners).
pub fn homography_from_4pt(
    src: &[Point2<f64>; 4],
    dst: &[Point2<f64>; 4],
) -> Option<Homography> {
    let from_src = unit_square_to(src)?.try_inverse()?;
    let h = unit_square_to(dst)? * from_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 || h.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(Homography::new(h / s))
}

/// Inverse-map warp: every output pixel `(x, y)` samples the source at
/// `h_src_from_dst * (x, y)`. Source pixels outside the image read as black.
pub fn warp_perspective_rgb(
    src: &RgbImage,
    h_src_from_dst: Homography,
    out_w: u32,
    out_h: u32,
) -> RgbImage {
    RgbImage::from_fn(out_w, out_h, |x, y| {
        let ps = h_src_from_dst.apply(Point2::new(x as f64, y as f64));
        if !ps.x.is_finite() || !ps.y.is_finite() {
            return image::Rgb([0, 0, 0]);
        }
        sample_bilinear_rgb(src, ps.x, ps.y)
    })
}
