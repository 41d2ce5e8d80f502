use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};

#[inline]
fn get_rgb(src: &RgbImage, x: i64, y: i64) -> [f32; 3] {
    if x < 0 || y < 0 || x >= src.width() as i64 || y >= src.height() as i64 {
        return [0.0; 3];
    }
    let p = src.get_pixel(x as u32, y as u32).0;
    [p[0] as f32, p[1] as f32, p[2] as f32]
}

/// Bilinear sample of an RGB image; pixels outside the image read as black.
#[inline]
pub fn sample_bilinear_rgb(src: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let p00 = get_rgb(src, x0, y0);
    let p10 = get_rgb(src, x0 + 1, y0);
    let p01 = get_rgb(src, x0, y0 + 1);
    let p11 = get_rgb(src, x0 + 1, y0 + 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let a = p00[c] + fx * (p10[c] - p00[c]);
        let b = p01[c] + fx * (p11[c] - p01[c]);
        out[c] = (a + fy * (b - a)).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// ITU-R 601-2 luma in 16.16 fixed point, bit-compatible with the PIL `L`
/// conversion that produced the stored reference hashes.
pub fn luma_601(src: &RgbImage) -> GrayImage {
    GrayImage::from_fn(src.width(), src.height(), |x, y| {
        let [r, g, b] = src.get_pixel(x, y).0;
        let l = (r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16;
        Luma([l as u8])
    })
}

/// Resize to a fixed height, keeping the aspect ratio (width truncates).
///
/// Returns `None` for empty inputs or a zero target height.
pub fn resize_to_height(src: &RgbImage, height: u32) -> Option<RgbImage> {
    if src.width() == 0 || src.height() == 0 || height == 0 {
        return None;
    }
    let ratio = height as f64 / src.height() as f64;
    let width = ((src.width() as f64 * ratio) as u32).max(1);
    Some(imageops::resize(src, width, height, FilterType::Lanczos3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 100, 200]));
        img.put_pixel(1, 0, Rgb([100, 200, 0]));
        let mid = sample_bilinear_rgb(&img, 0.5, 0.0);
        assert_eq!(mid.0[0], 50);
        assert_eq!(mid.0[1], 150);
        assert_eq!(mid.0[2], 100);
    }

    #[test]
    fn samples_outside_are_black() {
        let img = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        assert_eq!(sample_bilinear_rgb(&img, -5.0, 2.0).0, [0, 0, 0]);
        assert_eq!(sample_bilinear_rgb(&img, 2.0, 2.0).0, [255, 255, 255]);
    }

    #[test]
    fn luma_matches_pil_weights() {
        let img = RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]));
        assert_eq!(luma_601(&img).get_pixel(0, 0).0[0], 76);
        let img = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        assert_eq!(luma_601(&img).get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn resize_keeps_aspect() {
        let img = RgbImage::new(300, 600);
        let out = resize_to_height(&img, 500).expect("resized");
        assert_eq!(out.height(), 500);
        assert_eq!(out.width(), 250);
        assert!(resize_to_height(&RgbImage::new(0, 10), 500).is_none());
    }
}
