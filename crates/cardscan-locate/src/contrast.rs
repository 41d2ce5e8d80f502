//! Lighting normalization: CLAHE on the Lab lightness channel.

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::{ContrastParams, LocateError};

#[cfg(feature = "tracing")]
use tracing::instrument;

const HIST_SIZE: usize = 256;

/// Contrast-limited adaptive histogram equalization of an 8-bit image.
///
/// Per-tile histograms are clipped at `clip_limit * tile_pixels / 256`, the
/// excess is spread evenly over all bins, and every pixel is mapped through
/// a bilinear blend of its four nearest tile lookup tables.
pub fn clahe(src: &GrayImage, params: &ContrastParams) -> GrayImage {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    let tiles_x = params.tile_grid.0.clamp(1, w) as usize;
    let tiles_y = params.tile_grid.1.clamp(1, h) as usize;
    let tile_w = (w as usize).div_ceil(tiles_x);
    let tile_h = (h as usize).div_ceil(tiles_y);

    let mut luts = vec![[0u8; HIST_SIZE]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = (tx * tile_w).min(w as usize);
            let y0 = (ty * tile_h).min(h as usize);
            let x1 = (x0 + tile_w).min(w as usize);
            let y1 = (y0 + tile_h).min(h as usize);
            luts[ty * tiles_x + tx] = tile_lut(src, x0, y0, x1, y1, params.clip_limit);
        }
    }

    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;
    GrayImage::from_fn(w, h, |x, y| {
        let v = src.get_pixel(x, y).0[0] as usize;

        let txf = x as f32 * inv_tw - 0.5;
        let tx1 = txf.floor() as isize;
        let xa = txf - tx1 as f32;
        let tx2 = (tx1 + 1).min(tiles_x as isize - 1).max(0) as usize;
        let tx1 = tx1.max(0) as usize;

        let tyf = y as f32 * inv_th - 0.5;
        let ty1 = tyf.floor() as isize;
        let ya = tyf - ty1 as f32;
        let ty2 = (ty1 + 1).min(tiles_y as isize - 1).max(0) as usize;
        let ty1 = ty1.max(0) as usize;

        let lut = |tx: usize, ty: usize| luts[ty * tiles_x + tx][v] as f32;
        let top = lut(tx1, ty1) * (1.0 - xa) + lut(tx2, ty1) * xa;
        let bottom = lut(tx1, ty2) * (1.0 - xa) + lut(tx2, ty2) * xa;
        let out = top * (1.0 - ya) + bottom * ya;
        Luma([out.round().clamp(0.0, 255.0) as u8])
    })
}

fn tile_lut(
    src: &GrayImage,
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
    clip_limit: f32,
) -> [u8; HIST_SIZE] {
    let mut hist = [0u32; HIST_SIZE];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[src.get_pixel(x as u32, y as u32).0[0] as usize] += 1;
        }
    }
    let total = ((x1 - x0) * (y1 - y0)).max(1) as u32;

    if clip_limit > 0.0 {
        let limit = ((clip_limit * total as f32 / HIST_SIZE as f32) as u32).max(1);
        let mut clipped = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                clipped += *bin - limit;
                *bin = limit;
            }
        }
        let batch = clipped / HIST_SIZE as u32;
        let mut residual = clipped - batch * HIST_SIZE as u32;
        for bin in hist.iter_mut() {
            *bin += batch;
        }
        if residual > 0 {
            let step = (HIST_SIZE / residual as usize).max(1);
            let mut i = 0;
            while i < HIST_SIZE && residual > 0 {
                hist[i] += 1;
                residual -= 1;
                i += step;
            }
        }
    }

    let scale = 255.0 / total as f32;
    let mut lut = [0u8; HIST_SIZE];
    let mut sum = 0u32;
    for (bin, out) in hist.iter().zip(lut.iter_mut()) {
        sum += bin;
        *out = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

// sRGB (D65) <-> CIE Lab, with lightness scaled to 0..255 like 8-bit OpenCV.
const XN: f32 = 0.950_456;
const ZN: f32 = 1.088_754;
const LAB_EPS: f32 = 0.008_856;

#[inline]
fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > LAB_EPS {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

#[inline]
fn lab_f_inv(t: f32) -> f32 {
    let t3 = t * t * t;
    if t3 > LAB_EPS {
        t3
    } else {
        (t - 16.0 / 116.0) / 7.787
    }
}

/// Returns `(L in 0..=100, a, b)`.
fn rgb_to_lab(p: Rgb<u8>) -> (f32, f32, f32) {
    let [r, g, b] = p.0.map(srgb_to_linear);
    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / XN;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / ZN;
    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    let l = if y > LAB_EPS {
        116.0 * fy - 16.0
    } else {
        903.3 * y
    };
    (l, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

fn lab_to_rgb(l: f32, a: f32, b: f32) -> Rgb<u8> {
    let fy = (l + 16.0) / 116.0;
    let y = if l > 903.3 * LAB_EPS {
        fy * fy * fy
    } else {
        l / 903.3
    };
    let x = XN * lab_f_inv(fy + a / 500.0);
    let z = ZN * lab_f_inv(fy - b / 200.0);
    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_991 * y + 0.041_556 * z;
    let bl = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;
    Rgb([linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(bl)])
}

/// Equalize local lighting on the lightness channel only; chroma is kept.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img, params), fields(width = img.width(), height = img.height()))
)]
pub fn normalize_contrast(img: &RgbImage, params: &ContrastParams) -> Result<RgbImage, LocateError> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(LocateError::EmptyImage {
            width: w,
            height: h,
        });
    }

    let lab: Vec<(f32, f32, f32)> = img.pixels().map(|p| rgb_to_lab(*p)).collect();
    let lightness = GrayImage::from_fn(w, h, |x, y| {
        let l = lab[(y * w + x) as usize].0;
        Luma([(l * 2.55).round().clamp(0.0, 255.0) as u8])
    });
    let equalized = clahe(&lightness, params);

    Ok(RgbImage::from_fn(w, h, |x, y| {
        let (_, a, b) = lab[(y * w + x) as usize];
        let l = equalized.get_pixel(x, y).0[0] as f32 / 2.55;
        lab_to_rgb(l, a, b)
    }))
}
