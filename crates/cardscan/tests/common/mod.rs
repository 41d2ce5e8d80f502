#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;

use cardscan::core::{homography_from_4pt, warp_perspective_rgb, Quad};
use image::{ImageFormat, Rgb, RgbImage};

pub const RIG_LAYOUT: [(f64, f64); 4] =
    [(68.0, 414.0), (954.0, 429.0), (940.0, 1690.0), (41.0, 1658.0)];

/// Deterministic 64-bit LCG.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407))
    }

    pub fn below(&mut self, n: u32) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as u32) % n
    }
}

/// 300x420 catalogue card: white border around colored panels.
pub fn catalogue_card(seed: u64) -> RgbImage {
    let (w, h, border) = (300u32, 420u32, 16u32);
    let mut rng = Lcg::new(seed);
    let bg = Rgb([rng.below(200) as u8, rng.below(200) as u8, rng.below(200) as u8]);
    let mut img = RgbImage::from_pixel(w, h, Rgb([255, 255, 255]));
    for y in border..h - border {
        for x in border..w - border {
            img.put_pixel(x, y, bg);
        }
    }
    for _ in 0..10 {
        let (x0, y0) = (border + rng.below(w - 2 * border), border + rng.below(h - 2 * border));
        let (pw, ph) = (30 + rng.below(w / 2), 30 + rng.below(h / 2));
        let color = Rgb([rng.below(256) as u8, rng.below(256) as u8, rng.below(256) as u8]);
        for y in y0..(y0 + ph).min(h - border) {
            for x in x0..(x0 + pw).min(w - border) {
                img.put_pixel(x, y, color);
            }
        }
    }
    img
}

/// 1000x1800 rig frame with `card` warped onto the rig corner layout.
pub fn rig_frame(card: &RgbImage) -> RgbImage {
    let frame_quad = Quad::from_xy(RIG_LAYOUT);
    let (wf, hf) = ((card.width() - 1) as f64, (card.height() - 1) as f64);
    let card_quad = Quad::from_xy([(0.0, 0.0), (wf, 0.0), (wf, hf), (0.0, hf)]);
    let h = homography_from_4pt(&frame_quad.corners, &card_quad.corners).expect("homography");
    warp_perspective_rgb(card, h, 1000, 1800)
}

pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("encode png");
    out.into_inner()
}

pub fn save_png(img: &RgbImage, path: &Path) {
    img.save(path).expect("save png");
}
