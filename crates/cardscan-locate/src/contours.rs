//! Candidate outlines from independent binarization strategies.

use cardscan_core::{luma_601, Polygon};
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::find_contours;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{clahe, ContourParams, ContrastParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Where a frame came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    /// Fixed camera rig: card roughly at the reference layout.
    #[default]
    Rig,
    /// Arbitrary upload: additionally traces a Canny edge map.
    Upload,
}

/// Binarization strategy that produced an outline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourStrategy {
    AdaptiveGray,
    Red,
    Green,
    Blue,
    Edges,
}

/// One traced outline. May be degenerate (fewer than 3 points).
#[derive(Clone, Debug)]
pub struct Outline {
    pub strategy: ContourStrategy,
    pub polygon: Polygon,
}

/// Trace outlines with every strategy and concatenate the results.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(width = img.width(), height = img.height(), ?kind))
)]
pub fn extract_contours(
    img: &RgbImage,
    kind: CaptureKind,
    params: &ContourParams,
    contrast: &ContrastParams,
) -> Vec<Outline> {
    let gray = luma_601(img);
    let mut out = trace(&adaptive_binarize(&gray, params), ContourStrategy::AdaptiveGray);

    for (channel, strategy) in [
        (0, ContourStrategy::Red),
        (1, ContourStrategy::Green),
        (2, ContourStrategy::Blue),
    ] {
        let plane = GrayImage::from_fn(img.width(), img.height(), |x, y| {
            Luma([img.get_pixel(x, y).0[channel]])
        });
        let enhanced = clahe(&plane, contrast);
        out.extend(trace(&fixed_binarize(&enhanced, params.channel_threshold), strategy));
    }

    if kind == CaptureKind::Upload {
        let edges = canny(&gray, params.canny_low, params.canny_high);
        out.extend(trace(&edges, ContourStrategy::Edges));
    }

    log::debug!(
        "traced {} outlines ({:?}, {}x{})",
        out.len(),
        kind,
        img.width(),
        img.height()
    );
    out
}

/// Gaussian adaptive threshold: foreground where the pixel exceeds its local
/// weighted mean minus `adaptive_offset`.
fn adaptive_binarize(gray: &GrayImage, params: &ContourParams) -> GrayImage {
    let min_dim = gray.width().min(gray.height());
    let block = 1 + 2 * (min_dim / params.adaptive_block_divisor.max(1));
    let sigma = 0.3 * ((block as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let mean = gaussian_blur_f32(gray, sigma.max(0.5));
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0] as f32;
        let t = mean.get_pixel(x, y).0[0] as f32 - params.adaptive_offset;
        Luma([if v > t { 255 } else { 0 }])
    })
}

fn fixed_binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([if gray.get_pixel(x, y).0[0] > threshold {
            255
        } else {
            0
        }])
    })
}

fn trace(binary: &GrayImage, strategy: ContourStrategy) -> Vec<Outline> {
    find_contours::<i32>(binary)
        .into_iter()
        .map(|c| Outline {
            strategy,
            polygon: Polygon::new(
                c.points
                    .into_iter()
                    .map(|p| Point2::new(p.x as f64, p.y as f64))
                    .collect(),
            ),
        })
        .collect()
}
