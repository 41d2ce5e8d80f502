use cardscan_core::Quad;
use serde::{Deserialize, Serialize};

/// Contrast-limited adaptive histogram equalization settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastParams {
    /// Histogram clip limit relative to a uniform histogram.
    pub clip_limit: f32,
    /// Tile grid as `(columns, rows)`.
    pub tile_grid: (u32, u32),
}

impl Default for ContrastParams {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: (8, 8),
        }
    }
}

/// Binarization settings for the contour strategies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourParams {
    /// Adaptive block size is `1 + 2 * (min(width, height) / divisor)`.
    pub adaptive_block_divisor: u32,
    /// Subtracted from the local Gaussian mean before comparing.
    pub adaptive_offset: f32,
    /// Fixed threshold applied to each CLAHE-enhanced color channel.
    pub channel_threshold: u8,
    /// Canny hysteresis thresholds used for uploads.
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for ContourParams {
    fn default() -> Self {
        Self {
            adaptive_block_divisor: 20,
            adaptive_offset: 10.0,
            channel_threshold: 110,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

/// Bounding-quad search settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadFitParams {
    /// Edges shorter than this fraction of the perimeter are merged away.
    pub length_cutoff: f64,
    /// Scale applied to the simplified hull before the containment test.
    pub hull_shrink: f64,
    /// Corner regions start this fraction of the way from centroid to corner.
    pub corner_region: f64,
}

impl Default for QuadFitParams {
    fn default() -> Self {
        Self {
            length_cutoff: 0.15,
            hull_shrink: 0.9999,
            corner_region: 0.9,
        }
    }
}

/// Full localizer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorParams {
    pub contrast: ContrastParams,
    pub contours: ContourParams,
    pub quad_fit: QuadFitParams,
    /// Hulls smaller than this fraction of the frame are ignored.
    pub min_area_fraction: f64,
    /// Shrink factor is `min(1, 1 - corner_score * crop_gain)`.
    pub crop_gain: f64,
    /// Shrink factor used when the corner score is undefined.
    pub default_shrink: f64,
    /// A candidate is accepted only if every corner is closer than this
    /// (pixels) to the matching reference corner.
    pub acceptance_px: f64,
    /// Expected card corners for the capture rig, in frame pixels.
    pub reference_layout: Quad,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            contrast: ContrastParams::default(),
            contours: ContourParams::default(),
            quad_fit: QuadFitParams::default(),
            min_area_fraction: 0.001,
            crop_gain: 22.0 / 100.0,
            default_shrink: 1.0,
            acceptance_px: 25.0,
            reference_layout: Quad::from_xy([
                (68.0, 414.0),
                (954.0, 429.0),
                (940.0, 1690.0),
                (41.0, 1658.0),
            ]),
        }
    }
}
