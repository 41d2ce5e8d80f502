//! Card localization built on top of `cardscan-core`.
//!
//! ## Quickstart
//!
//! ```
//! use cardscan_locate::{CaptureKind, CardLocalizer, LocatorParams};
//! use image::RgbImage;
//!
//! let localizer = CardLocalizer::new(LocatorParams::default());
//! let frame = RgbImage::new(200, 300);
//! let card = localizer.locate(&frame, CaptureKind::Rig).expect("non-empty frame");
//! println!("rectified {}x{} via {:?}", card.image.width(), card.image.height(), card.source);
//! ```
//!
//! Pipeline:
//! 1. Even out lighting with CLAHE on the Lab lightness channel.
//! 2. Trace outlines with an adaptive-threshold grayscale pass and one fixed
//!    threshold pass per color channel (plus a Canny pass for uploads).
//! 3. Reduce each outline's convex hull to a few long edges, then pick the
//!    minimum-area quadrilateral formed by four extended edges that still
//!    encloses the hull.
//! 4. Measure how rounded the hull is inside the quad's corners and shrink
//!    the quad accordingly.
//! 5. Keep the quad closest to the reference corner layout and warp it to an
//!    upright rectangle; without an acceptable quad, warp the reference
//!    layout itself.

mod contours;
mod contrast;
mod corners;
mod error;
mod localizer;
mod params;
mod quad_fit;
mod rectify;

pub use contours::{extract_contours, CaptureKind, ContourStrategy, Outline};
pub use contrast::{clahe, normalize_contrast};
pub use corners::corner_diff_score;
pub use error::LocateError;
pub use localizer::{
    Candidate, CandidateOutcome, CardLocalizer, LocateSource, LocatedCard, SkipReason,
};
pub use params::{ContourParams, ContrastParams, LocatorParams, QuadFitParams};
pub use quad_fit::{bounding_quad_candidates, fit_bounding_quad, simplify_polygon};
pub use rectify::rectify_quad;
