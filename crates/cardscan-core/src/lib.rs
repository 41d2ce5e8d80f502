//! Core types and utilities for trading card scanning.
//!
//! This crate is intentionally small and purely geometric: polygons and
//! quadrilaterals in image coordinates, a convex hull, exact line/segment
//! intersection helpers, 4-point homographies and a perspective warp over
//! `image::RgbImage`. It knows nothing about contours, hashes or indexes.

mod geometry;
mod homography;
mod logger;
mod sampling;

pub use geometry::{
    clip_convex, clip_segment_convex, convex_hull, line_intersection, segments_cross, Polygon,
    Quad,
};
pub use homography::{homography_from_4pt, warp_perspective_rgb, Homography};
pub use sampling::{luma_601, resize_to_height, sample_bilinear_rgb};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
