use cardscan_core::{convex_hull, Polygon, Quad};
use image::RgbImage;
use serde::Serialize;

use crate::{
    corner_diff_score, extract_contours, fit_bounding_quad, normalize_contrast, rectify_quad,
    CaptureKind, ContourStrategy, LocateError, LocatorParams,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Why an outline did not become an accepted candidate.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    /// Fewer than three distinct points, so no hull.
    TooFewPoints,
    /// Hull area below `min_area_fraction` of the frame.
    TooSmall { area: f64 },
    /// No four extended hull edges enclose the hull.
    NoBoundingQuad,
    /// Some corner is at least `acceptance_px` away from the reference layout.
    OutsideReference { max_distance: f64 },
}

/// Result of evaluating a single outline.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOutcome {
    Accepted {
        /// Fitted quad after the corner-roundness shrink.
        quad: Quad,
        /// Corner diff score; `None` when every corner region was degenerate.
        score: Option<f64>,
        max_distance: f64,
        min_distance: f64,
    },
    Skipped(SkipReason),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Candidate {
    pub strategy: ContourStrategy,
    pub outcome: CandidateOutcome,
}

/// How the rectified quad was chosen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocateSource {
    /// Accepted candidate with the smallest minimum corner distance.
    Detected {
        min_distance: f64,
        strategy: ContourStrategy,
    },
    /// No acceptable candidate; the reference layout was warped directly.
    Fallback,
}

/// Rectified card plus the evidence that produced it.
#[derive(Clone, Debug)]
pub struct LocatedCard {
    /// Upright card cut from the contrast-normalized frame.
    pub image: RgbImage,
    /// Quad that was rectified, in frame pixels.
    pub quad: Quad,
    pub source: LocateSource,
    /// Every traced outline in extraction order.
    pub candidates: Vec<Candidate>,
}

impl LocatedCard {
    pub fn accepted_count(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| matches!(c.outcome, CandidateOutcome::Accepted { .. }))
            .count()
    }
}

/// Finds the card quadrilateral in a frame and rectifies it.
///
/// Stateless apart from its parameters; a single instance can serve
/// concurrent calls.
#[derive(Clone, Debug)]
pub struct CardLocalizer {
    params: LocatorParams,
    reference: Quad,
}

impl CardLocalizer {
    pub fn new(params: LocatorParams) -> Self {
        // Layouts loaded from config may list corners in any order.
        let reference = Quad::new(params.reference_layout.corners);
        Self { params, reference }
    }

    pub fn params(&self) -> &LocatorParams {
        &self.params
    }

    /// Reference corner layout in counterclockwise order.
    pub fn reference_layout(&self) -> &Quad {
        &self.reference
    }

    /// Normalize lighting, trace candidate outlines, and rectify the best
    /// quad. Falls back to the reference layout when nothing is accepted.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(width = img.width(), height = img.height()))
    )]
    pub fn locate(&self, img: &RgbImage, kind: CaptureKind) -> Result<LocatedCard, LocateError> {
        let normalized = normalize_contrast(img, &self.params.contrast)?;
        let frame_area = img.width() as f64 * img.height() as f64;
        let outlines = extract_contours(
            &normalized,
            kind,
            &self.params.contours,
            &self.params.contrast,
        );

        let mut best: Option<(f64, Quad, ContourStrategy)> = None;
        let mut candidates = Vec::with_capacity(outlines.len());
        for outline in outlines {
            let outcome = self.evaluate(&outline.polygon, frame_area);
            if let CandidateOutcome::Accepted {
                quad, min_distance, ..
            } = &outcome
            {
                log::debug!(
                    "{:?} candidate accepted: min corner distance {:.2}px",
                    outline.strategy,
                    min_distance
                );
                if best.as_ref().is_none_or(|(d, _, _)| min_distance < d) {
                    best = Some((*min_distance, *quad, outline.strategy));
                }
            }
            candidates.push(Candidate {
                strategy: outline.strategy,
                outcome,
            });
        }

        if let Some((min_distance, quad, strategy)) = best {
            if let Some(image) = rectify_quad(&normalized, &quad) {
                let card = LocatedCard {
                    image,
                    quad,
                    source: LocateSource::Detected {
                        min_distance,
                        strategy,
                    },
                    candidates,
                };
                log::debug!(
                    "located card via {:?} ({} of {} outlines accepted)",
                    strategy,
                    card.accepted_count(),
                    card.candidates.len()
                );
                return Ok(card);
            }
            log::warn!("best candidate could not be rectified; using reference layout");
        } else {
            log::warn!(
                "no outline matched the reference layout ({} traced); using reference layout",
                candidates.len()
            );
        }

        let quad = self.reference;
        let image = rectify_quad(&normalized, &quad).ok_or(LocateError::DegenerateReference)?;
        Ok(LocatedCard {
            image,
            quad,
            source: LocateSource::Fallback,
            candidates,
        })
    }

    /// Score one outline against the reference layout.
    pub fn evaluate(&self, outline: &Polygon, frame_area: f64) -> CandidateOutcome {
        if outline.len() < 3 {
            return CandidateOutcome::Skipped(SkipReason::TooFewPoints);
        }
        let hull = convex_hull(&outline.points);
        if hull.len() < 3 {
            return CandidateOutcome::Skipped(SkipReason::TooFewPoints);
        }
        let area = hull.area();
        if area < frame_area * self.params.min_area_fraction {
            return CandidateOutcome::Skipped(SkipReason::TooSmall { area });
        }

        let Some(quad) = fit_bounding_quad(&hull, &self.params.quad_fit) else {
            return CandidateOutcome::Skipped(SkipReason::NoBoundingQuad);
        };
        let score = corner_diff_score(&hull, &quad, self.params.quad_fit.corner_region);
        let shrink = match score {
            Some(s) => (1.0 - s * self.params.crop_gain).min(1.0),
            None => self.params.default_shrink,
        };
        let quad = quad.scaled(shrink);

        let distances = quad.corner_distances(&self.reference);
        let max_distance = distances.iter().copied().fold(0.0, f64::max);
        let min_distance = distances.iter().copied().fold(f64::INFINITY, f64::min);
        if max_distance < self.params.acceptance_px {
            CandidateOutcome::Accepted {
                quad,
                score,
                max_distance,
                min_distance,
            }
        } else {
            CandidateOutcome::Skipped(SkipReason::OutsideReference { max_distance })
        }
    }
}

impl Default for CardLocalizer {
    fn default() -> Self {
        Self::new(LocatorParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::new(vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ])
    }

    fn small_rig() -> CardLocalizer {
        let mut params = LocatorParams::default();
        params.reference_layout =
            Quad::from_xy([(20.0, 20.0), (120.0, 20.0), (120.0, 160.0), (20.0, 160.0)]);
        params.acceptance_px = 6.0;
        CardLocalizer::new(params)
    }

    #[test]
    fn reference_layout_is_reordered() {
        let mut params = LocatorParams::default();
        let [a, b, c, d] = params.reference_layout.corners;
        params.reference_layout = Quad { corners: [c, a, d, b] };
        let localizer = CardLocalizer::new(params);
        assert_eq!(localizer.reference_layout().corners, [a, b, c, d]);
    }

    #[test]
    fn outline_on_reference_is_accepted() {
        let localizer = small_rig();
        match localizer.evaluate(&rect(21.0, 19.0, 121.0, 159.0), 200.0 * 200.0) {
            CandidateOutcome::Accepted {
                score,
                max_distance,
                min_distance,
                ..
            } => {
                assert!(score.is_some_and(|s| s < 1e-9));
                assert!(max_distance < 2.0);
                assert!(min_distance <= max_distance);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn skip_reasons_are_reported() {
        let localizer = small_rig();
        let frame_area = 200.0 * 200.0;

        let line = Polygon::new(vec![Point2::new(0.0, 0.0), Point2::new(5.0, 5.0)]);
        assert_eq!(
            localizer.evaluate(&line, frame_area),
            CandidateOutcome::Skipped(SkipReason::TooFewPoints)
        );

        assert!(matches!(
            localizer.evaluate(&rect(0.0, 0.0, 4.0, 4.0), frame_area),
            CandidateOutcome::Skipped(SkipReason::TooSmall { .. })
        ));

        assert!(matches!(
            localizer.evaluate(&rect(60.0, 60.0, 180.0, 190.0), frame_area),
            CandidateOutcome::Skipped(SkipReason::OutsideReference { .. })
        ));
    }

    #[test]
    fn blank_frame_falls_back_to_reference() {
        let localizer = small_rig();
        let card = localizer
            .locate(&RgbImage::new(200, 200), CaptureKind::Rig)
            .expect("locate");
        assert_eq!(card.source, LocateSource::Fallback);
        assert_eq!(card.quad, *localizer.reference_layout());
        assert_eq!(card.image.dimensions(), (100, 140));
        assert_eq!(card.accepted_count(), 0);
    }

    #[test]
    fn empty_frame_is_an_error() {
        let err = CardLocalizer::default()
            .locate(&RgbImage::new(0, 0), CaptureKind::Upload)
            .unwrap_err();
        assert_eq!(
            err,
            LocateError::EmptyImage {
                width: 0,
                height: 0
            }
        );
    }
}
