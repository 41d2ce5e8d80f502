use cardscan_core::{Polygon, Quad};
use cardscan_locate::{CaptureKind, CardLocalizer, LocateSource, LocatorParams};
use image::{Rgb, RgbImage};
use nalgebra::Point2;

const REFERENCE: [(f64, f64); 4] = [(68.0, 414.0), (954.0, 429.0), (940.0, 1690.0), (41.0, 1658.0)];

/// Fill every pixel whose center lies inside `corners` with `fg`.
fn render_quad(w: u32, h: u32, corners: [(f64, f64); 4], fg: Rgb<u8>, bg: Rgb<u8>) -> RgbImage {
    let poly = Polygon::new(corners.iter().map(|&(x, y)| Point2::new(x, y)).collect());
    RgbImage::from_fn(w, h, |x, y| {
        if poly.contains_point(Point2::new(x as f64, y as f64)) {
            fg
        } else {
            bg
        }
    })
}

fn assert_corners_within(found: &Quad, expected: [(f64, f64); 4], tol: f64) {
    let expected = Quad::from_xy(expected);
    for (i, d) in found.corner_distances(&expected).iter().enumerate() {
        assert!(
            *d < tol,
            "corner {i}: found {:?}, expected {:?} ({d:.2}px apart)",
            found.corners[i],
            expected.corners[i]
        );
    }
}

#[test]
fn white_card_on_black_is_found_at_reference_layout() {
    let _ = env_logger::builder().is_test(true).try_init();
    let frame = render_quad(1000, 1800, REFERENCE, Rgb([255, 255, 255]), Rgb([0, 0, 0]));

    let localizer = CardLocalizer::new(LocatorParams::default());
    let card = localizer.locate(&frame, CaptureKind::Rig).expect("locate");

    assert!(
        matches!(card.source, LocateSource::Detected { .. }),
        "fell back: {:?}",
        card.source
    );
    assert_corners_within(&card.quad, REFERENCE, 5.0);

    let (w, h) = card.quad.max_edge_lengths();
    assert!((card.image.width() as f64 - w).abs() <= 1.0);
    assert!((card.image.height() as f64 - h).abs() <= 1.0);
    // Rectified content is the card face, not background.
    let center = card.image.get_pixel(card.image.width() / 2, card.image.height() / 2);
    assert!(center.0.iter().all(|&c| c > 200), "center pixel {center:?}");
}

#[test]
fn shifted_card_is_tracked_within_tolerance() {
    let shifted = REFERENCE.map(|(x, y)| (x + 9.0, y - 7.0));
    let frame = render_quad(1000, 1800, shifted, Rgb([235, 220, 200]), Rgb([10, 10, 10]));

    let card = CardLocalizer::default()
        .locate(&frame, CaptureKind::Rig)
        .expect("locate");

    assert!(matches!(card.source, LocateSource::Detected { .. }));
    assert_corners_within(&card.quad, shifted, 5.0);
}

#[test]
fn card_far_from_reference_uses_fallback() {
    // Small card in the top-left corner: every corner is far from the rig layout.
    let corners = [(20.0, 20.0), (300.0, 20.0), (300.0, 400.0), (20.0, 400.0)];
    let frame = render_quad(1000, 1800, corners, Rgb([255, 255, 255]), Rgb([0, 0, 0]));

    let localizer = CardLocalizer::default();
    let card = localizer.locate(&frame, CaptureKind::Upload).expect("locate");

    assert_eq!(card.source, LocateSource::Fallback);
    assert_eq!(card.quad, *localizer.reference_layout());
    assert_eq!(card.accepted_count(), 0);
    assert!(!card.candidates.is_empty());
}
