use std::borrow::Cow;
use std::io::Cursor;
use std::sync::Arc;

use cardscan_core::{resize_to_height, Quad};
use cardscan_locate::{
    normalize_contrast, CaptureKind, CardLocalizer, LocateError, LocateSource, LocatedCard,
};
use cardscan_phash::{
    Fingerprint, FingerprintIndex, FingerprintSource, HashError, IndexError, Neighbor,
    PerceptualHasher,
};
use image::{imageops, ImageFormat, RgbImage};

use crate::{ReferenceImages, ScanConfig};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by [`CardIdentifier`].
#[derive(thiserror::Error, Debug)]
pub enum IdentifyError {
    #[error("image buffer is empty")]
    EmptyInput,

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("failed to encode PNG: {0}")]
    Encode(#[source] image::ImageError),
}

/// Result of identifying one photo.
#[derive(Clone, Debug)]
pub struct Identification {
    /// Closest catalogue cards, best first. Empty when the index is empty.
    pub matches: Vec<Neighbor>,
    pub fingerprint: Fingerprint,
    /// Quad that was rectified, in frame pixels.
    pub quad: Quad,
    pub source: LocateSource,
    /// Rectified card at the working height, PNG encoded.
    pub rectified_png: Vec<u8>,
    /// Rectified card next to the top match's reference image, PNG encoded.
    /// `None` without reference images or when the top match has none.
    pub comparison_png: Option<Vec<u8>>,
}

impl Identification {
    pub fn ids(&self) -> Vec<&str> {
        self.matches.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn best(&self) -> Option<&Neighbor> {
        self.matches.first()
    }
}

/// End-to-end identification: decode, locate, rectify, hash and look up.
///
/// The index is shared; several identifiers (or threads) may query it while
/// another caller rebuilds it.
pub struct CardIdentifier {
    localizer: CardLocalizer,
    hasher: PerceptualHasher,
    index: Arc<FingerprintIndex>,
    images: Option<Arc<dyn ReferenceImages>>,
}

impl CardIdentifier {
    pub fn new(config: &ScanConfig, index: Arc<FingerprintIndex>) -> Result<Self, HashError> {
        Ok(Self {
            localizer: CardLocalizer::new(config.locator.clone()),
            hasher: PerceptualHasher::new(config.hash.clone())?,
            index,
            images: None,
        })
    }

    /// Identifier over a fresh index that loads from `source` on first use.
    pub fn with_source(
        config: &ScanConfig,
        source: Arc<dyn FingerprintSource>,
    ) -> Result<Self, HashError> {
        let index = FingerprintIndex::with_source(config.index.clone(), source);
        Self::new(config, Arc::new(index))
    }

    /// Enable comparison images.
    pub fn with_reference_images(mut self, images: Arc<dyn ReferenceImages>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn localizer(&self) -> &CardLocalizer {
        &self.localizer
    }

    pub fn hasher(&self) -> &PerceptualHasher {
        &self.hasher
    }

    pub fn index(&self) -> &Arc<FingerprintIndex> {
        &self.index
    }

    /// Identify the card in an encoded image (PNG, JPEG, ...).
    ///
    /// `hash_size` overrides the configured hash size for this call; it must
    /// match the size of the indexed fingerprints.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, bytes), fields(bytes = bytes.len()))
    )]
    pub fn identify(
        &self,
        bytes: &[u8],
        kind: CaptureKind,
        hash_size: Option<u32>,
    ) -> Result<Identification, IdentifyError> {
        let frame = decode_rgb(bytes)?;
        self.identify_image(&frame, kind, hash_size)
    }

    /// Same as [`identify`](Self::identify) for an already decoded frame.
    pub fn identify_image(
        &self,
        frame: &RgbImage,
        kind: CaptureKind,
        hash_size: Option<u32>,
    ) -> Result<Identification, IdentifyError> {
        let hasher = self.hasher_for(hash_size)?;
        let LocatedCard {
            image, quad, source, ..
        } = self.localizer.locate(frame, kind)?;
        let hashed = hasher.hash_detailed(&image)?;
        let matches = self.index.nearest(&hashed.fingerprint, None)?;

        match matches.first() {
            Some(best) => log::info!(
                "top match {} at distance {} ({} candidates)",
                best.id,
                best.distance,
                matches.len()
            ),
            None => log::info!("fingerprint index is empty; no matches"),
        }

        let comparison_png = match matches.first() {
            Some(best) => self
                .comparison_image(&hashed.working, &best.id)
                .map(|img| encode_png(&img))
                .transpose()?,
            None => None,
        };

        Ok(Identification {
            rectified_png: encode_png(&hashed.working)?,
            matches,
            fingerprint: hashed.fingerprint,
            quad,
            source,
            comparison_png,
        })
    }

    /// Fingerprint a catalogue image, which is already upright and cropped.
    ///
    /// Contrast is normalized the same way as for photos, but no
    /// localization is attempted.
    pub fn fingerprint_reference(&self, bytes: &[u8]) -> Result<Fingerprint, IdentifyError> {
        let img = decode_rgb(bytes)?;
        let normalized = normalize_contrast(&img, &self.localizer.params().contrast)?;
        Ok(self.hasher.hash(&normalized)?)
    }

    /// Reload the index from its source; returns the number of records.
    pub fn rebuild_index(&self) -> Result<usize, IdentifyError> {
        Ok(self.index.rebuild()?)
    }

    fn hasher_for(&self, hash_size: Option<u32>) -> Result<Cow<'_, PerceptualHasher>, HashError> {
        match hash_size {
            Some(size) if size != self.hasher.hash_size() => {
                Ok(Cow::Owned(self.hasher.with_hash_size(size)?))
            }
            _ => Ok(Cow::Borrowed(&self.hasher)),
        }
    }

    fn comparison_image(&self, working: &RgbImage, id: &str) -> Option<RgbImage> {
        let images = self.images.as_ref()?;
        let reference = match images.load(id) {
            Ok(Some(img)) => img,
            Ok(None) => {
                log::debug!("no reference image for {id}");
                return None;
            }
            Err(err) => {
                log::warn!("reference image for {id} is unreadable: {err}");
                return None;
            }
        };
        let reference = resize_to_height(&reference, working.height())?;
        Some(side_by_side(working, &reference))
    }
}

impl std::fmt::Debug for CardIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardIdentifier")
            .field("localizer", &self.localizer)
            .field("hasher", &self.hasher)
            .field("index", &self.index)
            .field("reference_images", &self.images.is_some())
            .finish()
    }
}

fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, IdentifyError> {
    if bytes.is_empty() {
        return Err(IdentifyError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

fn encode_png(img: &RgbImage) -> Result<Vec<u8>, IdentifyError> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(IdentifyError::Encode)?;
    Ok(out.into_inner())
}

/// `left` and `right` on one canvas, top-aligned.
pub fn side_by_side(left: &RgbImage, right: &RgbImage) -> RgbImage {
    let width = left.width() + right.width();
    let height = left.height().max(right.height());
    let mut canvas = RgbImage::new(width, height);
    imageops::replace(&mut canvas, left, 0, 0);
    imageops::replace(&mut canvas, right, left.width() as i64, 0);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardscan_phash::FingerprintRecord;
    use image::Rgb;

    fn png(img: &RgbImage) -> Vec<u8> {
        encode_png(img).expect("encode")
    }

    fn identifier(index: FingerprintIndex) -> CardIdentifier {
        CardIdentifier::new(&ScanConfig::default(), Arc::new(index)).expect("default config")
    }

    #[test]
    fn empty_bytes_are_rejected() {
        let id = identifier(FingerprintIndex::new(Default::default()));
        assert!(matches!(
            id.identify(&[], CaptureKind::Rig, None),
            Err(IdentifyError::EmptyInput)
        ));
        assert!(matches!(
            id.fingerprint_reference(&[]),
            Err(IdentifyError::EmptyInput)
        ));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let id = identifier(FingerprintIndex::new(Default::default()));
        assert!(matches!(
            id.identify(b"definitely not an image", CaptureKind::Rig, None),
            Err(IdentifyError::Decode(_))
        ));
    }

    #[test]
    fn empty_index_yields_no_matches() {
        let id = identifier(FingerprintIndex::new(Default::default()));
        let frame = RgbImage::from_pixel(60, 80, Rgb([40, 40, 40]));
        let got = id
            .identify(&png(&frame), CaptureKind::Upload, None)
            .expect("identify");
        assert!(got.matches.is_empty());
        assert!(got.best().is_none());
        assert!(got.comparison_png.is_none());
        assert_eq!(got.source, LocateSource::Fallback);
        let rectified = image::load_from_memory(&got.rectified_png).expect("png");
        assert_eq!(rectified.height(), 500);
    }

    #[test]
    fn hash_size_override_must_match_index() {
        let fp = Fingerprint::zeros(32);
        let index = FingerprintIndex::from_records(
            Default::default(),
            vec![FingerprintRecord::new("card-1", fp)],
        )
        .expect("index");
        let id = identifier(index);
        let frame = png(&RgbImage::from_pixel(60, 80, Rgb([90, 10, 10])));

        let err = id
            .identify(&frame, CaptureKind::Rig, Some(16))
            .unwrap_err();
        assert!(matches!(
            err,
            IdentifyError::Index(IndexError::HashSizeMismatch {
                index: 32,
                query: 16
            })
        ));
        assert!(matches!(
            id.identify(&frame, CaptureKind::Rig, Some(1)),
            Err(IdentifyError::Hash(HashError::InvalidHashSize { hash_size: 1 }))
        ));
    }

    #[test]
    fn reference_fingerprint_matches_identical_bytes() {
        let card = RgbImage::from_fn(120, 168, |x, y| {
            Rgb([(x * 2) as u8, (y + x) as u8, ((x * y) % 200) as u8])
        });
        let id = identifier(FingerprintIndex::new(Default::default()));
        let a = id.fingerprint_reference(&png(&card)).expect("hash");
        let b = id.fingerprint_reference(&png(&card)).expect("hash");
        assert_eq!(a, b);
        assert_eq!(a.side(), 32);
    }

    #[test]
    fn side_by_side_places_both_images() {
        let left = RgbImage::from_pixel(3, 4, Rgb([255, 0, 0]));
        let right = RgbImage::from_pixel(2, 2, Rgb([0, 0, 255]));
        let out = side_by_side(&left, &right);
        assert_eq!(out.dimensions(), (5, 4));
        assert_eq!(out.get_pixel(2, 3), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(4, 1), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(4, 3), &Rgb([0, 0, 0]));
    }
}
