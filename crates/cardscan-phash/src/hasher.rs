use cardscan_core::{luma_601, resize_to_height};
use image::imageops::{self, FilterType};
use image::RgbImage;
use nalgebra::DMatrix;

use crate::dct::{dct2_basis, dct2_low, median};
use crate::{Fingerprint, HashError, HashParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Working-size image together with its fingerprint.
#[derive(Clone, Debug)]
pub struct HashedImage {
    /// Input resized to the working height.
    pub working: RgbImage,
    pub fingerprint: Fingerprint,
}

/// DCT perceptual hasher.
///
/// The image is resized to the working height, converted to luma, resized
/// to `(hash_size * highfreq_factor)²`, transformed with a 2D DCT-II, and
/// the `hash_size x hash_size` low-frequency block is thresholded at its
/// median (bit set where the coefficient is strictly greater).
#[derive(Clone, Debug)]
pub struct PerceptualHasher {
    params: HashParams,
    basis: DMatrix<f64>,
}

/// Largest side of the square the DCT runs on.
pub const MAX_DCT_SIDE: u32 = 4096;

impl PerceptualHasher {
    pub fn new(params: HashParams) -> Result<Self, HashError> {
        if !(2..=64).contains(&params.hash_size) {
            return Err(HashError::InvalidHashSize {
                hash_size: params.hash_size,
            });
        }
        let side = params
            .hash_size
            .checked_mul(params.highfreq_factor)
            .filter(|side| (1..=MAX_DCT_SIDE).contains(side))
            .ok_or(HashError::InvalidFactor {
                factor: params.highfreq_factor,
            })?;
        if params.working_height == 0 {
            return Err(HashError::InvalidWorkingHeight);
        }
        let basis = dct2_basis(params.hash_size as usize, side as usize);
        Ok(Self { params, basis })
    }

    pub fn params(&self) -> &HashParams {
        &self.params
    }

    #[inline]
    pub fn hash_size(&self) -> u32 {
        self.params.hash_size
    }

    /// Same settings with a different hash size.
    pub fn with_hash_size(&self, hash_size: u32) -> Result<Self, HashError> {
        if hash_size == self.params.hash_size {
            return Ok(self.clone());
        }
        Self::new(HashParams {
            hash_size,
            ..self.params.clone()
        })
    }

    /// Resize to the working height, keeping the aspect ratio.
    pub fn working_image(&self, img: &RgbImage) -> Result<RgbImage, HashError> {
        resize_to_height(img, self.params.working_height).ok_or(HashError::EmptyImage {
            width: img.width(),
            height: img.height(),
        })
    }

    pub fn hash(&self, img: &RgbImage) -> Result<Fingerprint, HashError> {
        Ok(self.hash_detailed(img)?.fingerprint)
    }

    /// Hash and keep the working-size image.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, img), fields(width = img.width(), height = img.height(), hash_size = self.params.hash_size))
    )]
    pub fn hash_detailed(&self, img: &RgbImage) -> Result<HashedImage, HashError> {
        let working = self.working_image(img)?;
        let fingerprint = self.hash_working(&working);
        Ok(HashedImage {
            working,
            fingerprint,
        })
    }

    /// Hash an image that is already at the working size.
    fn hash_working(&self, working: &RgbImage) -> Fingerprint {
        let side = self.basis.ncols() as u32;
        let gray = luma_601(working);
        let small = imageops::resize(&gray, side, side, FilterType::Lanczos3);
        let pixels = DMatrix::from_fn(side as usize, side as usize, |r, c| {
            small.get_pixel(c as u32, r as u32).0[0] as f64
        });

        let low = dct2_low(&pixels, &self.basis);
        let n = self.params.hash_size as usize;
        // Row-major copy; nalgebra stores column-major.
        let values: Vec<f64> = (0..n)
            .flat_map(|r| (0..n).map(move |c| (r, c)))
            .map(|(r, c)| low[(r, c)])
            .collect();
        let med = median(&values);
        Fingerprint::from_bits(self.params.hash_size, values.iter().map(|&v| v > med))
    }
}
