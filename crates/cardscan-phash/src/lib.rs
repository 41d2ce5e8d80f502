//! Perceptual hashing and fingerprint lookup for rectified card images.
//!
//! ## Quickstart
//!
//! ```
//! use cardscan_phash::{FingerprintIndex, FingerprintRecord, HashParams, IndexParams, PerceptualHasher};
//! use image::{Rgb, RgbImage};
//!
//! let hasher = PerceptualHasher::new(HashParams::default()).expect("valid params");
//! let card = RgbImage::from_fn(120, 168, |x, y| Rgb([(x * 2) as u8, (y + x) as u8, 90]));
//! let fingerprint = hasher.hash(&card).expect("non-empty image");
//!
//! let index = FingerprintIndex::from_records(
//!     IndexParams::default(),
//!     vec![FingerprintRecord::new("card-1", fingerprint.clone())],
//! )
//! .expect("uniform hash sizes");
//! let best = index.nearest(&fingerprint, Some(1)).expect("same hash size");
//! assert_eq!(best[0].id, "card-1");
//! assert_eq!(best[0].distance, 0);
//! ```

mod dct;
mod error;
mod fingerprint;
mod hasher;
mod index;
mod params;
mod record;
mod source;

pub use error::{FingerprintParseError, HashError, IndexError, SourceError};
pub use fingerprint::Fingerprint;
pub use hasher::{HashedImage, PerceptualHasher, MAX_DCT_SIDE};
pub use index::{FingerprintIndex, Neighbor};
pub use params::{HashParams, IndexParams};
pub use record::{FingerprintRecord, StoredRecord};
pub use source::{FingerprintSource, JsonFileSource, MemorySource};
