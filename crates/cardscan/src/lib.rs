//! High-level facade for the `cardscan-*` workspace.
//!
//! This crate provides:
//! - re-exports of the localization and hashing crates
//! - [`CardIdentifier`]: decode a photo, find and rectify the card, hash it
//!   and rank the closest catalogue fingerprints
//! - [`ScanConfig`]: every tunable in one JSON document
//! - the `cardscan` command-line tool (feature `cli`)
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cardscan::locate::CaptureKind;
//! use cardscan::phash::JsonFileSource;
//! use cardscan::{CardIdentifier, ScanConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScanConfig::default();
//! let source = Arc::new(JsonFileSource::new("fingerprints.json"));
//! let identifier = CardIdentifier::with_source(&config, source)?;
//!
//! let photo = std::fs::read("photo.jpg")?;
//! let result = identifier.identify(&photo, CaptureKind::Upload, None)?;
//! println!("best guesses: {:?}", result.ids());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `cardscan::core`: geometry, homographies, sampling, logging.
//! - `cardscan::locate`: contrast normalization, contours, quad fitting,
//!   rectification.
//! - `cardscan::phash`: perceptual hash, fingerprints, the fingerprint index.

pub use cardscan_core as core;
pub use cardscan_locate as locate;
pub use cardscan_phash as phash;

mod config;
mod identify;
mod references;

pub use config::{ConfigIoError, ScanConfig};
pub use identify::{side_by_side, CardIdentifier, Identification, IdentifyError};
pub use references::{DirectoryImages, ReferenceImages};
