use serde::{Deserialize, Serialize};

/// Perceptual hash settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashParams {
    /// Side of the output bit grid.
    pub hash_size: u32,
    /// The DCT input is `hash_size * highfreq_factor` pixels square.
    pub highfreq_factor: u32,
    /// Images are first resized to this height, keeping the aspect ratio.
    pub working_height: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            hash_size: 32,
            highfreq_factor: 4,
            working_height: 500,
        }
    }
}

/// Fingerprint index settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexParams {
    /// Default result count of a nearest-neighbour query.
    pub neighbors: usize,
    /// Records requested per page while loading from a source.
    pub page_size: usize,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            neighbors: 10,
            page_size: 100_000,
        }
    }
}
