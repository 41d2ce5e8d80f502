use std::path::PathBuf;

/// Errors returned by the perceptual hasher.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HashError {
    #[error("image has no pixels (width={width}, height={height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("hash size {hash_size} is outside 2..=64")]
    InvalidHashSize { hash_size: u32 },
    #[error("high-frequency factor {factor} must be at least 1 and keep hash_size * factor within 4096")]
    InvalidFactor { factor: u32 },
    #[error("working height must be positive")]
    InvalidWorkingHeight,
}

/// Errors returned when decoding a hex fingerprint.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FingerprintParseError {
    #[error("empty fingerprint string")]
    Empty,
    #[error("invalid hex digit {digit:?} at position {position}")]
    InvalidDigit { position: usize, digit: char },
    #[error("{digits} hex digits do not encode a square bit grid")]
    NotSquare { digits: usize },
    #[error("padding bits ahead of a {side}x{side} grid are set")]
    NonZeroPadding { side: u32 },
}

/// Errors returned by a fingerprint source.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse fingerprint records in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("fingerprint backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors returned by the fingerprint index.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("record {id:?} has an invalid fingerprint")]
    InvalidRecord {
        id: String,
        #[source]
        source: FingerprintParseError,
    },
    #[error("record {id:?} has hash size {got}, index uses {expected}")]
    MixedHashSizes { id: String, expected: u32, got: u32 },
    #[error("record id {id:?} appears more than once")]
    DuplicateId { id: String },
    #[error("query hash size {query} does not match index hash size {index}")]
    HashSizeMismatch { index: u32, query: u32 },
}
