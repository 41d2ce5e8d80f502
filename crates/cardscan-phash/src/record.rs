use serde::{Deserialize, Serialize};

use crate::{Fingerprint, FingerprintParseError};

/// Persisted form of a fingerprint: card identifier plus hex string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub phash: String,
}

/// Decoded card fingerprint held by the index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FingerprintRecord {
    pub id: String,
    pub fingerprint: Fingerprint,
}

impl FingerprintRecord {
    pub fn new(id: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            id: id.into(),
            fingerprint,
        }
    }

    pub fn to_stored(&self) -> StoredRecord {
        StoredRecord {
            id: self.id.clone(),
            phash: self.fingerprint.to_hex(),
        }
    }
}

impl TryFrom<StoredRecord> for FingerprintRecord {
    type Error = FingerprintParseError;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        let fingerprint = Fingerprint::from_hex(&stored.phash)?;
        Ok(Self {
            id: stored.id,
            fingerprint,
        })
    }
}
