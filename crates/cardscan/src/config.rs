use std::path::{Path, PathBuf};

use cardscan_locate::LocatorParams;
use cardscan_phash::{HashParams, IndexParams};
use serde::{Deserialize, Serialize};

/// Every tunable of the pipeline in one JSON document.
///
/// Missing fields fall back to their defaults, so a file containing only
/// `{"hash": {"hash_size": 16}}` is valid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub locator: LocatorParams,
    pub hash: HashParams,
    pub index: IndexParams,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ScanConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| ConfigIoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| ConfigIoError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let path = path.as_ref();
        let json = self.to_json_pretty().map_err(|source| ConfigIoError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| ConfigIoError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
