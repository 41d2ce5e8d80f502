//! Paginated access to persisted fingerprints.

use std::path::{Path, PathBuf};

use crate::{SourceError, StoredRecord};

/// Read-only, paginated view of the persisted fingerprint table.
///
/// `read_page(offset, limit)` returns at most `limit` records starting at
/// `offset` in a stable order; a page shorter than `limit` ends the scan.
pub trait FingerprintSource: Send + Sync {
    fn read_page(&self, offset: usize, limit: usize) -> Result<Vec<StoredRecord>, SourceError>;
}

fn page_of(records: &[StoredRecord], offset: usize, limit: usize) -> Vec<StoredRecord> {
    records.iter().skip(offset).take(limit).cloned().collect()
}

/// In-memory source, mostly for tests and embedding.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    records: Vec<StoredRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<StoredRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FingerprintSource for MemorySource {
    fn read_page(&self, offset: usize, limit: usize) -> Result<Vec<StoredRecord>, SourceError> {
        Ok(page_of(&self.records, offset, limit))
    }
}

/// JSON array of `{ "id": ..., "phash": ... }` objects on disk.
///
/// The file is re-read for every page so a rebuild sees the current content.
#[derive(Clone, Debug)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Result<Vec<StoredRecord>, SourceError> {
        let data = std::fs::read(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| SourceError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Write `records` as a pretty-printed JSON array.
    pub fn write_all(&self, records: &[StoredRecord]) -> Result<(), SourceError> {
        let json = serde_json::to_vec_pretty(records).map_err(|source| SourceError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl FingerprintSource for JsonFileSource {
    fn read_page(&self, offset: usize, limit: usize) -> Result<Vec<StoredRecord>, SourceError> {
        Ok(page_of(&self.read_all()?, offset, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<StoredRecord> {
        (0..n)
            .map(|i| StoredRecord {
                id: format!("card-{i}"),
                phash: format!("{:04x}", i),
            })
            .collect()
    }

    #[test]
    fn memory_pages_are_contiguous() {
        let src = MemorySource::new(records(5));
        let first = src.read_page(0, 2).expect("page");
        let last = src.read_page(4, 2).expect("page");
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].id, "card-1");
        assert_eq!(last.len(), 1);
        assert!(src.read_page(10, 2).expect("page").is_empty());
    }

    #[test]
    fn json_file_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = JsonFileSource::new(dir.path().join("records.json"));
        src.write_all(&records(3)).expect("write");
        assert_eq!(src.read_all().expect("read"), records(3));
        assert_eq!(src.read_page(1, 10).expect("page"), records(3)[1..].to_vec());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = JsonFileSource::new(dir.path().join("absent.json"));
        assert!(matches!(src.read_page(0, 1), Err(SourceError::Io { .. })));
    }

    #[test]
    fn malformed_json_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"{\"id\": 1}").expect("write");
        assert!(matches!(
            JsonFileSource::new(path).read_page(0, 1),
            Err(SourceError::Json { .. })
        ));
    }
}
