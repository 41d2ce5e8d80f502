//! In-memory Hamming-distance index over card fingerprints.
//!
//! Queries read an immutable snapshot behind an `Arc`; builds assemble a new
//! snapshot under a separate build lock and swap it in once complete, so
//! readers never wait on a running build.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    Fingerprint, FingerprintRecord, FingerprintSource, IndexError, IndexParams, StoredRecord,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One query result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Neighbor {
    pub id: String,
    pub distance: u32,
}

#[derive(Debug, Default)]
struct Snapshot {
    /// Hash size shared by every record; `None` when empty.
    side: Option<u32>,
    records: Vec<FingerprintRecord>,
}

impl Snapshot {
    fn from_records(records: Vec<FingerprintRecord>) -> Result<Self, IndexError> {
        let side = records.first().map(|r| r.fingerprint.side());
        if let Some(expected) = side {
            if let Some(bad) = records.iter().find(|r| r.fingerprint.side() != expected) {
                return Err(IndexError::MixedHashSizes {
                    id: bad.id.clone(),
                    expected,
                    got: bad.fingerprint.side(),
                });
            }
        }
        let duplicate = {
            let mut seen = HashSet::with_capacity(records.len());
            records.iter().find(|r| !seen.insert(r.id.as_str())).map(|r| r.id.clone())
        };
        if let Some(id) = duplicate {
            return Err(IndexError::DuplicateId { id });
        }
        Ok(Self { side, records })
    }
}

/// Exact nearest-neighbour index by Hamming distance.
///
/// A never-built index with a source builds itself on first use; without a
/// source it starts empty. Record ids are unique within an index; a build
/// that loads the same id twice fails with [`IndexError::DuplicateId`].
/// Results are ordered by ascending distance, ties by load order.
pub struct FingerprintIndex {
    params: IndexParams,
    source: Option<Arc<dyn FingerprintSource>>,
    current: RwLock<Option<Arc<Snapshot>>>,
    build_lock: Mutex<()>,
}

impl std::fmt::Debug for FingerprintIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintIndex")
            .field("params", &self.params)
            .field("has_source", &self.source.is_some())
            .field("len", &self.len())
            .finish()
    }
}

impl FingerprintIndex {
    /// Empty index without a backing source.
    pub fn new(params: IndexParams) -> Self {
        Self {
            params,
            source: None,
            current: RwLock::new(None),
            build_lock: Mutex::new(()),
        }
    }

    /// Index that loads from `source` on first query or on [`rebuild`](Self::rebuild).
    pub fn with_source(params: IndexParams, source: Arc<dyn FingerprintSource>) -> Self {
        Self {
            source: Some(source),
            ..Self::new(params)
        }
    }

    /// Index built directly from decoded records.
    pub fn from_records(
        params: IndexParams,
        records: Vec<FingerprintRecord>,
    ) -> Result<Self, IndexError> {
        let index = Self::new(params);
        index.publish(Snapshot::from_records(records)?);
        Ok(index)
    }

    pub fn params(&self) -> &IndexParams {
        &self.params
    }

    pub fn is_built(&self) -> bool {
        self.read_current().is_some()
    }

    /// Records in the current snapshot; 0 before the first build.
    pub fn len(&self) -> usize {
        self.read_current().map_or(0, |s| s.records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hash size of the indexed fingerprints, if any are loaded.
    pub fn hash_size(&self) -> Option<u32> {
        self.read_current().and_then(|s| s.side)
    }

    /// Copy of the current records in load order.
    pub fn records(&self) -> Vec<FingerprintRecord> {
        self.read_current()
            .map(|s| s.records.clone())
            .unwrap_or_default()
    }

    /// Reload every record from the source and swap in the new snapshot.
    ///
    /// On failure the previous snapshot stays in place. Without a source
    /// the current snapshot is kept and its size returned.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self)))]
    pub fn rebuild(&self) -> Result<usize, IndexError> {
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(source) = &self.source else {
            return Ok(self.len());
        };
        let snapshot = self.load(source.as_ref())?;
        let count = snapshot.records.len();
        self.publish(snapshot);
        Ok(count)
    }

    /// Up to `k` nearest records (default `params.neighbors`).
    ///
    /// An empty index yields an empty list for any query. A query whose
    /// hash size differs from the indexed one is rejected.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, query), fields(hash_size = query.side()))
    )]
    pub fn nearest(
        &self,
        query: &Fingerprint,
        k: Option<usize>,
    ) -> Result<Vec<Neighbor>, IndexError> {
        let snapshot = self.snapshot();
        let Some(side) = snapshot.side else {
            return Ok(Vec::new());
        };
        if side != query.side() {
            return Err(IndexError::HashSizeMismatch {
                index: side,
                query: query.side(),
            });
        }
        let k = k.unwrap_or(self.params.neighbors).min(snapshot.records.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(u32, usize)> = snapshot
            .records
            .par_iter()
            .enumerate()
            .map(|(i, r)| (r.fingerprint.hamming_unchecked(query), i))
            .collect();
        if k < scored.len() {
            scored.select_nth_unstable(k - 1);
            scored.truncate(k);
        }
        scored.sort_unstable();

        Ok(scored
            .into_iter()
            .map(|(distance, i)| Neighbor {
                id: snapshot.records[i].id.clone(),
                distance,
            })
            .collect())
    }

    /// Identifiers of [`nearest`](Self::nearest), best first.
    pub fn nearest_ids(
        &self,
        query: &Fingerprint,
        k: Option<usize>,
    ) -> Result<Vec<String>, IndexError> {
        Ok(self
            .nearest(query, k)?
            .into_iter()
            .map(|n| n.id)
            .collect())
    }

    /// Replace the fingerprint stored for `record.id`, or append it.
    ///
    /// Publishes a new snapshot; queries running against the old one are
    /// unaffected.
    pub fn upsert(&self, record: FingerprintRecord) -> Result<(), IndexError> {
        let base = self.snapshot();
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        // A rebuild may have landed between `snapshot()` and the lock.
        let base = self.read_current().unwrap_or(base);

        if let Some(expected) = base.side {
            if record.fingerprint.side() != expected {
                return Err(IndexError::MixedHashSizes {
                    id: record.id,
                    expected,
                    got: record.fingerprint.side(),
                });
            }
        }
        let mut records = base.records.clone();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => existing.fingerprint = record.fingerprint,
            None => records.push(record),
        }
        self.publish(Snapshot::from_records(records)?);
        Ok(())
    }

    fn load(&self, source: &dyn FingerprintSource) -> Result<Snapshot, IndexError> {
        let limit = self.params.page_size.max(1);
        let mut records = Vec::new();
        let mut offset = 0;
        loop {
            let page = source.read_page(offset, limit)?;
            let n = page.len();
            for stored in page {
                records.push(decode(stored)?);
            }
            offset += n;
            if n < limit {
                break;
            }
        }
        let snapshot = Snapshot::from_records(records)?;
        match snapshot.side {
            Some(side) => log::info!(
                "fingerprint index built: {} records, hash size {}",
                snapshot.records.len(),
                side
            ),
            None => log::warn!("fingerprint source returned no records; index is empty"),
        }
        Ok(snapshot)
    }

    /// Current snapshot, building it first if the index was never built.
    fn snapshot(&self) -> Arc<Snapshot> {
        if let Some(s) = self.read_current() {
            return s;
        }
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(s) = self.read_current() {
            return s;
        }
        let snapshot = match &self.source {
            Some(source) => self.load(source.as_ref()).unwrap_or_else(|err| {
                log::warn!("lazy fingerprint index build failed: {err}; serving an empty index");
                Snapshot::default()
            }),
            None => Snapshot::default(),
        };
        self.publish(snapshot)
    }

    fn read_current(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        snapshot
    }
}

fn decode(stored: StoredRecord) -> Result<FingerprintRecord, IndexError> {
    let id = stored.id.clone();
    FingerprintRecord::try_from(stored).map_err(|source| IndexError::InvalidRecord { id, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySource;

    fn fp(side: u32, ones: &[usize]) -> Fingerprint {
        Fingerprint::from_bits(side, (0..(side * side) as usize).map(|i| ones.contains(&i)))
    }

    fn stored(id: &str, fingerprint: &Fingerprint) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            phash: fingerprint.to_hex(),
        }
    }

    #[test]
    fn never_built_index_without_source_is_empty() {
        let index = FingerprintIndex::new(IndexParams::default());
        assert!(index.nearest(&fp(8, &[1]), None).expect("query").is_empty());
        assert!(index.is_built());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn empty_source_gives_empty_results_for_any_size() {
        let index = FingerprintIndex::with_source(
            IndexParams::default(),
            Arc::new(MemorySource::default()),
        );
        assert_eq!(index.rebuild().expect("rebuild"), 0);
        assert!(index.nearest(&fp(32, &[]), Some(5)).expect("query").is_empty());
        assert!(index.nearest(&fp(8, &[]), Some(5)).expect("query").is_empty());
    }

    #[test]
    fn results_are_sorted_with_ties_in_load_order() {
        let q = fp(4, &[]);
        let records = vec![
            FingerprintRecord::new("far", fp(4, &[0, 1, 2])),
            FingerprintRecord::new("tie-a", fp(4, &[5])),
            FingerprintRecord::new("exact", fp(4, &[])),
            FingerprintRecord::new("tie-b", fp(4, &[9])),
        ];
        let index = FingerprintIndex::from_records(IndexParams::default(), records).expect("index");
        let got = index.nearest(&q, None).expect("query");
        let ids: Vec<&str> = got.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["exact", "tie-a", "tie-b", "far"]);
        assert_eq!(got[0].distance, 0);
        assert_eq!(got[3].distance, 3);

        assert_eq!(
            index.nearest_ids(&q, Some(2)).expect("query"),
            ["exact", "tie-a"]
        );
        assert!(index.nearest(&q, Some(0)).expect("query").is_empty());
    }

    #[test]
    fn lazy_build_pages_through_source() {
        let records: Vec<StoredRecord> = (0..25)
            .map(|i| stored(&format!("c{i}"), &fp(4, &[i % 16])))
            .collect();
        let params = IndexParams {
            neighbors: 3,
            page_size: 10,
        };
        let index = FingerprintIndex::with_source(params, Arc::new(MemorySource::new(records)));
        assert!(!index.is_built());
        let got = index.nearest(&fp(4, &[7]), None).expect("query");
        assert_eq!(index.len(), 25);
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].id, "c7");
        assert_eq!(got[1].id, "c23");
    }

    #[test]
    fn page_size_multiple_still_terminates() {
        let records: Vec<StoredRecord> =
            (0..20).map(|i| stored(&format!("c{i}"), &fp(4, &[i % 16]))).collect();
        let params = IndexParams {
            neighbors: 10,
            page_size: 10,
        };
        let index = FingerprintIndex::with_source(params, Arc::new(MemorySource::new(records)));
        assert_eq!(index.rebuild().expect("rebuild"), 20);
    }

    #[test]
    fn mixed_sizes_are_rejected_at_build() {
        let source = MemorySource::new(vec![
            stored("a", &fp(4, &[1])),
            stored("b", &fp(8, &[1])),
        ]);
        let index = FingerprintIndex::with_source(IndexParams::default(), Arc::new(source));
        match index.rebuild() {
            Err(IndexError::MixedHashSizes { id, expected, got }) => {
                assert_eq!((id.as_str(), expected, got), ("b", 4, 8));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!index.is_built());
    }

    #[test]
    fn invalid_hex_names_the_record() {
        let source = MemorySource::new(vec![StoredRecord {
            id: "broken".into(),
            phash: "xyz".into(),
        }]);
        let index = FingerprintIndex::with_source(IndexParams::default(), Arc::new(source));
        assert!(matches!(
            index.rebuild(),
            Err(IndexError::InvalidRecord { ref id, .. }) if id == "broken"
        ));
    }

    #[test]
    fn query_size_mismatch_is_rejected() {
        let index = FingerprintIndex::from_records(
            IndexParams::default(),
            vec![FingerprintRecord::new("a", fp(4, &[]))],
        )
        .expect("index");
        assert!(matches!(
            index.nearest(&fp(8, &[]), None),
            Err(IndexError::HashSizeMismatch { index: 4, query: 8 })
        ));
    }

    #[test]
    fn upsert_replaces_and_appends() {
        let index = FingerprintIndex::new(IndexParams::default());
        index
            .upsert(FingerprintRecord::new("a", fp(4, &[1, 2])))
            .expect("insert");
        index
            .upsert(FingerprintRecord::new("b", fp(4, &[3])))
            .expect("insert");
        index
            .upsert(FingerprintRecord::new("a", fp(4, &[3])))
            .expect("replace");
        assert_eq!(index.len(), 2);

        let got = index.nearest(&fp(4, &[3]), None).expect("query");
        assert_eq!(got[0], Neighbor { id: "a".into(), distance: 0 });
        assert_eq!(got[1], Neighbor { id: "b".into(), distance: 0 });

        assert!(matches!(
            index.upsert(FingerprintRecord::new("c", fp(8, &[]))),
            Err(IndexError::MixedHashSizes { .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected_at_build() {
        let source = MemorySource::new(vec![
            stored("a", &fp(4, &[1])),
            stored("b", &fp(4, &[2])),
            stored("a", &fp(4, &[3])),
        ]);
        let index = FingerprintIndex::with_source(IndexParams::default(), Arc::new(source));
        match index.rebuild() {
            Err(IndexError::DuplicateId { id }) => assert_eq!(id, "a"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!index.is_built());

        assert!(matches!(
            FingerprintIndex::from_records(
                IndexParams::default(),
                vec![
                    FingerprintRecord::new("x", fp(4, &[])),
                    FingerprintRecord::new("x", fp(4, &[1])),
                ],
            ),
            Err(IndexError::DuplicateId { .. })
        ));
    }

    #[test]
    fn queries_see_full_snapshots_while_rebuilding() {
        const RECORDS: usize = 2000;
        let records: Vec<StoredRecord> = (0..RECORDS)
            .map(|i| stored(&format!("c{i}"), &fp(8, &[i % 64, (i / 64) % 64])))
            .collect();
        let params = IndexParams {
            neighbors: 10,
            page_size: 100,
        };
        let index = FingerprintIndex::with_source(params, Arc::new(MemorySource::new(records)));
        assert_eq!(index.rebuild().expect("rebuild"), RECORDS);

        let query = fp(8, &[5]);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let got = index.nearest(&query, None).expect("query");
                        assert_eq!(got.len(), 10);
                        assert!(got.windows(2).all(|w| w[0].distance <= w[1].distance));
                    }
                });
            }
            for _ in 0..2 {
                scope.spawn(|| {
                    for _ in 0..20 {
                        assert_eq!(index.rebuild().expect("rebuild"), RECORDS);
                    }
                });
            }
        });
        assert_eq!(index.len(), RECORDS);
    }
}
