//! Versioned catalog snapshots and the atomically swapped handle.

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

use super::index::CatalogIndex;

/// One immutable catalog build.
#[derive(Debug)]
pub struct CatalogSnapshot {
    pub index: CatalogIndex,
    /// Content fingerprint of the source the snapshot was built from.
    pub version: String,
    pub loaded_at: DateTime<Utc>,
    /// Source rows dropped during loading.
    pub dropped_rows: usize,
}

impl CatalogSnapshot {
    pub fn new(index: CatalogIndex, version: impl Into<String>, dropped_rows: usize) -> Self {
        Self {
            index,
            version: version.into(),
            loaded_at: Utc::now(),
            dropped_rows,
        }
    }
}

/// Shared pointer to the live snapshot.
///
/// Readers clone the `Arc` once per turn and keep a consistent view even if
/// a reload swaps the pointer mid-turn.
#[derive(Debug)]
pub struct CatalogHandle {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl CatalogHandle {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The live snapshot.
    pub fn current(&self) -> Arc<CatalogSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replaces the live snapshot, returning the previous one.
    pub fn swap(&self, snapshot: CatalogSnapshot) -> Arc<CatalogSnapshot> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Embedder;
    use crate::domain::taxonomy::{SkillTaxonomy, TaxonomyDocument};

    fn empty_snapshot(version: &str) -> CatalogSnapshot {
        let taxonomy = SkillTaxonomy::from_document(TaxonomyDocument::default()).unwrap();
        CatalogSnapshot::new(
            CatalogIndex::build(Vec::new(), &taxonomy, Embedder::new(8)),
            version,
            0,
        )
    }

    #[test]
    fn readers_keep_their_snapshot_across_swap() {
        let handle = CatalogHandle::new(empty_snapshot("v1"));
        let held = handle.current();

        let previous = handle.swap(empty_snapshot("v2"));

        assert_eq!(held.version, "v1");
        assert_eq!(previous.version, "v1");
        assert_eq!(handle.current().version, "v2");
    }
}
