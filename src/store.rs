//! The minimal persistence contract the engine is driven through.
//!
//! Real deployments put a database behind [`RecordStore`]; the engine only
//! needs to read the converted records, replace the cluster membership table
//! wholesale, and write one merged master per cluster. [`MemoryStore`] is
//! the in-memory reference implementation, used by the tests and as a model
//! for orchestration-job adapters.

use std::collections::BTreeMap;

use nanoid::nanoid;

use crate::Result;
use crate::cluster::{Cluster, ClusterId};
use crate::merge::MergedRecord;
use crate::record::{Record, RecordId};

/// Storage as seen by the deduplication engine.
pub trait RecordStore {
    /// Every currently converted record as `(id, record, is_deleted)`.
    fn records(&self) -> Result<Vec<(RecordId, Record, bool)>>;

    /// Replace the whole cluster membership table; clustering is recomputed
    /// from scratch each run, never patched incrementally.
    fn replace_clusters(&mut self, clusters: &[Cluster]) -> Result<()>;

    /// Store the merged master record of one cluster.
    fn store_master(&mut self, master: MergedRecord) -> Result<()>;
}

/// In-memory [`RecordStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<RecordId, (Record, bool)>,
    clusters: Vec<Cluster>,
    masters: BTreeMap<ClusterId, MergedRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, assigning a generated id when it carries none.
    /// Returns the id the record is stored under.
    pub fn insert(&mut self, mut record: Record) -> RecordId {
        if record.id.trim().is_empty() {
            record.id = nanoid!();
        }
        let id = record.id.clone();
        self.records.insert(id.clone(), (record, false));
        id
    }

    /// Mark a record deleted: it keeps its row but leaves clustering.
    pub fn mark_deleted(&mut self, id: &str) {
        if let Some((_, deleted)) = self.records.get_mut(id) {
            *deleted = true;
        }
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn masters(&self) -> impl Iterator<Item = &MergedRecord> {
        self.masters.values()
    }

    pub fn master_of(&self, cluster_id: ClusterId) -> Option<&MergedRecord> {
        self.masters.get(&cluster_id)
    }
}

impl RecordStore for MemoryStore {
    fn records(&self) -> Result<Vec<(RecordId, Record, bool)>> {
        Ok(self
            .records
            .iter()
            .map(|(id, (record, deleted))| (id.clone(), record.clone(), *deleted))
            .collect())
    }

    fn replace_clusters(&mut self, clusters: &[Cluster]) -> Result<()> {
        self.clusters = clusters.to_vec();
        // masters are keyed by cluster id and a new run renumbers clusters
        self.masters.clear();
        Ok(())
    }

    fn store_master(&mut self, master: MergedRecord) -> Result<()> {
        self.masters.insert(master.cluster_id, master);
        Ok(())
    }
}
