//! The deduplication engine.
//!
//! One [`Deduplicator::run`] recomputes entity resolution from scratch over
//! everything the store holds: clustering identifiers are extracted per
//! record, candidate clusters are built and unioned, and every cluster is
//! folded into a single master record. Cluster assignments and masters are
//! written back only after the whole computation has succeeded, so a failed
//! run never publishes partial tables; the previous complete result stays
//! authoritative.

use std::collections::HashMap;

use log::info;

use crate::Result;
use crate::cluster::{
    self, ClusterOptions, DEFAULT_BATCH_SIZE, DEFAULT_MAX_GROUP_SIZE, IdentifierIndex,
};
use crate::merge::{self, MergeOptions};
use crate::record::{Record, RecordId};
use crate::store::RecordStore;

/// Configuration options for a deduplication run.
///
/// # Examples
///
/// ```
/// use bibmerge::DeduplicatorConfig;
///
/// let config = DeduplicatorConfig {
///     run_in_parallel: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct DeduplicatorConfig {
    /// Evaluate candidate-group batches on the rayon pool. The pairwise
    /// phase is pure, so this changes wall-clock time, not results.
    pub run_in_parallel: bool,
    /// Candidate groups larger than this are skipped as identifier
    /// collisions; this bounds the quadratic pairwise cost.
    pub max_group_size: usize,
    /// Candidate groups handed to a worker at a time.
    pub batch_size: usize,
    /// Source registry whose affiliations outrank harvested ones when
    /// contributions are reconciled.
    pub authority_source: String,
}

impl Default for DeduplicatorConfig {
    fn default() -> Self {
        Self {
            run_in_parallel: false,
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            authority_source: "kb.se".into(),
        }
    }
}

/// Counters describing a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Records that took part in clustering (deleted rows excluded).
    pub record_count: usize,
    pub cluster_count: usize,
    /// Clusters with more than one member.
    pub duplicate_clusters: usize,
    pub skipped_groups: usize,
    pub matched_pairs: usize,
}

/// The entity-resolution engine: candidate generation, pairwise matching,
/// cluster union and master merging over a [`RecordStore`].
///
/// # Examples
///
/// ```
/// use bibmerge::{Deduplicator, MemoryStore, PublicationInfo, Record, Title};
///
/// let mut store = MemoryStore::new();
/// for org in ["kth", "uu"] {
///     store.insert(Record {
///         source_org: Some(org.into()),
///         title: Some(Title::new("Swepub at 10 years")),
///         publication_info: Some(PublicationInfo {
///             date: Some("2018".into()),
///             ..Default::default()
///         }),
///         ..Default::default()
///     });
/// }
///
/// let outcome = Deduplicator::new().run(&mut store).unwrap();
/// assert_eq!(outcome.cluster_count, 1);
/// assert_eq!(store.masters().count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    config: DeduplicatorConfig,
}

impl Deduplicator {
    /// Creates a new engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with custom configuration.
    #[must_use]
    pub fn with_config(mut self, config: DeduplicatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one full deduplication pass over the store.
    ///
    /// Reads every non-deleted record, replaces the cluster table and
    /// writes one merged master per cluster. Idempotent: rerunning over
    /// unchanged input reproduces the same clusters and masters.
    pub fn run<S: RecordStore>(&self, store: &mut S) -> Result<RunOutcome> {
        let mut records: HashMap<RecordId, Record> = HashMap::new();
        let mut index = IdentifierIndex::new();
        for (id, mut record, is_deleted) in store.records()? {
            if is_deleted {
                continue;
            }
            // the store's key is the canonical record id
            record.id = id;
            index.add_record(&record);
            records.insert(record.id.clone(), record);
        }

        let cluster_options = ClusterOptions {
            run_in_parallel: self.config.run_in_parallel,
            max_group_size: self.config.max_group_size,
            batch_size: self.config.batch_size,
        };
        let clustering = cluster::build_clusters(&records, &index, &cluster_options);

        let merge_options = MergeOptions {
            authority_source: self.config.authority_source.clone(),
        };
        let mut masters = Vec::with_capacity(clustering.clusters.len());
        for cluster in &clustering.clusters {
            masters.push(merge::merge_cluster(cluster, &records, &merge_options)?);
        }

        // everything is computed; only now touch the store
        store.replace_clusters(&clustering.clusters)?;
        for master in masters {
            store.store_master(master)?;
        }

        let duplicate_clusters = clustering
            .clusters
            .iter()
            .filter(|c| c.members.len() > 1)
            .count();
        info!(
            "deduplicated {} records into {} clusters ({} with duplicates)",
            records.len(),
            clustering.clusters.len(),
            duplicate_clusters
        );
        Ok(RunOutcome {
            record_count: records.len(),
            cluster_count: clustering.clusters.len(),
            duplicate_clusters,
            skipped_groups: clustering.skipped_groups,
            matched_pairs: clustering.matched_pairs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{
        Agent, Contribution, ElectronicLocator, Identifier, IdentifierKind, PublicationInfo,
        PublicationStatus, Summary, Title,
    };
    use crate::store::MemoryStore;
    use itertools::Itertools;
    use pretty_assertions::assert_eq;

    fn submission(id: &str, org: &str, title: &str) -> Record {
        Record {
            id: id.into(),
            source_org: Some(org.into()),
            title: Some(Title::new(title)),
            publication_info: Some(PublicationInfo {
                date: Some("2018".into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new();

        // the same article submitted by two organizations
        let mut first = submission("oai:kth:1", "kth", "Swepub at 10 years");
        first
            .identifiers
            .push(Identifier::new(IdentifierKind::Doi, "10.1000/swepub.10"));
        first.publication_status = Some(PublicationStatus::Submitted);
        first
            .contributions
            .push(Contribution::new(Agent::person("Anna", "Larsson")));
        store.insert(first);

        let mut second = submission("oai:uu:77", "uu", "Swepub at 10 years");
        second
            .identifiers
            .push(Identifier::new(IdentifierKind::Doi, "10.1000/swepub.10"));
        second.publication_status = Some(PublicationStatus::Published);
        second.summaries.push(Summary::new(
            "A retrospective of the national publication registry.",
        ));
        second.creator_count = Some(2);
        second
            .contributions
            .push(Contribution::new(Agent::person("A.", "Larsson")));
        second
            .electronic_locators
            .push(ElectronicLocator::new("https://example.org/fulltext.pdf"));
        store.insert(second);

        // an unrelated work
        store.insert(submission(
            "oai:ltu:3",
            "ltu",
            "A grammar of northern dialects",
        ));

        // a withdrawn record takes no part at all
        store.insert(submission("oai:kth:9", "kth", "Withdrawn manuscript"));
        store.mark_deleted("oai:kth:9");

        store
    }

    #[test]
    fn test_full_run_clusters_and_merges() {
        let mut store = seeded_store();
        let outcome = Deduplicator::new().run(&mut store).unwrap();

        assert_eq!(outcome.record_count, 3);
        assert_eq!(outcome.cluster_count, 2);
        assert_eq!(outcome.duplicate_clusters, 1);

        let duplicate_cluster = store
            .clusters()
            .iter()
            .find(|c| c.members.len() == 2)
            .expect("expected one duplicate cluster");
        let master = store.master_of(duplicate_cluster.id).unwrap();

        assert_eq!(
            master.member_ids.iter().sorted().collect::<Vec<_>>(),
            vec!["oai:kth:1", "oai:uu:77"]
        );
        assert_eq!(
            master.member_orgs.iter().sorted().collect::<Vec<_>>(),
            vec!["kth", "uu"]
        );
        // the richer record is the merge target and precedence applies
        assert_eq!(master.record.id, "oai:uu:77");
        assert_eq!(
            master.record.publication_status,
            Some(PublicationStatus::Published)
        );
        // the two name variants were reconciled into one contribution
        assert_eq!(master.record.contributions.len(), 1);
    }

    #[test]
    fn test_deleted_records_are_not_covered() {
        let mut store = seeded_store();
        Deduplicator::new().run(&mut store).unwrap();
        assert!(
            store
                .clusters()
                .iter()
                .all(|c| c.members.iter().all(|m| m != "oai:kth:9"))
        );
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let mut store = seeded_store();
        let engine = Deduplicator::new();
        engine.run(&mut store).unwrap();
        let clusters_first: Vec<_> = store.clusters().to_vec();
        let masters_first: Vec<_> = store.masters().cloned().collect();

        engine.run(&mut store).unwrap();
        assert_eq!(store.clusters(), &clusters_first[..]);
        assert_eq!(store.masters().cloned().collect::<Vec<_>>(), masters_first);
    }

    #[test]
    fn test_parallel_run_matches_sequential() {
        let mut sequential_store = seeded_store();
        let mut parallel_store = seeded_store();

        let sequential = Deduplicator::new().run(&mut sequential_store).unwrap();
        let parallel = Deduplicator::new()
            .with_config(DeduplicatorConfig {
                run_in_parallel: true,
                batch_size: 1,
                ..Default::default()
            })
            .run(&mut parallel_store)
            .unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(sequential_store.clusters(), parallel_store.clusters());
    }
}
