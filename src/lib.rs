//! An entity-resolution engine for bibliographic records harvested from
//! institutional repositories.
//!
//! The same publication is routinely submitted by several organizations with
//! slightly different metadata. `bibmerge` recognizes these submissions as
//! one work and produces a single canonical master record per work.
//!
//! # Key Features
//!
//! - **Candidate generation**: cheap, high-recall clustering identifiers
//!   (vowel-degraded title/summary keys plus external identifier values)
//!   narrow the quadratic pairwise test to plausible groups.
//! - **Pairwise matching**: a domain-tuned "same work" test built from
//!   title/summary similarity, publication dates and shared identifiers,
//!   with an absolute veto on conflicting DOIs.
//! - **Cluster construction**: the pairwise relation is deliberately not
//!   transitive; a union phase over a redirect table turns matched pairs
//!   into disjoint equivalence classes, singletons included.
//! - **Field-level merging**: the most complete member of each cluster is
//!   the merge target, and every other member is folded in under explicit
//!   per-field conflict policies (status precedence, identifier union,
//!   contributor reconciliation by fuzzy name match, and more).
//! - **Parallel batch processing**: candidate groups are evaluated on a
//!   bounded worker pool without changing results.
//!
//! # Basic Usage
//!
//! ```rust
//! use bibmerge::{Deduplicator, Identifier, IdentifierKind, MemoryStore, Record, Title};
//!
//! let mut store = MemoryStore::new();
//! for org in ["kth", "uu"] {
//!     let mut record = Record {
//!         source_org: Some(org.into()),
//!         title: Some(Title::new("Swepub at 10 years")),
//!         ..Default::default()
//!     };
//!     record
//!         .identifiers
//!         .push(Identifier::new(IdentifierKind::Doi, "10.1000/swepub.10"));
//!     store.insert(record);
//! }
//!
//! let outcome = Deduplicator::new().run(&mut store).unwrap();
//! assert_eq!(outcome.cluster_count, 1);
//!
//! let master = store.masters().next().unwrap();
//! assert_eq!(master.member_ids.len(), 2);
//! ```
//!
//! # Scope
//!
//! The crate is a library invoked by an orchestration job. Harvesting,
//! format conversion, validation/enrichment and real persistence live
//! behind the [`RecordStore`] seam; the engine consumes already-converted
//! records and writes back cluster assignments and merged masters.
//!
//! # Error Handling
//!
//! Malformed or sparse records are not errors: every accessor treats
//! absence as a valid state and comparisons against missing data resolve to
//! "no match". [`Error`] covers the storage seam and structurally
//! impossible inputs (such as merging an empty cluster).
//!
//! # Thread Safety
//!
//! The engine shares no mutable state across workers; parallel and
//! sequential runs produce identical results.

use thiserror::Error as ThisError;

pub mod cluster;
pub mod dedupe;
pub mod keys;
pub mod matcher;
pub mod merge;
pub mod name;
pub mod record;
pub mod similarity;
pub mod store;

// Reexports
pub use cluster::{
    Cluster, ClusterId, ClusterOptions, ClusterOutcome, IdentifierIndex, build_clusters,
};
pub use dedupe::{Deduplicator, DeduplicatorConfig, RunOutcome};
pub use keys::clustering_identifiers;
pub use matcher::is_same_work;
pub use merge::{MergeOptions, MergedRecord, merge_cluster, select_master};
pub use record::{
    Affiliation, Agent, Contribution, ElectronicLocator, Identifier, IdentifierKind, PartOf,
    PublicationInfo, PublicationStatus, Record, RecordId, Series, Subject, Summary, Title,
    UsagePolicy,
};
pub use store::{MemoryStore, RecordStore};

/// A specialized Result type for deduplication operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving and merging records.
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("cluster {0} has no mergeable members")]
    EmptyCluster(ClusterId),
}
