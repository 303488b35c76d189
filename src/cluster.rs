//! Cluster construction: from shared clustering identifiers to disjoint
//! equivalence classes.
//!
//! Construction runs in three phases. First, record ids are grouped by
//! shared clustering identifier; groups above a size cap are identifier
//! collisions too common to be useful and are skipped outright, which bounds
//! the otherwise quadratic pairwise cost. Second, every pair within a group
//! is tested with [`is_same_work`]; each matching pair becomes a proto
//! cluster of its own. This phase is data-parallel: groups are batched and
//! dispatched to the rayon pool, and workers are pure functions of their
//! batch. Third, proto clusters that share a record are unioned through a
//! redirect table until membership is disjoint, and every untouched record
//! becomes a singleton. The union phase is what makes the final relation
//! transitive; the pairwise test on its own is not.

use std::collections::{BTreeMap, HashMap, HashSet};

use itertools::Itertools;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::keys::clustering_identifiers;
use crate::matcher::is_same_work;
use crate::record::{Record, RecordId};

/// Numeric id of a cluster; assigned densely from zero on every run.
pub type ClusterId = u64;

/// Candidate groups larger than this are skipped as identifier collisions.
pub const DEFAULT_MAX_GROUP_SIZE: usize = 150;

/// Candidate groups dispatched to a worker per batch.
pub const DEFAULT_BATCH_SIZE: usize = 64;

const MIN_GROUP_SIZE: usize = 2;

/// A set of record ids believed to denote one work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub members: Vec<RecordId>,
}

/// The clustering-identifier index: a multimap from identifier to the
/// records carrying it. Built once per clustering run and discarded with
/// it; there is no cross-run cache.
#[derive(Debug, Default)]
pub struct IdentifierIndex {
    entries: BTreeMap<String, Vec<RecordId>>,
}

impl IdentifierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the record's clustering identifiers and index it under each.
    pub fn add_record(&mut self, record: &Record) {
        for key in clustering_identifiers(record) {
            self.insert(key, record.id.clone());
        }
    }

    pub fn insert(&mut self, identifier: impl Into<String>, record_id: RecordId) {
        self.entries
            .entry(identifier.into())
            .or_default()
            .push(record_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Knobs for the pairwise phase.
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    /// Evaluate group batches on the rayon pool instead of in sequence.
    pub run_in_parallel: bool,
    pub max_group_size: usize,
    pub batch_size: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            run_in_parallel: false,
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Result of a clustering run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOutcome {
    /// Disjoint clusters covering every input record, singletons included.
    pub clusters: Vec<Cluster>,
    /// Candidate groups skipped for exceeding the size cap.
    pub skipped_groups: usize,
    /// Distinct record pairs the matcher accepted.
    pub matched_pairs: usize,
}

/// Build disjoint clusters over `records` from the identifier index.
///
/// Deterministic for a given input: groups are visited in identifier order,
/// members in record-id order, and proto-cluster ids are assigned by the
/// coordinator after the (possibly parallel) pairwise phase.
pub fn build_clusters(
    records: &HashMap<RecordId, Record>,
    index: &IdentifierIndex,
    options: &ClusterOptions,
) -> ClusterOutcome {
    let (groups, skipped_groups) = candidate_groups(records, index, options.max_group_size);
    if skipped_groups > 0 {
        debug!("skipped {skipped_groups} oversized candidate groups");
    }

    let batch_size = options.batch_size.max(1);
    let batch_results: Vec<Vec<(RecordId, RecordId)>> = if options.run_in_parallel {
        groups
            .par_chunks(batch_size)
            .map(|batch| match_batch(batch, records))
            .collect()
    } else {
        groups
            .chunks(batch_size)
            .map(|batch| match_batch(batch, records))
            .collect()
    };
    // overlapping groups may surface the same pair twice
    let matched: Vec<(RecordId, RecordId)> =
        batch_results.into_iter().flatten().unique().collect();
    let matched_pairs = matched.len();

    // one proto cluster per matching pair; the proto id is the position
    let mut proto_members: Vec<Vec<RecordId>> = matched
        .into_iter()
        .map(|(a, b)| vec![a, b])
        .collect();

    // records owned by more than one proto cluster force unions
    let mut owners: BTreeMap<RecordId, Vec<usize>> = BTreeMap::new();
    for (proto, members) in proto_members.iter().enumerate() {
        for member in members {
            owners.entry(member.clone()).or_default().push(proto);
        }
    }

    let mut redirect: HashMap<usize, usize> = HashMap::new();
    for protos in owners.into_values() {
        if protos.len() < 2 {
            continue;
        }
        let mut current = protos[0];
        for &other in &protos[1..] {
            let from = resolve(&redirect, current);
            let into = resolve(&redirect, other);
            if from != into {
                let moved = std::mem::take(&mut proto_members[from]);
                proto_members[into].extend(moved);
                redirect.insert(from, into);
            }
            current = into;
        }
    }

    let mut clusters = Vec::new();
    let mut covered: HashSet<&RecordId> = HashSet::new();
    let mut next_id: ClusterId = 0;
    for (proto, members) in proto_members.iter().enumerate() {
        if redirect.contains_key(&proto) || members.is_empty() {
            continue;
        }
        covered.extend(members.iter());
        // unions can write the same record into a cluster more than once
        let members: Vec<RecordId> = members.iter().unique().cloned().collect();
        clusters.push(Cluster {
            id: next_id,
            members,
        });
        next_id += 1;
    }

    // everything untouched by any proto cluster is a singleton
    for record_id in records.keys().sorted() {
        if !covered.contains(record_id) {
            clusters.push(Cluster {
                id: next_id,
                members: vec![record_id.clone()],
            });
            next_id += 1;
        }
    }

    info!(
        "clustered {} records into {} clusters ({} matched pairs)",
        records.len(),
        clusters.len(),
        matched_pairs
    );
    ClusterOutcome {
        clusters,
        skipped_groups,
        matched_pairs,
    }
}

/// Dereference a proto-cluster id to its current root.
fn resolve(redirect: &HashMap<usize, usize>, mut id: usize) -> usize {
    while let Some(&next) = redirect.get(&id) {
        id = next;
    }
    id
}

/// Candidate groups within the size bounds, members sorted and deduplicated.
fn candidate_groups(
    records: &HashMap<RecordId, Record>,
    index: &IdentifierIndex,
    max_group_size: usize,
) -> (Vec<Vec<RecordId>>, usize) {
    let mut groups = Vec::new();
    let mut skipped = 0;
    for members in index.entries.values() {
        let group: Vec<RecordId> = members
            .iter()
            .filter(|id| records.contains_key(*id))
            .sorted()
            .dedup()
            .cloned()
            .collect();
        if group.len() < MIN_GROUP_SIZE {
            continue;
        }
        if group.len() > max_group_size {
            skipped += 1;
            continue;
        }
        groups.push(group);
    }
    (groups, skipped)
}

/// Pure worker: test all pairs within each group of one batch.
fn match_batch(
    batch: &[Vec<RecordId>],
    records: &HashMap<RecordId, Record>,
) -> Vec<(RecordId, RecordId)> {
    let mut pairs = Vec::new();
    for group in batch {
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                if is_same_work(&records[&group[i]], &records[&group[j]]) {
                    pairs.push((group[i].clone(), group[j].clone()));
                }
            }
        }
    }
    pairs
}
