//! Master selection and the field-level merge engine.
//!
//! For every cluster the most complete member is picked as the merge target
//! and deep-copied; each member is then folded into that master one field
//! group at a time, under per-field conflict policies. Merging only ever
//! adds or fills information; nothing already on the master is removed,
//! with one documented exception: a machine-assigned classification loses
//! to a curated classification at the same level. Candidates are folded in
//! stable record-id order so a rerun over the same cluster reproduces the
//! same master.

mod contribution;
mod identifiers;
mod part_of;

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::cluster::{Cluster, ClusterId};
use crate::record::{PublicationInfo, Record, RecordId, Subject};
use crate::{Error, Result};

/// Genre forms whose differences are union-merged between duplicates; any
/// other genre-form difference is left alone.
const GENRE_FORMS_TO_MERGE: &[&str] = &["https://id.kb.se/term/swepub/ArtisticWork"];

/// Knobs for the merge engine.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Code of the source registry whose affiliations outrank harvested
    /// ones during contribution reconciliation.
    pub authority_source: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            authority_source: "kb.se".into(),
        }
    }
}

/// The single merged record representing a cluster, with the provenance
/// downstream consumers need for duplicate-count reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub cluster_id: ClusterId,
    pub record: Record,
    /// Ids of every record folded into the master, in merge order.
    pub member_ids: Vec<RecordId>,
    /// Organizations that contributed a member record.
    pub member_orgs: Vec<String>,
}

/// Merge all members of a cluster into a master record.
pub fn merge_cluster(
    cluster: &Cluster,
    records: &HashMap<RecordId, Record>,
    options: &MergeOptions,
) -> Result<MergedRecord> {
    let mut members: Vec<&Record> = cluster
        .members
        .iter()
        .filter_map(|id| records.get(id))
        .collect();
    members.sort_by(|a, b| a.id.cmp(&b.id));

    let Some(master) = select_master(&members) else {
        return Err(Error::EmptyCluster(cluster.id));
    };
    let mut master = master.clone();

    let mut member_ids = Vec::with_capacity(members.len());
    let mut member_orgs = Vec::new();
    for candidate in &members {
        member_ids.push(candidate.id.clone());
        if let Some(org) = &candidate.source_org {
            member_orgs.push(org.clone());
        }
        merge_into(&mut master, candidate, options);
    }
    debug!(
        "merged cluster {} from {} member records",
        cluster.id,
        member_ids.len()
    );
    Ok(MergedRecord {
        cluster_id: cluster.id,
        record: master,
        member_ids,
        member_orgs,
    })
}

/// Pick the member with the most populated descriptive fields; ties go to
/// the first maximum in iteration order.
pub fn select_master<'a>(members: &[&'a Record]) -> Option<&'a Record> {
    let mut best: Option<&Record> = None;
    for record in members {
        if best.is_none_or(|b| record.descriptive_size() > b.descriptive_size()) {
            best = Some(record);
        }
    }
    best
}

/// Fold one candidate into the master, field group by field group.
pub fn merge_into(master: &mut Record, candidate: &Record, options: &MergeOptions) {
    if master == candidate {
        return;
    }
    contribution::merge_contributions(master, candidate, options);
    merge_notes_and_status(master, candidate);
    merge_genre_forms(master, candidate);
    merge_subjects(master, candidate);
    part_of::merge_series(master, candidate);
    identifiers::merge_identifier_lists(&mut master.identifiers, &candidate.identifiers);
    identifiers::merge_identifier_lists(
        &mut master.indirect_identifiers,
        &candidate.indirect_identifiers,
    );
    identifiers::merge_locators(&mut master.electronic_locators, &candidate.electronic_locators);
    part_of::merge_part_of(master, candidate);
    merge_publication_info(master, candidate);
    identifiers::merge_usage_policies(&mut master.usage_policies, &candidate.usage_policies);
    if master.copyright_date.is_none() {
        master.copyright_date = candidate.copyright_date.clone();
    }
}

/// Publication status follows the precedence ranking, creator count is
/// filled when missing, free-text notes are unioned.
fn merge_notes_and_status(master: &mut Record, candidate: &Record) {
    let adopt = match (&master.publication_status, &candidate.publication_status) {
        (None, Some(_)) => true,
        (Some(m), Some(c)) => c.rank() < m.rank(),
        _ => false,
    };
    if adopt {
        master.publication_status = candidate.publication_status.clone();
    }
    if master.creator_count.is_none() {
        master.creator_count = candidate.creator_count;
    }
    for note in &candidate.notes {
        if !master.notes.contains(note) {
            master.notes.push(note.clone());
        }
    }
}

fn merge_genre_forms(master: &mut Record, candidate: &Record) {
    if !(has_mergeable_genre(master) && has_mergeable_genre(candidate)) {
        return;
    }
    for genre_form in &candidate.genre_forms {
        if !master.genre_forms.contains(genre_form) {
            master.genre_forms.push(genre_form.clone());
        }
    }
}

fn has_mergeable_genre(record: &Record) -> bool {
    record
        .genre_forms
        .iter()
        .any(|g| GENRE_FORMS_TO_MERGE.contains(&g.as_str()))
}

/// Union subjects, except that a machine-assigned classification loses to a
/// curated classification at the same level, the one place merging drops
/// information.
fn merge_subjects(master: &mut Record, candidate: &Record) {
    for subject in &candidate.subjects {
        if subject.auto_assigned && has_curated_at_level(&master.subjects, subject.level()) {
            continue;
        }
        if !subject.auto_assigned
            && let Some(level) = subject.level()
        {
            master
                .subjects
                .retain(|m| !(m.auto_assigned && m.level() == Some(level)));
        }
        if !master
            .subjects
            .iter()
            .any(|m| m.same_classification(subject))
        {
            master.subjects.push(subject.clone());
        }
    }
}

fn has_curated_at_level(subjects: &[Subject], level: Option<usize>) -> bool {
    level.is_some_and(|l| {
        subjects
            .iter()
            .any(|s| !s.auto_assigned && s.level() == Some(l))
    })
}

/// Agent, place and date of publication are each filled from the candidate
/// only when absent on the master.
fn merge_publication_info(master: &mut Record, candidate: &Record) {
    let Some(from) = &candidate.publication_info else {
        return;
    };
    let info = master
        .publication_info
        .get_or_insert_with(PublicationInfo::default);
    if info.agent.is_none() {
        info.agent = from.agent.clone();
    }
    if info.place.is_none() {
        info.place = from.place.clone();
    }
    if info.date.is_none() {
        info.date = from.date.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{
        Contribution, Agent, Identifier, IdentifierKind, PublicationStatus, Summary, Title,
    };
    use pretty_assertions::assert_eq;

    fn record(id: &str) -> Record {
        Record {
            id: id.into(),
            title: Some(Title::new("Swepub at 10 years")),
            ..Default::default()
        }
    }

    fn cluster_of(ids: &[&str]) -> Cluster {
        Cluster {
            id: 0,
            members: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn into_map(records: Vec<Record>) -> HashMap<RecordId, Record> {
        records.into_iter().map(|r| (r.id.clone(), r)).collect()
    }

    #[test]
    fn test_select_master_prefers_most_complete() {
        let sparse = record("a");
        let mut rich = record("b");
        rich.summaries.push(Summary::new("an abstract"));
        rich.notes.push("note".into());
        let members = vec![&sparse, &rich];
        assert_eq!(select_master(&members).unwrap().id, "b");
    }

    #[test]
    fn test_select_master_tie_takes_first() {
        let a = record("a");
        let b = record("b");
        let members = vec![&a, &b];
        assert_eq!(select_master(&members).unwrap().id, "a");
        assert!(select_master(&[]).is_none());
    }

    #[test]
    fn test_merge_cluster_of_identical_records_is_idempotent() {
        let mut a = record("a");
        a.summaries.push(Summary::new("an abstract"));
        a.publication_status = Some(PublicationStatus::Published);
        a.contributions
            .push(Contribution::new(Agent::person("Anna", "Larsson")));
        a.identifiers
            .push(Identifier::new(IdentifierKind::Doi, "10.1/x"));

        let mut b = a.clone();
        b.id = "b".into();

        let merged = merge_cluster(
            &cluster_of(&["a", "b"]),
            &into_map(vec![a.clone(), b]),
            &MergeOptions::default(),
        )
        .unwrap();
        // folding an identical duplicate changes nothing on the master
        assert_eq!(merged.record, a);
        assert_eq!(merged.member_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_merge_empty_cluster_is_an_error() {
        let result = merge_cluster(
            &cluster_of(&["missing"]),
            &HashMap::new(),
            &MergeOptions::default(),
        );
        assert!(matches!(result, Err(Error::EmptyCluster(0))));
    }

    #[test]
    fn test_status_follows_precedence() {
        let mut master = record("a");
        master.publication_status = Some(PublicationStatus::Submitted);
        let mut candidate = record("b");
        candidate.publication_status = Some(PublicationStatus::Published);

        merge_into(&mut master, &candidate, &MergeOptions::default());
        assert_eq!(master.publication_status, Some(PublicationStatus::Published));

        // a lower-precedence candidate does not downgrade the master
        let mut worse = record("c");
        worse.publication_status = Some(PublicationStatus::Preprint);
        merge_into(&mut master, &worse, &MergeOptions::default());
        assert_eq!(master.publication_status, Some(PublicationStatus::Published));
    }

    #[test]
    fn test_creator_count_and_notes() {
        let mut master = record("a");
        master.notes.push("shared note".into());
        let mut candidate = record("b");
        candidate.creator_count = Some(4);
        candidate.notes = vec!["shared note".into(), "extra note".into()];

        merge_into(&mut master, &candidate, &MergeOptions::default());
        assert_eq!(master.creator_count, Some(4));
        assert_eq!(master.notes, vec!["shared note", "extra note"]);
    }

    #[test]
    fn test_genre_forms_merge_only_for_allow_listed_types() {
        let artistic = GENRE_FORMS_TO_MERGE[0].to_string();

        let mut master = record("a");
        master.genre_forms = vec!["https://id.kb.se/term/swepub/JournalArticle".into()];
        let mut candidate = record("b");
        candidate.genre_forms = vec!["https://id.kb.se/term/swepub/BookChapter".into()];
        merge_into(&mut master, &candidate, &MergeOptions::default());
        assert_eq!(master.genre_forms.len(), 1);

        let mut master = record("a");
        master.genre_forms = vec![artistic.clone()];
        let mut candidate = record("b");
        candidate.genre_forms = vec![artistic.clone(), "https://id.kb.se/term/swepub/Still".into()];
        merge_into(&mut master, &candidate, &MergeOptions::default());
        assert_eq!(master.genre_forms.len(), 2);
    }

    #[test]
    fn test_auto_assigned_subject_loses_to_curated() {
        let curated = Subject {
            code: Some("101".into()),
            pref_label: Some("Mathematics".into()),
            ..Default::default()
        };
        let auto = Subject {
            code: Some("202".into()),
            pref_label: Some("Machine guess".into()),
            auto_assigned: true,
            ..Default::default()
        };

        // candidate's auto classification is dropped against a curated one
        let mut master = record("a");
        master.subjects.push(curated.clone());
        let mut candidate = record("b");
        candidate.subjects.push(auto.clone());
        merge_into(&mut master, &candidate, &MergeOptions::default());
        assert_eq!(master.subjects, vec![curated.clone()]);

        // and the master's auto classification yields to a curated candidate
        let mut master = record("a");
        master.subjects.push(auto);
        let mut candidate = record("b");
        candidate.subjects.push(curated.clone());
        merge_into(&mut master, &candidate, &MergeOptions::default());
        assert_eq!(master.subjects, vec![curated]);
    }

    #[test]
    fn test_subjects_union_by_classification() {
        let mut master = record("a");
        master.subjects.push(Subject {
            code: Some("101".into()),
            language: Some("en".into()),
            ..Default::default()
        });
        let mut candidate = record("b");
        candidate.subjects.push(Subject {
            code: Some("101".into()),
            language: Some("en".into()),
            pref_label: Some("same thing, labelled".into()),
            ..Default::default()
        });
        candidate.subjects.push(Subject {
            code: Some("10105".into()),
            language: Some("en".into()),
            ..Default::default()
        });

        merge_into(&mut master, &candidate, &MergeOptions::default());
        assert_eq!(master.subjects.len(), 2);
    }

    #[test]
    fn test_publication_info_fills_only_missing_subfields() {
        let mut master = record("a");
        master.publication_info = Some(PublicationInfo {
            agent: Some("Springer".into()),
            place: None,
            date: Some("2018".into()),
        });
        let mut candidate = record("b");
        candidate.publication_info = Some(PublicationInfo {
            agent: Some("Elsevier".into()),
            place: Some("Amsterdam".into()),
            date: Some("2019".into()),
        });

        merge_into(&mut master, &candidate, &MergeOptions::default());
        let info = master.publication_info.unwrap();
        assert_eq!(info.agent.as_deref(), Some("Springer"));
        assert_eq!(info.place.as_deref(), Some("Amsterdam"));
        assert_eq!(info.date.as_deref(), Some("2018"));
    }

    #[test]
    fn test_copyright_date_master_wins() {
        let mut master = record("a");
        let mut candidate = record("b");
        candidate.copyright_date = Some("2017".into());
        merge_into(&mut master, &candidate, &MergeOptions::default());
        assert_eq!(master.copyright_date.as_deref(), Some("2017"));

        candidate.copyright_date = Some("2016".into());
        merge_into(&mut master, &candidate, &MergeOptions::default());
        assert_eq!(master.copyright_date.as_deref(), Some("2017"));
    }
}
