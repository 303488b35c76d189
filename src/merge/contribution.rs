//! Reconciling contributions between duplicate records.
//!
//! Identity is name-based: a candidate contribution is folded into a master
//! contribution when the names probably denote the same person, regardless
//! of the identifiers either side carries. Reconciliation prefers curated
//! data: name parts backed by an institutional Local identifier win, and an
//! affiliation tree sourced from the authority registry replaces a harvested
//! one wholesale.

use strsim::levenshtein;

use super::MergeOptions;
use crate::name::probably_same_name;
use crate::record::{Affiliation, Agent, Contribution, Identifier, IdentifierKind, Record};

pub(crate) fn merge_contributions(master: &mut Record, candidate: &Record, options: &MergeOptions) {
    for incoming in &candidate.contributions {
        let Some(incoming_name) = incoming.agent.display_name() else {
            // nameless contributions can never be matched, only carried over
            if !master.contributions.contains(incoming) {
                master.contributions.push(incoming.clone());
            }
            continue;
        };
        let matched = master.contributions.iter_mut().find(|m| {
            m.agent
                .display_name()
                .is_some_and(|name| probably_same_name(&name, &incoming_name))
        });
        match matched {
            Some(existing) => reconcile(existing, incoming, options),
            None => master.contributions.push(incoming.clone()),
        }
    }
}

fn reconcile(master: &mut Contribution, candidate: &Contribution, options: &MergeOptions) {
    adopt_name_parts(master, candidate);
    if should_replace_affiliations(master, candidate, &options.authority_source) {
        master.affiliations = candidate.affiliations.clone();
    } else {
        for affiliation in &candidate.affiliations {
            if !master
                .affiliations
                .iter()
                .any(|m| same_affiliation(m, affiliation))
            {
                master.affiliations.push(affiliation.clone());
            }
        }
    }
    merge_agent_identifiers(master, candidate);
}

/// Name parts are adopted only when the candidate is backed by an
/// institutional Local identifier and the master is not.
fn adopt_name_parts(master: &mut Contribution, candidate: &Contribution) {
    if !candidate.agent.has_local_identifier() || master.agent.has_local_identifier() {
        return;
    }
    if let (
        Agent::Person {
            given_name,
            family_name,
            ..
        },
        Agent::Person {
            given_name: candidate_given,
            family_name: candidate_family,
            ..
        },
    ) = (&mut master.agent, &candidate.agent)
    {
        if candidate_given.is_some() {
            *given_name = candidate_given.clone();
        }
        if candidate_family.is_some() {
            *family_name = candidate_family.clone();
        }
    }
}

fn should_replace_affiliations(
    master: &Contribution,
    candidate: &Contribution,
    authority: &str,
) -> bool {
    let authority_wins = has_authority_affiliation(candidate, authority)
        && !has_authority_affiliation(master, authority);
    let master_has_none = !candidate.affiliations.is_empty() && master.affiliations.is_empty();
    authority_wins || master_has_none
}

fn has_authority_affiliation(contribution: &Contribution, authority: &str) -> bool {
    contribution
        .affiliations
        .iter()
        .any(|a| a.has_source(authority))
}

/// Affiliations are the same entry when their normalized names agree within
/// a small edit-distance budget; unnamed nodes compare structurally.
fn same_affiliation(a: &Affiliation, b: &Affiliation) -> bool {
    match (normalized_name(a), normalized_name(b)) {
        (Some(x), Some(y)) => {
            let budget = x.chars().count().max(y.chars().count()) / 8;
            x == y || levenshtein(&x, &y) <= budget
        }
        _ => a == b,
    }
}

fn normalized_name(affiliation: &Affiliation) -> Option<String> {
    affiliation
        .name
        .as_deref()
        .map(|n| {
            n.to_lowercase()
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|n| !n.is_empty())
}

/// ORCID identifiers, and Local identifiers of person agents, are carried
/// over from the candidate; everything else stays as the master had it.
fn merge_agent_identifiers(master: &mut Contribution, candidate: &Contribution) {
    let keep_local = candidate.agent.is_person();
    let incoming: Vec<Identifier> = candidate
        .agent
        .identifiers()
        .iter()
        .filter(|i| {
            i.kind == IdentifierKind::Orcid || (keep_local && i.kind == IdentifierKind::Local)
        })
        .cloned()
        .collect();
    let existing = master.agent.identifiers_mut();
    for identifier in incoming {
        if !existing.contains(&identifier) {
            existing.push(identifier);
        }
    }
}
