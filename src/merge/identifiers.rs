//! Merging of external identifiers, electronic locators and usage policies.

use crate::record::{ElectronicLocator, Identifier, UsagePolicy};

/// The access-policy label denoting open access; it outranks every other
/// label when policies are merged position-wise.
const OPEN_ACCESS_LABEL: &str = "gratis";

/// Union two identifier lists.
///
/// ISSN, ISBN and URI identifiers commonly carry several legitimate values
/// per record, so they are deduplicated by value, with a missing qualifier
/// filled from the other side. Every other kind keeps at most one value:
/// the one already on the master wins.
pub(crate) fn merge_identifier_lists(master: &mut Vec<Identifier>, candidate: &[Identifier]) {
    for incoming in candidate {
        if incoming.kind.is_multi_valued() {
            match master
                .iter_mut()
                .find(|m| m.kind == incoming.kind && m.value == incoming.value)
            {
                Some(existing) => {
                    if existing.qualifier.is_none() && incoming.qualifier.is_some() {
                        existing.qualifier = incoming.qualifier.clone();
                    }
                }
                None => master.push(incoming.clone()),
            }
        } else if !master.iter().any(|m| m.kind == incoming.kind) {
            master.push(incoming.clone());
        }
    }
}

/// Merge electronic locators by (kind, uri) equality; on a match only the
/// notes are unioned, otherwise the candidate's locator is appended.
pub(crate) fn merge_locators(master: &mut Vec<ElectronicLocator>, candidate: &[ElectronicLocator]) {
    for incoming in candidate {
        match master.iter_mut().find(|m| m.matches(incoming)) {
            Some(existing) => {
                for note in &incoming.notes {
                    if !existing.notes.contains(note) {
                        existing.notes.push(note.clone());
                    }
                }
            }
            None => master.push(incoming.clone()),
        }
    }
}

/// Merge usage/access policies.
///
/// Access policies are compared position-wise: there is no meaningful
/// order between records, so entries at the same index are assumed to
/// correspond, and the open-access label wins at each position. The
/// master's embargoes are kept when it has any; links and uncategorized
/// entries are unioned without duplicates.
pub(crate) fn merge_usage_policies(master: &mut Vec<UsagePolicy>, candidate: &[UsagePolicy]) {
    if candidate.is_empty() {
        return;
    }
    if master.is_empty() {
        *master = candidate.to_vec();
        return;
    }

    let (m_access, m_embargoes, m_links, m_others) = split_policies(master);
    let (c_access, c_embargoes, c_links, c_others) = split_policies(candidate);

    let access = if c_access.is_empty() {
        m_access
    } else if m_access.is_empty() {
        c_access
    } else {
        let shared = m_access.len().min(c_access.len());
        let mut merged = Vec::with_capacity(m_access.len().max(c_access.len()));
        for i in 0..shared {
            let candidate_wins = !is_open_access(&m_access[i]) && is_open_access(&c_access[i]);
            merged.push(if candidate_wins {
                c_access[i].clone()
            } else {
                m_access[i].clone()
            });
        }
        let longer = if m_access.len() >= c_access.len() {
            &m_access
        } else {
            &c_access
        };
        merged.extend(longer[shared..].iter().cloned());
        merged
    };

    let embargoes = if m_embargoes.is_empty() {
        c_embargoes
    } else {
        m_embargoes
    };

    let mut links = m_links;
    for link in c_links {
        if !links.contains(&link) {
            links.push(link);
        }
    }
    let mut others = m_others;
    for other in c_others {
        if !others.contains(&other) {
            others.push(other);
        }
    }

    *master = access
        .into_iter()
        .chain(embargoes)
        .chain(links)
        .chain(others)
        .collect();
}

type PolicyGroups = (
    Vec<UsagePolicy>,
    Vec<UsagePolicy>,
    Vec<UsagePolicy>,
    Vec<UsagePolicy>,
);

fn split_policies(policies: &[UsagePolicy]) -> PolicyGroups {
    let mut access = Vec::new();
    let mut embargoes = Vec::new();
    let mut links = Vec::new();
    let mut others = Vec::new();
    for policy in policies {
        match policy {
            UsagePolicy::Access { .. } => access.push(policy.clone()),
            UsagePolicy::Embargo { .. } => embargoes.push(policy.clone()),
            UsagePolicy::Link { .. } => links.push(policy.clone()),
            UsagePolicy::Other { .. } => others.push(policy.clone()),
        }
    }
    (access, embargoes, links, others)
}

fn is_open_access(policy: &UsagePolicy) -> bool {
    matches!(policy, UsagePolicy::Access { label } if label == OPEN_ACCESS_LABEL)
}
