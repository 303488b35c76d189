//! The pairwise "same work" test.
//!
//! Given two records that share a clustering identifier, decide whether they
//! describe the same publication. The test is deliberately not transitive:
//! transitivity is imposed later by the cluster builder's union phase, never
//! assumed here. Missing fields degrade to "no match" rather than failing.

use std::collections::HashSet;

use crate::record::{IdentifierKind, Record};
use crate::similarity::{common_substring_ratio, same_publication_date};

/// Combined-title similarity must exceed this for the title gate to pass.
const TITLE_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Summary similarity threshold for the summary+date path.
const SUMMARY_SIMILARITY_THRESHOLD: f64 = 0.6;

/// Titles that recur across unrelated works; they pass no signal, so the
/// title-similarity path is closed for them and only a shared identifier can
/// tie such records together.
const GENERIC_TITLES: &[&str] = &[
    "abstract",
    "abstracts",
    "book review",
    "book reviews",
    "commentary",
    "correction",
    "corrigendum",
    "discussion",
    "editorial",
    "erratum",
    "foreword",
    "förord",
    "in memoriam",
    "index",
    "inledning",
    "introduction",
    "letter to the editor",
    "obituary",
    "preface",
    "recension",
    "reply",
    "review",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TitleVerdict {
    /// Either record has no usable combined title.
    Missing,
    /// Either combined title is on the generic-title denylist.
    Generic,
    Dissimilar,
    Similar,
}

/// Decide whether two records describe the same work.
///
/// The decision is intended to be symmetric but is not enforced to be by
/// construction; the cluster builder therefore evaluates each unordered pair
/// exactly once, so an asymmetry in the underlying string heuristic can
/// never produce contradictory verdicts for the same pair.
pub fn is_same_work(a: &Record, b: &Record) -> bool {
    // conflicting DOIs veto a match regardless of any other similarity
    if !compatible_doi_sets(a, b) {
        return false;
    }
    match title_verdict(a, b) {
        TitleVerdict::Missing | TitleVerdict::Dissimilar => false,
        // the title decides nothing; a shared identifier does
        TitleVerdict::Generic => shares_identifier(a, b),
        TitleVerdict::Similar => {
            shares_identifier(a, b)
                || (similar_summaries(a, b)
                    && same_publication_date(a.publication_date(), b.publication_date()))
        }
    }
}

/// DOI compatibility gate: both sets non-empty and different (as sorted,
/// deduplicated sets) is the only failing combination.
pub(crate) fn compatible_doi_sets(a: &Record, b: &Record) -> bool {
    let mut a_dois = a.identifier_values(IdentifierKind::Doi);
    let mut b_dois = b.identifier_values(IdentifierKind::Doi);
    if a_dois.is_empty() || b_dois.is_empty() {
        return true;
    }
    a_dois.sort_unstable();
    a_dois.dedup();
    b_dois.sort_unstable();
    b_dois.dedup();
    a_dois == b_dois
}

pub(crate) fn title_verdict(a: &Record, b: &Record) -> TitleVerdict {
    let (Some(title_a), Some(title_b)) = (a.combined_title(), b.combined_title()) else {
        return TitleVerdict::Missing;
    };
    if is_generic(&title_a) || is_generic(&title_b) {
        return TitleVerdict::Generic;
    }
    if common_substring_ratio(&title_a, &title_b) <= TITLE_SIMILARITY_THRESHOLD {
        return TitleVerdict::Dissimilar;
    }
    // "Part 1" must not match "Part 2": when either title ends in a number
    // (arabic or roman), the trailing tokens have to agree exactly
    let tail_a = trailing_token(&title_a);
    let tail_b = trailing_token(&title_b);
    let numbered = [tail_a, tail_b]
        .into_iter()
        .any(|t| t.is_some_and(is_numeric_or_roman));
    if numbered {
        match (tail_a, tail_b) {
            (Some(a), Some(b)) if a.eq_ignore_ascii_case(b) => {}
            _ => return TitleVerdict::Dissimilar,
        }
    }
    TitleVerdict::Similar
}

fn is_generic(title: &str) -> bool {
    let normalized = title.trim().to_lowercase();
    GENERIC_TITLES.contains(&normalized.as_str())
}

fn trailing_token(title: &str) -> Option<&str> {
    title
        .split_whitespace()
        .next_back()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
}

fn is_numeric_or_roman(token: &str) -> bool {
    let all_digits = token.chars().all(|c| c.is_ascii_digit());
    let all_roman = token
        .chars()
        .all(|c| "ivxlcdm".contains(c.to_ascii_lowercase()));
    all_digits || all_roman
}

/// Whether the records share at least one non-empty, globally comparable
/// identifier value. Local identifiers are organization-scoped and never
/// count; indirect identifiers (e.g. the ISBN of a containing book) do.
pub(crate) fn shares_identifier(a: &Record, b: &Record) -> bool {
    let a_values: HashSet<&str> = comparable_values(a).collect();
    if a_values.is_empty() {
        return false;
    }
    comparable_values(b).any(|v| a_values.contains(v))
}

fn comparable_values(record: &Record) -> impl Iterator<Item = &str> {
    record
        .identifiers
        .iter()
        .chain(&record.indirect_identifiers)
        .filter(|i| i.kind != IdentifierKind::Local)
        .map(|i| i.comparable_value())
        .filter(|v| !v.is_empty())
}

/// Summary gate for the summary+date path: both missing passes, one missing
/// fails, both present compare by common-substring ratio.
fn similar_summaries(a: &Record, b: &Record) -> bool {
    match (a.summary(), b.summary()) {
        (None, None) => true,
        (Some(sa), Some(sb)) => common_substring_ratio(sa, sb) >= SUMMARY_SIMILARITY_THRESHOLD,
        _ => false,
    }
}
