//! Clustering-identifier extraction.
//!
//! Every record contributes a small set of coarse, high-recall string keys:
//! a degraded form of its title, a degraded form of each summary, and the
//! values of its globally comparable external identifiers. Records sharing a
//! key become candidate duplicates; the actual decision is left to the
//! pairwise matcher. Degradation keeps only the vowels of the trailing part
//! of the text, which tolerates consonant typos and minor prefix differences
//! while staying cheap to index.

use itertools::Itertools;

use crate::record::{IdentifierKind, Record};

/// How much of the end of a title/summary feeds the degraded key.
const DEGRADED_SUFFIX_CHARS: usize = 60;

/// Keys shorter than this collide too often to be useful.
const MIN_KEY_CHARS: usize = 5;

/// Vowels kept by degradation, including accented and Scandinavian forms.
const VOWELS: &str = "aeiouyàáäåæèéíóöøúü";

/// Derive the clustering identifiers of a record. Pure function; the caller
/// owns the index the keys go into. Keys are deduplicated, in derivation
/// order.
pub fn clustering_identifiers(record: &Record) -> Vec<String> {
    let mut keys = Vec::new();

    if let Some(title) = record.combined_title()
        && let Some(key) = degraded_key(&title)
    {
        keys.push(key);
    }

    for summary in &record.summaries {
        if let Some(key) = degraded_key(&summary.label) {
            keys.push(key);
        }
    }

    for identifier in record
        .identifiers
        .iter()
        .chain(&record.indirect_identifiers)
    {
        if identifier.kind == IdentifierKind::Local {
            continue;
        }
        let value = identifier.value.trim();
        if value.chars().count() >= MIN_KEY_CHARS {
            keys.push(value.to_string());
        }
    }

    keys.into_iter().unique().collect()
}

/// Vowel-only, lower-cased form of the last [`DEGRADED_SUFFIX_CHARS`] chars
/// of the text; `None` when the result is too short to be a useful key.
fn degraded_key(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let tail_start = chars.len().saturating_sub(DEGRADED_SUFFIX_CHARS);
    let key: String = chars[tail_start..]
        .iter()
        .flat_map(|c| c.to_lowercase())
        .filter(|c| VOWELS.contains(*c))
        .collect();
    (key.chars().count() >= MIN_KEY_CHARS).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Identifier, Summary, Title};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_degraded_key_keeps_vowels_of_tail() {
        assert_eq!(
            degraded_key("Swepub at 10 years"),
            Some("euayea".to_string())
        );
        assert_eq!(degraded_key("Grönländska studier"), Some("öäauie".to_string()));
    }

    #[test]
    fn test_degraded_key_drops_short_results() {
        assert_eq!(degraded_key("bcd"), None);
        assert_eq!(degraded_key("a e i o"), None);
    }

    #[test]
    fn test_degraded_key_uses_only_the_trailing_chars() {
        let tail = "studies of vowel degradation in harvested publication titles";
        assert_eq!(tail.chars().count(), DEGRADED_SUFFIX_CHARS);
        let a = format!("First: {tail}");
        let b = format!("A completely different beginning {tail}");
        assert_eq!(degraded_key(&a), degraded_key(&b));
    }

    #[test]
    fn test_identifiers_become_keys_except_local() {
        let record = Record {
            identifiers: vec![
                Identifier::new(IdentifierKind::Doi, "10.1000/xyz123"),
                Identifier::new(IdentifierKind::Local, "internal-4711"),
                Identifier::new(IdentifierKind::Isbn, "9789170002991"),
            ],
            ..Default::default()
        };
        let keys = clustering_identifiers(&record);
        assert_eq!(keys, vec!["10.1000/xyz123", "9789170002991"]);
    }

    #[test]
    fn test_short_identifier_values_are_dropped() {
        let record = Record {
            identifiers: vec![Identifier::new(IdentifierKind::Pmid, "42")],
            ..Default::default()
        };
        assert!(clustering_identifiers(&record).is_empty());
    }

    #[test]
    fn test_title_and_summaries_contribute_keys() {
        let record = Record {
            title: Some(Title::new("Entity resolution for repository records")),
            summaries: vec![
                Summary::new("An abstract about clustering harvested publication metadata"),
            ],
            ..Default::default()
        };
        let keys = clustering_identifiers(&record);
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k.chars().count() >= MIN_KEY_CHARS));
    }

    #[test]
    fn test_keys_are_deduplicated() {
        let record = Record {
            identifiers: vec![
                Identifier::new(IdentifierKind::Doi, "10.1000/xyz123"),
                Identifier::new(IdentifierKind::Uri, "10.1000/xyz123"),
            ],
            ..Default::default()
        };
        assert_eq!(clustering_identifiers(&record).len(), 1);
    }

    #[test]
    fn test_record_with_nothing_yields_no_keys() {
        assert!(clustering_identifiers(&Record::default()).is_empty());
    }
}
