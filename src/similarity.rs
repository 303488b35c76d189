//! Text similarity primitives shared by the matcher and the merge engine.
//!
//! The central scorer is [`common_substring_ratio`], a heuristic rather than
//! an exact algorithm: it finds a shared substring (loosely defined, over
//! word lists) by starting at the middlemost common word and growing outwards
//! in both directions, then divides the matched length in words by the length
//! of the longer input. Starting in the middle cannot miss any match that
//! covers more than half of the input, and those are the only matches the
//! thresholds in this crate accept, so the shortcut is sound and much cheaper
//! than a full longest-common-substring search. Words need not match exactly;
//! a short edit distance counts, and split or joined compound words are
//! recovered by retrying with the neighbouring word appended.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use strsim::{jaro, levenshtein};

use crate::record::non_blank;

/// Max length in characters of text taken into a comparison.
pub(crate) const MAX_COMPARE_LENGTH: usize = 1000;

/// Words within this Levenshtein distance count as the same word.
const WORD_MATCH_DISTANCE: usize = 4;

/// Punctuation folded into whitespace before tokenizing.
const SEPARATOR_CHARS: &[char] = &[
    '-', '–', '_', ',', '.', ';', ':', '’', '\'', '!', '?', '”', '“', '#', '\u{00a0}',
];

static WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

/// Similarity of two texts in [0.0, 1.0], no misses tolerated while growing
/// the shared substring.
pub fn common_substring_ratio(a: &str, b: &str) -> f64 {
    common_substring_ratio_with_misses(a, b, 0)
}

/// Similarity of two texts, tolerating up to `allowed_misses` non-matching
/// words while growing the shared substring in each direction.
pub fn common_substring_ratio_with_misses(a: &str, b: &str, allowed_misses: usize) -> f64 {
    let mut a = word_list(a);
    let mut b = word_list(b);
    // `a` is the shorter list from here on
    if a.len() > b.len() {
        std::mem::swap(&mut a, &mut b);
    }

    // Find the middlemost word of `a` that is unique within `a` and also
    // occurs in `b`; the shared substring is grown from there.
    let mut found = HashSet::new();
    let mut unsuitable = HashSet::new();
    for word in &a {
        if found.contains(word) || !b.contains(word) {
            unsuitable.insert(word.clone());
        } else {
            found.insert(word.clone());
        }
    }
    let suitable: Vec<&String> = a.iter().filter(|w| !unsuitable.contains(*w)).collect();
    let Some(start_word) = suitable.get(suitable.len() / 2) else {
        return 0.0;
    };

    let start_a = a.iter().position(|w| &w == start_word).unwrap() as isize;
    let start_b = b.iter().position(|w| &w == start_word).unwrap() as isize;
    let len_a = a.len() as isize;
    let len_b = b.len() as isize;

    // start_word itself is part of the shared substring
    let mut count: usize = 1;

    // Grow backwards.
    let (mut ia, mut ib, mut misses) = (0isize, 0isize, 0usize);
    while start_a + ia > 0 && start_b + ib > 0 {
        ia -= 1;
        ib -= 1;
        let wa = &a[(start_a + ia) as usize];
        let wb = &b[(start_b + ib) as usize];
        if levenshtein(wa, wb) < WORD_MATCH_DISTANCE {
            count += 1;
        } else if start_a + ia > 0
            && joined_matches(&a[(start_a + ia - 1) as usize], wa, wb)
        {
            count += 1;
            ia -= 1;
        } else if start_b + ib > 0
            && joined_matches(&b[(start_b + ib - 1) as usize], wb, wa)
        {
            // two words of `b` consumed, and `b` is what we divide by
            count += 2;
            ib -= 1;
        } else {
            if misses > allowed_misses {
                break;
            }
            misses += 1;
            ia -= 1;
        }
    }

    // Grow forwards.
    let (mut ia, mut ib, mut misses) = (0isize, 0isize, 0usize);
    while start_a + ia < len_a - 1 && start_b + ib < len_b - 1 {
        ia += 1;
        ib += 1;
        let wa = &a[(start_a + ia) as usize];
        let wb = &b[(start_b + ib) as usize];
        if levenshtein(wa, wb) < WORD_MATCH_DISTANCE {
            count += 1;
        } else if start_a + ia < len_a - 2
            && joined_matches(wa, &a[(start_a + ia + 1) as usize], wb)
        {
            count += 1;
            ia += 1;
        } else if start_b + ib < len_b - 2
            && joined_matches(wb, &b[(start_b + ib + 1) as usize], wa)
        {
            count += 2;
            ib += 1;
        } else {
            if misses > allowed_misses {
                break;
            }
            misses += 1;
            ia -= 1;
        }
    }

    count as f64 / b.len() as f64
}

/// Compound-word recovery: does `first + second` match `other`?
fn joined_matches(first: &str, second: &str, other: &str) -> bool {
    levenshtein(&format!("{first}{second}"), other) < WORD_MATCH_DISTANCE
}

fn word_list(text: &str) -> Vec<String> {
    let scrubbed: String = truncated(text)
        .chars()
        .map(|c| if SEPARATOR_CHARS.contains(&c) { ' ' } else { c })
        .collect();
    let lowered = scrubbed.to_lowercase();
    WORD_REGEX
        .find_iter(&lowered)
        .map(|m| m.as_str().to_owned())
        .collect()
}

fn truncated(text: &str) -> &str {
    match text.char_indices().nth(MAX_COMPARE_LENGTH) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

/// Fuzzy equality of two optional texts at the given Jaro threshold.
///
/// Both absent counts as equal; one absent never matches.
pub fn text_similar(a: Option<&str>, b: Option<&str>, threshold: f64) -> bool {
    match (a.and_then(non_blank), b.and_then(non_blank)) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            jaro(&truncated(a).to_lowercase(), &truncated(b).to_lowercase()) >= threshold
        }
        _ => false,
    }
}

/// Whether two publication dates agree after truncating the longer to the
/// length of the shorter, so "2016" matches "2016-02-01". A missing date on
/// either side never matches.
pub fn same_publication_date(a: Option<&str>, b: Option<&str>) -> bool {
    let (Some(a), Some(b)) = (a.and_then(non_blank), b.and_then(non_blank)) else {
        return false;
    };
    let (a, b) = (a.trim(), b.trim());
    let shorter = a.chars().count().min(b.chars().count());
    a.chars().take(shorter).eq(b.chars().take(shorter))
}
