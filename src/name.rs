//! Fuzzy matching of contributor names.
//!
//! Contribution identity during merging is name-based: two contributions
//! belong to the same person when their names match closely enough,
//! independent of any external identifiers they carry. Names arrive in
//! inconsistent shapes ("Larsson, Anna", "Anna Larsson", "Larsson A."), so
//! the match is word-by-word and order-insensitive, with single-letter
//! tokens treated as initials and an edit-distance tolerance that scales
//! with word length.

use strsim::levenshtein;

/// Whether two contributor names probably denote the same person.
///
/// Every token of the shorter name must find a distinct partner in the
/// longer one; a missing or empty name never matches.
pub fn probably_same_name(a: &str, b: &str) -> bool {
    let a_tokens = name_tokens(a);
    let b_tokens = name_tokens(b);
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return false;
    }
    let (shorter, longer) = if a_tokens.len() <= b_tokens.len() {
        (&a_tokens, &b_tokens)
    } else {
        (&b_tokens, &a_tokens)
    };

    let mut taken = vec![false; longer.len()];
    'tokens: for token in shorter {
        for (i, other) in longer.iter().enumerate() {
            if !taken[i] && tokens_match(token, other) {
                taken[i] = true;
                continue 'tokens;
            }
        }
        return false;
    }
    true
}

fn tokens_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    // a single-letter token is an initial and matches on first letter
    if a.chars().count() == 1 || b.chars().count() == 1 {
        return a.chars().next() == b.chars().next();
    }
    // edit tolerance scales with length; words under five letters are
    // matched exactly ("Berg" and "Borg" are different people)
    let longest = a.chars().count().max(b.chars().count());
    longest >= 5 && levenshtein(a, b) <= longest / 4
}

fn name_tokens(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Larsson, Anna", "Anna Larsson")]
    #[case("Larsson Anna", "Larsson A.")]
    #[case("Larsson, A", "Anna Larsson")]
    #[case("Karlsson, Erik", "Carlsson, Erik")]
    #[case("J.E. Svensson", "Svensson, Johan Erik")]
    #[case("Svensson, Johan", "Svensson, Johan Erik")]
    fn test_probably_same(#[case] a: &str, #[case] b: &str) {
        assert!(probably_same_name(a, b));
        assert!(probably_same_name(b, a));
    }

    #[rstest]
    #[case("Larsson, Anna", "Nilsson, Anna")]
    #[case("Larsson, Anna", "Larsson, Bengt")]
    #[case("Jon Berg", "Jan Berg")]
    #[case("Larsson, Anna", "")]
    #[case("", "")]
    fn test_probably_different(#[case] a: &str, #[case] b: &str) {
        assert!(!probably_same_name(a, b));
        assert!(!probably_same_name(b, a));
    }

    #[test]
    fn test_short_words_need_exact_match() {
        // no tolerance below five letters: "berg"/"borg" are different names
        assert!(!probably_same_name("Berg, Anna", "Borg, Anna"));
    }

    #[test]
    fn test_initial_must_agree() {
        assert!(!probably_same_name("Larsson, A.", "Larsson, Bengt"));
    }
}
