//! References to containing works (journal issues, proceedings, books) and
//! the series they belong to.

use serde::{Deserialize, Serialize};

use super::{Identifier, IdentifierKind};
use crate::similarity::text_similar;

/// Jaro thresholds for fuzzy title equality of part-of references; subtitles
/// are less common, so the subtitle bar stays at the same relaxed level.
const PART_OF_TITLE_RATIO: f64 = 0.8;
const PART_OF_SUBTITLE_RATIO: f64 = 0.8;

/// Series titles are short and formulaic, so the bar is higher.
const SERIES_TITLE_RATIO: f64 = 0.9;

/// A reference to the containing work, e.g. the journal issue an article
/// appeared in. Equality is structural: a shared ISSN or ISBN, or the same
/// (main title, subtitle, volume, issue) tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartOf {
    pub main_title: Option<String>,
    pub subtitle: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub identifiers: Vec<Identifier>,
    pub series: Vec<Series>,
}

impl PartOf {
    pub fn titled(main_title: impl Into<String>) -> Self {
        Self {
            main_title: Some(main_title.into()),
            ..Default::default()
        }
    }

    pub fn issns(&self) -> Vec<&str> {
        self.identifier_values(IdentifierKind::Issn)
    }

    pub fn isbns(&self) -> Vec<&str> {
        self.identifier_values(IdentifierKind::Isbn)
    }

    fn identifier_values(&self, kind: IdentifierKind) -> Vec<&str> {
        self.identifiers
            .iter()
            .filter(|i| i.kind == kind)
            .map(|i| i.value.as_str())
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Whether two part-of references denote the same containing work.
    pub fn matches(&self, other: &PartOf) -> bool {
        if self == other {
            return true;
        }
        let issns = self.issns();
        if other.issns().iter().any(|issn| issns.contains(issn)) {
            return true;
        }
        let isbns = self.isbns();
        if other.isbns().iter().any(|isbn| isbns.contains(isbn)) {
            return true;
        }
        self.has_same_main_title(other)
            && text_similar(
                self.subtitle.as_deref(),
                other.subtitle.as_deref(),
                PART_OF_SUBTITLE_RATIO,
            )
            && self.volume == other.volume
            && self.issue == other.issue
    }

    fn has_same_main_title(&self, other: &PartOf) -> bool {
        // a part-of without any main title never matches on the title path
        if self.main_title.is_none() && other.main_title.is_none() {
            return false;
        }
        text_similar(
            self.main_title.as_deref(),
            other.main_title.as_deref(),
            PART_OF_TITLE_RATIO,
        )
    }
}

/// A series membership, either of the record itself or nested under a
/// part-of reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub title: Option<String>,
    pub issn: Option<String>,
    pub issue_number: Option<String>,
}

impl Series {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Equality for series carried directly on a record: same ISSN and issue
    /// number, or the same title.
    pub fn same_series(&self, other: &Series) -> bool {
        (self.has_same_issn(other) && self.has_same_issue_number(other))
            || self.has_same_title(other)
    }

    /// Equality for series nested under a part-of reference: a shared ISSN
    /// alone is enough there.
    pub fn same_series_in_part_of(&self, other: &Series) -> bool {
        self.has_same_issn(other) || self.has_same_title(other)
    }

    fn has_same_issn(&self, other: &Series) -> bool {
        match (trimmed(&self.issn), trimmed(&other.issn)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn has_same_issue_number(&self, other: &Series) -> bool {
        match (trimmed(&self.issue_number), trimmed(&other.issue_number)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn has_same_title(&self, other: &Series) -> bool {
        if self.title.is_none() && other.title.is_none() {
            return false;
        }
        text_similar(self.title.as_deref(), other.title.as_deref(), SERIES_TITLE_RATIO)
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
