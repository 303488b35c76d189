//! The in-memory representation of a harvested publication record.
//!
//! Everything the engine does, from candidate generation and pairwise
//! matching to cluster construction and merging, operates on [`Record`] and its
//! sub-entities. Records arrive already converted from their source format;
//! every field is optional and absence is a valid state, never an error.
//! Accessors therefore return `Option`/empty collections instead of failing.

use serde::{Deserialize, Serialize};

mod contribution;
mod part_of;

pub use contribution::{Affiliation, Agent, Contribution};
pub use part_of::{PartOf, Series};

/// Stable source identifier of a record (e.g. an OAI identifier).
pub type RecordId = String;

/// The kind of an external identifier carried by a record or sub-entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierKind {
    Doi,
    Isbn,
    Issn,
    Isi,
    Pmid,
    ScopusId,
    Uri,
    Orcid,
    /// Organization-local identifier; not globally comparable.
    Local,
}

impl IdentifierKind {
    /// Whether identifiers of this kind may carry several values on one
    /// record (ISSN/ISBN/URI commonly do; other kinds are one-per-record).
    pub fn is_multi_valued(self) -> bool {
        matches!(
            self,
            IdentifierKind::Issn | IdentifierKind::Isbn | IdentifierKind::Uri
        )
    }
}

/// A typed external identifier: `{kind, value, optional qualifier}`.
///
/// `source` names the registry that assigned the identifier when known
/// (used to recognize authority-sourced affiliations during merging).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub kind: IdentifierKind,
    pub value: String,
    pub qualifier: Option<String>,
    pub source: Option<String>,
}

/// Scopus EIDs are the Scopus ID with this prefix; strip it for comparison.
const SCOPUS_EID_PREFIX: &str = "2-s2.0-";

impl Identifier {
    pub fn new(kind: IdentifierKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            qualifier: None,
            source: None,
        }
    }

    /// The value as used for equality tests between records.
    ///
    /// Scopus identifiers are compared with the EID prefix removed, so a
    /// bare Scopus ID and the EID form of the same ID are equal.
    pub fn comparable_value(&self) -> &str {
        match self.kind {
            IdentifierKind::ScopusId => self
                .value
                .strip_prefix(SCOPUS_EID_PREFIX)
                .unwrap_or(&self.value),
            _ => self.value.trim(),
        }
    }
}

/// Title of a work: a main title plus an optional subtitle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub main: String,
    pub subtitle: Option<String>,
}

impl Title {
    pub fn new(main: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            subtitle: None,
        }
    }

    pub fn with_subtitle(main: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            subtitle: Some(subtitle.into()),
        }
    }

    /// The main title proper. When no explicit subtitle is present and the
    /// main title contains a colon, only the part before the first colon is
    /// returned ("main: sub" yields "main").
    pub fn main_title(&self) -> Option<&str> {
        if self
            .subtitle
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
        {
            return non_blank(&self.main);
        }
        non_blank(self.main.split(':').next().unwrap_or(&self.main))
    }

    /// The subtitle: the explicit field when present, otherwise the part of
    /// the main title after the first colon.
    pub fn sub_title(&self) -> Option<&str> {
        if let Some(sub) = self.subtitle.as_deref()
            && !sub.trim().is_empty()
        {
            return Some(sub);
        }
        self.main
            .split_once(':')
            .and_then(|(_, sub)| non_blank(sub.trim()))
    }

    /// Main title and subtitle concatenated, for similarity scoring.
    pub fn combined(&self) -> String {
        let mut combined = String::new();
        if !self.main.trim().is_empty() {
            combined.push_str(&self.main);
        }
        if let Some(sub) = self.subtitle.as_deref()
            && !sub.trim().is_empty()
        {
            if !combined.is_empty() {
                combined.push(' ');
            }
            combined.push_str(sub);
        }
        combined
    }
}

/// An abstract, possibly language-tagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub label: String,
    pub language: Option<String>,
}

impl Summary {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            language: None,
        }
    }
}

/// Publication status, ordered by precedence for merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicationStatus {
    Published,
    EpubAheadOfPrint,
    InPress,
    Accepted,
    Submitted,
    Preprint,
    /// A status the vocabulary does not know; ranks below all known ones.
    Other(String),
}

impl PublicationStatus {
    /// Precedence rank; lower wins a merge conflict.
    pub fn rank(&self) -> u8 {
        match self {
            PublicationStatus::Published => 1,
            PublicationStatus::EpubAheadOfPrint => 2,
            PublicationStatus::InPress => 3,
            PublicationStatus::Accepted => 4,
            PublicationStatus::Submitted => 5,
            PublicationStatus::Preprint => 6,
            PublicationStatus::Other(_) => 7,
        }
    }
}

/// A subject/classification entry.
///
/// `auto_assigned` marks classifications produced by machine classification
/// rather than carried on the harvested record; these lose merge conflicts
/// against curated classifications at the same level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Option<String>,
    pub code: Option<String>,
    pub pref_label: Option<String>,
    pub language: Option<String>,
    pub auto_assigned: bool,
}

impl Subject {
    /// Classification level, given by the digit count of the code
    /// (1-, 3- and 5-digit codes denote increasingly specific levels).
    pub fn level(&self) -> Option<usize> {
        self.code
            .as_deref()
            .map(|c| c.chars().filter(|ch| ch.is_ascii_digit()).count())
            .filter(|&n| n > 0)
    }

    /// Whether two entries denote the same classification: same id, or same
    /// (code, language) pair, or same preferred label.
    pub fn same_classification(&self, other: &Subject) -> bool {
        if self.id.is_some() && self.id == other.id {
            return true;
        }
        if self.code.is_some() && self.code == other.code && self.language == other.language {
            return true;
        }
        self.pref_label.is_some() && self.pref_label == other.pref_label
    }
}

/// A link to an electronic copy of the work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectronicLocator {
    pub kind: Option<String>,
    pub uri: String,
    pub notes: Vec<String>,
}

impl ElectronicLocator {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            kind: None,
            uri: uri.into(),
            notes: Vec::new(),
        }
    }

    /// Locators are the same entry when kind and URI both agree.
    pub fn matches(&self, other: &ElectronicLocator) -> bool {
        self.kind == other.kind && self.uri == other.uri
    }
}

/// Publication information: agent, place and date of publication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationInfo {
    pub agent: Option<String>,
    pub place: Option<String>,
    pub date: Option<String>,
}

/// A usage/access-policy entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsagePolicy {
    /// An access policy label; "gratis" denotes open access.
    Access { label: String },
    Embargo { until: Option<String> },
    Link { uri: String },
    Other { label: String },
}

/// A publication record as harvested from an institutional repository.
///
/// This is the unit of deduplication. The record owns its sub-entities;
/// nothing here is shared or lazily loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable source identifier.
    pub id: RecordId,
    /// Code of the organization that submitted the record.
    pub source_org: Option<String>,
    pub title: Option<Title>,
    pub summaries: Vec<Summary>,
    pub publication_status: Option<PublicationStatus>,
    pub creator_count: Option<u32>,
    /// Free-text notes.
    pub notes: Vec<String>,
    /// Genre/type tags (vocabulary term URIs).
    pub genre_forms: Vec<String>,
    pub contributions: Vec<Contribution>,
    pub subjects: Vec<Subject>,
    /// Identifiers of the work itself.
    pub identifiers: Vec<Identifier>,
    /// Identifiers of a containing manifestation (e.g. the ISBN of the book
    /// a chapter appears in).
    pub indirect_identifiers: Vec<Identifier>,
    pub part_of: Vec<PartOf>,
    pub series: Vec<Series>,
    pub electronic_locators: Vec<ElectronicLocator>,
    pub publication_info: Option<PublicationInfo>,
    pub usage_policies: Vec<UsagePolicy>,
    pub copyright_date: Option<String>,
}

impl Record {
    /// Main title and subtitle concatenated; `None` when blank or absent.
    pub fn combined_title(&self) -> Option<String> {
        self.title
            .as_ref()
            .map(Title::combined)
            .filter(|t| !t.trim().is_empty())
    }

    /// The first summary text, if any.
    pub fn summary(&self) -> Option<&str> {
        self.summaries.first().and_then(|s| non_blank(&s.label))
    }

    /// Date of publication, from the publication-information block.
    pub fn publication_date(&self) -> Option<&str> {
        self.publication_info
            .as_ref()
            .and_then(|p| p.date.as_deref())
            .and_then(non_blank)
    }

    /// Non-empty values of all identifiers of the given kind, in record order.
    pub fn identifier_values(&self, kind: IdentifierKind) -> Vec<&str> {
        self.identifiers
            .iter()
            .filter(|i| i.kind == kind)
            .map(Identifier::comparable_value)
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Count of populated descriptive fields, used to pick the most complete
    /// record in a cluster as the merge target. List-valued fields count
    /// their length; populated scalars count one each.
    pub fn descriptive_size(&self) -> usize {
        let lists = self.summaries.len()
            + self.notes.len()
            + self.genre_forms.len()
            + self.contributions.len()
            + self.subjects.len();
        let scalars = usize::from(self.title.is_some())
            + usize::from(self.publication_status.is_some())
            + usize::from(self.creator_count.is_some());
        lists + scalars
    }
}

pub(crate) fn non_blank(s: &str) -> Option<&str> {
    if s.trim().is_empty() { None } else { Some(s) }
}
