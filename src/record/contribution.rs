//! Contributions and the agents behind them.

use serde::{Deserialize, Serialize};

use super::{Identifier, IdentifierKind, non_blank};

/// The agent of a contribution. Each kind carries the attributes that make
/// sense for it; merge logic dispatches exhaustively over the variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Agent {
    Person {
        given_name: Option<String>,
        family_name: Option<String>,
        /// Display name as harvested, when the source provides one.
        name: Option<String>,
        identifiers: Vec<Identifier>,
    },
    Organization {
        name: Option<String>,
        identifiers: Vec<Identifier>,
    },
    Meeting {
        name: Option<String>,
        identifiers: Vec<Identifier>,
    },
}

impl Agent {
    pub fn person(given: impl Into<String>, family: impl Into<String>) -> Self {
        Agent::Person {
            given_name: Some(given.into()),
            family_name: Some(family.into()),
            name: None,
            identifiers: Vec::new(),
        }
    }

    pub fn is_person(&self) -> bool {
        matches!(self, Agent::Person { .. })
    }

    /// Name used for identity during merging: the explicit name when
    /// present, otherwise family and given name concatenated.
    pub fn display_name(&self) -> Option<String> {
        match self {
            Agent::Person {
                given_name,
                family_name,
                name,
                ..
            } => {
                if let Some(name) = name.as_deref().and_then(non_blank) {
                    return Some(name.to_string());
                }
                match (
                    family_name.as_deref().and_then(non_blank),
                    given_name.as_deref().and_then(non_blank),
                ) {
                    (Some(family), Some(given)) => Some(format!("{family} {given}")),
                    (Some(family), None) => Some(family.to_string()),
                    (None, Some(given)) => Some(given.to_string()),
                    (None, None) => None,
                }
            }
            Agent::Organization { name, .. } | Agent::Meeting { name, .. } => {
                name.as_deref().and_then(non_blank).map(str::to_string)
            }
        }
    }

    pub fn identifiers(&self) -> &[Identifier] {
        match self {
            Agent::Person { identifiers, .. }
            | Agent::Organization { identifiers, .. }
            | Agent::Meeting { identifiers, .. } => identifiers,
        }
    }

    pub fn identifiers_mut(&mut self) -> &mut Vec<Identifier> {
        match self {
            Agent::Person { identifiers, .. }
            | Agent::Organization { identifiers, .. }
            | Agent::Meeting { identifiers, .. } => identifiers,
        }
    }

    /// Whether the agent carries an institutional Local identifier.
    pub fn has_local_identifier(&self) -> bool {
        self.identifiers()
            .iter()
            .any(|i| i.kind == IdentifierKind::Local && !i.value.trim().is_empty())
    }
}

/// One contribution to a work: an agent, its roles, and the affiliation
/// tree the submitting organization reported for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub agent: Agent,
    pub roles: Vec<String>,
    pub affiliations: Vec<Affiliation>,
}

impl Contribution {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            roles: Vec::new(),
            affiliations: Vec::new(),
        }
    }
}

/// A node in an affiliation tree: an organization, optionally identified,
/// with nested sub-organizations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    pub name: Option<String>,
    pub identifiers: Vec<Identifier>,
    pub nested: Vec<Affiliation>,
}

impl Affiliation {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            identifiers: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Whether this node (or any nested node) carries a URI identifier
    /// assigned by the given source registry.
    pub fn has_source(&self, source: &str) -> bool {
        let direct = self
            .identifiers
            .iter()
            .any(|i| i.kind == IdentifierKind::Uri && i.source.as_deref() == Some(source));
        direct || self.nested.iter().any(|a| a.has_source(source))
    }
}
