/// Classification states for federation nodes
///
/// A node enters the store as `Unclassified` and is moved to a terminal
/// classification by the crawl driver.
use std::fmt;

/// Represents the protocol classification of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceType {
    /// Discovered but not yet classified (part of the frontier)
    Unclassified,

    /// Speaks the target federation protocol
    Confirmed,

    /// Does not speak the target protocol, or could not be classified
    NotOfProtocol,

    /// Processing the node failed unexpectedly; may be requeued
    Error,
}

impl InstanceType {
    /// Returns true if no further classification will happen for this node
    ///
    /// `Error` is not terminal: a requeue or re-run may revisit it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::NotOfProtocol)
    }

    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// Terminal classifications may only be rewritten with the same value,
    /// which keeps re-crawls of terminal nodes a no-op.
    pub fn can_transition_to(&self, next: InstanceType) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        true
    }

    /// Converts the instance type to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::Confirmed => "confirmed",
            Self::NotOfProtocol => "not_of_protocol",
            Self::Error => "error",
        }
    }

    /// Parses an instance type from a database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "unclassified" => Some(Self::Unclassified),
            "confirmed" => Some(Self::Confirmed),
            "not_of_protocol" => Some(Self::NotOfProtocol),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns all possible instance types
    pub fn all_types() -> Vec<Self> {
        vec![
            Self::Unclassified,
            Self::Confirmed,
            Self::NotOfProtocol,
            Self::Error,
        ]
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
