use std::fmt;

/// Edge collection status of a confirmed node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeStatus {
    /// Waiting for the edge validator
    NotStarted,

    /// Both lists were fetched and valid neighbors computed
    Success,

    /// The peers endpoint failed
    PeersUnreachable,

    /// The peers endpoint succeeded but the block list failed
    BlocklistUnreachable,

    /// Validation failed unexpectedly
    Error,
}

impl EdgeStatus {
    /// Returns true for statuses that a requeue resets to `NotStarted`
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PeersUnreachable | Self::BlocklistUnreachable | Self::Error
        )
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Success => "success",
            Self::PeersUnreachable => "peers_unreachable",
            Self::BlocklistUnreachable => "blocklist_unreachable",
            Self::Error => "error",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Self::NotStarted),
            "success" => Some(Self::Success),
            "peers_unreachable" => Some(Self::PeersUnreachable),
            "blocklist_unreachable" => Some(Self::BlocklistUnreachable),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn all_statuses() -> Vec<Self> {
        vec![
            Self::NotStarted,
            Self::Success,
            Self::PeersUnreachable,
            Self::BlocklistUnreachable,
            Self::Error,
        ]
    }
}

impl fmt::Display for EdgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
