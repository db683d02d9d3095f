use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing phase an error was recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Fetching the peers endpoint
    Peers,

    /// Fetching the domain block endpoint
    Blocks,

    /// Classifying and expanding the node during discovery
    Crawl,

    /// Computing valid neighbors
    Validate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Peers => "peers",
            Self::Blocks => "blocks",
            Self::Crawl => "crawl",
            Self::Validate => "validate",
        };
        write!(f, "{}", s)
    }
}

/// A structured error recorded against a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeError {
    pub phase: Phase,
    pub message: String,
}

impl NodeError {
    pub fn new(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }

    /// An unexpected failure caught at the node-processing boundary
    pub fn critical(phase: Phase, message: impl fmt::Display) -> Self {
        Self::new(phase, format!("Critical failure: {}", message))
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.phase, self.message)
    }
}
