//! Fedimap: a federation topology mapper
//!
//! This crate discovers the servers of a federated network by recursively
//! following each server's declared peers, classifies them against a target
//! protocol, and derives a validated, deduplicated undirected edge list of
//! confirmed inter-server links.

pub mod config;
pub mod crawler;
pub mod edges;
pub mod output;
pub mod shutdown;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Fedimap operations
#[derive(Debug, Error)]
pub enum FedimapError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Node name and endpoint URL errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Invalid node name: {0:?}")]
    InvalidNodeName(String),
}

/// Result type alias for Fedimap operations
pub type Result<T> = std::result::Result<T, FedimapError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlDriver, CrawlReport, FetchError, Fetcher};
pub use edges::{Edge, EdgeValidator, MaterializeReport, ValidationReport};
pub use state::{EdgeStatus, InstanceType, NodeError, Phase};
pub use storage::{NodeFilter, NodeRecord, NodeUpdate, SqliteStorage, Storage};
