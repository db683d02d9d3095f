//! Crawler module for node discovery
//!
//! This module contains the discovery side of the pipeline:
//! - JSON fetching with a hard per-call deadline
//! - Protocol classification from instance metadata
//! - Peer and block list collection
//! - Frontier expansion and round-based crawl driving

mod classifier;
mod collector;
mod coordinator;
mod expander;
mod fetcher;

pub use classifier::{classify_metadata, classify_node};
pub use collector::{collect_lists, parse_domain_blocks, parse_peers, CollectedLists};
pub use coordinator::{CrawlDriver, CrawlReport, NodeOutcome};
pub use expander::{expand, Expansion};
pub use fetcher::{build_http_client, FetchError, Fetcher};

use crate::config::Config;
use crate::shutdown::Shutdown;
use crate::storage::SqliteStorage;
use crate::FedimapError;
use std::path::Path;

/// Runs a complete crawl against the configured database
///
/// This is the main entry point for discovery. It will:
/// 1. Open the store
/// 2. Seed it if it is empty
/// 3. Drain the frontier round by round
///
/// Re-running after an interruption resumes from whatever is still
/// unclassified.
pub async fn crawl(
    config: &Config,
    config_hash: &str,
    shutdown: Shutdown,
) -> Result<CrawlReport, FedimapError> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let driver = CrawlDriver::new(config, storage, config_hash)?.with_shutdown(shutdown);
    driver.run().await
}
