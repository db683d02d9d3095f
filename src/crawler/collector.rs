//! Peer and block list collection
//!
//! The two endpoints are fetched one after the other and their outcomes are
//! kept apart: a failing block list never hides a good peers list, and the
//! other way round.

use crate::crawler::{FetchError, Fetcher};
use crate::state::{NodeError, Phase};
use crate::url::{normalize_node_name, DOMAIN_BLOCKS_PATH, PEERS_PATH};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// One entry of the domain block endpoint; extra fields are ignored
#[derive(Debug, Deserialize)]
struct DomainBlock {
    domain: String,
}

/// Outcome of collecting a node's declared lists
///
/// `None` means the endpoint failed; the matching error is in `errors`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedLists {
    pub peers: Option<BTreeSet<String>>,
    pub blocked: Option<BTreeSet<String>>,
    pub errors: Vec<NodeError>,
}

impl CollectedLists {
    pub fn peers_failed(&self) -> bool {
        self.peers.is_none()
    }

    pub fn blocks_failed(&self) -> bool {
        self.blocked.is_none()
    }

    /// Union of peers and blocked names, the discovery candidates
    pub fn candidates(&self) -> BTreeSet<String> {
        self.peers
            .iter()
            .chain(self.blocked.iter())
            .flatten()
            .cloned()
            .collect()
    }
}

/// Parses a peers payload: a list of domain strings
pub fn parse_peers(payload: Value) -> Result<BTreeSet<String>, FetchError> {
    let names: Vec<String> = serde_json::from_value(payload)
        .map_err(|e| FetchError::InvalidPayload(format!("peers must be a list of strings: {}", e)))?;
    Ok(normalize_all(names))
}

/// Parses a domain block payload: a list of records with a `domain` field
pub fn parse_domain_blocks(payload: Value) -> Result<BTreeSet<String>, FetchError> {
    let blocks: Vec<DomainBlock> = serde_json::from_value(payload).map_err(|e| {
        FetchError::InvalidPayload(format!(
            "domain blocks must be a list of records with a domain: {}",
            e
        ))
    })?;
    Ok(normalize_all(blocks.into_iter().map(|b| b.domain)))
}

fn normalize_all(names: impl IntoIterator<Item = String>) -> BTreeSet<String> {
    names
        .into_iter()
        .filter_map(|name| normalize_node_name(&name))
        .collect()
}

/// Fetches both lists for a node
pub async fn collect_lists(fetcher: &Fetcher, name: &str) -> CollectedLists {
    let mut lists = CollectedLists::default();

    match fetcher.get_json(name, PEERS_PATH).await.and_then(parse_peers) {
        Ok(peers) => lists.peers = Some(peers),
        Err(e) => {
            tracing::debug!("Peers of {} unavailable: {}", name, e);
            lists.errors.push(NodeError::new(Phase::Peers, e.to_string()));
        }
    }

    match fetcher
        .get_json(name, DOMAIN_BLOCKS_PATH)
        .await
        .and_then(parse_domain_blocks)
    {
        Ok(blocked) => lists.blocked = Some(blocked),
        Err(e) => {
            tracing::debug!("Block list of {} unavailable: {}", name, e);
            lists.errors.push(NodeError::new(Phase::Blocks, e.to_string()));
        }
    }

    lists
}
