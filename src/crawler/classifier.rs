//! Protocol classification
//!
//! A node is confirmed when its instance metadata declares the target
//! protocol. Classification is fail-safe: any fetch failure classifies the
//! node as not of the protocol rather than raising an error.

use crate::crawler::Fetcher;
use crate::state::InstanceType;
use crate::url::INSTANCE_PATH;
use serde_json::Value;

/// Classifies instance metadata against `protocol`
///
/// Rules, in order:
/// 1. `api_versions` is an object containing the `protocol` key
/// 2. `source_url` is a string containing `protocol` (case-insensitive)
///
/// Anything else, including fields of the wrong type, is `NotOfProtocol`.
pub fn classify_metadata(metadata: &Value, protocol: &str) -> InstanceType {
    let declares_version = metadata
        .get("api_versions")
        .and_then(Value::as_object)
        .map(|versions| versions.contains_key(protocol))
        .unwrap_or(false);
    if declares_version {
        return InstanceType::Confirmed;
    }

    let source_matches = metadata
        .get("source_url")
        .and_then(Value::as_str)
        .map(|url| url.to_lowercase().contains(&protocol.to_lowercase()))
        .unwrap_or(false);
    if source_matches {
        return InstanceType::Confirmed;
    }

    InstanceType::NotOfProtocol
}

/// Fetches a node's metadata and classifies it
pub async fn classify_node(fetcher: &Fetcher, protocol: &str, name: &str) -> InstanceType {
    match fetcher.get_json(name, INSTANCE_PATH).await {
        Ok(metadata) => classify_metadata(&metadata, protocol),
        Err(e) => {
            tracing::debug!("Classifying {} as not of protocol: {}", name, e);
            InstanceType::NotOfProtocol
        }
    }
}
