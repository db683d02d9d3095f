//! Node name and endpoint URL handling
//!
//! Node names are bare domains (optionally with a port) used as primary keys
//! in the store. This module normalizes candidate names and builds the
//! metadata endpoint URLs for a node.

mod domain;

pub use domain::normalize_node_name;

use crate::{UrlError, UrlResult};
use url::Url;

/// Instance metadata endpoint, used for protocol classification
pub const INSTANCE_PATH: &str = "/api/v2/instance";

/// Declared federation peers endpoint
pub const PEERS_PATH: &str = "/api/v1/instance/peers";

/// Declared domain blocks endpoint
pub const DOMAIN_BLOCKS_PATH: &str = "/api/v1/instance/domain_blocks";

/// Builds the URL of an endpoint on a node
///
/// # Examples
///
/// ```
/// use fedimap::url::{endpoint_url, PEERS_PATH};
///
/// let url = endpoint_url("https", "mastodon.social", PEERS_PATH).unwrap();
/// assert_eq!(url.as_str(), "https://mastodon.social/api/v1/instance/peers");
/// ```
pub fn endpoint_url(scheme: &str, node: &str, path: &str) -> UrlResult<Url> {
    if scheme != "https" && scheme != "http" {
        return Err(UrlError::InvalidScheme(scheme.to_string()));
    }

    let base = Url::parse(&format!("{}://{}", scheme, node))
        .map_err(|e| UrlError::Parse(format!("{}: {}", node, e)))?;

    if base.host_str().is_none() {
        return Err(UrlError::InvalidNodeName(node.to_string()));
    }

    base.join(path)
        .map_err(|e| UrlError::Parse(format!("{}{}: {}", node, path, e)))
}
