//! HTTP fetch client
//!
//! This module issues single JSON GET requests against node endpoints:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Enforcing an absolute per-call deadline on top of the client timeouts
//! - Validating status, content type and body before handing back JSON
//!
//! There are no retries. Callers decide what a failure means.

use crate::config::{FetchConfig, UserAgentConfig};
use crate::url::endpoint_url;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Typed failure of a single fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// A client timeout or the hard deadline elapsed
    #[error("Request exceeded hard timeout limit")]
    Timeout,

    /// DNS, connection or TLS failure, or an unusable URL
    #[error("Request error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Wrong content type, unparseable body, explicit error field or wrong shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The user agent is formatted as `CrawlerName/Version (+ContactURL; ContactEmail)`.
pub fn build_http_client(
    fetch: &FetchConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{} (+{}; {})",
        user_agent.crawler_name,
        user_agent.crawler_version,
        user_agent.contact_url,
        user_agent.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_millis(fetch.connect_timeout_ms))
        .timeout(Duration::from_millis(fetch.read_timeout_ms))
        .redirect(Policy::limited(5))
        .https_only(fetch.scheme == "https")
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetch client bound to one scheme and deadline
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    scheme: String,
    deadline: Duration,
}

impl Fetcher {
    pub fn new(fetch: &FetchConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(fetch, user_agent)?,
            scheme: fetch.scheme.clone(),
            deadline: Duration::from_millis(fetch.deadline_ms),
        })
    }

    /// Fetches `path` on `node` and returns its validated JSON payload
    pub async fn get_json(&self, node: &str, path: &str) -> Result<Value, FetchError> {
        let url = endpoint_url(&self.scheme, node, path)
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        self.fetch_json(url).await
    }

    /// Fetches a URL under the hard deadline
    ///
    /// Cancelling on deadline drops only this request's future; sibling
    /// calls are unaffected.
    pub async fn fetch_json(&self, url: Url) -> Result<Value, FetchError> {
        match tokio::time::timeout(self.deadline, self.request(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    async fn request(&self, url: Url) -> Result<Value, FetchError> {
        tracing::trace!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_json_content_type(&content_type) {
            return Err(FetchError::InvalidPayload(format!(
                "unexpected content type '{}'",
                content_type
            )));
        }

        let body = response.bytes().await?;
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| FetchError::InvalidPayload(format!("unparseable body: {}", e)))?;

        if let Some(message) = error_field(&value) {
            return Err(FetchError::InvalidPayload(format!(
                "error from endpoint: {}",
                message
            )));
        }

        Ok(value)
    }
}

/// Returns true for `application/json`, with or without parameters
fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("application/json")
}

/// Extracts the message of an explicit `error` field on an object payload
fn error_field(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    let error = object.get("error")?;

    let message = object
        .get("error_description")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    Some(message)
}
