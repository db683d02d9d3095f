use serde::Deserialize;

/// Main configuration structure for Fedimap
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawl driver behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of frontier nodes pulled per round
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Number of nodes processed concurrently within a round (1 = sequential)
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Node names inserted when the store is empty
    #[serde(default = "default_seeds")]
    pub seeds: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            seeds: default_seeds(),
        }
    }
}

/// Fetch client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// URL scheme used to reach nodes ("https", or "http" for local testing)
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// TCP connect timeout (milliseconds)
    #[serde(rename = "connect-timeout-ms", default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Total request timeout set on the HTTP client (milliseconds)
    ///
    /// Covers connect, headers and body together.
    #[serde(rename = "read-timeout-ms", default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Absolute wall-clock deadline for a single call (milliseconds)
    #[serde(rename = "deadline-ms", default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            deadline_ms: default_deadline_ms(),
        }
    }
}

/// Target protocol configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    /// Key looked up in `api_versions`, and substring looked for in `source_url`
    #[serde(default = "default_protocol_name")]
    pub name: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            name: default_protocol_name(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the adjacency list written by the edge materializer
    #[serde(rename = "edges-path")]
    pub edges_path: String,
}

fn default_batch_size() -> u32 {
    1000
}

fn default_concurrency() -> u32 {
    1
}

fn default_seeds() -> Vec<String> {
    [
        "mastodon.social",
        "fosstodon.org",
        "mstdn.social",
        "pawoo.net",
        "mastodon.online",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_read_timeout_ms() -> u64 {
    10_000
}

fn default_deadline_ms() -> u64 {
    10_000
}

fn default_protocol_name() -> String {
    "mastodon".to_string()
}
