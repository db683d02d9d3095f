use url::Url;

/// Normalizes a candidate node name
///
/// Trims whitespace, drops a trailing dot and lowercases. Returns `None`
/// for names that cannot address a node: empty strings, obfuscated block
/// entries containing `*`, and anything that carries more than `host[:port]`
/// when read as `https://<name>/`. Internationalized names come back in
/// their ASCII (punycode) form.
///
/// # Examples
///
/// ```
/// use fedimap::url::normalize_node_name;
///
/// assert_eq!(normalize_node_name(" Mastodon.Social. "), Some("mastodon.social".to_string()));
/// assert_eq!(normalize_node_name("mastodon.so*ial"), None);
/// assert_eq!(normalize_node_name("example.com/path"), None);
/// ```
pub fn normalize_node_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    let name = trimmed.to_lowercase();

    if name.is_empty() || name.contains('*') || name.chars().any(char::is_whitespace) {
        return None;
    }

    let url = Url::parse(&format!("https://{}/", name)).ok()?;
    let host = url.host_str()?;
    let rebuilt = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    if url.path() != "/"
        || url.query().is_some()
        || url.fragment().is_some()
        || !url.username().is_empty()
        || url.password().is_some()
    {
        return None;
    }

    Some(rebuilt)
}
