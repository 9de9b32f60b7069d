/// Hostname extraction for matching tabs against host configurations
use url::Url;

/// Extract the hostname from a tab URL
///
/// Mirrors what `new URL(url).hostname` gives a content script:
/// - https://www.google.com/search → www.google.com
/// - http://localhost:3000 → localhost
/// - https://[::1]:8080 → [::1]
///
/// Returns `None` for empty or unparsable URLs and for URLs that carry no
/// host at all (about:blank, data:, file:///...).
pub fn extract_hostname(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();

    if host.is_empty() { None } else { Some(host) }
}

/// Match pattern selecting every tab of a hostname, for `tabs.query({ url })`
pub fn url_match_pattern(host_name: &str) -> String {
    format!("*://{}/*", host_name)
}
