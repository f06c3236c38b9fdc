//! Proxy-related error classification.

/// Generic network/timeout substrings that only count as proxy-related when
/// a proxy was actually in use for the attempt.
const GENERIC_PROXY_PATTERNS: &[&str] = &[
    "connection refused",
    "no such host",
    "context deadline exceeded",
    "i/o timeout",
    "unexpected eof",
    "connection reset by peer",
    "tls handshake timeout",
];

/// Substrings that always indicate a proxy-layer failure regardless of
/// whether the caller knows a proxy was in use.
const EXPLICIT_PROXY_PATTERNS: &[&str] = &["proxyconnect", "http: proxy error", "socks connect"];

/// Whether an error message should be attributed to the proxy rather than
/// the upstream target.
#[must_use]
pub fn is_proxy_related_error(message: &str, address: &str, proxy_used: bool) -> bool {
    let lower = message.to_ascii_lowercase();

    if EXPLICIT_PROXY_PATTERNS.iter().any(|pattern| lower.contains(pattern)) {
        return true;
    }

    if !address.is_empty() && lower.contains(&address.to_ascii_lowercase()) {
        return true;
    }

    proxy_used && GENERIC_PROXY_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}
