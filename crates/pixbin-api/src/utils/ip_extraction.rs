//! Client IP extraction for rate limiting.
//!
//! Behind a proxy or load balancer the peer address is the proxy, not the
//! client; the real client address travels in `X-Forwarded-For`. That header is
//! attacker-controlled unless the deployment actually has trusted proxies in
//! front, so extraction validates each candidate and only walks as far up the
//! chain as `trusted_proxy_count` allows.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Extract the client IP for rate-limit keying.
///
/// Resolution order: `X-Forwarded-For` (validated against the trusted proxy
/// count), then `X-Real-IP`, then the peer socket address. Returns "unknown"
/// when nothing usable is present, which collapses such requests into a single
/// rate-limit bucket.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|chain| client_ip_from_chain(chain, trusted_proxy_count))
    {
        return ip.to_string();
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
    {
        return ip.to_string();
    }

    socket_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Pick the client IP out of an `X-Forwarded-For` chain.
///
/// The chain reads `client, proxy1, proxy2, ...` left to right. Only the last
/// `trusted_proxy_count` entries were appended by proxies we control, so the
/// client is the entry just before them. With no trusted proxies the whole
/// header is untrustworthy and only the final entry (set by the nearest hop)
/// is considered.
fn client_ip_from_chain(chain: &str, trusted_proxy_count: usize) -> Option<IpAddr> {
    let entries: Vec<&str> = chain
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let candidate = if trusted_proxy_count == 0 || entries.len() <= trusted_proxy_count {
        entries.last()?
    } else {
        entries.get(entries.len() - trusted_proxy_count - 1)?
    };

    candidate.parse::<IpAddr>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_single_forwarded_ip() {
        assert_eq!(
            client_ip_from_chain("192.168.1.1", 1).map(|ip| ip.to_string()),
            Some("192.168.1.1".to_string())
        );
    }

    #[test]
    fn test_chain_with_one_trusted_proxy() {
        assert_eq!(
            client_ip_from_chain("192.168.1.1, 10.0.0.1", 1).map(|ip| ip.to_string()),
            Some("192.168.1.1".to_string())
        );
    }

    #[test]
    fn test_chain_with_two_trusted_proxies() {
        assert_eq!(
            client_ip_from_chain("192.168.1.1, 10.0.0.1, 10.0.0.2", 2).map(|ip| ip.to_string()),
            Some("192.168.1.1".to_string())
        );
    }

    #[test]
    fn test_untrusted_header_uses_nearest_hop() {
        // A spoofed client entry is ignored when no proxies are trusted
        assert_eq!(
            client_ip_from_chain("1.2.3.4, 10.0.0.1", 0).map(|ip| ip.to_string()),
            Some("10.0.0.1".to_string())
        );
    }

    #[test]
    fn test_invalid_entries_are_rejected() {
        assert_eq!(client_ip_from_chain("not.an.ip", 0), None);
        assert_eq!(client_ip_from_chain("", 1), None);
        assert_eq!(client_ip_from_chain("999.999.999.999", 0), None);
    }

    #[test]
    fn test_fallback_to_real_ip_header() {
        let headers = headers_with("x-real-ip", "203.0.113.9");
        assert_eq!(extract_client_ip(&headers, None, 1), "203.0.113.9");
    }

    #[test]
    fn test_fallback_to_socket_addr() {
        let socket = SocketAddr::from(([127, 0, 0, 1], 8080));
        assert_eq!(
            extract_client_ip(&HeaderMap::new(), Some(&socket), 1),
            "127.0.0.1"
        );
    }

    #[test]
    fn test_fallback_to_unknown() {
        assert_eq!(extract_client_ip(&HeaderMap::new(), None, 1), "unknown");
    }

    #[test]
    fn test_ipv6_addresses_accepted() {
        let headers = headers_with("x-forwarded-for", "2001:db8::1");
        assert_eq!(extract_client_ip(&headers, None, 1), "2001:db8::1");
    }
}
