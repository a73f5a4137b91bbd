use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Request metadata captured when a wrong profile code is entered.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
    pub language: String,
}

impl RequestMeta {
    /// Proxy headers win; unproxied requests fall back to the peer
    /// socket address.
    pub fn capture(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let ip = client_ip(headers)
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| "Unknown IP".to_string());
        Self {
            ip,
            user_agent: header_or(headers, "user-agent", "Unknown UA"),
            referer: header_or(headers, "referer", "Unknown referer"),
            language: header_or(headers, "accept-language", "Unknown language"),
        }
    }

    /// Whether the IP is worth a geolocation lookup.
    pub fn has_ip(&self) -> bool {
        self.ip != "Unknown IP"
    }
}

fn header_or(headers: &HeaderMap, name: &str, fallback: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(fallback)
        .to_string()
}

/// Client IP as seen through a proxy: first entry of `X-Forwarded-For`,
/// falling back to `X-Real-IP`.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return Some(ip.to_string());
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers).unwrap(), "203.0.113.9");
    }

    #[test]
    fn real_ip_is_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.4".parse().unwrap());
        assert_eq!(client_ip(&headers).unwrap(), "198.51.100.4");
    }

    #[test]
    fn no_headers_no_peer_no_ip() {
        let headers = HeaderMap::new();
        assert!(client_ip(&headers).is_none());
        let meta = RequestMeta::capture(&headers, None);
        assert_eq!(meta.ip, "Unknown IP");
        assert!(!meta.has_ip());
    }

    #[test]
    fn socket_address_backfills_unproxied_requests() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "192.0.2.7:51442".parse().unwrap();
        let meta = RequestMeta::capture(&headers, Some(peer));
        assert_eq!(meta.ip, "192.0.2.7");
        assert!(meta.has_ip());
    }

    #[test]
    fn forwarded_header_beats_socket_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9".parse().unwrap());
        let peer: SocketAddr = "10.0.0.1:40000".parse().unwrap();
        let meta = RequestMeta::capture(&headers, Some(peer));
        assert_eq!(meta.ip, "203.0.113.9");
    }

    #[test]
    fn meta_reads_browser_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", "Mozilla/5.0".parse().unwrap());
        headers.insert("accept-language", "en-US,en;q=0.9".parse().unwrap());
        let meta = RequestMeta::capture(&headers, None);
        assert_eq!(meta.user_agent, "Mozilla/5.0");
        assert_eq!(meta.language, "en-US,en;q=0.9");
        assert_eq!(meta.referer, "Unknown referer");
    }
}
