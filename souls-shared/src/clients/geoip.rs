use reqwest::Client;
use serde::Deserialize;

/// Best-effort result of an ipinfo.io lookup. Any failure along the
/// way leaves every field at "Unknown".
#[derive(Debug, Clone, Deserialize)]
pub struct GeoInfo {
    #[serde(default = "unknown")]
    pub country: String,
    #[serde(default = "unknown")]
    pub region: String,
    #[serde(default = "unknown")]
    pub city: String,
    #[serde(default = "unknown")]
    pub org: String,
}

fn unknown() -> String {
    "Unknown".to_string()
}

impl Default for GeoInfo {
    fn default() -> Self {
        Self {
            country: unknown(),
            region: unknown(),
            city: unknown(),
            org: unknown(),
        }
    }
}

#[derive(Clone)]
pub struct GeoIpClient {
    client: Client,
    base_url: String,
}

impl GeoIpClient {
    pub fn new() -> Self {
        Self::with_base_url("https://ipinfo.io")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Look up the country/region/city/org for an IP address.
    /// Never fails the caller: timeouts, HTTP errors, and malformed
    /// bodies all collapse to the "Unknown" placeholder.
    pub async fn lookup(&self, ip: &str) -> GeoInfo {
        let url = format!("{}/{}/json", self.base_url, ip);
        let result = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await;

        match result {
            Ok(response) => match response.json::<GeoInfo>().await {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!(ip = %ip, error = %e, "geoip response parse failed");
                    GeoInfo::default()
                }
            },
            Err(e) => {
                tracing::warn!(ip = %ip, error = %e, "geoip lookup failed");
                GeoInfo::default()
            }
        }
    }
}

impl Default for GeoIpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_unknown() {
        let info: GeoInfo = serde_json::from_str(r#"{"country": "RW"}"#).unwrap();
        assert_eq!(info.country, "RW");
        assert_eq!(info.region, "Unknown");
        assert_eq!(info.city, "Unknown");
        assert_eq!(info.org, "Unknown");
    }

    #[test]
    fn full_payload_parses() {
        let body = r#"{"country":"RW","region":"Kigali City","city":"Kigali","org":"AS12345 Example ISP","ip":"203.0.113.9"}"#;
        let info: GeoInfo = serde_json::from_str(body).unwrap();
        assert_eq!(info.region, "Kigali City");
        assert_eq!(info.org, "AS12345 Example ISP");
    }

    #[test]
    fn default_is_all_unknown() {
        let info = GeoInfo::default();
        assert_eq!(info.country, "Unknown");
        assert_eq!(info.org, "Unknown");
    }

    #[tokio::test]
    async fn unreachable_host_collapses_to_unknown() {
        let client = GeoIpClient::with_base_url("http://127.0.0.1:1");
        let info = client.lookup("203.0.113.9").await;
        assert_eq!(info.country, "Unknown");
    }
}
