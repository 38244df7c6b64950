//! ipwho.is geolocation resolver.

use super::{GeoResolver, ResolutionError};
use crate::config::ResolverConfig;
use crate::schema::{Attribute, AttributeBag};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// ipwho.is API response.
///
/// Lookup failures are reported in-band: `success` is false and `message`
/// carries the reason.
#[derive(Debug, Deserialize)]
struct IpWhoisResponse {
    #[serde(default)]
    success: bool,

    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    continent: Option<String>,
    #[serde(default)]
    continent_code: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    region_code: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    is_eu: Option<bool>,
    #[serde(default)]
    postal: Option<String>,
    #[serde(default)]
    calling_code: Option<String>,
    #[serde(default)]
    capital: Option<String>,
    #[serde(default)]
    borders: Option<String>,

    #[serde(default)]
    flag: Option<FlagData>,

    #[serde(default)]
    connection: Option<ConnectionData>,

    #[serde(default)]
    timezone: Option<TimezoneData>,
}

#[derive(Debug, Default, Deserialize)]
struct FlagData {
    #[serde(default)]
    emoji: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConnectionData {
    #[serde(default)]
    asn: Option<u32>,
    #[serde(default)]
    org: Option<String>,
    #[serde(default)]
    isp: Option<String>,
    #[serde(default)]
    domain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TimezoneData {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    abbr: Option<String>,
    #[serde(default)]
    is_dst: Option<bool>,
    #[serde(default)]
    offset: Option<i64>,
    #[serde(default)]
    utc: Option<String>,
    #[serde(default)]
    current_time: Option<String>,
}

impl IpWhoisResponse {
    /// Flatten the nested response into an attribute bag.
    ///
    /// Attributes the service did not report are left out of the bag;
    /// non-string scalars are stringified since bag values are strings.
    fn into_bag(self) -> AttributeBag {
        let mut bag = AttributeBag::new();

        let mut put = |attr: Attribute, value: Option<String>| {
            if let Some(v) = value {
                bag.insert(attr, v);
            }
        };

        put(Attribute::Country, self.country);
        put(Attribute::CountryCode, self.country_code);
        put(Attribute::City, self.city);
        put(Attribute::Continent, self.continent);
        put(Attribute::ContinentCode, self.continent_code);
        put(Attribute::Region, self.region);
        put(Attribute::RegionCode, self.region_code);
        put(Attribute::Latitude, self.latitude.map(|v| v.to_string()));
        put(Attribute::Longitude, self.longitude.map(|v| v.to_string()));
        put(Attribute::IsEu, self.is_eu.map(|v| v.to_string()));
        put(Attribute::Postal, self.postal);
        put(Attribute::CallingCode, self.calling_code);
        put(Attribute::Capital, self.capital);
        put(Attribute::Borders, self.borders);

        let flag = self.flag.unwrap_or_default();
        put(Attribute::CountryFlag, flag.emoji);

        let connection = self.connection.unwrap_or_default();
        put(Attribute::Asn, connection.asn.map(|v| v.to_string()));
        put(Attribute::Org, connection.org);
        put(Attribute::Isp, connection.isp);
        put(Attribute::Domain, connection.domain);

        let timezone = self.timezone.unwrap_or_default();
        put(Attribute::TimezoneId, timezone.id);
        put(Attribute::TimezoneAbbr, timezone.abbr);
        put(
            Attribute::TimezoneIsDst,
            timezone.is_dst.map(|v| v.to_string()),
        );
        put(
            Attribute::TimezoneOffset,
            timezone.offset.map(|v| v.to_string()),
        );
        put(Attribute::TimezoneUtc, timezone.utc);
        put(Attribute::CurrentTime, timezone.current_time);

        bag
    }
}

/// Geolocation resolver backed by the ipwho.is lookup API.
pub struct IpWhoisResolver {
    config: ResolverConfig,
    client: Client,
}

impl IpWhoisResolver {
    /// Create a new ipwho.is resolver.
    pub fn new(config: ResolverConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn lookup_url(&self, ip: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), ip)
    }
}

#[async_trait]
impl GeoResolver for IpWhoisResolver {
    async fn resolve(&self, ip: &str) -> Result<AttributeBag, ResolutionError> {
        let url = self.lookup_url(ip);

        debug!(ip = %ip, "Querying ipwho.is");

        let response = self.client.get(&url).send().await?;

        // Check for rate limiting
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("ipwho.is rate limit exceeded");
            return Err(ResolutionError::RateLimited);
        }

        // Check for other errors
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ResolutionError::InvalidResponse(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        // Parse response
        let api_response: IpWhoisResponse = response.json().await.map_err(|e| {
            ResolutionError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        // Lookup failures are reported in-band with success: false
        if !api_response.success {
            let message = api_response
                .message
                .unwrap_or_else(|| format!("no data for {}", ip));
            return Err(ResolutionError::NotFound(message));
        }

        let bag = api_response.into_bag();

        debug!(
            ip = %ip,
            attributes = bag.len(),
            "ipwho.is lookup complete"
        );

        Ok(bag)
    }

    fn name(&self) -> &str {
        "ipwhois"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "ip": "8.8.8.8",
        "success": true,
        "type": "IPv4",
        "continent": "North America",
        "continent_code": "NA",
        "country": "United States",
        "country_code": "US",
        "region": "California",
        "region_code": "CA",
        "city": "Mountain View",
        "latitude": 37.3860517,
        "longitude": -122.0838511,
        "is_eu": false,
        "postal": "94039",
        "calling_code": "1",
        "capital": "Washington D.C.",
        "borders": "CA,MX",
        "flag": { "emoji": "🇺🇸" },
        "connection": {
            "asn": 15169,
            "org": "Google LLC",
            "isp": "Google LLC",
            "domain": "google.com"
        },
        "timezone": {
            "id": "America/Los_Angeles",
            "abbr": "PDT",
            "is_dst": true,
            "offset": -25200,
            "utc": "-07:00",
            "current_time": "2024-05-01T12:00:00-07:00"
        }
    }"#;

    #[test]
    fn test_parse_and_flatten_response() {
        let response: IpWhoisResponse = serde_json::from_str(SAMPLE_RESPONSE).unwrap();
        assert!(response.success);

        let bag = response.into_bag();
        assert_eq!(bag.get(Attribute::Country), Some("United States"));
        assert_eq!(bag.get(Attribute::CountryCode), Some("US"));
        assert_eq!(bag.get(Attribute::City), Some("Mountain View"));
        assert_eq!(bag.get(Attribute::Asn), Some("15169"));
        assert_eq!(bag.get(Attribute::Isp), Some("Google LLC"));
        assert_eq!(bag.get(Attribute::TimezoneId), Some("America/Los_Angeles"));
        assert_eq!(bag.get(Attribute::TimezoneOffset), Some("-25200"));
        assert_eq!(bag.get(Attribute::IsEu), Some("false"));
        assert_eq!(bag.get(Attribute::Latitude), Some("37.3860517"));
    }

    #[test]
    fn test_parse_failure_response() {
        let json = r#"{ "ip": "127.0.0.1", "success": false, "message": "Reserved range" }"#;
        let response: IpWhoisResponse = serde_json::from_str(json).unwrap();
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Reserved range"));
    }

    #[test]
    fn test_parse_sparse_response() {
        // Only some fields present; absent ones stay out of the bag
        let json = r#"{ "success": true, "country": "France", "country_code": "FR" }"#;
        let response: IpWhoisResponse = serde_json::from_str(json).unwrap();

        let bag = response.into_bag();
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get(Attribute::Country), Some("France"));
        assert!(bag.get(Attribute::City).is_none());
    }

    #[test]
    fn test_lookup_url() {
        let resolver = IpWhoisResolver::new(ResolverConfig {
            base_url: "http://ipwho.is/".to_string(),
            timeout_ms: 1000,
        });
        assert_eq!(resolver.lookup_url("8.8.8.8"), "http://ipwho.is/8.8.8.8");
    }

    #[test]
    fn test_resolver_name() {
        let resolver = IpWhoisResolver::new(ResolverConfig::default());
        assert_eq!(resolver.name(), "ipwhois");
    }
}
