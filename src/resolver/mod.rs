//! Geolocation resolution boundary.

pub mod ipwhois;

use crate::schema::AttributeBag;
use async_trait::async_trait;

/// Error from a geolocation resolver.
///
/// Transport failures (`Http`, `Timeout`, `RateLimited`) are kept distinct
/// from "the service answered but has no data for this IP" (`NotFound`).
#[derive(Debug)]
pub enum ResolutionError {
    /// HTTP request failed.
    Http(reqwest::Error),
    /// Timeout.
    Timeout,
    /// Rate limited by the lookup service.
    RateLimited,
    /// The service has no data for this IP.
    NotFound(String),
    /// Invalid or unparseable response.
    InvalidResponse(String),
    /// Other error.
    Other(String),
}

impl std::fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionError::Http(e) => write!(f, "HTTP error: {}", e),
            ResolutionError::Timeout => write!(f, "Request timed out"),
            ResolutionError::RateLimited => write!(f, "Rate limited"),
            ResolutionError::NotFound(msg) => write!(f, "No data for IP: {}", msg),
            ResolutionError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            ResolutionError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ResolutionError {}

impl From<reqwest::Error> for ResolutionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ResolutionError::Timeout
        } else {
            ResolutionError::Http(e)
        }
    }
}

/// Trait for geolocation resolvers.
///
/// Given an IP address, a resolver produces the attribute bag the scoring
/// engine evaluates rules against. Dropping the returned future cancels an
/// in-flight lookup; any timeout is the resolver's own configuration.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    /// Resolve the geolocation attributes of an IP address.
    async fn resolve(&self, ip: &str) -> Result<AttributeBag, ResolutionError>;

    /// Resolver name for logging.
    fn name(&self) -> &str;
}
