//! Address geocoding for map markers
//!
//! Talks to a Nominatim-compatible `/search` endpoint. Public Nominatim
//! allows at most one request per second, so requests pass through a
//! `governor` rate limiter replenishing one cell per `min_interval`.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::ReportConfig;
use crate::models::{parse_decimal, Coordinates};
use crate::utils::error::FetchError;

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Rate-limited geocoding client
pub struct Geocoder {
    client: Client,
    endpoint: String,
    /// `None` when `min_interval` is zero
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl Geocoder {
    /// Create a geocoder from report configuration
    pub fn new(config: &ReportConfig) -> Result<Self, FetchError> {
        Self::with_settings(&config.geocoder_url, &config.user_agent, Duration::from_secs(1))
    }

    /// Create a geocoder with an explicit endpoint and request spacing
    ///
    /// A zero `min_interval` disables rate limiting.
    pub fn with_settings(
        endpoint: &str,
        user_agent: &str,
        min_interval: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            rate_limiter: Quota::with_period(min_interval).map(RateLimiter::direct),
        })
    }

    /// Resolve an address to coordinates; `Ok(None)` when nothing matches
    pub async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, FetchError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        debug!(address = %address, "Geocoding address");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimit);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let places: Vec<Place> =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(places.first().and_then(|place| {
            let lat = parse_decimal(&place.lat)?;
            let lon = parse_decimal(&place.lon)?;
            Some(Coordinates { lat, lon })
        }))
    }
}
