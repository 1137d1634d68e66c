//! HTTP client for the listings API
//!
//! This module wraps the ads API with the pacing the upstream requires:
//! - a fixed pause before every request
//! - one retry after a 429 response, via [`RetryPolicy`]
//! - per-ad decoding, so one malformed ad does not discard the page

use crate::config::ApiConfig;
use crate::crawler::query::AdsQuery;
use crate::models::RawAd;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryPolicy};
use reqwest::{header::ACCEPT, header::HeaderValue, Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Listings API client
pub struct AdsApiClient {
    /// HTTP client with configured timeout
    client: Client,

    /// Endpoint URL
    base_url: String,

    /// Retry applied to rate-limited requests
    retry_policy: RetryPolicy,

    /// Pause before every request
    request_delay: Duration,
}

impl AdsApiClient {
    /// Create a client from API configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        Self::with_settings(
            &config.url,
            config.request_timeout(),
            config.request_delay(),
            RetryPolicy::rate_limit(config.rate_limit_backoff()),
        )
    }

    /// Create a client with explicit pacing, mainly for tests against mock servers
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_settings(
        base_url: &str,
        timeout: Duration,
        request_delay: Duration,
        retry_policy: RetryPolicy,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("realty-scout/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            retry_policy,
            request_delay,
        })
    }

    /// Fetch the ads matching a query
    ///
    /// Sleeps for the configured delay first, then issues the request,
    /// retrying once on a 429 response.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::RateLimit` when the retry is also rate limited,
    /// `FetchError::Api` when the body carries an `error` field, and
    /// other variants for transport, status or decoding failures.
    pub async fn fetch_ads(&self, query: &AdsQuery) -> Result<Vec<RawAd>, FetchError> {
        if !self.request_delay.is_zero() {
            debug!(
                delay_ms = self.request_delay.as_millis() as u64,
                "Waiting before API request"
            );
            tokio::time::sleep(self.request_delay).await;
        }

        let body = with_retry_if(
            &self.retry_policy,
            || self.request(query),
            FetchError::is_rate_limited,
        )
        .await?;

        parse_ads_response(&body)
    }

    /// Issue one GET request and return the decoded JSON body
    async fn request(&self, query: &AdsQuery) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .query(&query.to_params())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Http(e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimit);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// Decode an API response body into ads
///
/// An `error` field means the request failed even with a 200 status. Items
/// that are not JSON objects are skipped with a warning; mistyped fields
/// inside an ad do not drop the ad.
pub fn parse_ads_response(body: &Value) -> Result<Vec<RawAd>, FetchError> {
    let Some(object) = body.as_object() else {
        return Err(FetchError::Decode("response is not a JSON object".into()));
    };

    if let Some(error) = object.get("error") {
        let message = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(FetchError::Api(message));
    }

    let items = match object.get("data") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(_) => return Err(FetchError::Decode("'data' is not an array".into())),
    };

    let ads = items
        .iter()
        .filter_map(|item| match serde_json::from_value::<RawAd>(item.clone()) {
            Ok(ad) => Some(ad),
            Err(e) => {
                let url = item.get("url").and_then(Value::as_str).unwrap_or_default();
                warn!(url = %url, error = %e, "Skipping malformed ad");
                None
            }
        })
        .collect();

    Ok(ads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_data_array() {
        let ads = parse_ads_response(&json!({
            "code": 200,
            "data": [
                {"url": "https://example.com/1", "address": "Адрес 1"},
                {"url": "https://example.com/2", "address": "Адрес 2", "params": []}
            ]
        }))
        .unwrap();

        assert_eq!(ads.len(), 2);
        assert_eq!(ads[1].url.as_deref(), Some("https://example.com/2"));
    }

    #[test]
    fn test_parse_error_field() {
        let result = parse_ads_response(&json!({"error": "Неверный токен"}));
        assert!(matches!(result, Err(FetchError::Api(msg)) if msg == "Неверный токен"));
    }

    #[test]
    fn test_parse_missing_data_is_empty() {
        assert!(parse_ads_response(&json!({"code": 200})).unwrap().is_empty());
        assert!(parse_ads_response(&json!({"data": null})).unwrap().is_empty());
    }

    #[test]
    fn test_parse_skips_non_object_ads() {
        let ads = parse_ads_response(&json!({
            "data": [
                {"url": "https://example.com/ok", "title": "ok"},
                "not an object",
                7
            ]
        }))
        .unwrap();

        assert_eq!(ads.len(), 1);
        assert_eq!(ads[0].title.as_deref(), Some("ok"));
    }

    #[test]
    fn test_parse_keeps_ads_with_mistyped_text() {
        let ads = parse_ads_response(&json!({
            "data": [
                {"url": "https://e/1", "title": 5, "coords": {"lat": 59.93, "lng": 30.31}},
                {"url": 42, "address": {"street": "Невский"}}
            ]
        }))
        .unwrap();

        assert_eq!(ads.len(), 2);
        assert_eq!(ads[0].title.as_deref(), Some("5"));
        assert!(ads[0].coordinates().is_some());
        assert_eq!(ads[1].url.as_deref(), Some("42"));
        assert_eq!(ads[1].address, None);
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            parse_ads_response(&json!([1, 2])),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            parse_ads_response(&json!({"data": "nope"})),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_client_creation() {
        let client = AdsApiClient::with_settings(
            "http://localhost:8080",
            Duration::from_secs(5),
            Duration::ZERO,
            RetryPolicy::none(),
        );
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url, "http://localhost:8080");
    }
}
