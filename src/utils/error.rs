//! Error types for the listing pipeline
//!
//! This module defines the error types shared by the fetcher, the listing
//! store and the report writers.

use thiserror::Error;

/// Errors that can occur while fetching ads from the listings API
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered 429
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Non-success status other than 429
    #[error("Server responded with status {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Body is not the JSON shape we expect
    #[error("Decoding error: {0}")]
    Decode(String),

    /// The API reported an error in an otherwise successful response
    #[error("API error: {0}")]
    Api(String),
}

impl FetchError {
    /// Whether the request may succeed if issued again later
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimit | Self::Timeout => true,
            Self::Status(code) => *code >= 500,
            Self::Decode(_) | Self::Api(_) => false,
        }
    }

    /// Whether this is an upstream rate-limit response
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimit)
    }
}

/// Errors raised by listing stores
#[derive(Error, Debug)]
pub enum StoreError {
    /// A listing with this URL is already stored
    #[error("Listing with url {url} already stored")]
    DuplicateUrl { url: String },

    /// A listing with this address and area is already stored
    #[error("Listing at '{address}' with area {area} already stored")]
    DuplicateAddressArea { address: String, area: f64 },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database directory could not be created
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A previous holder of the connection lock panicked
    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Whether the error is a uniqueness violation
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            Self::DuplicateUrl { .. } | Self::DuplicateAddressArea { .. }
        )
    }
}

/// Errors raised while writing reports
#[derive(Error, Debug)]
pub enum ReportError {
    /// Spreadsheet rendering failed
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    /// Map template failed to render
    #[error("Template error: {0}")]
    Template(String),

    /// Report payload could not be serialized
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<handlebars::RenderError> for ReportError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for ReportError {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::Template(err.to_string())
    }
}
