//! Unified error handling for the realty-scout crate
//!
//! Each concern keeps its own error type; [`Error`] wraps them all so the
//! binary and library callers can handle one type across module boundaries.
//! [`JobRunner::from_config`](crate::crawler::pipeline::JobRunner::from_config)
//! returns it, and the pipeline labels notification failures with its
//! category.
//!
//! # Architecture
//!
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use realty_scout::error::Error;
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Will retry on the next run: {err}");
//!     } else {
//!         eprintln!("Fatal error: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::config::ConfigError;
pub use crate::notifications::NotifyError;
pub use crate::scheduler::error::SchedulerError;
pub use crate::utils::error::{FetchError, ReportError, StoreError};

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Listings API and geocoder (HTTP, timeout, rate limit)
    Network,
    /// Listing store
    Storage,
    /// Spreadsheet and map generation
    Report,
    /// Email delivery
    Notification,
    /// Configuration and validation errors
    Config,
    /// Scheduler and timing errors
    Scheduler,
}

impl ErrorCategory {
    /// Short label used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Storage => "storage",
            Self::Report => "report",
            Self::Notification => "notification",
            Self::Config => "config",
            Self::Scheduler => "scheduler",
        }
    }
}

/// Unified error type for the realty-scout crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Check if this error is recoverable (a later run may succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Fetch(e) => e.is_recoverable(),
            Self::Store(e) => e.is_duplicate(),
            Self::Report(_) => true,
            Self::Notify(e) => matches!(e, NotifyError::Smtp(_)),
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Io(_) => true, // I/O errors are often transient
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Config,
            Self::Fetch(_) => ErrorCategory::Network,
            Self::Store(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Report(_) => ErrorCategory::Report,
            Self::Notify(NotifyError::InvalidConfig(_)) => ErrorCategory::Config,
            Self::Notify(_) => ErrorCategory::Notification,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
