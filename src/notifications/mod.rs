//! Report delivery
//!
//! After each region is processed the job hands a [`Notification`] to a
//! [`Notifier`]. Either the region has new listings and both report files are
//! attached, or the recipient is told nothing new was found.
//!
//! ```text
//!   ┌─────────────┐      ┌──────────────┐      ┌────────────┐
//!   │  region job │ ───▶ │ Notification │ ───▶ │  Notifier  │
//!   └─────────────┘      └──────────────┘      └────────────┘
//!                                                    │
//!                                              ┌───────────┐
//!                                              │   Email   │
//!                                              └───────────┘
//! ```

pub mod email;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub use email::EmailNotifier;

/// Result type for notifier operations
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors that can occur while delivering a notification
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Sender or recipient is not a valid mailbox
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Message could not be assembled
    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    /// SMTP connection, authentication or delivery failed
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// An attachment could not be read
    #[error("Failed to read attachment: {0}")]
    Attachment(#[from] std::io::Error),

    /// Invalid notifier configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// What to tell the recipient about one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// New listings were found and both reports exist
    Reports {
        region: String,
        date: NaiveDate,
        spreadsheet: PathBuf,
        map: PathBuf,
    },

    /// Nothing new for the region
    NoNewListings { region: String, date: NaiveDate },
}

impl Notification {
    /// Region the notification is about
    pub fn region(&self) -> &str {
        match self {
            Self::Reports { region, .. } | Self::NoNewListings { region, .. } => region,
        }
    }

    /// Message subject
    pub fn subject(&self) -> String {
        match self {
            Self::Reports { region, date, .. } => format!(
                "Новые объекты недвижимости - {region} - {}",
                date.format("%d.%m.%Y")
            ),
            Self::NoNewListings { region, date } => format!(
                "Отчет по недвижимости за {} ({region}): новых объявлений нет",
                date.format("%d.%m.%Y")
            ),
        }
    }
}

/// Receipt for a delivered notification; failures are `Err` values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatus {
    /// Notifier that handled the notification
    pub channel: String,
    /// Optional detail about the delivery
    pub message: Option<String>,
    /// Timestamp of the delivery attempt
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl DeliveryStatus {
    /// Create a successful delivery status
    pub fn success(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            message: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create a successful delivery status with a message
    pub fn success_with_message(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(channel)
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[SENT] {}", self.channel)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

/// Delivery channel for notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name used in logs
    fn name(&self) -> &str;

    /// Deliver one notification
    async fn send(&self, notification: &Notification) -> NotifyResult<DeliveryStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 9).unwrap()
    }

    #[test]
    fn test_reports_subject() {
        let n = Notification::Reports {
            region: "Санкт-Петербург".into(),
            date: date(),
            spreadsheet: PathBuf::from("a.xlsx"),
            map: PathBuf::from("a.html"),
        };
        assert_eq!(
            n.subject(),
            "Новые объекты недвижимости - Санкт-Петербург - 09.05.2024"
        );
        assert_eq!(n.region(), "Санкт-Петербург");
    }

    #[test]
    fn test_no_new_listings_subject() {
        let n = Notification::NoNewListings {
            region: "Ленинградская область".into(),
            date: date(),
        };
        assert_eq!(
            n.subject(),
            "Отчет по недвижимости за 09.05.2024 (Ленинградская область): новых объявлений нет"
        );
    }

    #[test]
    fn test_delivery_status_display() {
        let status = DeliveryStatus::success_with_message("email", "Sent to a@b.c");
        assert_eq!(status.to_string(), "[SENT] email: Sent to a@b.c");
        assert_eq!(DeliveryStatus::success("email").to_string(), "[SENT] email");
    }
}
