//! SMTP email notifier
//!
//! Connects with STARTTLS and authenticates with the sender's credentials.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;
use tracing::info;

use crate::config::EmailConfig;

use super::{DeliveryStatus, Notification, Notifier, NotifyError, NotifyResult};

/// Body of the "nothing new" message
pub const NO_NEW_LISTINGS_TEXT: &str =
    "На данный момент нет новых объявлений, соответствующих вашим критериям.";

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Email notifier over SMTP
pub struct EmailNotifier {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    /// Create a notifier; no connection is made until the first send
    pub fn new(config: EmailConfig) -> NotifyResult<Self> {
        if config.sender.trim().is_empty() || config.recipient.trim().is_empty() {
            return Err(NotifyError::InvalidConfig(
                "email.sender and email.recipient must be set".into(),
            ));
        }

        let credentials = Credentials::new(config.sender.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self { config, transport })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, notification: &Notification) -> NotifyResult<DeliveryStatus> {
        let message = build_message(&self.config, notification).await?;

        info!(
            server = %self.config.smtp_server,
            port = self.config.smtp_port,
            region = %notification.region(),
            "Sending email"
        );
        self.transport.send(message).await?;

        Ok(DeliveryStatus::success_with_message(
            self.name(),
            format!("Sent to {}", self.config.recipient),
        ))
    }
}

/// Assemble the message for a notification
pub async fn build_message(config: &EmailConfig, notification: &Notification) -> NotifyResult<Message> {
    let from: Mailbox = config.sender.parse()?;
    let to: Mailbox = config.recipient.parse()?;
    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(notification.subject());

    let message = match notification {
        Notification::NoNewListings { .. } => builder
            .header(ContentType::TEXT_PLAIN)
            .body(NO_NEW_LISTINGS_TEXT.to_string())?,
        Notification::Reports {
            spreadsheet, map, ..
        } => {
            let xlsx_type = ContentType::parse(XLSX_CONTENT_TYPE)
                .map_err(|e| NotifyError::InvalidConfig(e.to_string()))?;

            builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::html(reports_body(map)))
                    .singlepart(attachment(spreadsheet, xlsx_type).await?)
                    .singlepart(attachment(map, ContentType::TEXT_HTML).await?),
            )?
        }
    };

    Ok(message)
}

/// HTML body accompanying the report attachments
pub fn reports_body(map: &Path) -> String {
    let map_name = file_name(map);
    format!(
        "<html>\n<body>\n\
         <p>Здравствуйте!</p>\n\
         <p>Найдены новые объявления о продаже недвижимости.</p>\n\
         <p>Отчет с детальной информацией (Excel) и интерактивная карта (HTML) приложены к этому письму.</p>\n\
         <p>Для просмотра карты скачайте приложенный файл <b>{map_name}</b> и откройте его в браузере.</p>\n\
         <br>\n\
         <p>С уважением,<br>realty-scout</p>\n\
         </body>\n</html>\n"
    )
}

async fn attachment(path: &Path, content_type: ContentType) -> NotifyResult<SinglePart> {
    let bytes = tokio::fs::read(path).await?;
    Ok(Attachment::new(file_name(path)).body(bytes, content_type))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_server: "smtp.example.com".into(),
            smtp_port: 587,
            sender: "robot@example.com".into(),
            password: "secret".into(),
            recipient: "owner@example.com".into(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 9).unwrap()
    }

    #[tokio::test]
    async fn test_no_new_listings_message_is_plain_text() {
        let message = build_message(
            &config(),
            &Notification::NoNewListings {
                region: "Spb".into(),
                date: date(),
            },
        )
        .await
        .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Content-Type: text/plain"));
        assert!(raw.contains("To: owner@example.com"));
        assert!(!raw.contains("multipart"));
    }

    #[tokio::test]
    async fn test_reports_message_has_two_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let spreadsheet = dir.path().join("report.xlsx");
        let map = dir.path().join("map.html");
        std::fs::write(&spreadsheet, b"xlsx-bytes").unwrap();
        std::fs::write(&map, b"<html></html>").unwrap();

        let message = build_message(
            &config(),
            &Notification::Reports {
                region: "Spb".into(),
                date: date(),
                spreadsheet,
                map,
            },
        )
        .await
        .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("multipart/mixed"));
        assert_eq!(raw.matches("Content-Disposition: attachment").count(), 2);
        assert!(raw.contains("report.xlsx"));
        assert!(raw.contains("map.html"));
    }

    #[tokio::test]
    async fn test_missing_attachment_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = build_message(
            &config(),
            &Notification::Reports {
                region: "Spb".into(),
                date: date(),
                spreadsheet: dir.path().join("missing.xlsx"),
                map: dir.path().join("missing.html"),
            },
        )
        .await;

        assert!(matches!(result, Err(NotifyError::Attachment(_))));
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let mut config = config();
        config.recipient = "not an address".into();
        let result = build_message(
            &config,
            &Notification::NoNewListings {
                region: "Spb".into(),
                date: date(),
            },
        )
        .await;

        assert!(matches!(result, Err(NotifyError::Address(_))));
    }

    #[test]
    fn test_notifier_requires_addresses() {
        let mut config = config();
        config.sender.clear();
        assert!(matches!(
            EmailNotifier::new(config),
            Err(NotifyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_reports_body_names_map_file() {
        let body = reports_body(Path::new("/tmp/reports/realty_map_spb.html"));
        assert!(body.contains("<b>realty_map_spb.html</b>"));
    }
}
