//! Job pipeline
//!
//! One job walks the configured regions in order:
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────┐    ┌──────────────┐
//! │ fetch region │───▶│ dedup/persist│───▶│ reports  │───▶│ notification │
//! └──────────────┘    └──────────────┘    └──────────┘    └──────────────┘
//! ```
//!
//! Failures are contained per region: a report or delivery error is logged
//! and the next region still runs.

use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, RegionConfig};
use crate::error::Error;
use crate::models::{CanonicalListing, CrawlStats};
use crate::notifications::{EmailNotifier, Notification, Notifier};
use crate::report::{ReportSet, ReportWriter};
use crate::storage::{self, ListingRepository, SharedListingRepository};

use super::{AdsApiClient, AdsSource, Crawler};

/// Outcome of one region within a job
#[derive(Debug, Clone, Default)]
pub struct RegionOutcome {
    pub region: String,
    pub stats: CrawlStats,

    /// Listings stored for the first time by this job
    pub new_listings: usize,

    pub reports: ReportSet,

    /// A notification was delivered for the region
    pub notified: bool,
}

/// Per-region summary of a job
#[derive(Debug, Clone, Default)]
pub struct JobSummary {
    pub regions: Vec<RegionOutcome>,
}

impl JobSummary {
    /// New listings across all regions
    pub fn total_new(&self) -> usize {
        self.regions.iter().map(|r| r.new_listings).sum()
    }

    /// Aggregated crawl statistics
    pub fn stats(&self) -> CrawlStats {
        let mut total = CrawlStats::default();
        for region in &self.regions {
            total.merge(&region.stats);
        }
        total
    }
}

/// Store listings not seen before and return them in input order
///
/// A listing whose (address, area) is already stored is skipped. Insert
/// failures, including url collisions, exclude only that listing.
pub fn persist_new_listings(
    store: &dyn ListingRepository,
    listings: Vec<CanonicalListing>,
) -> Vec<CanonicalListing> {
    let mut fresh = Vec::new();

    for listing in listings {
        match store.exists(&listing.address, listing.area) {
            Ok(true) => {
                debug!(url = %listing.url, address = %listing.address, "Already known");
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(url = %listing.url, error = %e, "Lookup failed, skipping listing");
                continue;
            }
        }

        match store.insert(&listing) {
            Ok(stored) => {
                debug!(id = stored.id, url = %listing.url, "New listing stored");
                fresh.push(listing);
            }
            Err(e) if e.is_duplicate() => {
                debug!(url = %listing.url, reason = %e, "Duplicate listing skipped");
            }
            Err(e) => {
                warn!(url = %listing.url, error = %e, "Failed to store listing");
            }
        }
    }

    fresh
}

/// Runs the full fetch, persist, report and notify sequence
pub struct JobRunner {
    config: Arc<Config>,
    crawler: Crawler,
    store: SharedListingRepository,
    reports: ReportWriter,
    notifier: Option<Arc<dyn Notifier>>,
}

impl JobRunner {
    /// Assemble a runner; without a notifier results are only logged
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn AdsSource>,
        store: SharedListingRepository,
        reports: ReportWriter,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let crawler = Crawler::new(config.clone(), source);
        Self {
            config,
            crawler,
            store,
            reports,
            notifier,
        }
    }

    /// Wire the API client, SQLite store and report writer from configuration
    ///
    /// Email is optional: an incomplete email section only disables
    /// notifications.
    pub fn from_config(config: Arc<Config>) -> crate::error::Result<Self> {
        let source = AdsApiClient::new(&config.api)?;
        let store = storage::open(&config.database)?;
        let reports = ReportWriter::new(config.reports.clone())?;

        let notifier: Option<Arc<dyn Notifier>> = match EmailNotifier::new(config.email.clone()) {
            Ok(notifier) => Some(Arc::new(notifier)),
            Err(e) => {
                let err = Error::from(e);
                warn!(category = err.category().as_str(), error = %err, "Email disabled");
                None
            }
        };

        Ok(Self::new(config, Arc::new(source), store, reports, notifier))
    }

    /// Whether finished jobs are mailed
    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }

    /// Run one job stamped with the current local time
    pub async fn run(&self) -> JobSummary {
        self.run_at(Local::now().naive_local()).await
    }

    /// Run one job; `timestamp` names the report files and dates the emails
    pub async fn run_at(&self, timestamp: NaiveDateTime) -> JobSummary {
        let started = Instant::now();
        info!(regions = self.config.regions.len(), "Job started");

        if let Err(e) = self.reports.prepare() {
            warn!(
                dir = %self.reports.output_dir().display(),
                error = %e,
                "Failed to clean report directory"
            );
        }

        let mut summary = JobSummary::default();
        for region in &self.config.regions {
            let outcome = self.run_region(region, timestamp).await;
            summary.regions.push(outcome);
        }

        let stats = summary.stats();
        info!(
            new_listings = summary.total_new(),
            fetched = stats.ads_fetched,
            failed_partitions = stats.failed_partitions,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Job finished"
        );

        summary
    }

    async fn run_region(&self, region: &RegionConfig, timestamp: NaiveDateTime) -> RegionOutcome {
        let batch = self.crawler.fetch_region(region).await;
        let fresh = persist_new_listings(self.store.as_ref(), batch.listings);

        info!(
            region = %region.name,
            candidates = batch.stats.accepted,
            new_listings = fresh.len(),
            "Deduplication complete"
        );

        let mut outcome = RegionOutcome {
            region: region.name.clone(),
            stats: batch.stats,
            new_listings: fresh.len(),
            ..Default::default()
        };

        let date = timestamp.date();
        let notification = if fresh.is_empty() {
            info!(region = %region.name, "No new listings");
            Some(Notification::NoNewListings {
                region: region.name.clone(),
                date,
            })
        } else {
            outcome.reports = self
                .reports
                .write_region(&region.name, &fresh, &batch.raw_ads, timestamp)
                .await;

            match (&outcome.reports.spreadsheet, &outcome.reports.map) {
                (Some(spreadsheet), Some(map)) => Some(Notification::Reports {
                    region: region.name.clone(),
                    date,
                    spreadsheet: spreadsheet.clone(),
                    map: map.clone(),
                }),
                _ => {
                    warn!(
                        region = %region.name,
                        spreadsheet = outcome.reports.spreadsheet.is_some(),
                        map = outcome.reports.map.is_some(),
                        "Reports incomplete, notification not sent"
                    );
                    None
                }
            }
        };

        if let Some(notification) = notification {
            outcome.notified = self.notify(&notification).await;
        }

        outcome
    }

    async fn notify(&self, notification: &Notification) -> bool {
        let Some(notifier) = &self.notifier else {
            debug!(region = %notification.region(), "No notifier configured");
            return false;
        };

        match notifier.send(notification).await {
            Ok(status) => {
                info!(
                    channel = %status.channel,
                    region = %notification.region(),
                    subject = %notification.subject(),
                    "Notification delivered"
                );
                true
            }
            Err(e) => {
                let err = Error::from(e);
                warn!(
                    channel = %notifier.name(),
                    region = %notification.region(),
                    category = err.category().as_str(),
                    recoverable = err.is_recoverable(),
                    error = %err,
                    "Notification failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ApiConfig, CategoryConfig, DatabaseConfig, EmailConfig, LoggingConfig, ReportConfig,
        ScheduleConfig,
    };
    use crate::crawler::AdsQuery;
    use crate::models::RawAd;
    use crate::notifications::{DeliveryStatus, NotifyResult};
    use crate::storage::{create_mock_repository, MockListingRepository};
    use crate::utils::error::FetchError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Mutex;

    struct FixedSource(Vec<RawAd>);

    #[async_trait]
    impl AdsSource for FixedSource {
        async fn fetch_ads(&self, _query: &AdsQuery) -> Result<Vec<RawAd>, FetchError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, notification: &Notification) -> NotifyResult<DeliveryStatus> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(DeliveryStatus::success(self.name()))
        }
    }

    fn config(output_dir: &Path) -> Config {
        Config {
            api: ApiConfig {
                url: "http://localhost".into(),
                user: "u".into(),
                token: "t".into(),
                limit: 1000,
                nedvigimost_type: None,
                fetch_for_yesterday: false,
                request_timeout_secs: 5,
                request_delay_ms: 0,
                rate_limit_backoff_ms: 0,
            },
            categories: vec![CategoryConfig::new(7, "Коммерческая недвижимость", "Общая площадь")],
            regions: vec![RegionConfig {
                name: "Москва".into(),
                cities: vec!["Москва".into()],
            }],
            schedule: ScheduleConfig {
                times: Vec::new(),
                run_once: true,
            },
            database: DatabaseConfig::default(),
            reports: ReportConfig {
                output_dir: output_dir.to_path_buf(),
                clean_on_start: true,
                geocode: false,
                ..Default::default()
            },
            email: EmailConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    fn ad(url: &str, address: &str, area: &str) -> RawAd {
        serde_json::from_value(json!({
            "url": url,
            "address": address,
            "title": "Офис",
            "price": 5000000,
            "params": {"Общая площадь": area},
            "coords": {"lat": "55.75", "lng": "37.61"}
        }))
        .unwrap()
    }

    fn listing(url: &str, address: &str, area: f64) -> CanonicalListing {
        CanonicalListing {
            address: address.into(),
            area,
            price: 100.0,
            price_per_unit_area: 1.0,
            url: url.into(),
            description: String::new(),
            title: String::new(),
            image_url: String::new(),
            region: "R".into(),
            city: "C".into(),
            category_id: 7,
            category_name: "Офисы".into(),
            category_color: "blue".into(),
        }
    }

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn runner(
        config: Config,
        ads: Vec<RawAd>,
        store: SharedListingRepository,
        notifier: Arc<RecordingNotifier>,
    ) -> JobRunner {
        let reports = ReportWriter::with_geocoder(config.reports.clone(), None).unwrap();
        JobRunner::new(
            Arc::new(config),
            Arc::new(FixedSource(ads)),
            store,
            reports,
            Some(notifier as Arc<dyn Notifier>),
        )
    }

    #[test]
    fn test_persist_skips_known_address_area() {
        let store = MockListingRepository::new();
        let fresh = persist_new_listings(
            &store,
            vec![
                listing("https://e.com/1", "Тверская 1", 50.0),
                listing("https://e.com/2", "Тверская 1", 50.0),
                listing("https://e.com/3", "Тверская 1", 60.0),
            ],
        );

        let urls: Vec<_> = fresh.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://e.com/1", "https://e.com/3"]);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_persist_skips_url_collision() {
        let store = MockListingRepository::new();
        persist_new_listings(&store, vec![listing("https://e.com/1", "A", 10.0)]);

        let fresh = persist_new_listings(&store, vec![listing("https://e.com/1", "B", 20.0)]);

        assert!(fresh.is_empty());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_run_finds_nothing_new() {
        let dir = tempfile::tempdir().unwrap();
        let store = create_mock_repository();
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner(
            config(dir.path()),
            vec![ad("https://e.com/1", "Тверская 1", "50")],
            store.clone(),
            notifier.clone(),
        );

        let first = runner.run_at(timestamp()).await;
        assert_eq!(first.total_new(), 1);
        assert!(first.regions[0].reports.is_complete());
        assert!(first.regions[0].notified);

        let second = runner.run_at(timestamp()).await;
        assert_eq!(second.total_new(), 0);
        assert_eq!(second.regions[0].reports, ReportSet::default());

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(matches!(sent[0], Notification::Reports { .. }));
        assert!(matches!(sent[1], Notification::NoNewListings { .. }));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incomplete_reports_are_not_sent() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let mut unplaced = ad("https://e.com/1", "Тверская 1", "50");
        unplaced.coords = None;

        let summary = runner(
            config(dir.path()),
            vec![unplaced],
            create_mock_repository(),
            notifier.clone(),
        )
        .run_at(timestamp())
        .await;

        let outcome = &summary.regions[0];
        assert_eq!(outcome.new_listings, 1);
        assert!(outcome.reports.spreadsheet.is_some());
        assert!(outcome.reports.map.is_none());
        assert!(!outcome.notified);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_from_config_without_email_has_no_notifier() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir.path().join("reports"));
        config.database.sqlite_path = dir.path().join("realty.db");

        let runner = JobRunner::from_config(Arc::new(config)).unwrap();
        assert!(!runner.has_notifier());
        assert!(dir.path().join("realty.db").exists());
    }

    #[test]
    fn test_from_config_reports_store_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let mut config = config(&dir.path().join("reports"));
        config.database.sqlite_path = blocker.join("realty.db");

        let err = match JobRunner::from_config(Arc::new(config)) {
            Ok(_) => panic!("store under a regular file must not open"),
            Err(e) => e,
        };
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(err.category().as_str(), "storage");
    }
}
