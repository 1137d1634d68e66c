//! Fetch orchestration
//!
//! This module drives the listings API for every (city, category) pair of a
//! region, runs each ad through the category's filter and normalizer, and
//! aggregates the survivors. Requests are issued strictly one after another.
//! A failed request only empties its own partition.

pub mod fetcher;
pub mod pipeline;
pub mod query;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{CategoryConfig, Config, RegionConfig};
use crate::listing::{FilterPolicy, Normalizer};
use crate::models::{CanonicalListing, CrawlStats, RawAd};
use crate::utils::error::FetchError;

pub use fetcher::AdsApiClient;
pub use query::{AdsQuery, DateRange};

/// Source of raw ads for a query
#[async_trait]
pub trait AdsSource: Send + Sync {
    /// Fetch the ads matching a query
    async fn fetch_ads(&self, query: &AdsQuery) -> Result<Vec<RawAd>, FetchError>;
}

#[async_trait]
impl AdsSource for AdsApiClient {
    async fn fetch_ads(&self, query: &AdsQuery) -> Result<Vec<RawAd>, FetchError> {
        AdsApiClient::fetch_ads(self, query).await
    }
}

/// Result of one (city, category) fetch
#[derive(Debug, Clone, Default)]
pub struct CategoryBatch {
    /// Ads that passed filtering and normalization
    pub listings: Vec<CanonicalListing>,

    /// Every decoded ad, kept for coordinate lookup
    pub raw_ads: Vec<RawAd>,

    pub stats: CrawlStats,
}

/// Aggregated result for one region
#[derive(Debug, Clone, Default)]
pub struct RegionBatch {
    pub region: String,

    /// Listings in city-then-category order
    pub listings: Vec<CanonicalListing>,

    pub raw_ads: Vec<RawAd>,

    pub stats: CrawlStats,
}

impl RegionBatch {
    fn extend(&mut self, batch: CategoryBatch) {
        self.listings.extend(batch.listings);
        self.raw_ads.extend(batch.raw_ads);
        self.stats.merge(&batch.stats);
    }
}

/// Fetch orchestrator
pub struct Crawler {
    config: Arc<Config>,
    source: Arc<dyn AdsSource>,
}

impl Crawler {
    /// Create an orchestrator over an ads source
    pub fn new(config: Arc<Config>, source: Arc<dyn AdsSource>) -> Self {
        Self { config, source }
    }

    /// Fetch every city and category of a region
    pub async fn fetch_region(&self, region: &RegionConfig) -> RegionBatch {
        let dates = self
            .config
            .api
            .fetch_for_yesterday
            .then(DateRange::yesterday);

        if let Some(dates) = &dates {
            info!(day = %dates.day, "Restricting search to ads published yesterday");
        }

        info!(
            region = %region.name,
            cities = region.cities.len(),
            categories = self.config.categories.len(),
            "Fetching region"
        );

        let mut batch = RegionBatch {
            region: region.name.clone(),
            ..Default::default()
        };

        for city in &region.cities {
            for category in &self.config.categories {
                let result = self
                    .fetch_category(&region.name, city, category, dates)
                    .await;
                batch.extend(result);
            }
        }

        info!(
            region = %region.name,
            fetched = batch.stats.ads_fetched,
            accepted = batch.stats.accepted,
            rejected_by_filter = batch.stats.rejected_by_filter,
            rejected_by_normalizer = batch.stats.rejected_by_normalizer,
            failed_partitions = batch.stats.failed_partitions,
            "Region fetch complete"
        );

        batch
    }

    /// Fetch, filter and normalize one category in one city
    ///
    /// Never fails: fetch errors are logged and yield an empty batch with
    /// `failed_partitions` set.
    pub async fn fetch_category(
        &self,
        region: &str,
        city: &str,
        category: &CategoryConfig,
        dates: Option<DateRange>,
    ) -> CategoryBatch {
        let query = AdsQuery::new(&self.config.api, category, city, dates);

        debug!(
            city = %city,
            category_id = category.id,
            category = %category.name,
            "Requesting ads"
        );

        let raw_ads = match self.source.fetch_ads(&query).await {
            Ok(ads) => ads,
            Err(e) => {
                warn!(
                    city = %city,
                    category = %category.name,
                    error = %e,
                    "Fetch failed, skipping category"
                );
                return CategoryBatch {
                    stats: CrawlStats {
                        failed_partitions: 1,
                        ..Default::default()
                    },
                    ..Default::default()
                };
            }
        };

        let batch = process_ads(raw_ads, category, region, city);

        info!(
            city = %city,
            category = %category.name,
            fetched = batch.stats.ads_fetched,
            accepted = batch.stats.accepted,
            "Category processed"
        );

        batch
    }
}

/// Run ads through the category's filter and normalizer
pub fn process_ads(
    raw_ads: Vec<RawAd>,
    category: &CategoryConfig,
    region: &str,
    city: &str,
) -> CategoryBatch {
    let policy = FilterPolicy::new(category);
    let normalizer = Normalizer::new(category, region, city);
    let mut stats = CrawlStats {
        ads_fetched: raw_ads.len(),
        ..Default::default()
    };
    let mut listings = Vec::new();

    for ad in &raw_ads {
        let url = ad.url.as_deref().unwrap_or_default();

        if let Err(exclusion) = policy.check(ad) {
            debug!(url = %url, reason = %exclusion, "Ad excluded");
            stats.rejected_by_filter += 1;
            continue;
        }

        match normalizer.normalize(ad) {
            Ok(listing) => listings.push(listing),
            Err(rejection) => {
                debug!(url = %url, reason = %rejection, "Ad rejected");
                stats.rejected_by_normalizer += 1;
            }
        }
    }

    stats.accepted = listings.len();

    CategoryBatch {
        listings,
        raw_ads,
        stats,
    }
}
