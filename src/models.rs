// Core data structures for realty-scout

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Ad object as returned by the listings API
///
/// Only the fields the pipeline reads are typed; everything else in the
/// payload is ignored. Mappings the API serializes as `[]` when empty are
/// accepted as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAd {
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    /// Number or numeric string; anything else counts as unknown
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub params: HashMap<String, Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub images: Vec<RawImage>,
    #[serde(default, deserialize_with = "lenient_coords")]
    pub coords: Option<RawCoords>,
}

/// Image entry of an ad
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawImage {
    #[serde(default, deserialize_with = "lenient_text")]
    pub imgurl: Option<String>,
}

/// Coordinates as sent by the API (strings or numbers)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCoords {
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default)]
    pub lng: Option<Value>,
}

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl RawAd {
    /// Raw value of an ad parameter
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Textual value of an ad parameter (strings and numbers only)
    pub fn param_text(&self, name: &str) -> Option<String> {
        self.param(name).and_then(value_text)
    }

    /// Lower-cased title and description joined by a space
    pub fn search_text(&self) -> String {
        let title = self.title.as_deref().unwrap_or_default().to_lowercase();
        let description = self
            .description
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        format!("{title} {description}")
    }

    /// First image URL, if the first image carries one
    pub fn first_image_url(&self) -> Option<&str> {
        self.images
            .first()
            .and_then(|img| img.imgurl.as_deref())
            .filter(|url| !url.trim().is_empty())
    }

    /// Coordinates carried by the ad itself
    pub fn coordinates(&self) -> Option<Coordinates> {
        let coords = self.coords.as_ref()?;
        let lat = coords.lat.as_ref().and_then(value_f64)?;
        let lon = coords.lng.as_ref().and_then(value_f64)?;
        if lat.is_finite() && lon.is_finite() {
            Some(Coordinates { lat, lon })
        } else {
            None
        }
    }
}

/// Text form of a JSON scalar
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric form of a JSON scalar; strings use `,` or `.` as decimal separator
pub fn value_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// Parse a decimal that may use a comma separator
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().replace(',', ".").parse::<f64>().ok()
}

/// Scalars become text; null, arrays and objects count as absent
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b.to_string()),
        value => value_text(&value),
    })
}

fn lenient_map<'de, D>(deserializer: D) -> Result<HashMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map.into_iter().collect(),
        _ => HashMap::new(),
    })
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<RawImage>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_coords<'de, D>(deserializer: D) -> Result<Option<RawCoords>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// Normalized listing, the unit of deduplication and reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalListing {
    pub address: String,
    pub area: f64,
    pub price: f64,
    pub price_per_unit_area: f64,
    pub url: String,
    pub description: String,
    pub title: String,
    pub image_url: String,
    pub region: String,
    pub city: String,
    pub category_id: u32,
    pub category_name: String,
    pub category_color: String,
}

impl CanonicalListing {
    /// Dedup key: address and area
    pub fn dedup_key(&self) -> (&str, f64) {
        (&self.address, self.area)
    }

    /// Whether the listing belongs to a land-parcel category
    pub fn is_land(&self) -> bool {
        is_land_category(&self.category_name)
    }
}

/// Land categories measure area in "sotka" rather than square meters
pub fn is_land_category(category_name: &str) -> bool {
    let lower = category_name.to_lowercase();
    lower.contains("земельн")
}

/// Price per unit of area rounded to two decimals, 0 for non-positive area
pub fn price_per_unit_area(price: f64, area: f64) -> f64 {
    if area > 0.0 {
        round2(price / area)
    } else {
        0.0
    }
}

/// Round to two decimal digits, ties to even
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Listing as persisted by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredListing {
    pub id: i64,
    pub listing: CanonicalListing,
    pub first_seen_at: DateTime<Utc>,
}

/// Per-region crawl statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub ads_fetched: usize,
    pub rejected_by_filter: usize,
    pub rejected_by_normalizer: usize,
    pub accepted: usize,
    pub failed_partitions: usize,
}

impl CrawlStats {
    /// Fold another partition's counters into this one
    pub fn merge(&mut self, other: &CrawlStats) {
        self.ads_fetched += other.ads_fetched;
        self.rejected_by_filter += other.rejected_by_filter;
        self.rejected_by_normalizer += other.rejected_by_normalizer;
        self.accepted += other.accepted;
        self.failed_partitions += other.failed_partitions;
    }
}
