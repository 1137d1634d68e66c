//! Raw ad to canonical listing conversion
//!
//! The area attribute differs per category (general premises report
//! "Общая площадь", land parcels "Площадь"), so the normalizer is built for
//! one category and reads the field that category names.

use thiserror::Error;

use crate::config::CategoryConfig;
use crate::models::{parse_decimal, price_per_unit_area, value_f64, value_text, CanonicalListing, RawAd};

/// Reasons an ad cannot become a listing
///
/// These are validation outcomes, not failures: the ad is dropped and the
/// batch continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("ad has no address")]
    MissingAddress,

    #[error("ad has no url")]
    MissingUrl,

    #[error("ad has no '{0}' parameter")]
    MissingArea(String),

    #[error("area '{0}' is not a number")]
    InvalidArea(String),

    #[error("area {0} is not a positive finite number")]
    NonPositiveArea(f64),
}

/// Converts raw ads of one category into canonical listings
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    category: &'a CategoryConfig,
    region: &'a str,
    city: &'a str,
}

impl<'a> Normalizer<'a> {
    /// Create a normalizer tagging listings with region and city
    pub fn new(category: &'a CategoryConfig, region: &'a str, city: &'a str) -> Self {
        Self {
            category,
            region,
            city,
        }
    }

    /// Build a canonical listing or explain why the ad is unusable
    pub fn normalize(&self, ad: &RawAd) -> Result<CanonicalListing, Rejection> {
        let address = ad
            .address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or(Rejection::MissingAddress)?;
        let url = non_blank(ad.url.as_deref()).ok_or(Rejection::MissingUrl)?;
        let area = self.area(ad)?;
        let price = price(ad);

        Ok(CanonicalListing {
            address: address.to_string(),
            area,
            price,
            price_per_unit_area: price_per_unit_area(price, area),
            url: url.to_string(),
            description: ad.description.as_deref().unwrap_or_default().trim().to_string(),
            title: ad.title.as_deref().unwrap_or_default().trim().to_string(),
            image_url: ad.first_image_url().unwrap_or_default().to_string(),
            region: self.region.to_string(),
            city: self.city.to_string(),
            category_id: self.category.id,
            category_name: self.category.name.clone(),
            category_color: self.category.color.clone(),
        })
    }

    fn area(&self, ad: &RawAd) -> Result<f64, Rejection> {
        let field = &self.category.area_field;
        let raw = ad
            .param(field)
            .filter(|v| !v.is_null())
            .ok_or_else(|| Rejection::MissingArea(field.clone()))?;

        let text = value_text(raw).ok_or_else(|| Rejection::InvalidArea(raw.to_string()))?;
        let area = parse_decimal(&text).ok_or(Rejection::InvalidArea(text))?;

        if area.is_finite() && area > 0.0 {
            Ok(area)
        } else {
            Err(Rejection::NonPositiveArea(area))
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Ad price, 0 when absent or not numeric
fn price(ad: &RawAd) -> f64 {
    ad.price
        .as_ref()
        .and_then(value_f64)
        .filter(|p| p.is_finite() && *p >= 0.0)
        .unwrap_or(0.0)
}
