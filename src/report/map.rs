//! Interactive HTML map report
//!
//! Renders a Leaflet page with one marker per listing. Coordinates come from
//! the raw ad with the same URL, falling back to the geocoder.

use chrono::NaiveDateTime;
use handlebars::Handlebars;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::models::{CanonicalListing, Coordinates, RawAd};
use crate::report::geocode::Geocoder;
use crate::utils::error::ReportError;
use crate::utils::{format_price, region_slug, truncate_text};

const MAP_TEMPLATE: &str = include_str!("../../templates/map.hbs");
const POPUP_TEMPLATE: &str = include_str!("../../templates/popup.hbs");

const DEFAULT_ZOOM: u8 = 11;

/// Longest description shown in a popup, in characters
const POPUP_DESCRIPTION_CHARS: usize = 400;

/// File name for a region's map
pub fn map_file_name(region: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "realty_map_{}_{}.html",
        region_slug(region),
        timestamp.format("%Y-%m-%d_%H%M%S")
    )
}

/// A listing placed on the map
#[derive(Debug, Clone)]
pub struct PlacedListing<'a> {
    pub listing: &'a CanonicalListing,
    pub coords: Coordinates,
}

/// Marker data embedded in the page
#[derive(Debug, Clone, Serialize)]
struct Marker {
    lat: f64,
    lon: f64,
    address: String,
    color: String,
    popup: String,
}

#[derive(Debug, Serialize)]
struct PopupData<'a> {
    address: &'a str,
    area: f64,
    area_unit: &'static str,
    price_per_unit: String,
    price: String,
    description: String,
    image_url: &'a str,
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct MapData {
    title: String,
    center_lat: f64,
    center_lon: f64,
    zoom: u8,
    markers_json: String,
}

/// Resolve coordinates for each listing
///
/// Ad coordinates win; otherwise the geocoder is asked when present.
/// Listings that cannot be placed are dropped.
pub async fn place_listings<'a>(
    listings: &'a [CanonicalListing],
    raw_ads: &[RawAd],
    geocoder: Option<&Geocoder>,
) -> Vec<PlacedListing<'a>> {
    let mut by_url: HashMap<&str, &RawAd> = HashMap::new();
    for ad in raw_ads {
        if let Some(url) = ad.url.as_deref() {
            by_url.entry(url).or_insert(ad);
        }
    }

    let mut placed = Vec::with_capacity(listings.len());
    for listing in listings {
        let from_ad = by_url
            .get(listing.url.as_str())
            .and_then(|ad| ad.coordinates());

        let coords = match (from_ad, geocoder) {
            (Some(coords), _) => Some(coords),
            (None, Some(geocoder)) => match geocoder.geocode(&listing.address).await {
                Ok(coords) => coords,
                Err(e) => {
                    warn!(address = %listing.address, error = %e, "Geocoding failed");
                    None
                }
            },
            (None, None) => None,
        };

        match coords {
            Some(coords) => placed.push(PlacedListing { listing, coords }),
            None => debug!(address = %listing.address, "No coordinates, skipping marker"),
        }
    }

    placed
}

/// Map page renderer
pub struct MapRenderer<'a> {
    handlebars: Handlebars<'a>,
}

impl<'a> MapRenderer<'a> {
    /// Create a renderer with the built-in templates
    pub fn new() -> Result<Self, ReportError> {
        let mut handlebars = Handlebars::new();
        handlebars.register_template_string("map", MAP_TEMPLATE)?;
        handlebars.register_template_string("popup", POPUP_TEMPLATE)?;
        Ok(Self { handlebars })
    }

    /// Render popup HTML for one listing
    pub fn render_popup(&self, listing: &CanonicalListing) -> Result<String, ReportError> {
        let data = PopupData {
            address: &listing.address,
            area: listing.area,
            area_unit: if listing.is_land() { "сот." } else { "м²" },
            price_per_unit: format_price(listing.price_per_unit_area),
            price: format_price(listing.price),
            description: truncate_text(&listing.description, POPUP_DESCRIPTION_CHARS),
            image_url: &listing.image_url,
            url: &listing.url,
        };
        Ok(self.handlebars.render("popup", &data)?)
    }

    /// Render the map page centered on the first marker; `None` when no
    /// listing could be placed
    pub fn render(
        &self,
        region: &str,
        placed: &[PlacedListing<'_>],
    ) -> Result<Option<String>, ReportError> {
        let Some(first) = placed.first() else {
            return Ok(None);
        };

        let markers = placed
            .iter()
            .map(|p| {
                Ok(Marker {
                    lat: p.coords.lat,
                    lon: p.coords.lon,
                    address: p.listing.address.clone(),
                    color: p.listing.category_color.clone(),
                    popup: self.render_popup(p.listing)?,
                })
            })
            .collect::<Result<Vec<_>, ReportError>>()?;

        let data = MapData {
            title: format!("Новые объекты недвижимости - {region}"),
            center_lat: first.coords.lat,
            center_lon: first.coords.lon,
            zoom: DEFAULT_ZOOM,
            markers_json: script_safe_json(&markers)?,
        };

        Ok(Some(self.handlebars.render("map", &data)?))
    }
}

/// JSON that can be inlined in a `<script>` element
fn script_safe_json<T: Serialize>(value: &T) -> Result<String, ReportError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn listing(url: &str, address: &str) -> CanonicalListing {
        CanonicalListing {
            address: address.into(),
            area: 150.0,
            price: 30_000_000.0,
            price_per_unit_area: 200_000.0,
            url: url.into(),
            description: "<b>Отличное</b> помещение".into(),
            title: "Помещение".into(),
            image_url: "https://img.example.com/1.jpg".into(),
            region: "Санкт-Петербург".into(),
            city: "Санкт-Петербург".into(),
            category_id: 7,
            category_name: "Коммерческая недвижимость".into(),
            category_color: "red".into(),
        }
    }

    fn raw(url: &str, coords: serde_json::Value) -> RawAd {
        serde_json::from_value(json!({"url": url, "coords": coords})).unwrap()
    }

    #[test]
    fn test_map_file_name() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(
            map_file_name("Санкт-Петербург", ts),
            "realty_map_санкт-петербург_2024-01-02_030405.html"
        );
    }

    #[tokio::test]
    async fn test_place_uses_ad_coordinates_and_drops_unplaced() {
        let listings = vec![
            listing("https://e.com/1", "Невский пр., 28"),
            listing("https://e.com/2", "Литейный пр., 1"),
        ];
        let raw_ads = vec![
            raw("https://e.com/1", json!({"lat": "59.9355", "lng": "30.3200"})),
            raw("https://e.com/2", json!([])),
        ];

        let placed = place_listings(&listings, &raw_ads, None).await;

        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].listing.url, "https://e.com/1");
        assert_eq!(placed[0].coords.lat, 59.9355);
    }

    #[test]
    fn test_render_none_without_markers() {
        let renderer = MapRenderer::new().unwrap();
        assert!(renderer
            .render("Санкт-Петербург", &[])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_render_page() {
        let renderer = MapRenderer::new().unwrap();
        let l = listing("https://e.com/1", "Невский пр., 28");
        let placed = vec![PlacedListing {
            listing: &l,
            coords: Coordinates {
                lat: 59.9355,
                lon: 30.32,
            },
        }];

        let html = renderer
            .render("Санкт-Петербург", &placed)
            .unwrap()
            .unwrap();

        assert!(html.contains("L.map('map').setView([59.9355, 30.32], 11)"));
        assert!(html.contains("Невский пр., 28"));
        assert!(html.contains("leaflet"));
        assert!(!html.contains("</b> помещение"));
    }

    #[test]
    fn test_popup_escapes_and_formats() {
        let renderer = MapRenderer::new().unwrap();
        let popup = renderer
            .render_popup(&listing("https://e.com/1", "Невский пр., 28"))
            .unwrap();

        assert!(popup.contains("200 тыс. руб."));
        assert!(popup.contains("30 млн. руб."));
        assert!(popup.contains("&lt;b&gt;Отличное&lt;/b&gt;"));
        assert!(popup.contains("https://img.example.com/1.jpg"));
        assert!(popup.contains("Перейти к объявлению"));
    }

    #[test]
    fn test_popup_without_image() {
        let renderer = MapRenderer::new().unwrap();
        let mut l = listing("https://e.com/1", "Адрес");
        l.image_url.clear();
        let popup = renderer.render_popup(&l).unwrap();
        assert!(!popup.contains("<img"));
        assert!(popup.contains("width: 100%"));
    }
}
