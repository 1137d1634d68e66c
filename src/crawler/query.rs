//! Query parameters for the listings API

use chrono::{Duration as ChronoDuration, Local, NaiveDate};

use crate::config::{ApiConfig, CategoryConfig};

/// API parameter code for the minimum area
pub const PARAM_AREA_MIN: &str = "param[7446]";

/// API parameter code for the maximum area
pub const PARAM_AREA_MAX: &str = "param[7486]";

/// A single calendar day sent as `date1`/`date2`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub day: NaiveDate,
}

impl DateRange {
    /// The calendar day before `today`
    pub fn day_before(today: NaiveDate) -> Self {
        Self {
            day: today - ChronoDuration::days(1),
        }
    }

    /// Yesterday in local time
    pub fn yesterday() -> Self {
        Self::day_before(Local::now().date_naive())
    }

    /// Start of the day, `YYYY-MM-DD 00:00:00`
    pub fn start(&self) -> String {
        format!("{} 00:00:00", self.day.format("%Y-%m-%d"))
    }

    /// End of the day, `YYYY-MM-DD 23:59:59`
    pub fn end(&self) -> String {
        format!("{} 23:59:59", self.day.format("%Y-%m-%d"))
    }
}

/// One API request: a category searched in a city
#[derive(Debug, Clone, PartialEq)]
pub struct AdsQuery {
    pub user: String,
    pub token: String,
    pub limit: u32,
    pub category_id: u32,
    pub city: String,
    pub nedvigimost_type: Option<u32>,
    pub dates: Option<DateRange>,
    pub area_min: Option<f64>,
    pub area_max: Option<f64>,
}

impl AdsQuery {
    /// Build the query for a category in a city
    ///
    /// The area range is only sent for categories with `area_query_filter`.
    pub fn new(api: &ApiConfig, category: &CategoryConfig, city: &str, dates: Option<DateRange>) -> Self {
        let (area_min, area_max) = if category.area_query_filter {
            (category.square_min, category.square_max)
        } else {
            (None, None)
        };

        Self {
            user: api.user.clone(),
            token: api.token.clone(),
            limit: api.limit,
            category_id: category.id,
            city: city.to_string(),
            nedvigimost_type: api.nedvigimost_type,
            dates,
            area_min,
            area_max,
        }
    }

    /// Query string pairs in request order
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("user", self.user.clone()),
            ("token", self.token.clone()),
            ("limit", self.limit.to_string()),
            ("category_id", self.category_id.to_string()),
        ];

        if let Some(dates) = &self.dates {
            params.push(("date1", dates.start()));
            params.push(("date2", dates.end()));
        }

        if !self.city.is_empty() {
            params.push(("city", self.city.clone()));
        }

        if let Some(kind) = self.nedvigimost_type {
            params.push(("nedvigimost_type", kind.to_string()));
        }

        if let Some(min) = self.area_min {
            params.push((PARAM_AREA_MIN, min.to_string()));
        }

        if let Some(max) = self.area_max {
            params.push((PARAM_AREA_MAX, max.to_string()));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> ApiConfig {
        ApiConfig {
            url: "https://ads-api.ru/main/api".into(),
            user: "user@example.com".into(),
            token: "token".into(),
            limit: 1000,
            nedvigimost_type: Some(1),
            fetch_for_yesterday: true,
            request_timeout_secs: 30,
            request_delay_ms: 0,
            rate_limit_backoff_ms: 0,
        }
    }

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_day_before() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let range = DateRange::day_before(today);
        assert_eq!(range.start(), "2024-02-29 00:00:00");
        assert_eq!(range.end(), "2024-02-29 23:59:59");
    }

    #[test]
    fn test_params_include_area_range() {
        let mut category = CategoryConfig::new(7, "Коммерческая недвижимость", "Общая площадь");
        category.square_min = Some(50.0);
        category.square_max = Some(500.0);

        let query = AdsQuery::new(&api(), &category, "Санкт-Петербург", None);
        let params = query.to_params();

        assert_eq!(param(&params, "category_id"), Some("7"));
        assert_eq!(param(&params, "city"), Some("Санкт-Петербург"));
        assert_eq!(param(&params, "nedvigimost_type"), Some("1"));
        assert_eq!(param(&params, PARAM_AREA_MIN), Some("50"));
        assert_eq!(param(&params, PARAM_AREA_MAX), Some("500"));
        assert_eq!(param(&params, "date1"), None);
    }

    #[test]
    fn test_land_skips_area_range() {
        let mut category = CategoryConfig::new(5, "Земельные участки", "Площадь");
        category.square_min = Some(6.0);
        category.area_query_filter = false;

        let query = AdsQuery::new(&api(), &category, "Пушкин", None);
        let params = query.to_params();

        assert_eq!(param(&params, PARAM_AREA_MIN), None);
        assert_eq!(param(&params, PARAM_AREA_MAX), None);
    }

    #[test]
    fn test_params_include_dates() {
        let category = CategoryConfig::new(7, "Офисы", "Общая площадь");
        let dates = DateRange::day_before(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
        let query = AdsQuery::new(&api(), &category, "Пушкин", Some(dates));
        let params = query.to_params();

        assert_eq!(param(&params, "date1"), Some("2024-05-09 00:00:00"));
        assert_eq!(param(&params, "date2"), Some("2024-05-09 23:59:59"));
    }
}
