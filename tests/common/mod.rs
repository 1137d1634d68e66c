//! Common test utilities

use realty_scout::config::{
    ApiConfig, CategoryConfig, Config, DatabaseConfig, EmailConfig, LoggingConfig, RegionConfig,
    ReportConfig, ScheduleConfig,
};
use serde_json::{json, Map, Value};
use std::path::Path;

/// Office category with an area query range
pub fn office_category() -> CategoryConfig {
    let mut category = CategoryConfig::new(7, "Коммерческая недвижимость", "Общая площадь");
    category.square_min = Some(100.0);
    category.square_max = Some(1000.0);
    category.exclude_keywords = vec!["аренда".to_string()];
    category
}

/// Land category; the area range is not sent to the API
pub fn land_category() -> CategoryConfig {
    let mut category = CategoryConfig::new(5, "Земельные участки", "Площадь");
    category.color = "green".to_string();
    category.square_min = Some(10.0);
    category.area_query_filter = false;
    category
}

/// Create a run-once config against `api_url`, writing into `dir`
pub fn test_config(api_url: &str, dir: &Path) -> Config {
    Config {
        api: ApiConfig {
            url: api_url.to_string(),
            user: "robot@example.com".to_string(),
            token: "secret-token".to_string(),
            limit: 1000,
            nedvigimost_type: Some(1),
            fetch_for_yesterday: false,
            request_timeout_secs: 5,
            request_delay_ms: 0,
            rate_limit_backoff_ms: 0,
        },
        categories: vec![office_category(), land_category()],
        regions: vec![RegionConfig {
            name: "Санкт-Петербург".to_string(),
            cities: vec!["Санкт-Петербург".to_string()],
        }],
        schedule: ScheduleConfig {
            times: Vec::new(),
            run_once: true,
        },
        database: DatabaseConfig {
            sqlite_path: dir.join("realty.db"),
        },
        reports: ReportConfig {
            output_dir: dir.join("reports"),
            geocode: false,
            ..Default::default()
        },
        email: EmailConfig::default(),
        logging: LoggingConfig::default(),
    }
}

/// Ad JSON as returned by the listings API
#[allow(dead_code)]
pub fn ad_json(url: &str, address: &str, area_field: &str, area: &str) -> Value {
    let mut params = Map::new();
    params.insert(area_field.to_string(), Value::String(area.to_string()));

    json!({
        "url": url,
        "address": address,
        "title": "Продается помещение",
        "description": "Отдельный вход",
        "price": 12000000,
        "params": params,
        "images": [{"imgurl": "https://img.example.com/1.jpg"}],
        "coords": {"lat": "59.93", "lng": "30.31"}
    })
}

/// Successful API body wrapping `ads`
#[allow(dead_code)]
pub fn api_body(ads: Vec<Value>) -> Value {
    json!({ "code": 200, "data": ads })
}
