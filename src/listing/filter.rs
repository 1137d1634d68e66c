//! Per-category exclusion rules
//!
//! Rules are opt-in: an empty exclusion list disables that axis entirely.
//! Checks run in a fixed order and stop at the first match.

use crate::config::CategoryConfig;
use crate::models::RawAd;

/// Why an ad was excluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// Building type contains an excluded substring
    BuildingType { value: String, matched: String },

    /// Title or description contains an excluded keyword
    Keyword(String),
}

impl std::fmt::Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BuildingType { value, matched } => {
                write!(f, "building type '{value}' matches '{matched}'")
            }
            Self::Keyword(keyword) => write!(f, "keyword '{keyword}'"),
        }
    }
}

/// Exclusion policy built from one category's configuration
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    building_type_field: String,
    exclude_building_types: Vec<String>,
    exclude_keywords: Vec<String>,
}

impl FilterPolicy {
    /// Build the policy for a category
    pub fn new(category: &CategoryConfig) -> Self {
        Self {
            building_type_field: category.building_type_field.clone(),
            exclude_building_types: category.exclude_building_types.clone(),
            exclude_keywords: category
                .exclude_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Decide whether the ad proceeds to normalization
    pub fn check(&self, ad: &RawAd) -> Result<(), Exclusion> {
        if !self.exclude_building_types.is_empty() {
            if let Some(value) = ad.param_text(&self.building_type_field) {
                if let Some(matched) = self
                    .exclude_building_types
                    .iter()
                    .find(|excluded| value.contains(excluded.as_str()))
                {
                    return Err(Exclusion::BuildingType {
                        value,
                        matched: matched.clone(),
                    });
                }
            }
        }

        if !self.exclude_keywords.is_empty() {
            let text = ad.search_text();
            if let Some(keyword) = self
                .exclude_keywords
                .iter()
                .find(|k| text.contains(k.as_str()))
            {
                return Err(Exclusion::Keyword(keyword.clone()));
            }
        }

        Ok(())
    }
}
