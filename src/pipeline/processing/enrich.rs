use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::DEFAULT_CITY_RULES;
use crate::types::CanonicalRecord;

/// Maps a dataset URL fragment to the city the dataset covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRule {
    pub url_fragment: String,
    pub city: String,
}

/// Fills an empty `city` from the record's provenance URL.
///
/// Rules are tried in order and the first fragment contained in
/// `source_dataset_url` wins. Records that already carry a city are untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityBackfill {
    rules: Vec<CityRule>,
}

impl CityBackfill {
    pub fn new(rules: Vec<CityRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[CityRule] {
        &self.rules
    }

    /// City for a provenance URL, if any rule matches
    pub fn city_for(&self, source_url: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| !rule.url_fragment.is_empty() && source_url.contains(&rule.url_fragment))
            .map(|rule| rule.city.as_str())
    }

    /// Fill `record.city` in place. Returns true if the record was changed.
    pub fn apply(&self, record: &mut CanonicalRecord) -> bool {
        if !record.city.trim().is_empty() || record.source_dataset_url.is_empty() {
            return false;
        }
        match self.city_for(&record.source_dataset_url) {
            Some(city) => {
                debug!(
                    "CityBackfill: city='{}' for source_url={}",
                    city, record.source_dataset_url
                );
                record.city = city.to_string();
                true
            }
            None => false,
        }
    }

    pub fn enrich(&self, mut record: CanonicalRecord) -> CanonicalRecord {
        self.apply(&mut record);
        record
    }
}

impl Default for CityBackfill {
    fn default() -> Self {
        Self::new(
            DEFAULT_CITY_RULES
                .iter()
                .map(|(fragment, city)| CityRule {
                    url_fragment: fragment.to_string(),
                    city: city.to_string(),
                })
                .collect(),
        )
    }
}
