//! Schema-agnostic field resolution.
//!
//! Every source row, whatever its shape, is first turned into a [`FlatFieldMap`]
//! whose keys went through [`normalize_key`]. Canonical fields are then looked up
//! by trying each configured alias in priority order, so the resolver never needs
//! to know which format or portal the row came from.

pub mod address;
pub mod mapping;

use std::collections::HashMap;

use crate::types::{CanonicalRecord, Field};

pub use address::compose_address;
pub use mapping::{Alias, FieldMappingTable};

/// Reduce a raw column/property name to a lookup token: lowercased, trimmed,
/// and stripped of everything that is not a letter or digit.
///
/// `"ЄДРПОУ."`, `" едрпоу "` and `"Є ДРПОУ"` all become `"єдрпоу"`.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Per-row view of a source record keyed by normalized tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatFieldMap {
    values: HashMap<String, String>,
}

impl FlatFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from raw key/value pairs. Later pairs whose keys collide after
    /// normalization overwrite earlier ones.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::new();
        for (key, value) in pairs {
            map.insert(key.as_ref(), value.as_ref());
        }
        map
    }

    /// Insert a raw key/value pair. Keys that normalize to nothing are dropped.
    pub fn insert(&mut self, raw_key: &str, raw_value: &str) {
        let token = normalize_key(raw_key);
        if token.is_empty() {
            return;
        }
        self.values.insert(token, raw_value.trim().to_string());
    }

    /// Look up an already-normalized token
    pub fn get(&self, token: &str) -> Option<&str> {
        self.values.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolve `field` against `map`: the value of the first alias, in table order,
/// that is present and non-empty. Returns an empty string when nothing matches.
pub fn resolve(map: &FlatFieldMap, field: Field, table: &FieldMappingTable) -> String {
    table
        .aliases(field)
        .iter()
        .filter_map(|alias| map.get(alias.token()))
        .find(|value| !value.is_empty())
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// Build a canonical record from one flattened row. No validity check is done here.
pub fn normalize_record(
    map: &FlatFieldMap,
    table: &FieldMappingTable,
    source_url: &str,
) -> CanonicalRecord {
    CanonicalRecord {
        name: resolve(map, Field::Name, table),
        edrpou: resolve(map, Field::Edrpou, table),
        address: compose_address(map, table),
        phone: resolve(map, Field::Phone, table),
        email: resolve(map, Field::Email, table),
        region: resolve(map, Field::Region, table),
        city: resolve(map, Field::City, table),
        source_dataset_url: source_url.to_string(),
    }
}
