use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{FORMAT_API, FORMAT_CSV, FORMAT_JSON, FORMAT_XLS, FORMAT_XLSX};

/// Declared format of a downloaded dataset resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    Csv,
    Json,
    Api,
    Xls,
    Xlsx,
}

impl DataFormat {
    /// Map a portal format label to a known format. Case and surrounding
    /// whitespace are ignored; unknown labels yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_uppercase().as_str() {
            FORMAT_CSV => Some(Self::Csv),
            FORMAT_JSON => Some(Self::Json),
            FORMAT_API => Some(Self::Api),
            FORMAT_XLS => Some(Self::Xls),
            FORMAT_XLSX => Some(Self::Xlsx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => FORMAT_CSV,
            Self::Json => FORMAT_JSON,
            Self::Api => FORMAT_API,
            Self::Xls => FORMAT_XLS,
            Self::Xlsx => FORMAT_XLSX,
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully downloaded dataset resource awaiting normalization
#[derive(Debug, Clone)]
pub struct RawBlob {
    pub content: Vec<u8>,
    /// Format label as published by the portal (e.g. "csv", "XLSX")
    pub format_tag: String,
    /// Dataset page the resource was found on
    pub source_url: String,
}

impl RawBlob {
    pub fn new(
        content: impl Into<Vec<u8>>,
        format_tag: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            format_tag: format_tag.into(),
            source_url: source_url.into(),
        }
    }

    pub fn format(&self) -> Option<DataFormat> {
        DataFormat::from_tag(&self.format_tag)
    }
}

/// Canonical fields an alias table can resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Edrpou,
    /// Single-column full address
    Address,
    Phone,
    Email,
    Region,
    City,
    AddressStreet,
    AddressHouse,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Name,
        Field::Edrpou,
        Field::Address,
        Field::Phone,
        Field::Email,
        Field::Region,
        Field::City,
        Field::AddressStreet,
        Field::AddressHouse,
    ];
}

/// The normalized association record. Missing data is an empty string, never absent.
///
/// Field order is the export column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub name: String,
    pub edrpou: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub region: String,
    pub city: String,
    pub source_dataset_url: String,
}

/// A dataset resource listed in a batch manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    #[serde(default)]
    pub title: Option<String>,
    /// Local path of the downloaded resource
    pub path: std::path::PathBuf,
    pub format: String,
    /// Dataset page URL recorded as provenance
    pub source_url: String,
}

impl DatasetDescriptor {
    pub fn into_blob(self, content: Vec<u8>) -> RawBlob {
        RawBlob::new(content, self.format, self.source_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tags_are_case_insensitive() {
        assert_eq!(DataFormat::from_tag("csv"), Some(DataFormat::Csv));
        assert_eq!(DataFormat::from_tag(" Json "), Some(DataFormat::Json));
        assert_eq!(DataFormat::from_tag("api"), Some(DataFormat::Api));
        assert_eq!(DataFormat::from_tag("xls"), Some(DataFormat::Xls));
        assert_eq!(DataFormat::from_tag("XlSx"), Some(DataFormat::Xlsx));
        assert_eq!(DataFormat::from_tag("pdf"), None);
        assert_eq!(DataFormat::from_tag(""), None);
    }

    #[test]
    fn test_field_serde_names() {
        let json = serde_json::to_string(&Field::AddressStreet).unwrap();
        assert_eq!(json, "\"address_street\"");
        let field: Field = serde_json::from_str("\"edrpou\"").unwrap();
        assert_eq!(field, Field::Edrpou);
    }

    #[test]
    fn test_descriptor_keeps_page_url_as_provenance() {
        let descriptor = DatasetDescriptor {
            title: Some("Перелік ОСББ".to_string()),
            path: "lviv.csv".into(),
            format: "csv".to_string(),
            source_url: "https://data.gov.ua/dataset/perelik-osbb".to_string(),
        };
        let blob = descriptor.into_blob(b"a,b".to_vec());
        assert_eq!(blob.source_url, "https://data.gov.ua/dataset/perelik-osbb");
        assert_eq!(blob.format(), Some(DataFormat::Csv));
    }
}
