use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{IngestError, Result};
use crate::pipeline::processing::enrich::{CityBackfill, CityRule};
use crate::pipeline::processing::normalize::FieldMappingTable;
use crate::types::Field;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "OSBB_CONFIG";

/// Optional overrides for the built-in lookup tables.
///
/// ```toml
/// [fields]
/// edrpou = ["ЄДРПОУ", "Code"]
///
/// [[city_backfill]]
/// url_fragment = "https://data.gov.ua/dataset/0003"
/// city = "Хмельницький"
/// ```
///
/// A field listed under `[fields]` replaces that field's built-in aliases; fields
/// not listed keep theirs. A `city_backfill` array replaces the built-in table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fields: HashMap<Field, Vec<String>>,
    #[serde(default)]
    pub city_backfill: Option<Vec<CityRule>>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, else from `$OSBB_CONFIG`, else use the built-in tables
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let path: Option<PathBuf> = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(rules) = &self.city_backfill {
            if let Some(rule) = rules.iter().find(|r| r.url_fragment.trim().is_empty()) {
                return Err(IngestError::Config(format!(
                    "city_backfill rule for '{}' has an empty url_fragment",
                    rule.city
                )));
            }
        }
        Ok(())
    }

    pub fn field_mappings(&self) -> FieldMappingTable {
        // Iterate in a fixed order so the resulting table does not depend on map order
        Field::ALL
            .iter()
            .filter_map(|field| self.fields.get(field).map(|aliases| (*field, aliases)))
            .fold(FieldMappingTable::builtin(), |table, (field, aliases)| {
                table.with_aliases(field, aliases.iter().cloned())
            })
    }

    pub fn city_backfill(&self) -> CityBackfill {
        match &self.city_backfill {
            Some(rules) => CityBackfill::new(rules.clone()),
            None => CityBackfill::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_uses_builtin_tables() {
        let config = Config::default();
        assert_eq!(config.field_mappings(), FieldMappingTable::builtin());
        assert_eq!(config.city_backfill(), CityBackfill::default());
    }

    #[test]
    fn test_field_override_replaces_only_that_field() {
        let config = Config::from_toml(
            r#"
            [fields]
            edrpou = ["Ідентифікаційний код", "EDRPOU"]
            "#,
        )
        .unwrap();
        let table = config.field_mappings();
        let edrpou: Vec<&str> = table.aliases(Field::Edrpou).iter().map(|a| a.raw()).collect();
        assert_eq!(edrpou, vec!["Ідентифікаційний код", "EDRPOU"]);
        assert_eq!(
            table.aliases(Field::Name),
            FieldMappingTable::builtin().aliases(Field::Name)
        );
    }

    #[test]
    fn test_city_rules_keep_file_order() {
        let config = Config::from_toml(
            r#"
            [[city_backfill]]
            url_fragment = "portal/a"
            city = "Перше"

            [[city_backfill]]
            url_fragment = "portal"
            city = "Друге"
            "#,
        )
        .unwrap();
        let backfill = config.city_backfill();
        assert_eq!(backfill.rules().len(), 2);
        assert_eq!(backfill.city_for("https://portal/a/1"), Some("Перше"));
        assert_eq!(backfill.city_for("https://portal/b/1"), Some("Друге"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = Config::from_toml("[fields]\npostcode = [\"zip\"]\n").unwrap_err();
        assert!(matches!(err, IngestError::Toml(_)));
    }

    #[test]
    fn test_empty_fragment_is_rejected() {
        let err = Config::from_toml("[[city_backfill]]\nurl_fragment = \" \"\ncity = \"X\"\n").unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[fields]\nphone = [\"tel\"]").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.field_mappings().aliases(Field::Phone)[0].raw(), "tel");

        let missing = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(missing, IngestError::Config(_)));
    }
}
