use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{Diagnostic, Parser, RowResult, Rows, SourceRow};
use crate::constants::{JSON_CONTAINER_KEYS, UTF8_BOM};
use crate::pipeline::processing::normalize::FlatFieldMap;

/// JSON documents, API responses and GeoJSON feature collections
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for JsonParser {
    fn name(&self) -> &'static str {
        "JsonParser"
    }

    fn rows(&self, content: Vec<u8>, source_url: &str) -> Result<Rows, Diagnostic> {
        debug!("JsonParser: start bytes_len={}", content.len());
        let body = content.strip_prefix(UTF8_BOM).unwrap_or(&content[..]);
        let root: Value =
            serde_json::from_slice(body).map_err(|e| Diagnostic::parse_failure(source_url, e))?;

        let entries = locate_entries(root).ok_or_else(|| Diagnostic::StructureNotFound {
            source_url: source_url.to_string(),
        })?;
        if entries.is_empty() {
            return Err(Diagnostic::EmptyDataset {
                source_url: source_url.to_string(),
            });
        }
        info!("JsonParser: found entries count={} in {}", entries.len(), source_url);

        let source_url = source_url.to_string();
        let rows = entries
            .into_iter()
            .enumerate()
            .map(move |(index, entry)| -> RowResult {
                match resolution_source(entry) {
                    Some(object) => Ok(SourceRow {
                        index,
                        fields: flatten_object(object),
                    }),
                    None => Err(Diagnostic::NonMappingEntry {
                        source_url: source_url.clone(),
                        index,
                    }),
                }
            });
        Ok(Box::new(rows))
    }
}

/// Find the list of entity entries: the root itself if it is an array, otherwise
/// the first of `data`, `records`, `features` that holds an array.
fn locate_entries(root: Value) -> Option<Vec<Value>> {
    match root {
        Value::Array(entries) => Some(entries),
        Value::Object(mut object) => JSON_CONTAINER_KEYS.iter().find_map(|key| {
            if !matches!(object.get(*key), Some(Value::Array(_))) {
                return None;
            }
            debug!("JsonParser: using container key '{}'", key);
            match object.remove(*key) {
                Some(Value::Array(entries)) => Some(entries),
                _ => None,
            }
        }),
        _ => None,
    }
}

/// The object fields are resolved from. GeoJSON features contribute only their
/// `properties`; any other object is used as-is; non-objects have none.
fn resolution_source(entry: Value) -> Option<Map<String, Value>> {
    let Value::Object(mut object) = entry else {
        return None;
    };
    let is_feature = object.get("type").and_then(Value::as_str) == Some("Feature");
    if is_feature && matches!(object.get("properties"), Some(Value::Object(_))) {
        if let Some(Value::Object(properties)) = object.remove("properties") {
            return Some(properties);
        }
    }
    Some(object)
}

fn flatten_object(object: Map<String, Value>) -> FlatFieldMap {
    FlatFieldMap::from_pairs(
        object
            .into_iter()
            .map(|(key, value)| (key, value_text(value))),
    )
}

/// Text form of a property value: strings verbatim, null as empty, anything
/// else as its compact JSON text.
fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
