use std::collections::HashMap;

use super::normalize_key;
use crate::constants::DEFAULT_FIELD_ALIASES;
use crate::types::Field;

/// A source column name accepted for a canonical field, with its lookup token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    raw: String,
    token: String,
}

impl Alias {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let token = normalize_key(&raw);
        Self { raw, token }
    }

    /// The alias as configured
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The alias after key normalization
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Read-only mapping from canonical field to aliases, highest priority first.
///
/// Built once and shared (typically behind an `Arc`) by every parse invocation.
/// Fields without an entry resolve to an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMappingTable {
    aliases: HashMap<Field, Vec<Alias>>,
}

impl FieldMappingTable {
    pub fn new<I, A, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Field, A)>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let aliases = entries
            .into_iter()
            .map(|(field, list)| {
                let list = list
                    .into_iter()
                    .map(Alias::new)
                    .filter(|alias| !alias.token.is_empty())
                    .collect();
                (field, list)
            })
            .collect();
        Self { aliases }
    }

    /// The built-in alias lists collected from the known portals
    pub fn builtin() -> Self {
        Self::new(
            DEFAULT_FIELD_ALIASES
                .iter()
                .map(|(field, aliases)| (*field, aliases.iter().copied())),
        )
    }

    /// Return a copy of this table with `field`'s aliases replaced
    pub fn with_aliases<A, S>(mut self, field: Field, aliases: A) -> Self
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = aliases
            .into_iter()
            .map(Alias::new)
            .filter(|alias| !alias.token.is_empty())
            .collect();
        self.aliases.insert(field, list);
        self
    }

    pub fn aliases(&self, field: Field) -> &[Alias] {
        self.aliases.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for FieldMappingTable {
    fn default() -> Self {
        Self::builtin()
    }
}
