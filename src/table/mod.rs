//! The rename table: which class names are rewritten to what.
//!
//! A [`RenameTable`] maps old internal class names (`lib/R$id`) to their replacements
//! (`app/R$id`). A name that is not in the table is simply left alone; a miss is never an
//! error. Tables are built once, by a [`provider::TableProvider`], and shared read-only
//! across every class of a rewrite pass.
//!
//! # Examples
//!
//! ```rust
//! use classremap::table::RenameTable;
//!
//! let table: RenameTable = [("lib/R", "app/R"), ("lib/R$id", "app/R$id")]
//!     .into_iter()
//!     .collect();
//!
//! assert_eq!(table.get("lib/R$id"), Some("app/R$id"));
//! assert_eq!(table.get("lib/Other"), None);
//! assert_eq!(table.len(), 2);
//! ```

pub mod provider;

pub use provider::{InMemoryTable, JsonFileTable, TableProvider, TableSource};

use std::collections::HashMap;

use crate::{Error, Result};

/// Immutable mapping from old internal class names to new ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameTable {
    entries: HashMap<String, String>,
}

impl RenameTable {
    /// Wrap an existing mapping.
    #[must_use]
    pub fn new(entries: HashMap<String, String>) -> Self {
        RenameTable { entries }
    }

    /// Parse a flat JSON object of string to string.
    ///
    /// `origin` only labels errors and log output, typically the path the text came from.
    ///
    /// # Errors
    /// Returns [`crate::Error::TableMalformed`] if the text is not JSON, is not an object,
    /// or holds a value that is not a string.
    pub fn from_json_str(text: &str, origin: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|error| Error::TableMalformed {
                origin: origin.to_string(),
                message: error.to_string(),
            })?;

        let object = match value {
            serde_json::Value::Object(object) => object,
            other => {
                return Err(Error::TableMalformed {
                    origin: origin.to_string(),
                    message: format!("expected a JSON object, found {}", json_kind(&other)),
                })
            }
        };

        let mut entries = HashMap::with_capacity(object.len());
        for (key, value) in object {
            let new_name = match value {
                serde_json::Value::String(new_name) => new_name,
                other => {
                    return Err(Error::TableMalformed {
                        origin: origin.to_string(),
                        message: format!(
                            "value for \"{key}\" must be a string, found {}",
                            json_kind(&other)
                        ),
                    })
                }
            };
            if key.contains('.') && !key.contains('/') {
                log::warn!(
                    "{origin}: key \"{key}\" looks like a dotted source name; \
                     rename tables use slash-separated internal names"
                );
            }
            entries.insert(key, new_name);
        }

        Ok(RenameTable { entries })
    }

    /// Replacement for `old`, if any.
    #[must_use]
    pub fn get(&self, old: &str) -> Option<&str> {
        self.entries.get(old).map(String::as_str)
    }

    /// `true` if `old` has a replacement.
    #[must_use]
    pub fn contains(&self, old: &str) -> bool {
        self.entries.contains_key(old)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the table renames nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(old, new)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(old, new)| (old.as_str(), new.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for RenameTable
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RenameTable {
            entries: iter
                .into_iter()
                .map(|(old, new)| (old.into(), new.into()))
                .collect(),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
