//! Sources a [`RenameTable`] can be resolved from.
//!
//! The rewriter never resolves a table itself; it receives a finished one. Hosts pick a
//! [`TableProvider`] implementation, call [`TableProvider::resolve`] once per rewrite pass
//! and share the result.
//!
//! - [`InMemoryTable`] - a mapping the host already holds
//! - [`JsonFileTable`] - a flat JSON object on disk
//! - [`TableSource`] - configuration value naming one of the above
//!
//! # Examples
//!
//! ```rust,no_run
//! use classremap::table::{JsonFileTable, TableProvider};
//!
//! let provider = JsonFileTable::new("build/intermediates/r-rename.json");
//! let table = provider.resolve()?;
//! println!("{}: {} renames", provider.describe(), table.len());
//! # Ok::<(), classremap::Error>(())
//! ```

use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::{table::RenameTable, Error, Result};

/// Something that can produce a [`RenameTable`].
///
/// Implementations do no caching: every call to [`TableProvider::resolve`] reads the backing
/// data again.
pub trait TableProvider: Send + Sync {
    /// Build the table.
    ///
    /// # Errors
    /// Returns [`crate::Error::TableUnavailable`] if the backing data cannot be located or
    /// read, and [`crate::Error::TableMalformed`] if it is not a flat string mapping.
    fn resolve(&self) -> Result<RenameTable>;

    /// Human readable description of where the table comes from.
    fn describe(&self) -> String;
}

/// A table the host has already computed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTable {
    entries: HashMap<String, String>,
}

impl InMemoryTable {
    /// Wrap a mapping.
    #[must_use]
    pub fn new(entries: HashMap<String, String>) -> Self {
        InMemoryTable { entries }
    }
}

impl TableProvider for InMemoryTable {
    fn resolve(&self) -> Result<RenameTable> {
        Ok(RenameTable::new(self.entries.clone()))
    }

    fn describe(&self) -> String {
        format!("in-memory table ({} entries)", self.entries.len())
    }
}

/// A JSON file holding one object of old name to new name.
#[derive(Debug, Clone)]
pub struct JsonFileTable {
    path: PathBuf,
}

impl JsonFileTable {
    /// Point at a table file. Nothing is read until [`TableProvider::resolve`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileTable { path: path.into() }
    }

    /// The configured path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableProvider for JsonFileTable {
    fn resolve(&self) -> Result<RenameTable> {
        let origin = self.path.display().to_string();
        let bytes = fs::read(&self.path).map_err(|error| Error::TableUnavailable {
            origin: origin.clone(),
            reason: error.to_string(),
        })?;
        let text = String::from_utf8(bytes).map_err(|error| Error::TableMalformed {
            origin: origin.clone(),
            message: format!("not UTF-8: {error}"),
        })?;

        let table = RenameTable::from_json_str(&text, &origin)?;
        log::info!("Loaded {} renames from {}", table.len(), origin);
        Ok(table)
    }

    fn describe(&self) -> String {
        format!("JSON table {}", self.path.display())
    }
}

/// Where a rename table is configured to come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    /// A JSON file
    File(PathBuf),
    /// A mapping given inline
    Inline(HashMap<String, String>),
}

impl TableSource {
    /// The provider for this source.
    #[must_use]
    pub fn provider(&self) -> Box<dyn TableProvider> {
        match self {
            TableSource::File(path) => Box::new(JsonFileTable::new(path.clone())),
            TableSource::Inline(entries) => Box::new(InMemoryTable::new(entries.clone())),
        }
    }

    /// Resolve this source.
    ///
    /// # Errors
    /// See [`TableProvider::resolve`].
    pub fn resolve(&self) -> Result<RenameTable> {
        self.provider().resolve()
    }

    /// Resolve a source that may not have been configured at all.
    ///
    /// # Errors
    /// Returns [`crate::Error::TableUnavailable`] for `None`, otherwise see
    /// [`TableProvider::resolve`].
    pub fn resolve_optional(source: Option<&TableSource>) -> Result<RenameTable> {
        match source {
            Some(source) => source.resolve(),
            None => Err(Error::TableUnavailable {
                origin: "configuration".to_string(),
                reason: "no rename table configured".to_string(),
            }),
        }
    }
}

impl fmt::Display for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSource::File(path) => write!(f, "{}", path.display()),
            TableSource::Inline(entries) => write!(f, "<inline, {} entries>", entries.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn in_memory() {
        let entries = HashMap::from([("lib/R".to_string(), "app/R".to_string())]);
        let provider = InMemoryTable::new(entries);
        let table = provider.resolve().unwrap();
        assert_eq!(table.get("lib/R"), Some("app/R"));
        assert_eq!(provider.describe(), "in-memory table (1 entries)");
    }

    #[test]
    fn json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"lib/R$id": "app/R$id"}}"#).unwrap();

        let provider = JsonFileTable::new(file.path());
        let table = provider.resolve().unwrap();
        assert_eq!(table.get("lib/R$id"), Some("app/R$id"));
        assert_eq!(provider.path(), file.path());
    }

    #[test]
    fn json_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let provider = JsonFileTable::new(dir.path().join("absent.json"));
        assert!(matches!(
            provider.resolve(),
            Err(Error::TableUnavailable { .. })
        ));
    }

    #[test]
    fn json_file_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"lib/R": 7}}"#).unwrap();
        assert!(matches!(
            JsonFileTable::new(file.path()).resolve(),
            Err(Error::TableMalformed { .. })
        ));
    }

    #[test]
    fn source_not_configured() {
        match TableSource::resolve_optional(None) {
            Err(Error::TableUnavailable { reason, .. }) => {
                assert_eq!(reason, "no rename table configured");
            }
            other => panic!("expected TableUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn source_inline() {
        let source = TableSource::Inline(HashMap::from([(
            "lib/R".to_string(),
            "app/R".to_string(),
        )]));
        let table = TableSource::resolve_optional(Some(&source)).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(source.to_string(), "<inline, 1 entries>");
    }
}
