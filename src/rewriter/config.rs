//! Configuration for a rewrite run.

use crate::{
    rewriter::{filter::ClassFilter, session::RewriteSession},
    table::TableSource,
    Result,
};

/// Everything a host needs to decide before rewriting.
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    /// Where the rename table comes from. Must be set before a session can open.
    pub table: Option<TableSource>,

    /// Classes to rewrite (default: all).
    pub filter: ClassFilter,

    /// Rewrite batches on the rayon pool (default: true).
    pub parallel: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            table: None,
            filter: ClassFilter::All,
            parallel: true,
        }
    }
}

impl RewriteConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the table source.
    #[must_use]
    pub fn with_table(mut self, table: TableSource) -> Self {
        self.table = Some(table);
        self
    }

    /// Set the class filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ClassFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Process batches sequentially.
    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Resolve the table and open a session.
    ///
    /// # Errors
    /// Returns [`crate::Error::TableUnavailable`] if no table is configured or it cannot be
    /// read, and [`crate::Error::TableMalformed`] if it is not a flat string mapping.
    pub fn open_session(&self) -> Result<RewriteSession> {
        let table = TableSource::resolve_optional(self.table.as_ref())?;
        Ok(RewriteSession::from_table(table, self.filter.clone()).with_parallel(self.parallel))
    }
}
