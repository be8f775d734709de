//! A rewrite pass over many classes sharing one resolved table.

use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    classfile::ClassFile,
    rewriter::{filter::ClassFilter, rewrite_with_stats, RewriteStats},
    table::{RenameTable, TableProvider},
    Result,
};

/// What happened to one class.
///
/// Every variant carries the class, so the host can write the result back regardless of
/// the outcome.
#[derive(Debug, Clone)]
pub enum ClassOutcome<T = ClassFile> {
    /// Not selected by the session's filter; returned as given
    Skipped(T),
    /// Selected, but nothing referenced a renamed class; returned as given
    Unchanged(T),
    /// At least one reference was replaced
    Rewritten {
        /// The rewritten class
        class: T,
        /// What was replaced
        stats: RewriteStats,
    },
}

impl<T> ClassOutcome<T> {
    /// The resulting class.
    pub fn into_inner(self) -> T {
        match self {
            ClassOutcome::Skipped(class)
            | ClassOutcome::Unchanged(class)
            | ClassOutcome::Rewritten { class, .. } => class,
        }
    }

    /// Borrow the resulting class.
    pub fn class(&self) -> &T {
        match self {
            ClassOutcome::Skipped(class)
            | ClassOutcome::Unchanged(class)
            | ClassOutcome::Rewritten { class, .. } => class,
        }
    }

    /// Substitution counts, empty unless rewritten.
    pub fn stats(&self) -> RewriteStats {
        match self {
            ClassOutcome::Rewritten { stats, .. } => *stats,
            _ => RewriteStats::default(),
        }
    }

    /// `true` for [`ClassOutcome::Rewritten`].
    pub fn is_rewritten(&self) -> bool {
        matches!(self, ClassOutcome::Rewritten { .. })
    }

    /// `true` for [`ClassOutcome::Skipped`].
    pub fn is_skipped(&self) -> bool {
        matches!(self, ClassOutcome::Skipped(_))
    }
}

/// One class of a batch, identified by where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInput {
    /// File path or archive entry name
    pub name: String,
    /// Class file bytes
    pub bytes: Vec<u8>,
}

impl ClassInput {
    /// Pair a label with class bytes.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        ClassInput {
            name: name.into(),
            bytes,
        }
    }
}

/// Result for one [`ClassInput`], in input order.
#[derive(Debug, Clone)]
pub struct ClassOutput {
    /// Label of the input
    pub name: String,
    /// What happened
    pub outcome: ClassOutcome<Vec<u8>>,
}

/// Holds a resolved [`RenameTable`] and a [`ClassFilter`] for the duration of a pass.
///
/// The table is resolved when the session is opened, before any class is touched, and is
/// never reloaded. Sessions are cheap to clone and safe to share across threads.
///
/// # Examples
///
/// ```rust
/// use classremap::rewriter::{ClassFilter, RewriteSession};
/// use classremap::table::InMemoryTable;
/// use std::collections::HashMap;
///
/// let provider = InMemoryTable::new(HashMap::from([
///     ("lib/R".to_string(), "app/R".to_string()),
/// ]));
/// let session = RewriteSession::open(&provider, ClassFilter::All)?;
/// assert_eq!(session.table().get("lib/R"), Some("app/R"));
/// # Ok::<(), classremap::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct RewriteSession {
    table: Arc<RenameTable>,
    filter: ClassFilter,
    parallel: bool,
}

impl RewriteSession {
    /// Resolve the table from `provider` and open a session.
    ///
    /// # Errors
    /// Returns whatever [`TableProvider::resolve`] fails with.
    pub fn open(provider: &dyn TableProvider, filter: ClassFilter) -> Result<Self> {
        let table = provider.resolve()?;
        log::info!(
            "Resolved {} renames from {}",
            table.len(),
            provider.describe()
        );
        Ok(Self::from_table(table, filter))
    }

    /// Open a session on a table that is already shared.
    #[must_use]
    pub fn new(table: Arc<RenameTable>, filter: ClassFilter) -> Self {
        RewriteSession {
            table,
            filter,
            parallel: true,
        }
    }

    /// Open a session owning `table`.
    #[must_use]
    pub fn from_table(table: RenameTable, filter: ClassFilter) -> Self {
        Self::new(Arc::new(table), filter)
    }

    /// Choose between rayon and sequential batch processing.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The resolved table.
    #[must_use]
    pub fn table(&self) -> &RenameTable {
        &self.table
    }

    /// The class filter.
    #[must_use]
    pub fn filter(&self) -> &ClassFilter {
        &self.filter
    }

    /// `true` if batches run on the rayon pool.
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// `true` if the filter selects `class`. Classes whose name cannot be resolved are
    /// never selected.
    fn selects(&self, class: &ClassFile) -> bool {
        match class.name() {
            Ok(name) => self.filter.matches(name),
            Err(error) => {
                log::warn!("Skipping class with unresolvable name: {error}");
                false
            }
        }
    }

    /// Rewrite a parsed class.
    pub fn rewrite_class(&self, class: ClassFile) -> ClassOutcome {
        if !self.selects(&class) {
            return ClassOutcome::Skipped(class);
        }
        self.rewrite_selected(class)
    }

    fn rewrite_selected(&self, class: ClassFile) -> ClassOutcome {
        let (class, stats) = rewrite_with_stats(class, &self.table);
        if stats.is_empty() {
            return ClassOutcome::Unchanged(class);
        }

        log::debug!(
            "Rewrote {}: {} field, {} method, {} class constant references",
            class.name().unwrap_or("<unnamed>"),
            stats.field_refs,
            stats.method_refs,
            stats.type_constants
        );
        ClassOutcome::Rewritten { class, stats }
    }

    /// Rewrite class file bytes.
    ///
    /// The filter sees the class name before any method body is decoded, so a skipped
    /// class only needs a readable header. Skipped and unchanged classes come back as a
    /// copy of `bytes`, not re-encoded.
    ///
    /// # Errors
    /// Returns the class-format error if `bytes` cannot be parsed or the rewritten class
    /// cannot be written.
    pub fn rewrite_bytes(&self, bytes: &[u8]) -> Result<ClassOutcome<Vec<u8>>> {
        match ClassFile::peek_name(bytes)? {
            Some(name) if self.filter.matches(&name) => {}
            Some(_) => return Ok(ClassOutcome::Skipped(bytes.to_vec())),
            None => {
                log::warn!("Skipping class with undecodable name");
                return Ok(ClassOutcome::Skipped(bytes.to_vec()));
            }
        }

        let class = ClassFile::parse(bytes)?;
        match self.rewrite_selected(class) {
            ClassOutcome::Skipped(_) => Ok(ClassOutcome::Skipped(bytes.to_vec())),
            ClassOutcome::Unchanged(_) => Ok(ClassOutcome::Unchanged(bytes.to_vec())),
            ClassOutcome::Rewritten { class, stats } => Ok(ClassOutcome::Rewritten {
                class: class.to_bytes()?,
                stats,
            }),
        }
    }

    /// Rewrite many classes, keeping input order.
    ///
    /// Classes are independent of each other, so the batch runs on the rayon pool unless
    /// the session was made sequential.
    ///
    /// # Errors
    /// The first class that fails aborts the batch; no partial results are returned.
    pub fn rewrite_batch(&self, inputs: Vec<ClassInput>) -> Result<Vec<ClassOutput>> {
        let process = |input: ClassInput| -> Result<ClassOutput> {
            let outcome = self.rewrite_bytes(&input.bytes).inspect_err(|error| {
                log::error!("Failed to rewrite {}: {error}", input.name);
            })?;
            Ok(ClassOutput {
                name: input.name,
                outcome,
            })
        };

        if self.parallel {
            inputs.into_par_iter().map(process).collect()
        } else {
            inputs.into_iter().map(process).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        bytecode::{opcodes, FieldInsn, Instruction},
        classfile::{Code, MethodAccessFlags},
        table::InMemoryTable,
        Error,
    };

    fn class(name: &str, owner: &str) -> Vec<u8> {
        let mut class = ClassFile::new(name, Some("java/lang/Object")).unwrap();
        class.add_method(
            MethodAccessFlags::STATIC,
            "value",
            "()I",
            Some(Code::new(
                1,
                0,
                vec![
                    Instruction::Field(FieldInsn::new(opcodes::GETSTATIC, owner, "title", "I")),
                    Instruction::simple(opcodes::IRETURN),
                ],
            )),
        );
        class.to_bytes().unwrap()
    }

    fn session(filter: ClassFilter) -> RewriteSession {
        let provider = InMemoryTable::new(HashMap::from([(
            "lib/R$id".to_string(),
            "app/R$id".to_string(),
        )]));
        RewriteSession::open(&provider, filter).unwrap()
    }

    #[test]
    fn rewrite_bytes_outcomes() {
        let session = session(ClassFilter::Prefix("app/".into()));

        let skipped = class("lib/Widget", "lib/R$id");
        let outcome = session.rewrite_bytes(&skipped).unwrap();
        assert!(outcome.is_skipped());
        assert_eq!(outcome.into_inner(), skipped);

        let unchanged = class("app/Main", "lib/Other");
        let outcome = session.rewrite_bytes(&unchanged).unwrap();
        assert!(matches!(outcome, ClassOutcome::Unchanged(_)));
        assert_eq!(outcome.class(), &unchanged);

        let outcome = session.rewrite_bytes(&class("app/Main", "lib/R$id")).unwrap();
        assert!(outcome.is_rewritten());
        assert_eq!(outcome.stats().field_refs, 1);
        assert_eq!(outcome.stats().methods, 1);

        let parsed = ClassFile::parse(outcome.class()).unwrap();
        let code = parsed.methods[0].code().unwrap();
        assert_eq!(code.instructions[0].referenced_class(), Some("app/R$id"));
    }

    #[test]
    fn skipped_class_body_is_not_decoded() {
        let mut bytes = class("lib/Widget", "lib/R$id");
        // getstatic #n; ireturn
        let position = bytes
            .windows(4)
            .rposition(|window| window[0] == opcodes::GETSTATIC && window[3] == opcodes::IRETURN)
            .unwrap();
        bytes[position] = 0xCB;
        assert!(ClassFile::parse(&bytes).is_err());

        let outcome = session(ClassFilter::Prefix("app/".into()))
            .rewrite_bytes(&bytes)
            .unwrap();
        assert!(outcome.is_skipped());
        assert_eq!(outcome.into_inner(), bytes);

        let result = session(ClassFilter::All).rewrite_bytes(&bytes);
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn batch_keeps_order() {
        let inputs = (0..16)
            .map(|n| {
                let owner = if n % 2 == 0 { "lib/R$id" } else { "lib/Other" };
                ClassInput::new(format!("c{n}.class"), class(&format!("app/C{n}"), owner))
            })
            .collect::<Vec<_>>();

        for parallel in [true, false] {
            let outputs = session(ClassFilter::All)
                .with_parallel(parallel)
                .rewrite_batch(inputs.clone())
                .unwrap();
            assert_eq!(outputs.len(), 16);
            for (n, output) in outputs.iter().enumerate() {
                assert_eq!(output.name, format!("c{n}.class"));
                assert_eq!(output.outcome.is_rewritten(), n % 2 == 0);
            }
        }
    }

    #[test]
    fn batch_aborts_on_first_failure() {
        let inputs = vec![
            ClassInput::new("good.class", class("app/Good", "lib/R$id")),
            ClassInput::new("bad.class", vec![0xCA, 0xFE]),
        ];
        let result = session(ClassFilter::All).rewrite_batch(inputs);
        assert!(matches!(result, Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn session_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RewriteSession>();
        assert_send_sync::<Arc<RenameTable>>();
    }
}
