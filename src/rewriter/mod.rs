//! The reference rewriter.
//!
//! Given a class and a [`RenameTable`], every method body is walked in order and each
//! instruction that names a class is looked up:
//!
//! - field access (`getstatic`, `putstatic`, `getfield`, `putfield`): the owner is replaced
//!   on a hit; name and descriptor are left as they are
//! - method invocation (`invoke*` except `invokedynamic`): same rule, and the interface flag
//!   is kept
//! - constant load of a class literal (`ldc Foo.class`): a new class constant is loaded
//!   on a hit, the original instruction is kept on a miss
//!
//! Everything else passes through untouched. The number, order and kind of instructions
//! never change, and the rewrite cannot fail: a name missing from the table is not an error.
//!
//! Instructions are plain values, so the rewrite is a pure mapping from one instruction list
//! to another. [`session::RewriteSession`] wraps it with table resolution, class selection
//! and batch processing.
//!
//! # Examples
//!
//! ```rust
//! use classremap::bytecode::{opcodes, FieldInsn, Instruction};
//! use classremap::rewriter::rewrite_instructions;
//! use classremap::table::RenameTable;
//!
//! let table: RenameTable = [("lib/R$id", "app/R$id")].into_iter().collect();
//! let body = vec![
//!     Instruction::Field(FieldInsn::new(opcodes::GETSTATIC, "lib/R$id", "title", "I")),
//!     Instruction::simple(opcodes::IRETURN),
//! ];
//!
//! let rewritten = rewrite_instructions(&body, &table);
//! assert_eq!(rewritten[0].referenced_class(), Some("app/R$id"));
//! assert_eq!(rewritten[1], body[1]);
//! ```

pub mod config;
pub mod filter;
pub mod session;

pub use config::RewriteConfig;
pub use filter::ClassFilter;
pub use session::{ClassInput, ClassOutcome, ClassOutput, RewriteSession};

use std::ops::AddAssign;

use serde::Serialize;

use crate::{
    bytecode::{Instruction, LdcInsn, LdcValue},
    classfile::{ClassFile, MethodAttribute},
    table::RenameTable,
};

/// Substitution counts for one class or a whole batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RewriteStats {
    /// Method bodies with at least one substitution
    pub methods: usize,
    /// Field access owners replaced
    pub field_refs: usize,
    /// Method invocation owners replaced
    pub method_refs: usize,
    /// Class literal constants replaced
    pub type_constants: usize,
}

impl RewriteStats {
    /// Total number of instructions that changed.
    #[must_use]
    pub fn substitutions(&self) -> usize {
        self.field_refs + self.method_refs + self.type_constants
    }

    /// `true` if nothing was replaced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.substitutions() == 0
    }
}

impl AddAssign for RewriteStats {
    fn add_assign(&mut self, other: Self) {
        self.methods += other.methods;
        self.field_refs += other.field_refs;
        self.method_refs += other.method_refs;
        self.type_constants += other.type_constants;
    }
}

/// Rewrite one instruction.
///
/// Returns a copy of `instruction` with its class reference replaced if the table has an
/// entry for it, and an identical copy otherwise.
#[must_use]
pub fn rewrite_instruction(instruction: &Instruction, table: &RenameTable) -> Instruction {
    substitute(instruction, table).unwrap_or_else(|| instruction.clone())
}

/// Rewrite a method body, preserving instruction count and order.
#[must_use]
pub fn rewrite_instructions(instructions: &[Instruction], table: &RenameTable) -> Vec<Instruction> {
    instructions
        .iter()
        .map(|instruction| rewrite_instruction(instruction, table))
        .collect()
}

/// Rewrite every method body of `class`.
#[must_use]
pub fn rewrite(class: ClassFile, table: &RenameTable) -> ClassFile {
    rewrite_with_stats(class, table).0
}

/// Rewrite every method body of `class` and count what changed.
#[must_use]
pub fn rewrite_with_stats(mut class: ClassFile, table: &RenameTable) -> (ClassFile, RewriteStats) {
    let mut stats = RewriteStats::default();
    if table.is_empty() {
        return (class, stats);
    }

    for method in &mut class.methods {
        for attribute in &mut method.attributes {
            let MethodAttribute::Code(code) = attribute else {
                continue;
            };

            let mut method_stats = RewriteStats::default();
            for instruction in &mut code.instructions {
                if let Some(replacement) = substitute(instruction, table) {
                    match &replacement {
                        Instruction::Field(_) => method_stats.field_refs += 1,
                        Instruction::Method(_) => method_stats.method_refs += 1,
                        _ => method_stats.type_constants += 1,
                    }
                    *instruction = replacement;
                }
            }

            if !method_stats.is_empty() {
                method_stats.methods = 1;
                stats += method_stats;
            }
        }
    }

    (class, stats)
}

/// The replacement for `instruction`, or `None` if it stays as it is.
///
/// A table entry that maps a name to itself is not a substitution.
fn substitute(instruction: &Instruction, table: &RenameTable) -> Option<Instruction> {
    let renamed = |old: &str| table.get(old).filter(|new| *new != old);

    match instruction {
        Instruction::Field(insn) => {
            let owner = renamed(&insn.owner)?;
            let mut insn = insn.clone();
            insn.owner = owner.to_string();
            insn.index = None;
            Some(Instruction::Field(insn))
        }
        Instruction::Method(insn) => {
            let owner = renamed(&insn.owner)?;
            let mut insn = insn.clone();
            insn.owner = owner.to_string();
            insn.index = None;
            Some(Instruction::Method(insn))
        }
        Instruction::Ldc(insn) => {
            let LdcValue::Type(name) = &insn.value else {
                return None;
            };
            let new_name = renamed(name)?;
            Some(Instruction::Ldc(LdcInsn {
                opcode: insn.opcode,
                value: LdcValue::Type(new_name.to_string()),
                index: None,
            }))
        }
        _ => None,
    }
}
