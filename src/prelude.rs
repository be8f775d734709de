//! # classremap Prelude
//!
//! Glob-import this module to get the types needed for a typical rewrite pass.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all classremap operations
pub use crate::Error;

/// The result type used throughout classremap
pub use crate::Result;

// ================================================================================================
// Rename Tables
// ================================================================================================

/// Old to new internal class names
pub use crate::table::RenameTable;

/// Table providers and configured sources
pub use crate::table::{InMemoryTable, JsonFileTable, TableProvider, TableSource};

// ================================================================================================
// Rewriting
// ================================================================================================

/// Pure rewrite functions
pub use crate::rewriter::{rewrite, rewrite_instruction, rewrite_instructions, rewrite_with_stats};

/// Sessions, filters, configuration and outcomes
pub use crate::rewriter::{
    ClassFilter, ClassInput, ClassOutcome, ClassOutput, RewriteConfig, RewriteSession,
    RewriteStats,
};

// ================================================================================================
// Class Files and Bytecode
// ================================================================================================

/// Class file model
pub use crate::classfile::{ClassFile, Code, ConstantPool, Method, MethodAccessFlags};

/// Instruction model
pub use crate::bytecode::{FieldInsn, Instruction, LdcInsn, LdcValue, MethodInsn};
