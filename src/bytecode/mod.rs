//! JVM bytecode: opcode tables, the structural instruction model and its codec.
//!
//! # Architecture
//!
//! - [`opcodes`] - opcode constants and the per-opcode operand layout table
//! - [`instruction`] - [`Instruction`] and the symbolic shapes the rewriter works on
//! - [`decoder`] - `code` bytes to instructions, resolving constant pool references
//! - [`encoder`] - instructions to `code` bytes, interning and relaying out as needed
//!
//! # Examples
//!
//! ```rust
//! use classremap::bytecode::{decoder, encoder, opcodes, Instruction};
//! use classremap::classfile::ConstantPool;
//!
//! let mut pool = ConstantPool::new();
//! let code = [opcodes::ICONST_0, opcodes::IRETURN];
//!
//! let decoded = decoder::decode(&code, &pool)?;
//! assert_eq!(decoded.instructions[1], Instruction::simple(opcodes::IRETURN));
//!
//! let encoded = encoder::encode(&decoded.instructions, &mut pool)?;
//! assert_eq!(encoded.code, code);
//! # Ok::<(), classremap::Error>(())
//! ```

pub mod decoder;
pub mod encoder;
pub mod instruction;
pub mod opcodes;

pub use instruction::{FieldInsn, Instruction, LdcInsn, LdcValue, MethodInsn};
