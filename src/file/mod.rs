//! Byte-level reading and writing primitives.
//!
//! - [`parser::Parser`] - bounds-checked big-endian cursor over class file bytes
//! - [`io`] - the [`io::ClassIO`] trait plus read/write helpers

pub mod io;
pub mod parser;
