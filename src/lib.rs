// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # classremap
//!
//! Rewrites class references inside compiled JVM method bodies according to a rename table.
//!
//! When several independently compiled libraries are merged into one artifact, their
//! generated resource classes (`lib/R`, `lib/R$id`, ...) are merged or renamed. Every method
//! body that still names one of the old classes has to be pointed at the new one, without
//! recompiling and without changing what the code does. `classremap` does exactly that, at
//! the bytecode level:
//!
//! - field accesses and method invocations whose owner is in the table get the new owner
//! - class literal loads (`ldc Foo.class`) of a class in the table load the new class
//! - everything else is left byte for byte as it was
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use classremap::prelude::*;
//!
//! let session = RewriteSession::open(
//!     &JsonFileTable::new("build/r-rename.json"),
//!     ClassFilter::All,
//! )?;
//!
//! let input = std::fs::read("build/classes/app/MainActivity.class")?;
//! match session.rewrite_bytes(&input)? {
//!     ClassOutcome::Rewritten { class, stats } => {
//!         println!("{} references rewritten", stats.substitutions());
//!         std::fs::write("build/classes/app/MainActivity.class", class)?;
//!     }
//!     _ => println!("nothing to do"),
//! }
//! # Ok::<(), classremap::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`table`] - [`table::RenameTable`] and the providers it is resolved from
//! - [`rewriter`] - the pure instruction rewrite, plus sessions, filters and batches
//! - [`classfile`] - class file parsing and writing
//! - [`bytecode`] - the instruction model and its decoder and encoder
//!
//! Classes that are parsed and written back without changes come out byte-identical. A
//! rewrite only appends constants to the pool; if that pushes a class literal past index
//! 255 the affected `ldc` is widened and the method body is laid out again, with branch
//! offsets, exception handlers, line numbers, local variable ranges and stack map frames
//! moved along.
//!
//! ## Thread Safety
//!
//! [`table::RenameTable`] is immutable once built and [`rewriter::RewriteSession`] only
//! holds it behind an [`std::sync::Arc`], so one session can rewrite any number of classes
//! concurrently. [`rewriter::RewriteSession::rewrite_batch`] does so on the rayon pool.

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use classremap::prelude::*;
///
/// let table: RenameTable = [("lib/R", "app/R")].into_iter().collect();
/// let session = RewriteSession::from_table(table, ClassFilter::All);
/// assert!(session.table().contains("lib/R"));
/// ```
pub mod prelude;

/// JVM instructions and their decoder and encoder.
pub mod bytecode;

/// Class file model: constant pool, methods and the `Code` attribute.
pub mod classfile;

/// The rename table and the providers it is resolved from.
pub mod table;

/// The reference rewriter and the session that drives it over many classes.
///
/// # Key Types
///
/// - [`rewriter::RewriteSession`] - resolved table plus class filter
/// - [`rewriter::ClassFilter`] - which classes are rewritten
/// - [`rewriter::RewriteConfig`] - host configuration that opens a session
/// - [`rewriter::RewriteStats`] - what a rewrite changed
pub mod rewriter;

/// `classremap` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `classremap` Error type
///
/// # Examples
///
/// ```rust
/// use classremap::{classfile::ClassFile, Error};
///
/// match ClassFile::parse(&[0xDE, 0xAD, 0xBE, 0xEF]) {
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {message}"),
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub use error::Error;

/// Bounds-checked big-endian cursor used by every parser in the crate.
pub use file::parser::Parser;
