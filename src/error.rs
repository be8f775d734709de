use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors fall into two groups. Rename table resolution fails with
/// [`Error::TableUnavailable`] or [`Error::TableMalformed`]; both are fatal for a whole
/// rewrite phase. Everything else comes from the class-format layer (reading or writing
/// class files). The reference rewriter itself never fails.
///
/// # Error Categories
///
/// ## Rename Table Errors
/// - [`Error::TableUnavailable`] - The backing data could not be located or read
/// - [`Error::TableMalformed`] - The backing data is not a flat string-to-string mapping
///
/// ## Class Format Errors
/// - [`Error::Malformed`] - Corrupted or invalid class file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of the input
/// - [`Error::ConstantPoolFull`] - Writing would need more than 65535 constant pool slots
/// - [`Error::Relayout`] - A method body could not be laid out again after widening
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// # Examples
///
/// ```rust,no_run
/// use classremap::{Error, table::{JsonFileTable, TableProvider}};
///
/// match JsonFileTable::new("build/transform-table.json").resolve() {
///     Ok(table) => println!("{} renames", table.len()),
///     Err(Error::TableUnavailable { origin, reason }) => {
///         eprintln!("no table at {origin}: {reason}");
///     }
///     Err(Error::TableMalformed { origin, message }) => {
///         eprintln!("bad table in {origin}: {message}");
///     }
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The backing data for the rename table cannot be located.
    ///
    /// Raised for a missing or unreadable table file, or when no table source was
    /// configured at all. Non-recoverable for the build step.
    #[error("Rename table unavailable ({origin}): {reason}")]
    TableUnavailable {
        /// Where the table was expected to come from
        origin: String,
        /// Why it could not be loaded
        reason: String,
    },

    /// The backing data exists but is not a flat string-to-string mapping.
    ///
    /// Raised for invalid JSON, a JSON document that is not an object, or an object
    /// with a non-string value.
    #[error("Rename table malformed ({origin}): {message}")]
    TableMalformed {
        /// Where the table came from
        origin: String,
        /// What is wrong with it
        message: String,
    },

    /// The class file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the input.
    #[error("Out of Bound read would have occurred - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The constant pool cannot hold the entries a rewritten class needs.
    #[error("Constant pool is full, cannot add more than 65535 entries")]
    ConstantPoolFull,

    /// A method body could not be laid out again.
    ///
    /// Widening an `ldc` to `ldc_w` shifts every following instruction. If a branch
    /// no longer fits its encoding, or the `Code` attribute carries offsets that cannot
    /// be remapped, writing the class fails with this error.
    #[error("Cannot relayout method body: {0}")]
    Relayout(String),

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}
