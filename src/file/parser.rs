//! Low-level byte stream parser for class file decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary data
//! parser used for reading class file structures and JVM bytecode. Every read is bounds
//! checked and big-endian, as mandated by the class file format.
//!
//! # Usage Examples
//!
//! ```rust
//! use classremap::Parser;
//!
//! let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34];
//! let mut parser = Parser::new(&data);
//!
//! let magic = parser.read_be::<u32>()?;
//! assert_eq!(magic, 0xCAFE_BABE);
//!
//! parser.seek(6)?;
//! let major = parser.read_be::<u16>()?;
//! assert_eq!(major, 52);
//! # Ok::<(), classremap::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, ClassIO},
    Result,
};

/// A binary data parser for reading class file structures.
///
/// `Parser` maintains an internal position cursor and provides bounds checking to prevent
/// buffer overruns when reading malformed or truncated class files.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use classremap::Parser;
    /// let data = [0x01, 0x02, 0x03, 0x04];
    /// let parser = Parser::new(&data);
    /// assert_eq!(parser.len(), 4);
    /// ```
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to exactly the end of the data is allowed; it leaves nothing to read.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        self.position = self.calc_end_position(step)?;
        Ok(())
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Number of bytes left between the cursor and the end of the data.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Peek at the next byte without advancing the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is at or beyond the data length.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or_else(|| out_of_bounds_error!())
    }

    /// Read a type `T` from the current position in big-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use classremap::Parser;
    /// let data = [0x01, 0x02, 0x03, 0x04];
    /// let mut parser = Parser::new(&data);
    ///
    /// let value: u16 = parser.read_be()?;
    /// assert_eq!(value, 0x0102);
    /// assert_eq!(parser.pos(), 2);
    /// # Ok::<(), classremap::Error>(())
    /// ```
    pub fn read_be<T: ClassIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Calculate the position `length` bytes ahead of the cursor, checking bounds.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the end position would exceed the data length.
    pub fn calc_end_position(&self, length: usize) -> Result<usize> {
        match self.position.checked_add(length) {
            Some(end) if end <= self.data.len() => Ok(end),
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Read `length` raw bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read a `u16`-length-prefixed byte string, as stored in `CONSTANT_Utf8_info`
    /// entries.
    ///
    /// The bytes are returned undecoded; see [`decode_modified_utf8`].
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the string is truncated.
    pub fn read_prefixed_bytes(&mut self) -> Result<&'a [u8]> {
        let length = self.read_be::<u16>()? as usize;
        self.read_bytes(length)
    }
}

/// Decode the modified UTF-8 encoding used by class files.
///
/// Standard UTF-8 input decodes directly. Modified UTF-8 (encoded NUL, surrogate pairs)
/// goes through the UTF-16 code units it stands for.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] on invalid sequences and on unpaired surrogates,
/// which the JVM accepts but a Rust string cannot hold.
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        if !text.contains('\0') {
            return Ok(text.to_string());
        }
    }

    String::from_utf16(&decode_units(bytes)?)
        .map_err(|_| malformed_error!("Unpaired surrogate in modified UTF-8"))
}

/// Decode modified UTF-8, replacing whatever cannot be represented with U+FFFD.
#[must_use]
pub fn decode_modified_utf8_lossy(bytes: &[u8]) -> String {
    match decode_units(bytes) {
        Ok(units) => String::from_utf16_lossy(&units),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn decode_units(bytes: &[u8]) -> Result<Vec<u16>> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        let a = u16::from(bytes[index]);
        if a & 0x80 == 0 {
            if a == 0 {
                return Err(malformed_error!("Raw NUL byte in modified UTF-8 at {}", index));
            }
            units.push(a);
            index += 1;
        } else if a & 0xE0 == 0xC0 {
            let b = continuation(bytes, index + 1)?;
            units.push(((a & 0x1F) << 6) | b);
            index += 2;
        } else if a & 0xF0 == 0xE0 {
            let b = continuation(bytes, index + 1)?;
            let c = continuation(bytes, index + 2)?;
            units.push(((a & 0x0F) << 12) | (b << 6) | c);
            index += 3;
        } else {
            return Err(malformed_error!("Invalid modified UTF-8 lead byte 0x{:02X}", a));
        }
    }
    Ok(units)
}

/// Encode a string as modified UTF-8.
///
/// NUL becomes `C0 80` and supplementary characters become surrogate pairs, each encoded
/// in three bytes.
#[must_use]
pub fn encode_modified_utf8(text: &str) -> Vec<u8> {
    if !text.contains('\0') && text.chars().all(|c| (c as u32) < 0x10000) {
        return text.as_bytes().to_vec();
    }

    let mut out = Vec::with_capacity(text.len() + 8);
    for unit in text.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

fn continuation(bytes: &[u8], index: usize) -> Result<u16> {
    match bytes.get(index) {
        Some(byte) if byte & 0xC0 == 0x80 => Ok(u16::from(byte & 0x3F)),
        Some(byte) => Err(malformed_error!(
            "Invalid modified UTF-8 continuation byte 0x{:02X}",
            byte
        )),
        None => Err(out_of_bounds_error!()),
    }
}
