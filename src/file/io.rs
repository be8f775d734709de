//! Low-level byte order and safe reading/writing utilities for class file parsing.
//!
//! The JVM class file format stores every multi-byte quantity in big-endian order. This
//! module provides bounds-checked helpers to read such values out of a byte buffer and to
//! write them back, either appended to a growing `Vec<u8>` or patched into an existing
//! buffer at a known offset.
//!
//! # Key Components
//!
//! - [`crate::file::io::ClassIO`] - Trait defining big-endian conversion for primitive types
//! - [`crate::file::io::read_be`] / [`crate::file::io::read_be_at`] - Bounds-checked reads
//! - [`crate::file::io::write_be`] - Append a value to an output buffer
//! - [`crate::file::io::write_be_at`] - Patch a value into an existing buffer
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use classremap::file::io::{read_be_at, write_be};
//!
//! let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34];
//! let mut offset = 0;
//! let magic: u32 = read_be_at(&data, &mut offset)?;
//! let major: u16 = read_be_at(&data, &mut offset)?;
//! assert_eq!(magic, 0xCAFE_BABE);
//! assert_eq!(major, 52);
//!
//! let mut out = Vec::new();
//! write_be(&mut out, magic);
//! assert_eq!(out, [0xCA, 0xFE, 0xBA, 0xBE]);
//! # Ok::<(), classremap::Error>(())
//! ```

use crate::Result;

/// Trait for primitive types that can be read from and written to class file data.
///
/// Implemented for all fixed-width integers. Floating point constants are kept as
/// their raw bit patterns (`u32`/`u64`) so that they round trip exactly, NaN payloads
/// included.
pub trait ClassIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_class_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl ClassIO for $ty {
                type Bytes = [u8; $len];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_class_io! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
}

/// Safely reads a value of type `T` in big-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be<T: ClassIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Safely reads a value of type `T` in big-endian byte order at `offset`, advancing it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be_at<T: ClassIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;

    Ok(T::from_be_bytes(read))
}

/// Appends a value of type `T` in big-endian byte order to `out`.
pub fn write_be<T: ClassIO>(out: &mut Vec<u8>, value: T) {
    out.extend_from_slice(value.to_be_bytes().as_ref());
}

/// Writes a value of type `T` in big-endian byte order at `offset`, advancing it.
///
/// Used to back-patch length fields once the size of the data that follows is known.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn write_be_at<T: ClassIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    data[*offset..end].copy_from_slice(value.to_be_bytes().as_ref());
    *offset = end;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_be_u8() {
        let result = read_be::<u8>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x01);
    }

    #[test]
    fn read_be_u16() {
        let result = read_be::<u16>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0102);
    }

    #[test]
    fn read_be_i16() {
        let result = read_be::<i16>(&[0xFF, 0xFE]).unwrap();
        assert_eq!(result, -2);
    }

    #[test]
    fn read_be_u32() {
        let result = read_be::<u32>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0102_0304);
    }

    #[test]
    fn read_be_u64() {
        let result = read_be::<u64>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0102_0304_0506_0708);
    }

    #[test]
    fn read_be_at_advances() {
        let mut offset = 0;
        let first: u16 = read_be_at(&TEST_BUFFER, &mut offset).unwrap();
        let second: u32 = read_be_at(&TEST_BUFFER, &mut offset).unwrap();
        assert_eq!(first, 0x0102);
        assert_eq!(second, 0x0304_0506);
        assert_eq!(offset, 6);
    }

    #[test]
    fn read_be_at_out_of_bounds() {
        let mut offset = 6;
        assert!(matches!(
            read_be_at::<u32>(&TEST_BUFFER, &mut offset),
            Err(crate::Error::OutOfBounds { .. })
        ));
        assert_eq!(offset, 6);
    }

    #[test]
    fn write_be_appends() {
        let mut out = Vec::new();
        write_be(&mut out, 0xCAFE_BABE_u32);
        write_be(&mut out, 52_u16);
        write_be(&mut out, -1_i8);
        assert_eq!(out, [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34, 0xFF]);
    }

    #[test]
    fn write_be_at_patches() {
        let mut data = [0u8; 6];
        let mut offset = 2;
        write_be_at(&mut data, &mut offset, 0x1234_5678_u32).unwrap();
        assert_eq!(data, [0x00, 0x00, 0x12, 0x34, 0x56, 0x78]);
        assert_eq!(offset, 6);
    }

    #[test]
    fn write_be_at_out_of_bounds() {
        let mut data = [0u8; 2];
        let mut offset = 1;
        assert!(write_be_at(&mut data, &mut offset, 1_u16).is_err());
    }
}
