//! Opaque attributes (JVMS §4.7).
//!
//! Attributes the rewriter has no reason to look into are carried as their name index plus
//! raw payload and written back byte for byte.

use crate::{
    classfile::constpool::ConstantPool,
    file::{io::write_be, parser::Parser},
    Result,
};

/// An attribute kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Constant pool index of the attribute name
    pub name_index: u16,
    /// Attribute payload, without the six byte header
    pub data: Vec<u8>,
}

impl Attribute {
    /// Read one attribute including its header.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the payload is truncated.
    pub fn parse(parser: &mut Parser) -> Result<Self> {
        let name_index = parser.read_be::<u16>()?;
        let length = parser.read_be::<u32>()? as usize;
        let data = parser.read_bytes(length)?.to_vec();
        Ok(Attribute { name_index, data })
    }

    /// Write the attribute including its header.
    pub fn write(&self, out: &mut Vec<u8>) {
        write_be(out, self.name_index);
        write_be(out, self.data.len() as u32);
        out.extend_from_slice(&self.data);
    }

    /// Resolve the attribute name.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the name index is not a `CONSTANT_Utf8`.
    pub fn name<'p>(&self, pool: &'p ConstantPool) -> Result<&'p str> {
        pool.utf8(self.name_index)
    }
}

/// Read a `u16` count followed by that many attributes.
pub(crate) fn parse_attributes(parser: &mut Parser) -> Result<Vec<Attribute>> {
    let count = parser.read_be::<u16>()?;
    (0..count).map(|_| Attribute::parse(parser)).collect()
}

/// Write a `u16` count followed by the attributes.
pub(crate) fn write_attributes(attributes: &[Attribute], out: &mut Vec<u8>) {
    write_be(out, attributes.len() as u16);
    for attribute in attributes {
        attribute.write(out);
    }
}
