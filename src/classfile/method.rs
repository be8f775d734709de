//! Fields and methods (JVMS §4.5, §4.6).

use bitflags::bitflags;

use crate::{
    classfile::{
        attribute::{parse_attributes, write_attributes, Attribute},
        code::Code,
        constpool::ConstantPool,
    },
    file::{io::write_be, parser::Parser},
    Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method `access_flags`
    pub struct MethodAccessFlags: u16 {
        /// Declared `public`
        const PUBLIC = 0x0001;
        /// Declared `private`
        const PRIVATE = 0x0002;
        /// Declared `protected`
        const PROTECTED = 0x0004;
        /// Declared `static`
        const STATIC = 0x0008;
        /// Declared `final`
        const FINAL = 0x0010;
        /// Declared `synchronized`
        const SYNCHRONIZED = 0x0020;
        /// Compiler-generated bridge method
        const BRIDGE = 0x0040;
        /// Variable arity
        const VARARGS = 0x0080;
        /// Declared `native`
        const NATIVE = 0x0100;
        /// Declared `abstract`
        const ABSTRACT = 0x0400;
        /// Declared `strictfp`
        const STRICT = 0x0800;
        /// Not present in source
        const SYNTHETIC = 0x1000;
    }
}

/// A field, kept opaque apart from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Raw `access_flags`
    pub access_flags: u16,
    /// Constant pool index of the field name
    pub name_index: u16,
    /// Constant pool index of the field descriptor
    pub descriptor_index: u16,
    /// Field attributes
    pub attributes: Vec<Attribute>,
}

impl Field {
    pub(crate) fn parse(parser: &mut Parser) -> Result<Self> {
        Ok(Field {
            access_flags: parser.read_be()?,
            name_index: parser.read_be()?,
            descriptor_index: parser.read_be()?,
            attributes: parse_attributes(parser)?,
        })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        write_be(out, self.access_flags);
        write_be(out, self.name_index);
        write_be(out, self.descriptor_index);
        write_attributes(&self.attributes, out);
    }

    /// Resolve the field name.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the name index is not a `CONSTANT_Utf8`.
    pub fn name<'p>(&self, pool: &'p ConstantPool) -> Result<&'p str> {
        pool.utf8(self.name_index)
    }
}

/// An attribute attached to a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodAttribute {
    /// The decoded method body
    Code(Code),
    /// Anything else, as raw bytes
    Other(Attribute),
}

/// A method with its name, descriptor and body resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// Access flags, unknown bits preserved
    pub access_flags: MethodAccessFlags,
    /// Method name, with U+FFFD for text that does not decode
    pub name: String,
    /// Method descriptor, with U+FFFD for text that does not decode
    pub descriptor: String,
    /// Attributes in class file order
    pub attributes: Vec<MethodAttribute>,
    name_index: Option<u16>,
    descriptor_index: Option<u16>,
}

impl Method {
    /// A method built in memory.
    pub fn new(
        access_flags: MethodAccessFlags,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        code: Option<Code>,
    ) -> Self {
        Method {
            access_flags,
            name: name.into(),
            descriptor: descriptor.into(),
            attributes: code.map(MethodAttribute::Code).into_iter().collect(),
            name_index: None,
            descriptor_index: None,
        }
    }

    pub(crate) fn parse(parser: &mut Parser, pool: &ConstantPool) -> Result<Self> {
        let access_flags = MethodAccessFlags::from_bits_retain(parser.read_be()?);
        let name_index = parser.read_be::<u16>()?;
        let descriptor_index = parser.read_be::<u16>()?;

        let attributes = parse_attributes(parser)?
            .into_iter()
            .map(|attribute| {
                if pool.utf8_entry(attribute.name_index)?.text() == Some("Code") {
                    Ok(MethodAttribute::Code(Code::parse(
                        attribute.name_index,
                        &attribute.data,
                        pool,
                    )?))
                } else {
                    Ok(MethodAttribute::Other(attribute))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Method {
            access_flags,
            name: pool.utf8_entry(name_index)?.to_string_lossy().into_owned(),
            descriptor: pool.utf8_entry(descriptor_index)?.to_string_lossy().into_owned(),
            attributes,
            name_index: Some(name_index),
            descriptor_index: Some(descriptor_index),
        })
    }

    pub(crate) fn write(&self, pool: &mut ConstantPool, out: &mut Vec<u8>) -> Result<()> {
        let name_index = utf8_index(pool, self.name_index, &self.name)?;
        let descriptor_index = utf8_index(pool, self.descriptor_index, &self.descriptor)?;

        write_be(out, self.access_flags.bits());
        write_be(out, name_index);
        write_be(out, descriptor_index);
        write_be(out, self.attributes.len() as u16);
        for attribute in &self.attributes {
            match attribute {
                MethodAttribute::Code(code) => code.write(pool, out)?,
                MethodAttribute::Other(attribute) => attribute.write(out),
            }
        }
        Ok(())
    }

    /// The method body, if the method has one.
    #[must_use]
    pub fn code(&self) -> Option<&Code> {
        self.attributes.iter().find_map(|attribute| match attribute {
            MethodAttribute::Code(code) => Some(code),
            MethodAttribute::Other(_) => None,
        })
    }

    /// Mutable access to the method body.
    pub fn code_mut(&mut self) -> Option<&mut Code> {
        self.attributes.iter_mut().find_map(|attribute| match attribute {
            MethodAttribute::Code(code) => Some(code),
            MethodAttribute::Other(_) => None,
        })
    }
}

/// Reuse `hint` if it still holds `text`, otherwise intern. An undecodable entry is kept
/// as long as the text it was read as is unchanged.
fn utf8_index(pool: &mut ConstantPool, hint: Option<u16>, text: &str) -> Result<u16> {
    match hint {
        Some(index)
            if pool
                .utf8_entry(index)
                .is_ok_and(|found| found.to_string_lossy() == text) =>
        {
            Ok(index)
        }
        _ => pool.intern_utf8(text),
    }
}
