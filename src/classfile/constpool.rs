//! The class file constant pool (JVMS §4.4).
//!
//! [`ConstantPool`] keeps every entry exactly as read so that writing an untouched class
//! reproduces the input bytes. On top of the raw entries it offers:
//!
//! - symbolic lookups ([`ConstantPool::class_name`], [`ConstantPool::member_ref`],
//!   [`ConstantPool::ldc_value`]) used by the bytecode decoder
//! - interning ([`ConstantPool::intern_class`], [`ConstantPool::intern_member_ref`], ...),
//!   which returns the index of an existing identical entry or appends a new one
//!
//! Entries are only ever appended, so every index stored anywhere else in the class stays
//! valid across a rewrite.
//!
//! `CONSTANT_Utf8` entries keep their raw bytes. Text that has no Rust string form (an
//! unpaired surrogate, for one) is written back as read and never matches a lookup.

use std::{borrow::Cow, collections::HashMap};

use strum::{Display, FromRepr};

use crate::{
    bytecode::LdcValue,
    file::{
        io::write_be,
        parser::{decode_modified_utf8, decode_modified_utf8_lossy, encode_modified_utf8, Parser},
    },
    Error, Result,
};

/// Constant pool entry tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ConstantTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}

/// The payload of a `CONSTANT_Utf8` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Utf8Entry {
    bytes: Vec<u8>,
    /// `None` if the bytes do not decode to a Rust string
    text: Option<String>,
}

impl Utf8Entry {
    /// An entry for `text`, encoded as modified UTF-8.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Utf8Entry {
            bytes: encode_modified_utf8(text),
            text: Some(text.to_string()),
        }
    }

    /// An entry for bytes read from a class file.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let text = decode_modified_utf8(&bytes).ok();
        Utf8Entry { bytes, text }
    }

    /// The encoded bytes, as they are written.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The decoded text, if there is one.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The decoded text, with U+FFFD for what does not decode.
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match &self.text {
            Some(text) => Cow::Borrowed(text),
            None => Cow::Owned(decode_modified_utf8_lossy(&self.bytes)),
        }
    }
}

/// One constant pool slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Constant {
    /// Slot 0 and the second slot of every `Long`/`Double`
    Unusable,
    Utf8(Utf8Entry),
    Integer(i32),
    /// Raw IEEE 754 bits
    Float(u32),
    Long(i64),
    /// Raw IEEE 754 bits
    Double(u64),
    Class {
        name_index: u16,
    },
    String {
        string_index: u16,
    },
    FieldRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    MethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
}

impl Constant {
    /// `Long` and `Double` take two slots.
    #[must_use]
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }

    fn tag(&self) -> Option<ConstantTag> {
        let tag = match self {
            Constant::Unusable => return None,
            Constant::Utf8(_) => ConstantTag::Utf8,
            Constant::Integer(_) => ConstantTag::Integer,
            Constant::Float(_) => ConstantTag::Float,
            Constant::Long(_) => ConstantTag::Long,
            Constant::Double(_) => ConstantTag::Double,
            Constant::Class { .. } => ConstantTag::Class,
            Constant::String { .. } => ConstantTag::String,
            Constant::FieldRef { .. } => ConstantTag::FieldRef,
            Constant::MethodRef { .. } => ConstantTag::MethodRef,
            Constant::InterfaceMethodRef { .. } => ConstantTag::InterfaceMethodRef,
            Constant::NameAndType { .. } => ConstantTag::NameAndType,
            Constant::MethodHandle { .. } => ConstantTag::MethodHandle,
            Constant::MethodType { .. } => ConstantTag::MethodType,
            Constant::Dynamic { .. } => ConstantTag::Dynamic,
            Constant::InvokeDynamic { .. } => ConstantTag::InvokeDynamic,
            Constant::Module { .. } => ConstantTag::Module,
            Constant::Package { .. } => ConstantTag::Package,
        };
        Some(tag)
    }

    fn parse(parser: &mut Parser) -> Result<Self> {
        let raw_tag = parser.read_be::<u8>()?;
        let Some(tag) = ConstantTag::from_repr(raw_tag) else {
            return Err(malformed_error!(
                "Unknown constant pool tag {} at offset {}",
                raw_tag,
                parser.pos() - 1
            ));
        };

        let constant = match tag {
            ConstantTag::Utf8 => {
                Constant::Utf8(Utf8Entry::from_bytes(parser.read_prefixed_bytes()?.to_vec()))
            }
            ConstantTag::Integer => Constant::Integer(parser.read_be()?),
            ConstantTag::Float => Constant::Float(parser.read_be()?),
            ConstantTag::Long => Constant::Long(parser.read_be()?),
            ConstantTag::Double => Constant::Double(parser.read_be()?),
            ConstantTag::Class => Constant::Class {
                name_index: parser.read_be()?,
            },
            ConstantTag::String => Constant::String {
                string_index: parser.read_be()?,
            },
            ConstantTag::FieldRef => Constant::FieldRef {
                class_index: parser.read_be()?,
                name_and_type_index: parser.read_be()?,
            },
            ConstantTag::MethodRef => Constant::MethodRef {
                class_index: parser.read_be()?,
                name_and_type_index: parser.read_be()?,
            },
            ConstantTag::InterfaceMethodRef => Constant::InterfaceMethodRef {
                class_index: parser.read_be()?,
                name_and_type_index: parser.read_be()?,
            },
            ConstantTag::NameAndType => Constant::NameAndType {
                name_index: parser.read_be()?,
                descriptor_index: parser.read_be()?,
            },
            ConstantTag::MethodHandle => Constant::MethodHandle {
                reference_kind: parser.read_be()?,
                reference_index: parser.read_be()?,
            },
            ConstantTag::MethodType => Constant::MethodType {
                descriptor_index: parser.read_be()?,
            },
            ConstantTag::Dynamic => Constant::Dynamic {
                bootstrap_method_attr_index: parser.read_be()?,
                name_and_type_index: parser.read_be()?,
            },
            ConstantTag::InvokeDynamic => Constant::InvokeDynamic {
                bootstrap_method_attr_index: parser.read_be()?,
                name_and_type_index: parser.read_be()?,
            },
            ConstantTag::Module => Constant::Module {
                name_index: parser.read_be()?,
            },
            ConstantTag::Package => Constant::Package {
                name_index: parser.read_be()?,
            },
        };

        Ok(constant)
    }

    fn write(&self, out: &mut Vec<u8>) {
        let Some(tag) = self.tag() else {
            return;
        };
        write_be(out, tag as u8);

        match self {
            Constant::Unusable => {}
            Constant::Utf8(entry) => {
                // Length is checked when the entry is created
                write_be(out, entry.bytes.len() as u16);
                out.extend_from_slice(&entry.bytes);
            }
            Constant::Integer(value) => write_be(out, *value),
            Constant::Float(bits) => write_be(out, *bits),
            Constant::Long(value) => write_be(out, *value),
            Constant::Double(bits) => write_be(out, *bits),
            Constant::Class { name_index: index }
            | Constant::String {
                string_index: index,
            }
            | Constant::MethodType {
                descriptor_index: index,
            }
            | Constant::Module { name_index: index }
            | Constant::Package { name_index: index } => write_be(out, *index),
            Constant::FieldRef {
                class_index: first,
                name_and_type_index: second,
            }
            | Constant::MethodRef {
                class_index: first,
                name_and_type_index: second,
            }
            | Constant::InterfaceMethodRef {
                class_index: first,
                name_and_type_index: second,
            }
            | Constant::NameAndType {
                name_index: first,
                descriptor_index: second,
            }
            | Constant::Dynamic {
                bootstrap_method_attr_index: first,
                name_and_type_index: second,
            }
            | Constant::InvokeDynamic {
                bootstrap_method_attr_index: first,
                name_and_type_index: second,
            } => {
                write_be(out, *first);
                write_be(out, *second);
            }
            Constant::MethodHandle {
                reference_kind,
                reference_index,
            } => {
                write_be(out, *reference_kind);
                write_be(out, *reference_index);
            }
        }
    }
}

/// Which kind of member reference an instruction points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// `CONSTANT_Fieldref`
    Field,
    /// `CONSTANT_Methodref`
    Method,
    /// `CONSTANT_InterfaceMethodref`
    InterfaceMethod,
}

/// A member reference resolved to its symbolic parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'a> {
    /// Reference kind
    pub kind: MemberKind,
    /// Internal name of the owning class
    pub owner: &'a str,
    /// Member name
    pub name: &'a str,
    /// Member descriptor
    pub descriptor: &'a str,
}

/// The constant pool of one class file.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    /// Slot 0 is always [`Constant::Unusable`]
    entries: Vec<Constant>,
    /// First index of each distinct entry, for interning
    lookup: HashMap<Constant, u16>,
}

impl ConstantPool {
    /// Largest slot count a constant pool can declare.
    pub const MAX_COUNT: usize = u16::MAX as usize;

    /// An empty pool, containing only the reserved slot 0.
    #[must_use]
    pub fn new() -> Self {
        ConstantPool {
            entries: vec![Constant::Unusable],
            lookup: HashMap::new(),
        }
    }

    /// Parse a pool, starting at its `constant_pool_count`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a zero count or an unknown tag, and
    /// [`crate::Error::OutOfBounds`] for truncated data.
    pub fn parse(parser: &mut Parser) -> Result<Self> {
        let count = parser.read_be::<u16>()? as usize;
        if count == 0 {
            return Err(malformed_error!("constant_pool_count must be at least 1"));
        }

        let mut pool = ConstantPool {
            entries: Vec::with_capacity(count),
            lookup: HashMap::with_capacity(count),
        };
        pool.entries.push(Constant::Unusable);

        while pool.entries.len() < count {
            let constant = Constant::parse(parser)?;
            let wide = constant.is_wide();
            pool.insert_parsed(constant);
            if wide {
                if pool.entries.len() >= count {
                    return Err(malformed_error!(
                        "Wide constant at index {} overruns constant_pool_count {}",
                        pool.entries.len() - 1,
                        count
                    ));
                }
                pool.entries.push(Constant::Unusable);
            }
        }

        Ok(pool)
    }

    fn insert_parsed(&mut self, constant: Constant) {
        // count <= u16::MAX, so every index fits
        let index = self.entries.len() as u16;
        self.lookup.entry(constant.clone()).or_insert(index);
        self.entries.push(constant);
    }

    /// Serialize the pool, including its `constant_pool_count`.
    pub fn write(&self, out: &mut Vec<u8>) {
        write_be(out, self.entries.len() as u16);
        for constant in &self.entries {
            constant.write(out);
        }
    }

    /// The `constant_pool_count` value: number of slots including slot 0.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the pool holds no entries besides slot 0.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Iterate over `(index, constant)` for every usable slot.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, constant)| !matches!(constant, Constant::Unusable))
            .map(|(index, constant)| (index as u16, constant))
    }

    /// Look up a slot.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for index 0, indices past the end and the
    /// unusable upper half of a `Long`/`Double`.
    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(malformed_error!(
                "Invalid constant pool index {} (pool has {} slots)",
                index,
                self.entries.len()
            )),
            Some(constant) => Ok(constant),
        }
    }

    /// Resolve a `CONSTANT_Utf8` to its entry, decodable or not.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the index is invalid or holds another kind.
    pub fn utf8_entry(&self, index: u16) -> Result<&Utf8Entry> {
        match self.get(index)? {
            Constant::Utf8(entry) => Ok(entry),
            other => Err(malformed_error!(
                "Expected Utf8 at constant pool index {}, found {:?}",
                index,
                other
            )),
        }
    }

    /// Resolve a `CONSTANT_Utf8`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the index is invalid, holds another kind, or
    /// holds text without a Rust string form.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        self.utf8_entry(index)?.text().ok_or_else(|| {
            malformed_error!(
                "Utf8 at constant pool index {} does not decode to a string",
                index
            )
        })
    }

    /// Resolve a `CONSTANT_Class` to the entry holding its internal name.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the index is invalid or holds another kind.
    pub fn class_entry(&self, index: u16) -> Result<&Utf8Entry> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8_entry(*name_index),
            other => Err(malformed_error!(
                "Expected Class at constant pool index {}, found {:?}",
                index,
                other
            )),
        }
    }

    /// Resolve a `CONSTANT_Class` to its internal name.
    ///
    /// # Errors
    /// See [`ConstantPool::class_entry`] and [`ConstantPool::utf8`].
    pub fn class_name(&self, index: u16) -> Result<&str> {
        self.class_entry(index)?.text().ok_or_else(|| {
            malformed_error!(
                "Class name at constant pool index {} does not decode to a string",
                index
            )
        })
    }

    /// `true` if `index` is, or points through its class, string or name-and-type parts
    /// to, a `CONSTANT_Utf8` without a Rust string form.
    #[must_use]
    pub fn has_undecodable_text(&self, index: u16) -> bool {
        let undecodable = |index: u16| {
            matches!(
                self.entries.get(index as usize),
                Some(Constant::Utf8(entry)) if entry.text.is_none()
            )
        };
        let parts = |index: u16| match self.entries.get(index as usize) {
            Some(Constant::Class { name_index } | Constant::String { string_index: name_index }) => {
                undecodable(*name_index)
            }
            Some(Constant::NameAndType {
                name_index,
                descriptor_index,
            }) => undecodable(*name_index) || undecodable(*descriptor_index),
            _ => false,
        };

        match self.entries.get(index as usize) {
            Some(
                Constant::FieldRef {
                    class_index,
                    name_and_type_index,
                }
                | Constant::MethodRef {
                    class_index,
                    name_and_type_index,
                }
                | Constant::InterfaceMethodRef {
                    class_index,
                    name_and_type_index,
                },
            ) => parts(*class_index) || parts(*name_and_type_index),
            _ => undecodable(index) || parts(index),
        }
    }

    /// Resolve a `CONSTANT_NameAndType` to `(name, descriptor)`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the index is invalid or holds another kind.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            other => Err(malformed_error!(
                "Expected NameAndType at constant pool index {}, found {:?}",
                index,
                other
            )),
        }
    }

    /// Resolve a field or method reference to its symbolic parts.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the index is invalid or holds another kind.
    pub fn member_ref(&self, index: u16) -> Result<MemberRef<'_>> {
        let (kind, class_index, name_and_type_index) = match self.get(index)? {
            Constant::FieldRef {
                class_index,
                name_and_type_index,
            } => (MemberKind::Field, class_index, name_and_type_index),
            Constant::MethodRef {
                class_index,
                name_and_type_index,
            } => (MemberKind::Method, class_index, name_and_type_index),
            Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => (MemberKind::InterfaceMethod, class_index, name_and_type_index),
            other => {
                return Err(malformed_error!(
                    "Expected member reference at constant pool index {}, found {:?}",
                    index,
                    other
                ))
            }
        };

        let (name, descriptor) = self.name_and_type(*name_and_type_index)?;
        Ok(MemberRef {
            kind,
            owner: self.class_name(*class_index)?,
            name,
            descriptor,
        })
    }

    /// Resolve the operand of an `ldc`, `ldc_w` or `ldc2_w`.
    ///
    /// Strings and classes whose text does not decode come back as [`LdcValue::Other`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the entry cannot be loaded by `ldc`.
    pub fn ldc_value(&self, index: u16) -> Result<LdcValue> {
        let value = match self.get(index)? {
            Constant::Integer(value) => LdcValue::Integer(*value),
            Constant::Float(bits) => LdcValue::Float(*bits),
            Constant::Long(value) => LdcValue::Long(*value),
            Constant::Double(bits) => LdcValue::Double(*bits),
            Constant::String { string_index } => match self.utf8_entry(*string_index)?.text() {
                Some(text) => LdcValue::String(text.to_string()),
                None => LdcValue::Other(index),
            },
            Constant::Class { name_index } => match self.utf8_entry(*name_index)?.text() {
                Some(name) => LdcValue::Type(name.to_string()),
                None => LdcValue::Other(index),
            },
            Constant::MethodHandle { .. }
            | Constant::MethodType { .. }
            | Constant::Dynamic { .. } => LdcValue::Other(index),
            other => {
                return Err(malformed_error!(
                    "Constant pool index {} ({:?}) is not loadable",
                    index,
                    other
                ))
            }
        };
        Ok(value)
    }

    /// `true` if `index` holds a member reference of `kind` with exactly these parts.
    #[must_use]
    pub fn is_member_ref(
        &self,
        index: u16,
        kind: MemberKind,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> bool {
        self.member_ref(index).is_ok_and(|member| {
            member.kind == kind
                && member.owner == owner
                && member.name == name
                && member.descriptor == descriptor
        })
    }

    /// `true` if `index` loads exactly `value`.
    #[must_use]
    pub fn is_ldc_value(&self, index: u16, value: &LdcValue) -> bool {
        self.ldc_value(index).is_ok_and(|found| &found == value)
    }

    /// Return the index of an identical entry, appending one if there is none.
    ///
    /// # Errors
    /// Returns [`crate::Error::ConstantPoolFull`] if the pool has no room left.
    pub fn intern(&mut self, constant: Constant) -> Result<u16> {
        if let Some(index) = self.lookup.get(&constant) {
            return Ok(*index);
        }

        let slots = if constant.is_wide() { 2 } else { 1 };
        if self.entries.len() + slots > Self::MAX_COUNT {
            return Err(Error::ConstantPoolFull);
        }

        let index = self.entries.len() as u16;
        let wide = constant.is_wide();
        self.lookup.insert(constant.clone(), index);
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        Ok(index)
    }

    /// Intern a `CONSTANT_Utf8`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the encoded text exceeds 65535 bytes, or
    /// [`crate::Error::ConstantPoolFull`].
    pub fn intern_utf8(&mut self, text: &str) -> Result<u16> {
        let entry = Utf8Entry::new(text);
        if entry.bytes.len() > u16::MAX as usize {
            return Err(malformed_error!(
                "Utf8 constant of {} bytes is too long",
                entry.bytes.len()
            ));
        }
        self.intern(Constant::Utf8(entry))
    }

    /// Intern a `CONSTANT_Class` for an internal name.
    ///
    /// # Errors
    /// See [`ConstantPool::intern_utf8`].
    pub fn intern_class(&mut self, name: &str) -> Result<u16> {
        let name_index = self.intern_utf8(name)?;
        self.intern(Constant::Class { name_index })
    }

    /// Intern a `CONSTANT_NameAndType`.
    ///
    /// # Errors
    /// See [`ConstantPool::intern_utf8`].
    pub fn intern_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.intern_utf8(name)?;
        let descriptor_index = self.intern_utf8(descriptor)?;
        self.intern(Constant::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    /// Intern a field, method or interface method reference.
    ///
    /// # Errors
    /// See [`ConstantPool::intern_utf8`].
    pub fn intern_member_ref(
        &mut self,
        kind: MemberKind,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16> {
        let class_index = self.intern_class(owner)?;
        let name_and_type_index = self.intern_name_and_type(name, descriptor)?;
        let constant = match kind {
            MemberKind::Field => Constant::FieldRef {
                class_index,
                name_and_type_index,
            },
            MemberKind::Method => Constant::MethodRef {
                class_index,
                name_and_type_index,
            },
            MemberKind::InterfaceMethod => Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            },
        };
        self.intern(constant)
    }

    /// Intern the constant an `ldc` family instruction loads.
    ///
    /// [`LdcValue::Other`] already names its slot and is returned as is.
    ///
    /// # Errors
    /// See [`ConstantPool::intern_utf8`].
    pub fn intern_ldc(&mut self, value: &LdcValue) -> Result<u16> {
        match value {
            LdcValue::Integer(value) => self.intern(Constant::Integer(*value)),
            LdcValue::Float(bits) => self.intern(Constant::Float(*bits)),
            LdcValue::Long(value) => self.intern(Constant::Long(*value)),
            LdcValue::Double(bits) => self.intern(Constant::Double(*bits)),
            LdcValue::String(text) => {
                let string_index = self.intern_utf8(text)?;
                self.intern(Constant::String { string_index })
            }
            LdcValue::Type(name) => self.intern_class(name),
            LdcValue::Other(index) => {
                self.get(*index)?;
                Ok(*index)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pool_bytes() -> Vec<u8> {
        let mut out = Vec::new();
        // count = 8: #1 Utf8 "lib/R", #2 Class #1, #3 Long (2 slots), #5 Utf8 "x",
        // #6 Utf8 "I", #7 NameAndType #5 #6
        write_be(&mut out, 8_u16);
        out.push(1);
        write_be(&mut out, 5_u16);
        out.extend_from_slice(b"lib/R");
        out.push(7);
        write_be(&mut out, 1_u16);
        out.push(5);
        write_be(&mut out, 42_i64);
        out.push(1);
        write_be(&mut out, 1_u16);
        out.push(b'x');
        out.push(1);
        write_be(&mut out, 1_u16);
        out.push(b'I');
        out.push(12);
        write_be(&mut out, 5_u16);
        write_be(&mut out, 6_u16);
        out
    }

    #[test]
    fn parse_and_write_round_trip() {
        let bytes = sample_pool_bytes();
        let mut parser = Parser::new(&bytes);
        let pool = ConstantPool::parse(&mut parser).unwrap();

        assert_eq!(pool.len(), 8);
        assert!(!parser.has_more_data());
        assert_eq!(pool.class_name(2).unwrap(), "lib/R");
        assert_eq!(pool.name_and_type(7).unwrap(), ("x", "I"));
        assert!(pool.get(4).is_err());
        assert!(pool.get(0).is_err());
        assert!(pool.get(8).is_err());

        let mut out = Vec::new();
        pool.write(&mut out);
        assert_eq!(out, bytes);
    }

    #[test]
    fn intern_reuses_existing_entries() {
        let bytes = sample_pool_bytes();
        let mut pool = ConstantPool::parse(&mut Parser::new(&bytes)).unwrap();

        assert_eq!(pool.intern_class("lib/R").unwrap(), 2);
        assert_eq!(pool.intern_name_and_type("x", "I").unwrap(), 7);
        assert_eq!(pool.intern_ldc(&LdcValue::Long(42)).unwrap(), 3);
        assert_eq!(pool.len(), 8);
    }

    #[test]
    fn intern_appends_new_entries() {
        let bytes = sample_pool_bytes();
        let mut pool = ConstantPool::parse(&mut Parser::new(&bytes)).unwrap();

        let field = pool
            .intern_member_ref(MemberKind::Field, "app/R", "x", "I")
            .unwrap();
        // Utf8 "app/R", Class, then the FieldRef reusing NameAndType #7
        assert_eq!(field, 10);
        assert_eq!(pool.len(), 11);

        let member = pool.member_ref(field).unwrap();
        assert_eq!(member.kind, MemberKind::Field);
        assert_eq!(member.owner, "app/R");
        assert_eq!(member.name, "x");
        assert_eq!(member.descriptor, "I");
        assert!(pool.is_member_ref(field, MemberKind::Field, "app/R", "x", "I"));
        assert!(!pool.is_member_ref(field, MemberKind::Method, "app/R", "x", "I"));
    }

    #[test]
    fn intern_wide_takes_two_slots() {
        let mut pool = ConstantPool::new();
        let index = pool.intern_ldc(&LdcValue::Double(1.5_f64.to_bits())).unwrap();
        assert_eq!(index, 1);
        assert_eq!(pool.len(), 3);
        assert!(pool.get(2).is_err());
        assert_eq!(pool.intern_utf8("next").unwrap(), 3);
    }

    #[test]
    fn ldc_values() {
        let mut pool = ConstantPool::new();
        let text = pool.intern_ldc(&LdcValue::String("hello".into())).unwrap();
        let class = pool.intern_ldc(&LdcValue::Type("lib/R".into())).unwrap();
        let utf8 = pool.intern_utf8("lib/R").unwrap();

        assert_eq!(
            pool.ldc_value(text).unwrap(),
            LdcValue::String("hello".into())
        );
        assert_eq!(pool.ldc_value(class).unwrap(), LdcValue::Type("lib/R".into()));
        assert!(pool.ldc_value(utf8).is_err());
        assert!(pool.is_ldc_value(class, &LdcValue::Type("lib/R".into())));
        assert!(!pool.is_ldc_value(class, &LdcValue::String("lib/R".into())));
    }

    #[test]
    fn undecodable_utf8_is_kept_opaque() {
        // #1 Utf8 ED A0 80 (a lone high surrogate), #2 String #1, #3 Utf8 "A",
        // #4 Utf8 "B" as the overlong C1 82, #5 Class #1
        let mut bytes = Vec::new();
        write_be(&mut bytes, 6_u16);
        bytes.push(1);
        write_be(&mut bytes, 3_u16);
        bytes.extend_from_slice(&[0xED, 0xA0, 0x80]);
        bytes.push(8);
        write_be(&mut bytes, 1_u16);
        bytes.push(1);
        write_be(&mut bytes, 1_u16);
        bytes.push(b'A');
        bytes.push(1);
        write_be(&mut bytes, 2_u16);
        bytes.extend_from_slice(&[0xC1, 0x82]);
        bytes.push(7);
        write_be(&mut bytes, 1_u16);

        let mut pool = ConstantPool::parse(&mut Parser::new(&bytes)).unwrap();
        assert!(pool.utf8(1).is_err());
        assert_eq!(pool.utf8_entry(1).unwrap().bytes(), &[0xED_u8, 0xA0, 0x80][..]);
        assert_eq!(pool.utf8_entry(1).unwrap().to_string_lossy(), "\u{FFFD}");
        assert_eq!(pool.utf8(4).unwrap(), "B");
        assert!(pool.class_name(5).is_err());

        assert_eq!(pool.ldc_value(2).unwrap(), LdcValue::Other(2));
        assert_eq!(pool.ldc_value(5).unwrap(), LdcValue::Other(5));
        assert!(pool.has_undecodable_text(1));
        assert!(pool.has_undecodable_text(2));
        assert!(pool.has_undecodable_text(5));
        assert!(!pool.has_undecodable_text(3));
        assert!(!pool.has_undecodable_text(4));

        // Interned text never lands on the opaque entry or the overlong one
        assert_eq!(pool.intern_utf8("A").unwrap(), 3);
        assert_eq!(pool.intern_utf8("\u{FFFD}").unwrap(), 6);
        assert_eq!(pool.intern_utf8("B").unwrap(), 7);

        let mut out = Vec::new();
        pool.write(&mut out);
        assert_eq!(&out[2..bytes.len()], &bytes[2..]);
    }

    #[test]
    fn member_ref_through_undecodable_owner() {
        let mut pool = ConstantPool::new();
        let owner = pool
            .intern(Constant::Utf8(Utf8Entry::from_bytes(vec![0xED, 0xB0, 0x80])))
            .unwrap();
        let class_index = pool.intern(Constant::Class { name_index: owner }).unwrap();
        let name_and_type_index = pool.intern_name_and_type("x", "I").unwrap();
        let field = pool
            .intern(Constant::FieldRef {
                class_index,
                name_and_type_index,
            })
            .unwrap();
        let plain = pool
            .intern_member_ref(MemberKind::Field, "lib/R", "x", "I")
            .unwrap();

        assert!(pool.member_ref(field).is_err());
        assert!(pool.has_undecodable_text(field));
        assert!(!pool.has_undecodable_text(plain));
    }

    #[test]
    fn unknown_tag_is_malformed() {
        let bytes = [0x00, 0x02, 0x02, 0x00];
        let result = ConstantPool::parse(&mut Parser::new(&bytes));
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn wide_constant_overrun_is_malformed() {
        let mut bytes = vec![0x00, 0x02, 0x05];
        bytes.extend_from_slice(&7_i64.to_be_bytes());
        let result = ConstantPool::parse(&mut Parser::new(&bytes));
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn full_pool() {
        let mut pool = ConstantPool::new();
        for value in 0..(ConstantPool::MAX_COUNT as i32 - 1) {
            pool.intern(Constant::Integer(value)).unwrap();
        }
        assert_eq!(pool.len(), ConstantPool::MAX_COUNT);
        assert!(matches!(
            pool.intern(Constant::Integer(-1)),
            Err(Error::ConstantPoolFull)
        ));
        // Existing entries are still found
        assert_eq!(pool.intern(Constant::Integer(0)).unwrap(), 1);
    }
}
