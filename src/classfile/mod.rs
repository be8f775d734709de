//! Reading and writing JVM class files (JVMS §4).
//!
//! [`ClassFile`] fully models the constant pool and method bodies, which is where class
//! references live. Fields, interfaces and
//! class-level attributes are kept as raw bytes and written back untouched.
//!
//! # Architecture
//!
//! - [`constpool`] - [`ConstantPool`] with symbolic lookups and interning
//! - [`method`] - [`Method`], [`Field`] and access flags
//! - [`code`] - the decoded `Code` attribute
//! - [`attribute`] - opaque attributes
//! - [`relayout`] - offset translation for method bodies that changed size
//!
//! # Round Trip
//!
//! A class that is parsed and written without modification produces the input bytes.
//! Modifications only ever append to the constant pool, so indices held by opaque parts of
//! the class stay valid.
//!
//! # Examples
//!
//! ```rust
//! use classremap::bytecode::{opcodes, Instruction};
//! use classremap::classfile::{ClassFile, Code, MethodAccessFlags};
//!
//! let mut class = ClassFile::new("app/Main", Some("java/lang/Object"))?;
//! class.add_method(
//!     MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
//!     "main",
//!     "([Ljava/lang/String;)V",
//!     Some(Code::new(0, 1, vec![Instruction::simple(opcodes::RETURN)])),
//! );
//!
//! let bytes = class.to_bytes()?;
//! let parsed = ClassFile::parse(&bytes)?;
//! assert_eq!(parsed.name()?, "app/Main");
//! assert_eq!(parsed.to_bytes()?, bytes);
//! # Ok::<(), classremap::Error>(())
//! ```

pub mod attribute;
pub mod code;
pub mod constpool;
pub mod method;
pub mod relayout;

pub use attribute::Attribute;
pub use code::{Code, ExceptionHandler};
pub use constpool::{Constant, ConstantPool, MemberKind, MemberRef, Utf8Entry};
pub use method::{Field, Method, MethodAccessFlags, MethodAttribute};

use bitflags::bitflags;

use crate::{
    classfile::attribute::{parse_attributes, write_attributes},
    file::{io::write_be, parser::Parser},
    Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Class `access_flags`
    pub struct ClassAccessFlags: u16 {
        /// Declared `public`
        const PUBLIC = 0x0001;
        /// Declared `final`
        const FINAL = 0x0010;
        /// `invokespecial` uses superclass semantics
        const SUPER = 0x0020;
        /// An interface
        const INTERFACE = 0x0200;
        /// Declared `abstract`
        const ABSTRACT = 0x0400;
        /// Not present in source
        const SYNTHETIC = 0x1000;
        /// An annotation interface
        const ANNOTATION = 0x2000;
        /// An enum class
        const ENUM = 0x4000;
        /// A module descriptor
        const MODULE = 0x8000;
    }
}

/// A parsed class file.
#[derive(Debug, Clone)]
pub struct ClassFile {
    /// Minor version
    pub minor_version: u16,
    /// Major version
    pub major_version: u16,
    /// Constant pool
    pub constant_pool: ConstantPool,
    /// Access flags, unknown bits preserved
    pub access_flags: ClassAccessFlags,
    /// Constant pool index of this class
    pub this_class: u16,
    /// Constant pool index of the superclass, 0 for `java/lang/Object` and module-info
    pub super_class: u16,
    /// Constant pool indices of the direct superinterfaces
    pub interfaces: Vec<u16>,
    /// Fields
    pub fields: Vec<Field>,
    /// Methods
    pub methods: Vec<Method>,
    /// Class-level attributes
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// `0xCAFEBABE`
    pub const MAGIC: u32 = 0xCAFE_BABE;

    /// Major version written by [`ClassFile::new`] (Java 8).
    pub const DEFAULT_MAJOR_VERSION: u16 = 52;

    /// Parse a class file.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a bad magic number, invalid constant pool
    /// references, undecodable method bodies or trailing bytes, and
    /// [`crate::Error::OutOfBounds`] for truncated input.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut parser = Parser::new(data);
        Self::read_magic(&mut parser)?;

        let minor_version = parser.read_be::<u16>()?;
        let major_version = parser.read_be::<u16>()?;
        let constant_pool = ConstantPool::parse(&mut parser)?;
        let access_flags = ClassAccessFlags::from_bits_retain(parser.read_be()?);
        let this_class = parser.read_be::<u16>()?;
        let super_class = parser.read_be::<u16>()?;
        constant_pool.class_entry(this_class)?;

        let interface_count = parser.read_be::<u16>()?;
        let interfaces = (0..interface_count)
            .map(|_| parser.read_be::<u16>())
            .collect::<Result<Vec<_>>>()?;

        let field_count = parser.read_be::<u16>()?;
        let fields = (0..field_count)
            .map(|_| Field::parse(&mut parser))
            .collect::<Result<Vec<_>>>()?;

        let method_count = parser.read_be::<u16>()?;
        let methods = (0..method_count)
            .map(|_| Method::parse(&mut parser, &constant_pool))
            .collect::<Result<Vec<_>>>()?;

        let attributes = parse_attributes(&mut parser)?;
        if parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after class file",
                parser.remaining()
            ));
        }

        Ok(ClassFile {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Serialize the class.
    ///
    /// Method bodies are encoded against a copy of the constant pool, so constants that
    /// rewritten instructions need are appended to the output without changing `self`.
    ///
    /// # Errors
    /// Returns [`crate::Error::ConstantPoolFull`] or [`crate::Error::Relayout`] if a
    /// modified method body cannot be written.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut pool = self.constant_pool.clone();

        let mut methods = Vec::new();
        write_be(&mut methods, self.methods.len() as u16);
        for method in &self.methods {
            method.write(&mut pool, &mut methods)?;
        }

        let mut out = Vec::with_capacity(methods.len() + 1024);
        write_be(&mut out, Self::MAGIC);
        write_be(&mut out, self.minor_version);
        write_be(&mut out, self.major_version);
        pool.write(&mut out);
        write_be(&mut out, self.access_flags.bits());
        write_be(&mut out, self.this_class);
        write_be(&mut out, self.super_class);
        write_be(&mut out, self.interfaces.len() as u16);
        for interface in &self.interfaces {
            write_be(&mut out, *interface);
        }
        write_be(&mut out, self.fields.len() as u16);
        for field in &self.fields {
            field.write(&mut out);
        }
        out.extend_from_slice(&methods);
        write_attributes(&self.attributes, &mut out);

        Ok(out)
    }

    /// An empty public class.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a name is too long for a `CONSTANT_Utf8`.
    pub fn new(name: &str, super_name: Option<&str>) -> Result<Self> {
        let mut constant_pool = ConstantPool::new();
        let this_class = constant_pool.intern_class(name)?;
        let super_class = match super_name {
            Some(super_name) => constant_pool.intern_class(super_name)?,
            None => 0,
        };

        Ok(ClassFile {
            minor_version: 0,
            major_version: Self::DEFAULT_MAJOR_VERSION,
            constant_pool,
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        })
    }

    /// Append a method and return it for further edits.
    pub fn add_method(
        &mut self,
        access_flags: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        code: Option<Code>,
    ) -> &mut Method {
        let index = self.methods.len();
        self.methods
            .push(Method::new(access_flags, name, descriptor, code));
        &mut self.methods[index]
    }

    /// Read a class file only as far as `this_class` and return its internal name, or
    /// `None` if the name does not decode to a string. Method bodies are not looked at.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a bad magic number or an invalid
    /// `this_class`, and [`crate::Error::OutOfBounds`] for truncated input.
    pub fn peek_name(data: &[u8]) -> Result<Option<String>> {
        let mut parser = Parser::new(data);
        Self::read_magic(&mut parser)?;
        // minor_version, major_version
        parser.advance_by(4)?;
        let constant_pool = ConstantPool::parse(&mut parser)?;
        // access_flags
        parser.advance_by(2)?;
        let this_class = parser.read_be::<u16>()?;
        Ok(constant_pool
            .class_entry(this_class)?
            .text()
            .map(str::to_string))
    }

    fn read_magic(parser: &mut Parser) -> Result<()> {
        let magic = parser.read_be::<u32>()?;
        if magic != Self::MAGIC {
            return Err(malformed_error!("Invalid magic 0x{:08X}", magic));
        }
        Ok(())
    }

    /// Internal name of this class.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `this_class` is not a `CONSTANT_Class` or
    /// its name does not decode to a string.
    pub fn name(&self) -> Result<&str> {
        self.constant_pool.class_name(self.this_class)
    }

    /// Internal name of the superclass, `None` if there is none.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `super_class` is not a `CONSTANT_Class`.
    pub fn super_name(&self) -> Result<Option<&str>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.constant_pool.class_name(self.super_class).map(Some)
    }

    /// Method bodies paired with their method, in declaration order.
    pub fn code_bodies(&self) -> impl Iterator<Item = (&Method, &Code)> {
        self.methods
            .iter()
            .filter_map(|method| method.code().map(|code| (method, code)))
    }
}
