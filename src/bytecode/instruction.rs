//! Structural representation of decoded JVM instructions.
//!
//! Method bodies are decoded into a flat `Vec<Instruction>`. The three instruction shapes
//! that can name another class carry their reference symbolically, already resolved out of
//! the constant pool:
//!
//! - [`Instruction::Field`] - `getstatic`, `putstatic`, `getfield`, `putfield`
//! - [`Instruction::Method`] - `invokevirtual`, `invokespecial`, `invokestatic`, `invokeinterface`
//! - [`Instruction::Ldc`] - `ldc`, `ldc_w`, `ldc2_w` with an [`LdcValue`]
//!
//! Everything else keeps only what is needed to write it back: branch targets (as indices
//! into the instruction list, so they survive relayout) and raw operand bytes.
//!
//! Symbolic instructions remember the constant pool index they were decoded from. The
//! encoder reuses that index as long as the entry still describes the same value, so an
//! untouched method re-encodes to the exact same bytes.
//!
//! # Examples
//!
//! ```rust
//! use classremap::bytecode::{opcodes, FieldInsn, Instruction};
//!
//! let get = Instruction::Field(FieldInsn::new(
//!     opcodes::GETSTATIC,
//!     "lib/R$id",
//!     "title",
//!     "I",
//! ));
//! assert_eq!(get.mnemonic(), "getstatic");
//! assert_eq!(get.referenced_class(), Some("lib/R$id"));
//! ```

use std::fmt;

use crate::bytecode::opcodes;

/// A field access instruction: `getstatic`, `putstatic`, `getfield` or `putfield`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInsn {
    /// Opcode byte
    pub opcode: u8,
    /// Internal name of the class declaring the field
    pub owner: String,
    /// Field name
    pub name: String,
    /// Field descriptor
    pub descriptor: String,
    /// Constant pool index of the `CONSTANT_Fieldref` this was decoded from
    pub index: Option<u16>,
}

impl FieldInsn {
    /// Create a field instruction with no constant pool index yet.
    pub fn new(
        opcode: u8,
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        FieldInsn {
            opcode,
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
            index: None,
        }
    }
}

/// A method invocation instruction: `invokevirtual`, `invokespecial`, `invokestatic`
/// or `invokeinterface`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInsn {
    /// Opcode byte
    pub opcode: u8,
    /// Internal name of the class declaring the method
    pub owner: String,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// `true` if the reference is a `CONSTANT_InterfaceMethodref`
    pub is_interface: bool,
    /// Constant pool index of the member reference this was decoded from
    pub index: Option<u16>,
    /// `invokeinterface` count byte as read; `None` derives it from the descriptor
    pub count: Option<u8>,
}

impl MethodInsn {
    /// Create a method instruction with no constant pool index yet.
    ///
    /// `invokeinterface` always references an interface method; for every other opcode the
    /// flag is taken as given.
    pub fn new(
        opcode: u8,
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        is_interface: bool,
    ) -> Self {
        MethodInsn {
            opcode,
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
            is_interface: is_interface || opcode == opcodes::INVOKEINTERFACE,
            index: None,
            count: None,
        }
    }

    /// Argument slot count written after `invokeinterface`, derived from the descriptor
    /// (plus one for the receiver).
    #[must_use]
    pub fn interface_arg_count(&self) -> u8 {
        let mut slots: u32 = 1;
        let mut chars = self.descriptor.chars().skip(1).peekable();
        while let Some(c) = chars.next() {
            match c {
                ')' => break,
                'J' | 'D' => slots += 2,
                'L' => {
                    for c in chars.by_ref() {
                        if c == ';' {
                            break;
                        }
                    }
                    slots += 1;
                }
                '[' => {
                    while chars.peek() == Some(&'[') {
                        chars.next();
                    }
                    if chars.next() == Some('L') {
                        for c in chars.by_ref() {
                            if c == ';' {
                                break;
                            }
                        }
                    }
                    slots += 1;
                }
                _ => slots += 1,
            }
        }
        u8::try_from(slots).unwrap_or(u8::MAX)
    }
}

/// The value pushed by a constant-load instruction.
///
/// Only [`LdcValue::Type`] names a class. Method handles, method types and dynamic constants
/// are carried by their constant pool index and never looked into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LdcValue {
    /// `CONSTANT_Integer`
    Integer(i32),
    /// `CONSTANT_Float`, as raw IEEE 754 bits
    Float(u32),
    /// `CONSTANT_Long`
    Long(i64),
    /// `CONSTANT_Double`, as raw IEEE 754 bits
    Double(u64),
    /// `CONSTANT_String`
    String(String),
    /// `CONSTANT_Class`: a class-type literal such as `Foo.class`, by internal name
    Type(String),
    /// `CONSTANT_MethodHandle`, `CONSTANT_MethodType`, `CONSTANT_Dynamic`, or a string or
    /// class whose text does not decode, by pool index
    Other(u16),
}

impl LdcValue {
    /// Internal class name if this is a class-type literal.
    #[must_use]
    pub fn as_type(&self) -> Option<&str> {
        match self {
            LdcValue::Type(name) => Some(name),
            _ => None,
        }
    }

    /// `true` for `long` and `double`, which need `ldc2_w`.
    #[must_use]
    pub fn is_wide(&self) -> bool {
        matches!(self, LdcValue::Long(_) | LdcValue::Double(_))
    }
}

impl fmt::Display for LdcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LdcValue::Integer(value) => write!(f, "{value}"),
            LdcValue::Float(bits) => write!(f, "{}f", f32::from_bits(*bits)),
            LdcValue::Long(value) => write!(f, "{value}l"),
            LdcValue::Double(bits) => write!(f, "{}d", f64::from_bits(*bits)),
            LdcValue::String(text) => write!(f, "{text:?}"),
            LdcValue::Type(name) => write!(f, "class {name}"),
            LdcValue::Other(index) => write!(f, "#{index}"),
        }
    }
}

/// A constant-load instruction: `ldc`, `ldc_w` or `ldc2_w`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdcInsn {
    /// Opcode byte as decoded; the encoder may widen `ldc` to `ldc_w`
    pub opcode: u8,
    /// Loaded value
    pub value: LdcValue,
    /// Constant pool index this was decoded from
    pub index: Option<u16>,
}

impl LdcInsn {
    /// Create a constant load, picking `ldc2_w` for wide values and `ldc` otherwise.
    #[must_use]
    pub fn new(value: LdcValue) -> Self {
        let opcode = if value.is_wide() {
            opcodes::LDC2_W
        } else {
            opcodes::LDC
        };
        LdcInsn {
            opcode,
            value,
            index: None,
        }
    }

    /// A class-type literal load.
    pub fn class(name: impl Into<String>) -> Self {
        Self::new(LdcValue::Type(name.into()))
    }
}

/// A decoded JVM instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Field access
    Field(FieldInsn),
    /// Method invocation
    Method(MethodInsn),
    /// Constant load
    Ldc(LdcInsn),
    /// Conditional or unconditional jump (`if*`, `goto`, `jsr` and their wide forms)
    Branch {
        /// Opcode byte
        opcode: u8,
        /// Index of the target instruction
        target: usize,
    },
    /// `tableswitch`
    TableSwitch {
        /// Index of the default target
        default: usize,
        /// Lowest key
        low: i32,
        /// Highest key
        high: i32,
        /// Target indices for `low..=high`
        targets: Vec<usize>,
    },
    /// `lookupswitch`
    LookupSwitch {
        /// Index of the default target
        default: usize,
        /// `(key, target index)` pairs in key order
        pairs: Vec<(i32, usize)>,
    },
    /// Any other instruction, with its operand bytes as found in the input
    Other {
        /// Opcode byte
        opcode: u8,
        /// Raw operand bytes (for `wide`, the modified opcode and its operands)
        operands: Vec<u8>,
    },
}

impl Instruction {
    /// Shorthand for an operand-less instruction such as `return` or `aload_0`.
    #[must_use]
    pub fn simple(opcode: u8) -> Self {
        Instruction::Other {
            opcode,
            operands: Vec::new(),
        }
    }

    /// Opcode byte of the instruction as it will be written.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        match self {
            Instruction::Field(insn) => insn.opcode,
            Instruction::Method(insn) => insn.opcode,
            Instruction::Ldc(insn) => insn.opcode,
            Instruction::Branch { opcode, .. } | Instruction::Other { opcode, .. } => *opcode,
            Instruction::TableSwitch { .. } => opcodes::TABLESWITCH,
            Instruction::LookupSwitch { .. } => opcodes::LOOKUPSWITCH,
        }
    }

    /// Mnemonic of the opcode.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        opcodes::mnemonic(self.opcode())
    }

    /// The class this instruction names, if it is one of the shapes that can be rewritten.
    #[must_use]
    pub fn referenced_class(&self) -> Option<&str> {
        match self {
            Instruction::Field(insn) => Some(&insn.owner),
            Instruction::Method(insn) => Some(&insn.owner),
            Instruction::Ldc(insn) => insn.value.as_type(),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Field(insn) => write!(
                f,
                "{} {}.{}:{}",
                self.mnemonic(),
                insn.owner,
                insn.name,
                insn.descriptor
            ),
            Instruction::Method(insn) => write!(
                f,
                "{} {}.{}{}",
                self.mnemonic(),
                insn.owner,
                insn.name,
                insn.descriptor
            ),
            Instruction::Ldc(insn) => write!(f, "{} {}", self.mnemonic(), insn.value),
            Instruction::Branch { target, .. } => write!(f, "{} ->{target}", self.mnemonic()),
            Instruction::TableSwitch { low, high, .. } => {
                write!(f, "tableswitch [{low}..={high}]")
            }
            Instruction::LookupSwitch { pairs, .. } => {
                write!(f, "lookupswitch ({} cases)", pairs.len())
            }
            Instruction::Other { operands, .. } if operands.is_empty() => {
                write!(f, "{}", self.mnemonic())
            }
            Instruction::Other { operands, .. } => {
                write!(f, "{}", self.mnemonic())?;
                for byte in operands {
                    write!(f, " {byte:02X}")?;
                }
                Ok(())
            }
        }
    }
}
