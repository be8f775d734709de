//! The `Code` attribute (JVMS §4.7.3) with its body decoded into instructions.

use crate::{
    bytecode::{decoder, encoder, Instruction},
    classfile::{
        attribute::{parse_attributes, write_attributes, Attribute},
        constpool::ConstantPool,
        relayout::{remap_attribute, OffsetMap},
    },
    file::{io::write_be, parser::Parser},
    Result,
};

/// One entry of a method's exception table, in bytecode offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// First covered offset
    pub start_pc: u16,
    /// Offset after the last covered instruction
    pub end_pc: u16,
    /// Handler entry point
    pub handler_pc: u16,
    /// Constant pool index of the caught class, 0 for `finally`
    pub catch_type: u16,
}

/// A method body.
///
/// Offsets stored in [`Code::exception_table`] and in the nested [`Code::attributes`] refer
/// to the body as it was decoded. When the instructions encode to a different layout they
/// are translated on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    /// Constant pool index of the `"Code"` name, if decoded from a class
    pub name_index: Option<u16>,
    /// Maximum operand stack depth
    pub max_stack: u16,
    /// Number of local variable slots
    pub max_locals: u16,
    /// Decoded body
    pub instructions: Vec<Instruction>,
    /// Exception handlers
    pub exception_table: Vec<ExceptionHandler>,
    /// Nested attributes such as `LineNumberTable` and `StackMapTable`
    pub attributes: Vec<Attribute>,
    /// Instruction offsets at decode time, `None` for bodies built in memory
    decoded_offsets: Option<Vec<u32>>,
}

impl Code {
    /// A body built in memory, with no exception handlers or nested attributes.
    #[must_use]
    pub fn new(max_stack: u16, max_locals: u16, instructions: Vec<Instruction>) -> Self {
        Code {
            name_index: None,
            max_stack,
            max_locals,
            instructions,
            exception_table: Vec::new(),
            attributes: Vec::new(),
            decoded_offsets: None,
        }
    }

    /// Parse the payload of a `Code` attribute.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] if the body
    /// cannot be decoded.
    pub fn parse(name_index: u16, data: &[u8], pool: &ConstantPool) -> Result<Self> {
        let mut parser = Parser::new(data);
        let max_stack = parser.read_be::<u16>()?;
        let max_locals = parser.read_be::<u16>()?;

        let code_length = parser.read_be::<u32>()? as usize;
        if code_length == 0 || code_length > encoder::MAX_CODE_LENGTH {
            return Err(malformed_error!("Invalid code_length {}", code_length));
        }
        let decoded = decoder::decode(parser.read_bytes(code_length)?, pool)?;

        let handlers = parser.read_be::<u16>()?;
        let mut exception_table = Vec::with_capacity(handlers as usize);
        for _ in 0..handlers {
            exception_table.push(ExceptionHandler {
                start_pc: parser.read_be()?,
                end_pc: parser.read_be()?,
                handler_pc: parser.read_be()?,
                catch_type: parser.read_be()?,
            });
        }

        let attributes = parse_attributes(&mut parser)?;
        if parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after Code attribute",
                parser.remaining()
            ));
        }

        Ok(Code {
            name_index: Some(name_index),
            max_stack,
            max_locals,
            instructions: decoded.instructions,
            exception_table,
            attributes,
            decoded_offsets: Some(decoded.offsets),
        })
    }

    /// Write the complete attribute, header included.
    ///
    /// # Errors
    /// Returns [`crate::Error::Relayout`] if the body moved and something that depends on
    /// its offsets cannot follow, plus any encoding error.
    pub fn write(&self, pool: &mut ConstantPool, out: &mut Vec<u8>) -> Result<()> {
        let name_index = match self.name_index {
            Some(index) if pool.utf8(index).is_ok_and(|name| name == "Code") => index,
            _ => pool.intern_utf8("Code")?,
        };
        let encoded = encoder::encode(&self.instructions, pool)?;

        let moved = match &self.decoded_offsets {
            Some(decoded) if *decoded != encoded.offsets => Some(decoded.as_slice()),
            _ => None,
        };
        let (exception_table, attributes) = match moved {
            None => (self.exception_table.clone(), self.attributes.clone()),
            Some(decoded) => {
                let map = OffsetMap::new(decoded, &encoded.offsets)?;
                log::debug!(
                    "Relaying out method body: {} -> {} bytes",
                    decoded.last().copied().unwrap_or_default(),
                    encoded.code.len()
                );
                let handlers = self
                    .exception_table
                    .iter()
                    .map(|handler| {
                        Ok(ExceptionHandler {
                            start_pc: map.translate(handler.start_pc)?,
                            end_pc: map.translate(handler.end_pc)?,
                            handler_pc: map.translate(handler.handler_pc)?,
                            catch_type: handler.catch_type,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let attributes = self
                    .attributes
                    .iter()
                    .map(|attribute| {
                        let name = pool
                            .utf8_entry(attribute.name_index)?
                            .text()
                            .unwrap_or_default();
                        remap_attribute(name, attribute, &map)
                    })
                    .collect::<Result<Vec<_>>>()?;
                (handlers, attributes)
            }
        };

        let mut body = Vec::with_capacity(encoded.code.len() + 32);
        write_be(&mut body, self.max_stack);
        write_be(&mut body, self.max_locals);
        write_be(&mut body, encoded.code.len() as u32);
        body.extend_from_slice(&encoded.code);
        write_be(&mut body, exception_table.len() as u16);
        for handler in &exception_table {
            write_be(&mut body, handler.start_pc);
            write_be(&mut body, handler.end_pc);
            write_be(&mut body, handler.handler_pc);
            write_be(&mut body, handler.catch_type);
        }
        write_attributes(&attributes, &mut body);

        write_be(out, name_index);
        write_be(out, body.len() as u32);
        out.extend_from_slice(&body);
        Ok(())
    }
}
