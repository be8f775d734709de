//! Remapping of bytecode offsets after a method body changed size.
//!
//! Widening an `ldc` to `ldc_w` moves every later instruction. Branches are handled by the
//! encoder since they point at instruction indices; this module takes care of everything in
//! and around the `Code` attribute that stores raw offsets:
//!
//! - the exception table
//! - `LineNumberTable`
//! - `LocalVariableTable` and `LocalVariableTypeTable`
//! - `StackMapTable`, including `Uninitialized` verification types
//!
//! Type annotations inside `Code` also carry offsets, but in a shape that is not worth
//! rebuilding here; a method that has them and needs relayout is rejected with
//! [`crate::Error::Relayout`].

use crate::{
    classfile::attribute::Attribute,
    file::{io::write_be, parser::Parser},
    Error, Result,
};

/// Maps instruction start offsets of the decoded body to those of the encoded body.
///
/// Both offset lists end with the code length, so ranges that run to the end of the
/// method map as well.
#[derive(Debug)]
pub struct OffsetMap<'a> {
    old: &'a [u32],
    new: &'a [u32],
}

impl<'a> OffsetMap<'a> {
    /// Pair two offset lists produced for the same instruction list.
    ///
    /// # Errors
    /// Returns [`crate::Error::Relayout`] if the lists have different lengths, which means
    /// instructions were added or removed since decoding.
    pub fn new(old: &'a [u32], new: &'a [u32]) -> Result<Self> {
        if old.len() != new.len() {
            return Err(Error::Relayout(format!(
                "instruction count changed from {} to {}",
                old.len().saturating_sub(1),
                new.len().saturating_sub(1)
            )));
        }
        Ok(OffsetMap { old, new })
    }

    /// `true` when nothing moved.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.old == self.new
    }

    /// Translate an old offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `offset` is not an instruction boundary of the
    /// decoded body.
    pub fn translate(&self, offset: u16) -> Result<u16> {
        match self.old.binary_search(&u32::from(offset)) {
            // Encoded bodies never exceed u16::MAX bytes
            Ok(position) => Ok(self.new[position] as u16),
            Err(_) => Err(malformed_error!(
                "Offset {} is not an instruction boundary",
                offset
            )),
        }
    }
}

/// What to do with an attribute nested in `Code` once offsets moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NestedAttribute {
    LineNumbers,
    LocalVariables,
    StackMap,
    TypeAnnotations,
    Opaque,
}

impl NestedAttribute {
    pub(crate) fn from_name(name: &str) -> Self {
        match name {
            "LineNumberTable" => NestedAttribute::LineNumbers,
            "LocalVariableTable" | "LocalVariableTypeTable" => NestedAttribute::LocalVariables,
            "StackMapTable" => NestedAttribute::StackMap,
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                NestedAttribute::TypeAnnotations
            }
            _ => NestedAttribute::Opaque,
        }
    }
}

/// Rewrite the offsets of a nested `Code` attribute.
pub(crate) fn remap_attribute(
    name: &str,
    attribute: &Attribute,
    map: &OffsetMap,
) -> Result<Attribute> {
    let data = match NestedAttribute::from_name(name) {
        NestedAttribute::LineNumbers => remap_line_numbers(&attribute.data, map)?,
        NestedAttribute::LocalVariables => remap_local_variables(&attribute.data, map)?,
        NestedAttribute::StackMap => remap_stack_map(&attribute.data, map)?,
        NestedAttribute::TypeAnnotations => {
            return Err(Error::Relayout(format!(
                "{name} cannot be carried across a relayout"
            )))
        }
        NestedAttribute::Opaque => {
            log::warn!("Keeping {name} unchanged although its method was relaid out");
            attribute.data.clone()
        }
    };

    Ok(Attribute {
        name_index: attribute.name_index,
        data,
    })
}

fn remap_line_numbers(data: &[u8], map: &OffsetMap) -> Result<Vec<u8>> {
    let mut parser = Parser::new(data);
    let mut out = Vec::with_capacity(data.len());

    let count = parser.read_be::<u16>()?;
    write_be(&mut out, count);
    for _ in 0..count {
        let start_pc = parser.read_be::<u16>()?;
        let line = parser.read_be::<u16>()?;
        write_be(&mut out, map.translate(start_pc)?);
        write_be(&mut out, line);
    }

    Ok(out)
}

fn remap_local_variables(data: &[u8], map: &OffsetMap) -> Result<Vec<u8>> {
    let mut parser = Parser::new(data);
    let mut out = Vec::with_capacity(data.len());

    let count = parser.read_be::<u16>()?;
    write_be(&mut out, count);
    for _ in 0..count {
        let start_pc = parser.read_be::<u16>()?;
        let length = parser.read_be::<u16>()?;
        let end_pc = u16::try_from(u32::from(start_pc) + u32::from(length))
            .map_err(|_| malformed_error!("Local variable range overflows at {}", start_pc))?;

        let new_start = map.translate(start_pc)?;
        let new_end = map.translate(end_pc)?;
        write_be(&mut out, new_start);
        write_be(&mut out, new_end - new_start);
        // name_index, descriptor_or_signature_index, index
        out.extend_from_slice(parser.read_bytes(6)?);
    }

    Ok(out)
}

/// Remap a `StackMapTable`.
///
/// Frames are re-encoded with their new deltas. A `same_frame` or
/// `same_locals_1_stack_item_frame` whose delta no longer fits the compact form is promoted
/// to its extended form; every other frame keeps its kind.
fn remap_stack_map(data: &[u8], map: &OffsetMap) -> Result<Vec<u8>> {
    let mut parser = Parser::new(data);
    let mut out = Vec::with_capacity(data.len() + 8);

    let count = parser.read_be::<u16>()?;
    write_be(&mut out, count);

    let mut previous: Option<(u32, u32)> = None;
    for _ in 0..count {
        let frame_type = parser.read_be::<u8>()?;
        let delta = match frame_type {
            0..=63 => u16::from(frame_type),
            64..=127 => u16::from(frame_type - 64),
            247..=255 => parser.read_be::<u16>()?,
            _ => {
                return Err(malformed_error!(
                    "Reserved stack map frame type {}",
                    frame_type
                ))
            }
        };

        let old_offset = match previous {
            None => u32::from(delta),
            Some((old, _)) => old + u32::from(delta) + 1,
        };
        let old_offset = u16::try_from(old_offset)
            .map_err(|_| malformed_error!("Stack map frame offset {} overflows", old_offset))?;
        let new_offset = u32::from(map.translate(old_offset)?);
        let new_delta = match previous {
            None => new_offset,
            Some((_, new)) => new_offset - new - 1,
        };
        previous = Some((u32::from(old_offset), new_offset));
        // Bounded by the code length
        let new_delta = new_delta as u16;

        match frame_type {
            0..=63 if new_delta <= 63 => out.push(new_delta as u8),
            0..=63 => {
                out.push(251);
                write_be(&mut out, new_delta);
            }
            64..=127 => {
                if new_delta <= 63 {
                    out.push(64 + new_delta as u8);
                } else {
                    out.push(247);
                    write_be(&mut out, new_delta);
                }
                copy_verification_type(&mut parser, &mut out, map)?;
            }
            247 => {
                out.push(frame_type);
                write_be(&mut out, new_delta);
                copy_verification_type(&mut parser, &mut out, map)?;
            }
            248..=251 => {
                out.push(frame_type);
                write_be(&mut out, new_delta);
            }
            252..=254 => {
                out.push(frame_type);
                write_be(&mut out, new_delta);
                for _ in 0..(frame_type - 251) {
                    copy_verification_type(&mut parser, &mut out, map)?;
                }
            }
            _ => {
                // full_frame
                out.push(frame_type);
                write_be(&mut out, new_delta);
                for _ in 0..2 {
                    let items = parser.read_be::<u16>()?;
                    write_be(&mut out, items);
                    for _ in 0..items {
                        copy_verification_type(&mut parser, &mut out, map)?;
                    }
                }
            }
        }
    }

    Ok(out)
}

fn copy_verification_type(parser: &mut Parser, out: &mut Vec<u8>, map: &OffsetMap) -> Result<()> {
    let tag = parser.read_be::<u8>()?;
    out.push(tag);
    match tag {
        0..=6 => {}
        // Object: constant pool index
        7 => out.extend_from_slice(parser.read_bytes(2)?),
        // Uninitialized: offset of the `new` instruction
        8 => {
            let offset = parser.read_be::<u16>()?;
            write_be(out, map.translate(offset)?);
        }
        _ => return Err(malformed_error!("Unknown verification type tag {}", tag)),
    }
    Ok(())
}
