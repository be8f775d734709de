//! Encoding of [`Instruction`]s back into `Code` attribute bytes.
//!
//! Encoding runs in three steps:
//!
//! 1. **Resolve** - every symbolic instruction gets its constant pool index. The decoded
//!    index is reused while the entry still describes the instruction; anything else is
//!    interned. An `ldc` whose constant ends up beyond index 255 is widened to `ldc_w`.
//! 2. **Layout** - instruction sizes are now fixed except for switch padding, which
//!    depends on the start offset, so offsets are assigned in a forward walk. A `goto` or
//!    `jsr` whose offset no longer fits 16 bits is promoted to `goto_w`/`jsr_w` and the
//!    walk repeats until nothing else needs promoting.
//! 3. **Emit** - bytes are written with branch targets turned back into relative offsets.
//!
//! An instruction list decoded from a method and left untouched encodes to the original
//! bytes.

use crate::{
    bytecode::{
        instruction::{Instruction, LdcInsn},
        opcodes,
    },
    classfile::constpool::{ConstantPool, MemberKind},
    file::io::write_be,
    Error, Result,
};

/// An encoded method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// The `code` array
    pub code: Vec<u8>,
    /// Start offset of each instruction, followed by the code length
    pub offsets: Vec<u32>,
}

/// Longest `code` array a method can have.
pub const MAX_CODE_LENGTH: usize = u16::MAX as usize;

/// Encode `instructions`, interning whatever constants they need into `pool`.
///
/// # Errors
/// Returns [`crate::Error::ConstantPoolFull`] if interning overflows the pool,
/// [`crate::Error::Relayout`] if a conditional branch no longer fits its offset field or
/// the method outgrows 65535 bytes, and [`crate::Error::Malformed`] for branch targets
/// outside the instruction list.
pub fn encode(instructions: &[Instruction], pool: &mut ConstantPool) -> Result<Encoded> {
    let indices = resolve_indices(instructions, pool)?;

    let mut promoted = vec![false; instructions.len()];
    let offsets = loop {
        let offsets = layout(instructions, &indices, &promoted)?;
        let mut grew = false;
        for (position, instruction) in instructions.iter().enumerate() {
            let Instruction::Branch {
                opcode: opcodes::GOTO | opcodes::JSR,
                target,
            } = instruction
            else {
                continue;
            };
            if !promoted[position] && !fits_i16(&offsets, position, *target) {
                promoted[position] = true;
                grew = true;
            }
        }
        if !grew {
            break offsets;
        }
    };

    let length = offsets.last().copied().unwrap_or_default() as usize;
    let mut code = Vec::with_capacity(length);
    for (position, (instruction, index)) in instructions.iter().zip(&indices).enumerate() {
        emit(
            instruction,
            *index,
            promoted[position],
            position,
            &offsets,
            &mut code,
        )?;
    }

    Ok(Encoded { code, offsets })
}

/// Start offset of each instruction, followed by the code length.
fn layout(
    instructions: &[Instruction],
    indices: &[Option<u16>],
    promoted: &[bool],
) -> Result<Vec<u32>> {
    let mut offsets = Vec::with_capacity(instructions.len() + 1);
    let mut offset = 0_usize;
    for ((instruction, index), promoted) in instructions.iter().zip(indices).zip(promoted) {
        offsets.push(offset as u32);
        offset += encoded_size(instruction, *index, *promoted, offset);
        if offset > MAX_CODE_LENGTH {
            return Err(Error::Relayout(format!(
                "method body grows beyond {MAX_CODE_LENGTH} bytes"
            )));
        }
    }
    offsets.push(offset as u32);
    Ok(offsets)
}

/// `false` only for a target inside the body that is out of 16-bit reach. Targets outside
/// the body are reported when emitting.
fn fits_i16(offsets: &[u32], position: usize, target: usize) -> bool {
    match offsets.get(target) {
        Some(start) if target + 1 < offsets.len() => {
            i16::try_from(i64::from(*start) - i64::from(offsets[position])).is_ok()
        }
        _ => true,
    }
}

/// The 32-bit form of `goto` and `jsr`.
fn wide_branch(opcode: u8) -> u8 {
    match opcode {
        opcodes::GOTO => opcodes::GOTO_W,
        opcodes::JSR => opcodes::JSR_W,
        other => other,
    }
}

/// Constant pool index for each symbolic instruction, `None` for the rest.
fn resolve_indices(
    instructions: &[Instruction],
    pool: &mut ConstantPool,
) -> Result<Vec<Option<u16>>> {
    instructions
        .iter()
        .map(|instruction| match instruction {
            Instruction::Field(insn) => member_index(
                pool,
                insn.index,
                MemberKind::Field,
                (insn.owner.as_str(), insn.name.as_str(), insn.descriptor.as_str()),
            )
            .map(Some),
            Instruction::Method(insn) => {
                let kind = if insn.is_interface {
                    MemberKind::InterfaceMethod
                } else {
                    MemberKind::Method
                };
                member_index(
                    pool,
                    insn.index,
                    kind,
                    (insn.owner.as_str(), insn.name.as_str(), insn.descriptor.as_str()),
                )
                .map(Some)
            }
            Instruction::Ldc(insn) => ldc_index(insn, pool).map(Some),
            _ => Ok(None),
        })
        .collect()
}

fn member_index(
    pool: &mut ConstantPool,
    hint: Option<u16>,
    kind: MemberKind,
    (owner, name, descriptor): (&str, &str, &str),
) -> Result<u16> {
    match hint {
        Some(index) if pool.is_member_ref(index, kind, owner, name, descriptor) => Ok(index),
        _ => pool.intern_member_ref(kind, owner, name, descriptor),
    }
}

fn ldc_index(insn: &LdcInsn, pool: &mut ConstantPool) -> Result<u16> {
    match insn.index {
        Some(index) if pool.is_ldc_value(index, &insn.value) => Ok(index),
        _ => pool.intern_ldc(&insn.value),
    }
}

/// Opcode actually written for an `ldc` family instruction.
fn ldc_opcode(insn: &LdcInsn, index: u16) -> u8 {
    if insn.value.is_wide() {
        opcodes::LDC2_W
    } else if insn.opcode == opcodes::LDC && index > u16::from(u8::MAX) {
        opcodes::LDC_W
    } else {
        insn.opcode
    }
}

fn switch_padding(offset: usize) -> usize {
    (4 - (offset + 1) % 4) % 4
}

fn encoded_size(
    instruction: &Instruction,
    index: Option<u16>,
    promoted: bool,
    offset: usize,
) -> usize {
    match instruction {
        Instruction::Field(_) => 3,
        Instruction::Method(insn) if insn.opcode == opcodes::INVOKEINTERFACE => 5,
        Instruction::Method(_) => 3,
        Instruction::Ldc(insn) => {
            if ldc_opcode(insn, index.unwrap_or_default()) == opcodes::LDC {
                2
            } else {
                3
            }
        }
        Instruction::Branch { opcode, .. } => {
            if promoted || matches!(*opcode, opcodes::GOTO_W | opcodes::JSR_W) {
                5
            } else {
                3
            }
        }
        Instruction::TableSwitch { targets, .. } => {
            1 + switch_padding(offset) + 12 + 4 * targets.len()
        }
        Instruction::LookupSwitch { pairs, .. } => 1 + switch_padding(offset) + 8 + 8 * pairs.len(),
        Instruction::Other { operands, .. } => 1 + operands.len(),
    }
}

fn emit(
    instruction: &Instruction,
    index: Option<u16>,
    promoted: bool,
    position: usize,
    offsets: &[u32],
    out: &mut Vec<u8>,
) -> Result<()> {
    let here = i64::from(offsets[position]);
    let relative = |target: usize| -> Result<i64> {
        // The final offset entry is the code length, not an instruction
        match offsets.get(target) {
            Some(start) if target + 1 < offsets.len() => Ok(i64::from(*start) - here),
            _ => Err(malformed_error!(
                "Instruction {} branches to {} outside the method body",
                position,
                target
            )),
        }
    };
    let index = index.unwrap_or_default();

    match instruction {
        Instruction::Field(insn) => {
            out.push(insn.opcode);
            write_be(out, index);
        }
        Instruction::Method(insn) => {
            out.push(insn.opcode);
            write_be(out, index);
            if insn.opcode == opcodes::INVOKEINTERFACE {
                out.push(insn.count.unwrap_or_else(|| insn.interface_arg_count()));
                out.push(0);
            }
        }
        Instruction::Ldc(insn) => {
            let opcode = ldc_opcode(insn, index);
            out.push(opcode);
            if opcode == opcodes::LDC {
                // ldc_opcode only keeps `ldc` for indices that fit
                out.push(index as u8);
            } else {
                write_be(out, index);
            }
        }
        Instruction::Branch { opcode, target } => {
            let delta = relative(*target)?;
            let opcode = if promoted { wide_branch(*opcode) } else { *opcode };
            out.push(opcode);
            if matches!(opcode, opcodes::GOTO_W | opcodes::JSR_W) {
                write_be(out, delta as i32);
            } else {
                let Ok(delta) = i16::try_from(delta) else {
                    return Err(Error::Relayout(format!(
                        "{} at instruction {} needs offset {} which exceeds 16 bits",
                        opcodes::mnemonic(opcode),
                        position,
                        delta
                    )));
                };
                write_be(out, delta);
            }
        }
        Instruction::TableSwitch {
            default,
            low,
            high,
            targets,
        } => {
            out.push(opcodes::TABLESWITCH);
            out.resize(out.len() + switch_padding(offsets[position] as usize), 0);
            write_be(out, relative(*default)? as i32);
            write_be(out, *low);
            write_be(out, *high);
            for target in targets {
                write_be(out, relative(*target)? as i32);
            }
        }
        Instruction::LookupSwitch { default, pairs } => {
            out.push(opcodes::LOOKUPSWITCH);
            out.resize(out.len() + switch_padding(offsets[position] as usize), 0);
            write_be(out, relative(*default)? as i32);
            write_be(out, pairs.len() as i32);
            for (key, target) in pairs {
                write_be(out, *key);
                write_be(out, relative(*target)? as i32);
            }
        }
        Instruction::Other { opcode, operands } => {
            out.push(*opcode);
            out.extend_from_slice(operands);
        }
    }

    Ok(())
}
