//! Decoding of `Code` attribute bytes into [`Instruction`]s.
//!
//! Decoding happens in two passes. The first walks the byte stream with the layout table
//! from [`crate::bytecode::opcodes::OPCODES`], resolving constant pool references into
//! symbolic instructions and recording branch targets as absolute byte offsets. The second
//! turns every target offset into the index of the instruction starting there.
//!
//! Besides the instructions, [`decode`] returns the byte offset each instruction started
//! at, plus the code length as a final entry. The class-format layer keeps those offsets to
//! remap exception handlers and offset-bearing attributes if the method has to be laid out
//! again.

use crate::{
    bytecode::{
        instruction::{FieldInsn, Instruction, LdcInsn, MethodInsn},
        opcodes::{self, OperandLayout, OPCODES},
    },
    classfile::constpool::{ConstantPool, MemberKind},
    file::parser::Parser,
    Result,
};

/// A decoded method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Instructions in code order
    pub instructions: Vec<Instruction>,
    /// Start offset of each instruction, followed by the code length
    pub offsets: Vec<u32>,
}

/// Decode the `code` array of a `Code` attribute.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for reserved opcodes, branch targets that do not
/// land on an instruction boundary, unresolvable constant pool references and invalid switch
/// tables, and [`crate::Error::OutOfBounds`] for truncated instructions.
pub fn decode(code: &[u8], pool: &ConstantPool) -> Result<Decoded> {
    let mut parser = Parser::new(code);
    let mut instructions = Vec::new();
    let mut offsets = Vec::new();

    while parser.has_more_data() {
        let offset = parser.pos();
        offsets.push(offset as u32);
        instructions.push(decode_one(&mut parser, pool)?);
    }
    offsets.push(code.len() as u32);

    // Offset -> instruction index; usize::MAX marks the middle of an instruction
    let mut starts = vec![usize::MAX; code.len() + 1];
    for (index, offset) in offsets.iter().enumerate() {
        starts[*offset as usize] = index;
    }
    let resolve = |target: usize| -> Result<usize> {
        match starts.get(target) {
            Some(index) if *index != usize::MAX && target < code.len() => Ok(*index),
            _ => Err(malformed_error!(
                "Branch target {} is not the start of an instruction",
                target
            )),
        }
    };

    for instruction in &mut instructions {
        match instruction {
            Instruction::Branch { target, .. } => *target = resolve(*target)?,
            Instruction::TableSwitch {
                default, targets, ..
            } => {
                *default = resolve(*default)?;
                for target in targets.iter_mut() {
                    *target = resolve(*target)?;
                }
            }
            Instruction::LookupSwitch { default, pairs } => {
                *default = resolve(*default)?;
                for (_, target) in pairs.iter_mut() {
                    *target = resolve(*target)?;
                }
            }
            _ => {}
        }
    }

    Ok(Decoded {
        instructions,
        offsets,
    })
}

/// Absolute target of a relative branch, rejecting targets before the method start.
fn absolute(offset: usize, relative: i64) -> Result<usize> {
    let target = offset as i64 + relative;
    usize::try_from(target)
        .map_err(|_| malformed_error!("Branch at {} jumps before the method start", offset))
}

fn decode_one(parser: &mut Parser, pool: &ConstantPool) -> Result<Instruction> {
    let offset = parser.pos();
    let opcode = parser.read_be::<u8>()?;
    let info = &OPCODES[opcode as usize];
    if info.is_reserved() {
        return Err(malformed_error!(
            "Reserved opcode 0x{:02X} at offset {}",
            opcode,
            offset
        ));
    }

    let instruction = match info.layout {
        OperandLayout::None => Instruction::simple(opcode),
        OperandLayout::Fixed(count) => Instruction::Other {
            opcode,
            operands: parser.read_bytes(count as usize)?.to_vec(),
        },
        OperandLayout::PoolIndexU8 => {
            let index = u16::from(parser.read_be::<u8>()?);
            Instruction::Ldc(LdcInsn {
                opcode,
                value: pool.ldc_value(index)?,
                index: Some(index),
            })
        }
        OperandLayout::PoolIndex { extra } => {
            let start = parser.pos();
            let index = parser.read_be::<u16>()?;
            parser.advance_by(extra as usize)?;
            let operands = &parser.data()[start..parser.pos()];
            decode_pool_ref(opcode, index, operands, pool).unwrap_or_else(|| {
                Ok(Instruction::Other {
                    opcode,
                    operands: operands.to_vec(),
                })
            })?
        }
        OperandLayout::Branch16 => {
            let relative = parser.read_be::<i16>()?;
            Instruction::Branch {
                opcode,
                target: absolute(offset, i64::from(relative))?,
            }
        }
        OperandLayout::Branch32 => {
            let relative = parser.read_be::<i32>()?;
            Instruction::Branch {
                opcode,
                target: absolute(offset, i64::from(relative))?,
            }
        }
        OperandLayout::TableSwitch => {
            skip_padding(parser)?;
            let default = absolute(offset, i64::from(parser.read_be::<i32>()?))?;
            let low = parser.read_be::<i32>()?;
            let high = parser.read_be::<i32>()?;
            if high < low {
                return Err(malformed_error!(
                    "tableswitch at {} has high {} below low {}",
                    offset,
                    high,
                    low
                ));
            }
            let count = (i64::from(high) - i64::from(low) + 1) as usize;
            // Each target takes four bytes, which bounds the allocation
            parser.calc_end_position(count.saturating_mul(4))?;
            let mut targets = Vec::with_capacity(count);
            for _ in 0..count {
                targets.push(absolute(offset, i64::from(parser.read_be::<i32>()?))?);
            }
            Instruction::TableSwitch {
                default,
                low,
                high,
                targets,
            }
        }
        OperandLayout::LookupSwitch => {
            skip_padding(parser)?;
            let default = absolute(offset, i64::from(parser.read_be::<i32>()?))?;
            let count = parser.read_be::<i32>()?;
            let Ok(count) = usize::try_from(count) else {
                return Err(malformed_error!(
                    "lookupswitch at {} has negative npairs {}",
                    offset,
                    count
                ));
            };
            parser.calc_end_position(count.saturating_mul(8))?;
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let key = parser.read_be::<i32>()?;
                let target = absolute(offset, i64::from(parser.read_be::<i32>()?))?;
                pairs.push((key, target));
            }
            Instruction::LookupSwitch { default, pairs }
        }
        OperandLayout::Wide => {
            let modified = parser.read_be::<u8>()?;
            let length = match modified {
                opcodes::IINC => 4,
                0x15..=0x19 | 0x36..=0x3A | opcodes::RET => 2,
                _ => {
                    return Err(malformed_error!(
                        "wide at {} modifies {} which cannot be widened",
                        offset,
                        opcodes::mnemonic(modified)
                    ))
                }
            };
            let mut operands = Vec::with_capacity(length + 1);
            operands.push(modified);
            operands.extend_from_slice(parser.read_bytes(length)?);
            Instruction::Other { opcode, operands }
        }
    };

    Ok(instruction)
}

/// Symbolic decoding of pool-indexed instructions that may name a class through a member
/// reference or a loadable constant. `None` for opcodes that are kept opaque, and for
/// references through text that does not decode.
fn decode_pool_ref(
    opcode: u8,
    index: u16,
    operands: &[u8],
    pool: &ConstantPool,
) -> Option<Result<Instruction>> {
    if pool.has_undecodable_text(index) {
        return None;
    }

    let decoded = match opcode {
        opcodes::GETSTATIC | opcodes::PUTSTATIC | opcodes::GETFIELD | opcodes::PUTFIELD => {
            pool.member_ref(index).and_then(|member| {
                if member.kind != MemberKind::Field {
                    return Err(malformed_error!(
                        "{} references #{} which is not a field",
                        opcodes::mnemonic(opcode),
                        index
                    ));
                }
                Ok(Instruction::Field(FieldInsn {
                    opcode,
                    owner: member.owner.to_string(),
                    name: member.name.to_string(),
                    descriptor: member.descriptor.to_string(),
                    index: Some(index),
                }))
            })
        }
        opcodes::INVOKEVIRTUAL
        | opcodes::INVOKESPECIAL
        | opcodes::INVOKESTATIC
        | opcodes::INVOKEINTERFACE => pool.member_ref(index).and_then(|member| {
            if member.kind == MemberKind::Field {
                return Err(malformed_error!(
                    "{} references #{} which is a field",
                    opcodes::mnemonic(opcode),
                    index
                ));
            }
            Ok(Instruction::Method(MethodInsn {
                opcode,
                owner: member.owner.to_string(),
                name: member.name.to_string(),
                descriptor: member.descriptor.to_string(),
                is_interface: member.kind == MemberKind::InterfaceMethod,
                index: Some(index),
                count: if opcode == opcodes::INVOKEINTERFACE {
                    operands.get(2).copied()
                } else {
                    None
                },
            }))
        }),
        opcodes::LDC_W | opcodes::LDC2_W => pool.ldc_value(index).map(|value| {
            Instruction::Ldc(LdcInsn {
                opcode,
                value,
                index: Some(index),
            })
        }),
        _ => return None,
    };
    Some(decoded)
}

/// Skip the zero to three bytes aligning switch operands to a multiple of four from the
/// start of the code array.
fn skip_padding(parser: &mut Parser) -> Result<()> {
    let padding = (4 - parser.pos() % 4) % 4;
    parser.advance_by(padding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bytecode::LdcValue,
        classfile::constpool::{Constant, Utf8Entry},
        Error,
    };

    fn pool() -> (ConstantPool, u16, u16, u16) {
        let mut pool = ConstantPool::new();
        let field = pool
            .intern_member_ref(MemberKind::Field, "lib/R$id", "title", "I")
            .unwrap();
        let method = pool
            .intern_member_ref(MemberKind::InterfaceMethod, "a/I", "run", "()V")
            .unwrap();
        let class = pool.intern_class("lib/R").unwrap();
        (pool, field, method, class)
    }

    #[test]
    fn decode_symbolic() {
        let (pool, field, method, class) = pool();
        let [f0, f1] = field.to_be_bytes();
        let [m0, m1] = method.to_be_bytes();
        let code = [
            opcodes::GETSTATIC,
            f0,
            f1,
            opcodes::INVOKEINTERFACE,
            m0,
            m1,
            1,
            0,
            opcodes::LDC,
            class as u8,
            opcodes::NEW,
            0,
            class as u8,
            opcodes::RETURN,
        ];

        let decoded = decode(&code, &pool).unwrap();
        assert_eq!(decoded.offsets, vec![0, 3, 8, 10, 13, 14]);

        match &decoded.instructions[0] {
            Instruction::Field(insn) => {
                assert_eq!(insn.owner, "lib/R$id");
                assert_eq!(insn.index, Some(field));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &decoded.instructions[1] {
            Instruction::Method(insn) => {
                assert!(insn.is_interface);
                assert_eq!(insn.owner, "a/I");
                assert_eq!(insn.count, Some(1));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &decoded.instructions[2] {
            Instruction::Ldc(insn) => assert_eq!(insn.value, LdcValue::Type("lib/R".into())),
            other => panic!("unexpected {other:?}"),
        }
        // `new` stays opaque
        assert_eq!(
            decoded.instructions[3],
            Instruction::Other {
                opcode: opcodes::NEW,
                operands: vec![0, class as u8]
            }
        );
    }

    #[test]
    fn undecodable_references_stay_opaque() {
        let mut pool = ConstantPool::new();
        let surrogate = pool
            .intern(Constant::Utf8(Utf8Entry::from_bytes(vec![0xED, 0xA0, 0x80])))
            .unwrap();
        let string = pool
            .intern(Constant::String {
                string_index: surrogate,
            })
            .unwrap();
        let owner = pool.intern(Constant::Class { name_index: surrogate }).unwrap();
        let name_and_type_index = pool.intern_name_and_type("title", "I").unwrap();
        let field = pool
            .intern(Constant::FieldRef {
                class_index: owner,
                name_and_type_index,
            })
            .unwrap();
        let [f0, f1] = field.to_be_bytes();
        let code = [
            opcodes::LDC,
            string as u8,
            opcodes::GETSTATIC,
            f0,
            f1,
            opcodes::RETURN,
        ];

        let decoded = decode(&code, &pool).unwrap();
        assert_eq!(
            decoded.instructions[0],
            Instruction::Ldc(LdcInsn {
                opcode: opcodes::LDC,
                value: LdcValue::Other(string),
                index: Some(string),
            })
        );
        assert_eq!(
            decoded.instructions[1],
            Instruction::Other {
                opcode: opcodes::GETSTATIC,
                operands: vec![f0, f1]
            }
        );
        assert_eq!(decoded.instructions[1].referenced_class(), None);
    }

    #[test]
    fn decode_branches_to_indices() {
        let pool = ConstantPool::new();
        // 0: iconst_0, 1: ifeq +4 -> 5, 4: nop, 5: goto -1 -> 4
        let code = [opcodes::ICONST_0, opcodes::IFEQ, 0, 4, opcodes::NOP, opcodes::GOTO, 0xFF, 0xFF];
        let decoded = decode(&code, &pool).unwrap();

        assert_eq!(
            decoded.instructions[1],
            Instruction::Branch {
                opcode: opcodes::IFEQ,
                target: 3
            }
        );
        assert_eq!(
            decoded.instructions[3],
            Instruction::Branch {
                opcode: opcodes::GOTO,
                target: 2
            }
        );
    }

    #[test]
    fn decode_tableswitch_with_padding() {
        let pool = ConstantPool::new();
        // 0: iload_0, 1: tableswitch (2 bytes padding) default +23, keys 0..=1 -> +23, +24
        let mut code = vec![0x1A, opcodes::TABLESWITCH, 0, 0];
        for value in [23_i32, 0, 1, 23, 24] {
            code.extend_from_slice(&value.to_be_bytes());
        }
        code.push(opcodes::NOP); // 24
        code.push(opcodes::RETURN); // 25

        let decoded = decode(&code, &pool).unwrap();
        assert_eq!(
            decoded.instructions[1],
            Instruction::TableSwitch {
                default: 2,
                low: 0,
                high: 1,
                targets: vec![2, 3],
            }
        );
    }

    #[test]
    fn decode_wide() {
        let pool = ConstantPool::new();
        let code = [opcodes::WIDE, opcodes::IINC, 1, 0, 0xFF, 0xFF, opcodes::RETURN];
        let decoded = decode(&code, &pool).unwrap();
        assert_eq!(
            decoded.instructions[0],
            Instruction::Other {
                opcode: opcodes::WIDE,
                operands: vec![opcodes::IINC, 1, 0, 0xFF, 0xFF]
            }
        );
        assert_eq!(decoded.offsets, vec![0, 6, 7]);
    }

    #[test]
    fn decode_errors() {
        let pool = ConstantPool::new();

        // Reserved opcode
        assert!(matches!(decode(&[0xCB], &pool), Err(Error::Malformed { .. })));
        // Branch into the middle of an instruction
        assert!(matches!(
            decode(&[opcodes::GOTO, 0, 1], &pool),
            Err(Error::Malformed { .. })
        ));
        // Branch past the end
        assert!(matches!(
            decode(&[opcodes::GOTO, 0, 3], &pool),
            Err(Error::Malformed { .. })
        ));
        // Truncated operand
        assert!(matches!(
            decode(&[opcodes::SIPUSH, 0], &pool),
            Err(Error::OutOfBounds { .. })
        ));
        // Dangling constant pool reference
        assert!(matches!(
            decode(&[opcodes::GETSTATIC, 0, 9], &pool),
            Err(Error::Malformed { .. })
        ));
    }
}
