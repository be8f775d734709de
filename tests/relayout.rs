//! Byte-level behaviour of writing rewritten classes, including `ldc` widening.

mod common;

use classremap::{
    bytecode::{opcodes, Instruction},
    classfile::{Attribute, ClassFile, ExceptionHandler},
    prelude::*,
};
use common::{offsets, r_class_table, sample_class, SampleOptions};

const PADDED: SampleOptions = SampleOptions {
    padding: 300,
    type_annotations: false,
};

fn nested<'a>(class: &'a ClassFile, name: &str) -> Result<&'a Attribute> {
    let code = class.methods[0]
        .code()
        .ok_or_else(|| Error::Relayout("sample method has no body".into()))?;
    for attribute in &code.attributes {
        if attribute.name(&class.constant_pool)? == name {
            return Ok(attribute);
        }
    }
    Err(Error::Relayout(format!("no {name} attribute")))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[test]
fn test_round_trip_is_byte_identical() -> Result<()> {
    for options in [
        SampleOptions::default(),
        PADDED,
        SampleOptions {
            padding: 300,
            type_annotations: true,
        },
    ] {
        let bytes = sample_class(options);
        assert_eq!(ClassFile::parse(&bytes)?.to_bytes()?, bytes);
    }
    Ok(())
}

#[test]
fn test_narrow_pool_keeps_layout() -> Result<()> {
    let bytes = sample_class(SampleOptions::default());
    let output = ClassFile::parse(&rewrite(ClassFile::parse(&bytes)?, &r_class_table()).to_bytes()?)?;

    let code = output.methods[0].code().unwrap();
    assert_eq!(
        code.exception_table,
        vec![ExceptionHandler {
            start_pc: 0,
            end_pc: 6,
            handler_pc: offsets::HANDLER,
            catch_type: code.exception_table[0].catch_type,
        }]
    );
    let original = ClassFile::parse(&bytes)?;
    for name in ["LineNumberTable", "LocalVariableTable", "StackMapTable"] {
        assert_eq!(nested(&output, name)?.data, nested(&original, name)?.data);
    }
    Ok(())
}

#[test]
fn test_widened_ldc_moves_everything_after_it() -> Result<()> {
    let bytes = sample_class(PADDED);
    let original = ClassFile::parse(&bytes)?;
    let written = rewrite(original.clone(), &r_class_table()).to_bytes()?;
    let output = ClassFile::parse(&written)?;

    let code = output.methods[0].code().unwrap();
    match &code.instructions[6] {
        Instruction::Ldc(insn) => {
            assert_eq!(insn.opcode, opcodes::LDC_W);
            assert!(insn.index.is_some_and(|index| index > 255));
        }
        other => panic!("expected a class literal load, got {other}"),
    }
    // the string literal keeps its narrow form
    assert_eq!(code.instructions[4].opcode(), opcodes::LDC);
    assert_eq!(code.instructions.len(), original.methods[0].code().unwrap().instructions.len());

    // default moved from 34 to 35, the case targets sit before the widened load
    assert!(contains(
        &written,
        &[
            opcodes::TABLESWITCH,
            0, 0, 0, 28,
            0, 0, 0, 0,
            0, 0, 0, 1,
            0, 0, 0, 21,
            0, 0, 0, 24,
        ]
    ));

    let handler = code.exception_table[0];
    assert_eq!((handler.start_pc, handler.end_pc, handler.handler_pc), (0, 6, 37));

    assert_eq!(
        nested(&output, "LineNumberTable")?.data,
        vec![0, 4, 0, 0, 0, 10, 0, 6, 0, 11, 0, 28, 0, 12, 0, 37, 0, 14]
    );
    assert_eq!(
        nested(&output, "LocalVariableTable")?.data[..6],
        [0, 1, 0, 0, 0, 40]
    );

    let old_frames = &nested(&original, "StackMapTable")?.data;
    let mut expected = vec![0, 4, 28, 2, 3, 65, 7];
    expected.extend_from_slice(&old_frames[old_frames.len() - 2..]);
    assert_eq!(nested(&output, "StackMapTable")?.data, expected);
    Ok(())
}

#[test]
fn test_widened_output_survives_another_pass() -> Result<()> {
    let once = rewrite(ClassFile::parse(&sample_class(PADDED))?, &r_class_table()).to_bytes()?;
    assert_eq!(ClassFile::parse(&once)?.to_bytes()?, once);
    Ok(())
}

#[test]
fn test_type_annotations_block_relayout() -> Result<()> {
    let annotated = sample_class(SampleOptions {
        padding: 300,
        type_annotations: true,
    });
    let rewritten = rewrite(ClassFile::parse(&annotated)?, &r_class_table());
    assert!(matches!(rewritten.to_bytes(), Err(Error::Relayout(_))));

    let session = RewriteSession::from_table(r_class_table(), ClassFilter::All);
    assert!(matches!(
        session.rewrite_bytes(&annotated),
        Err(Error::Relayout(_))
    ));

    // without a layout change the annotations are written back untouched
    let narrow = sample_class(SampleOptions {
        padding: 0,
        type_annotations: true,
    });
    let output = ClassFile::parse(&rewrite(ClassFile::parse(&narrow)?, &r_class_table()).to_bytes()?)?;
    assert_eq!(nested(&output, "RuntimeVisibleTypeAnnotations")?.data, vec![0, 0]);
    Ok(())
}

#[test]
fn test_mismatched_instruction_count_is_rejected() -> Result<()> {
    let mut class = ClassFile::parse(&sample_class(SampleOptions::default()))?;
    class.methods[0]
        .code_mut()
        .unwrap()
        .instructions
        .insert(0, Instruction::simple(opcodes::NOP));
    assert!(matches!(class.to_bytes(), Err(Error::Relayout(_))));
    Ok(())
}
