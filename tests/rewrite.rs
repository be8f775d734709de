//! Integration tests for the reference rewriter on complete class files.

mod common;

use classremap::{
    bytecode::{opcodes, FieldInsn, Instruction, LdcInsn, LdcValue, MethodInsn},
    classfile::{ClassFile, Code, MethodAccessFlags},
    prelude::*,
};
use common::{r_class_table, sample_class, SampleOptions};

fn body(class: &ClassFile) -> &[Instruction] {
    &class.methods[0].code().unwrap().instructions
}

#[test]
fn test_empty_table_is_identity() -> Result<()> {
    let bytes = sample_class(SampleOptions::default());
    let class = ClassFile::parse(&bytes)?;

    let (rewritten, stats) = rewrite_with_stats(class.clone(), &RenameTable::default());
    assert!(stats.is_empty());
    assert_eq!(body(&rewritten), body(&class));
    assert_eq!(rewritten.to_bytes()?, bytes);

    let session = RewriteSession::from_table(RenameTable::default(), ClassFilter::All);
    let outcome = session.rewrite_bytes(&bytes)?;
    assert!(matches!(outcome, ClassOutcome::Unchanged(_)));
    assert_eq!(outcome.into_inner(), bytes);
    Ok(())
}

#[test]
fn test_r_class_scenario() -> Result<()> {
    let bytes = sample_class(SampleOptions::default());
    let class = ClassFile::parse(&bytes)?;
    let (rewritten, stats) = rewrite_with_stats(class, &r_class_table());

    assert_eq!(stats.methods, 1);
    assert_eq!(stats.field_refs, 1);
    assert_eq!(stats.method_refs, 0);
    assert_eq!(stats.type_constants, 1);

    let output = ClassFile::parse(&rewritten.to_bytes()?)?;
    let instructions = body(&output);

    match &instructions[0] {
        Instruction::Field(insn) => {
            assert_eq!(insn.opcode, opcodes::GETSTATIC);
            assert_eq!(insn.owner, "app/R$id");
            assert_eq!(insn.name, "title");
            assert_eq!(insn.descriptor, "I");
        }
        other => panic!("expected a field access, got {other}"),
    }
    match &instructions[1] {
        Instruction::Method(insn) => assert_eq!(insn.owner, "lib/Util"),
        other => panic!("expected an invocation, got {other}"),
    }
    match &instructions[4] {
        Instruction::Ldc(insn) => assert_eq!(insn.value, LdcValue::String("lib/R".into())),
        other => panic!("expected a string load, got {other}"),
    }
    match &instructions[6] {
        Instruction::Ldc(insn) => {
            assert_eq!(insn.opcode, opcodes::LDC);
            assert_eq!(insn.value, LdcValue::Type("app/R".into()));
        }
        other => panic!("expected a class literal load, got {other}"),
    }
    Ok(())
}

#[test]
fn test_order_and_count_preserved() -> Result<()> {
    let class = ClassFile::parse(&sample_class(SampleOptions::default()))?;
    let before = body(&class).to_vec();
    let rewritten = rewrite(class, &r_class_table());
    let after = body(&rewritten);

    assert_eq!(before.len(), after.len());
    for (old, new) in before.iter().zip(after) {
        assert_eq!(old.opcode(), new.opcode());
        if old.referenced_class().is_some_and(|name| r_class_table().contains(name)) {
            assert_ne!(old, new);
        } else {
            assert_eq!(old, new);
        }
    }
    Ok(())
}

#[test]
fn test_identity_mapping_is_byte_identical() -> Result<()> {
    let bytes = sample_class(SampleOptions::default());
    let table: RenameTable = [("lib/R", "lib/R"), ("lib/R$id", "lib/R$id")]
        .into_iter()
        .collect();

    let rewritten = rewrite(ClassFile::parse(&bytes)?, &table);
    assert_eq!(rewritten.to_bytes()?, bytes);
    Ok(())
}

#[test]
fn test_second_pass_changes_nothing() -> Result<()> {
    let bytes = sample_class(SampleOptions::default());
    let once = rewrite(ClassFile::parse(&bytes)?, &r_class_table()).to_bytes()?;
    let twice = rewrite(ClassFile::parse(&once)?, &r_class_table()).to_bytes()?;
    assert_eq!(once, twice);
    Ok(())
}

#[test]
fn test_constant_pool_only_grows() -> Result<()> {
    let bytes = sample_class(SampleOptions::default());
    let class = ClassFile::parse(&bytes)?;
    let before = class.constant_pool.clone();

    let output = ClassFile::parse(&rewrite(class, &r_class_table()).to_bytes()?)?;
    // Utf8 + Class for app/R and app/R$id, plus a Fieldref reusing the NameAndType
    assert_eq!(output.constant_pool.len(), before.len() + 5);
    for (index, constant) in before.iter() {
        assert_eq!(output.constant_pool.get(index)?, constant);
    }
    Ok(())
}

#[test]
fn test_unmapped_types_untouched() -> Result<()> {
    let mut class = ClassFile::new("app/Main", Some("java/lang/Object"))?;
    class.add_method(
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        "classes",
        "()V",
        Some(Code::new(
            1,
            0,
            vec![
                Instruction::Ldc(LdcInsn::class("lib/Unrelated")),
                Instruction::simple(opcodes::POP),
                Instruction::Ldc(LdcInsn::new(LdcValue::Integer(7))),
                Instruction::simple(opcodes::POP),
                Instruction::Ldc(LdcInsn::new(LdcValue::Double(2.5_f64.to_bits()))),
                Instruction::simple(0x58), // pop2
                Instruction::simple(opcodes::RETURN),
            ],
        )),
    );
    let bytes = class.to_bytes()?;

    let session = RewriteSession::from_table(r_class_table(), ClassFilter::All);
    let outcome = session.rewrite_bytes(&bytes)?;
    assert!(matches!(outcome, ClassOutcome::Unchanged(_)));
    assert_eq!(outcome.into_inner(), bytes);
    Ok(())
}

#[test]
fn test_interface_invocation_keeps_shape() -> Result<()> {
    let mut class = ClassFile::new("app/Main", Some("java/lang/Object"))?;
    class.add_method(
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        "call",
        "(Llib/R$Listener;)V",
        Some(Code::new(
            2,
            1,
            vec![
                Instruction::simple(opcodes::ALOAD_0),
                Instruction::simple(opcodes::ICONST_0),
                Instruction::Method(MethodInsn::new(
                    opcodes::INVOKEINTERFACE,
                    "lib/R$Listener",
                    "onClick",
                    "(I)V",
                    true,
                )),
                Instruction::Field(FieldInsn::new(
                    opcodes::GETSTATIC,
                    "lib/R$Listener",
                    "NONE",
                    "Llib/R$Listener;",
                )),
                Instruction::simple(opcodes::POP),
                Instruction::simple(opcodes::RETURN),
            ],
        )),
    );
    let table: RenameTable = [("lib/R$Listener", "app/R$Listener")].into_iter().collect();

    let output = ClassFile::parse(&rewrite(class, &table).to_bytes()?)?;
    let instructions = body(&output);
    match &instructions[2] {
        Instruction::Method(insn) => {
            assert_eq!(insn.opcode, opcodes::INVOKEINTERFACE);
            assert!(insn.is_interface);
            assert_eq!(insn.owner, "app/R$Listener");
            assert_eq!(insn.interface_arg_count(), 2);
        }
        other => panic!("expected an invocation, got {other}"),
    }
    match &instructions[3] {
        Instruction::Field(insn) => {
            assert_eq!(insn.owner, "app/R$Listener");
            // descriptors are not part of the rewrite
            assert_eq!(insn.descriptor, "Llib/R$Listener;");
        }
        other => panic!("expected a field access, got {other}"),
    }
    assert_eq!(output.methods[0].descriptor, "(Llib/R$Listener;)V");
    Ok(())
}

#[test]
fn test_lone_surrogate_string_survives() -> Result<()> {
    let mut class = ClassFile::new("app/Main", Some("java/lang/Object"))?;
    class.add_method(
        MethodAccessFlags::STATIC,
        "value",
        "()I",
        Some(Code::new(
            1,
            0,
            vec![
                Instruction::Ldc(LdcInsn::new(LdcValue::String("QQQ".into()))),
                Instruction::simple(opcodes::POP),
                Instruction::Field(FieldInsn::new(opcodes::GETSTATIC, "lib/R$id", "title", "I")),
                Instruction::simple(opcodes::IRETURN),
            ],
        )),
    );
    let mut bytes = class.to_bytes()?;

    // javac writes "\uD800" as ED A0 80
    let position = bytes
        .windows(5)
        .position(|window| window == [0x00, 0x03, b'Q', b'Q', b'Q'])
        .unwrap();
    bytes[position + 2..position + 5].copy_from_slice(&[0xED, 0xA0, 0x80]);

    let session = RewriteSession::from_table(r_class_table(), ClassFilter::All);
    let outcome = session.rewrite_bytes(&bytes)?;
    assert!(outcome.is_rewritten());
    assert_eq!(outcome.stats().field_refs, 1);

    let rewritten = outcome.into_inner();
    // Pool entries are only appended; everything up to the string is as read
    assert_eq!(&rewritten[10..position + 5], &bytes[10..position + 5]);

    let output = ClassFile::parse(&rewritten)?;
    let instructions = body(&output);
    match &instructions[0] {
        Instruction::Ldc(insn) => {
            assert!(matches!(insn.value, LdcValue::Other(_)));
            assert_eq!(insn.opcode, opcodes::LDC);
        }
        other => panic!("expected a constant load, got {other}"),
    }
    assert_eq!(instructions[2].referenced_class(), Some("app/R$id"));
    Ok(())
}
