//! Shared fixtures for the integration tests.
//!
//! The sample class is assembled by hand the way javac lays it out, including the
//! offset-bearing attributes (exception table, `LineNumberTable`, `LocalVariableTable`,
//! `StackMapTable`) that a relayout has to carry along.
#![allow(dead_code)]

use classremap::{
    bytecode::{opcodes, LdcValue},
    classfile::{ConstantPool, MemberKind},
    table::RenameTable,
};

/// The rename table of a typical library merge.
pub fn r_class_table() -> RenameTable {
    [("lib/R", "app/R"), ("lib/R$id", "app/R$id")]
        .into_iter()
        .collect()
}

/// Knobs for [`sample_class`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleOptions {
    /// Integer constants appended after everything the method uses, pushing new entries
    /// past index 255
    pub padding: usize,
    /// Add an (empty) `RuntimeVisibleTypeAnnotations` attribute to the method body
    pub type_annotations: bool,
}

/// Offsets of interest in the sample method body.
pub mod offsets {
    pub const TABLESWITCH: u16 = 7;
    pub const LDC_STRING: u16 = 28;
    pub const LDC_CLASS: u16 = 31;
    pub const DEFAULT: u16 = 34;
    pub const HANDLER: u16 = 36;
    pub const CODE_LENGTH: u16 = 39;
}

fn u16_be(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn u32_be(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn attribute(out: &mut Vec<u8>, name_index: u16, data: &[u8]) {
    u16_be(out, name_index);
    u32_be(out, data.len() as u32);
    out.extend_from_slice(data);
}

/// `app/MainActivity` with one method:
///
/// ```text
/// public static Object run(int value) {
///      0: getstatic     lib/R$id.title:I
///      3: invokestatic  lib/Util.log:(I)V
///      6: iload_0
///      7: tableswitch   { 0: 28, 1: 31, default: 34 }
///     28: ldc           "lib/R"
///     30: areturn
///     31: ldc           class lib/R
///     33: areturn
///     34: aconst_null
///     35: areturn
///     36: astore_1            // handler for 0..6, java/lang/Exception
///     37: aconst_null
///     38: areturn
/// }
/// ```
pub fn sample_class(options: SampleOptions) -> Vec<u8> {
    let mut pool = ConstantPool::new();
    let this_class = pool.intern_class("app/MainActivity").unwrap();
    let super_class = pool.intern_class("java/lang/Object").unwrap();
    let field = pool
        .intern_member_ref(MemberKind::Field, "lib/R$id", "title", "I")
        .unwrap();
    let log = pool
        .intern_member_ref(MemberKind::Method, "lib/Util", "log", "(I)V")
        .unwrap();
    let text = pool.intern_ldc(&LdcValue::String("lib/R".into())).unwrap();
    let class_r = pool.intern_class("lib/R").unwrap();
    let exception = pool.intern_class("java/lang/Exception").unwrap();

    let run = pool.intern_utf8("run").unwrap();
    let run_descriptor = pool.intern_utf8("(I)Ljava/lang/Object;").unwrap();
    let code_name = pool.intern_utf8("Code").unwrap();
    let lnt_name = pool.intern_utf8("LineNumberTable").unwrap();
    let lvt_name = pool.intern_utf8("LocalVariableTable").unwrap();
    let smt_name = pool.intern_utf8("StackMapTable").unwrap();
    let tya_name = pool.intern_utf8("RuntimeVisibleTypeAnnotations").unwrap();
    let value_name = pool.intern_utf8("value").unwrap();
    let int_descriptor = pool.intern_utf8("I").unwrap();
    let source_name = pool.intern_utf8("SourceFile").unwrap();
    let source_file = pool.intern_utf8("MainActivity.java").unwrap();

    for n in 0..options.padding {
        pool.intern_ldc(&LdcValue::Integer(1000 + n as i32)).unwrap();
    }

    let mut code = Vec::new();
    code.push(opcodes::GETSTATIC);
    u16_be(&mut code, field);
    code.push(opcodes::INVOKESTATIC);
    u16_be(&mut code, log);
    code.push(0x1A); // iload_0
    code.push(opcodes::TABLESWITCH);
    for value in [27_i32, 0, 1, 21, 24] {
        code.extend_from_slice(&value.to_be_bytes());
    }
    code.extend_from_slice(&[opcodes::LDC, text as u8, opcodes::ARETURN]);
    code.extend_from_slice(&[opcodes::LDC, class_r as u8, opcodes::ARETURN]);
    code.extend_from_slice(&[opcodes::ACONST_NULL, opcodes::ARETURN]);
    code.extend_from_slice(&[0x4C, opcodes::ACONST_NULL, opcodes::ARETURN]);
    assert_eq!(code.len(), offsets::CODE_LENGTH as usize);

    let mut line_numbers = Vec::new();
    u16_be(&mut line_numbers, 4);
    for (pc, line) in [(0, 10), (6, 11), (offsets::LDC_STRING, 12), (offsets::HANDLER, 14)] {
        u16_be(&mut line_numbers, pc);
        u16_be(&mut line_numbers, line);
    }

    let mut locals = Vec::new();
    u16_be(&mut locals, 1);
    for value in [0, offsets::CODE_LENGTH, value_name, int_descriptor, 0] {
        u16_be(&mut locals, value);
    }

    let mut stack_map = Vec::new();
    u16_be(&mut stack_map, 4);
    stack_map.extend_from_slice(&[28, 2, 2, 65, 7]);
    u16_be(&mut stack_map, exception);

    let mut body = Vec::new();
    u16_be(&mut body, 1); // max_stack
    u16_be(&mut body, 2); // max_locals
    u32_be(&mut body, code.len() as u32);
    body.extend_from_slice(&code);
    u16_be(&mut body, 1);
    for value in [0, 6, offsets::HANDLER, exception] {
        u16_be(&mut body, value);
    }
    u16_be(&mut body, if options.type_annotations { 4 } else { 3 });
    attribute(&mut body, lnt_name, &line_numbers);
    attribute(&mut body, lvt_name, &locals);
    attribute(&mut body, smt_name, &stack_map);
    if options.type_annotations {
        attribute(&mut body, tya_name, &[0, 0]);
    }

    let mut class = Vec::new();
    u32_be(&mut class, 0xCAFE_BABE);
    u16_be(&mut class, 0);
    u16_be(&mut class, 52);
    pool.write(&mut class);
    u16_be(&mut class, 0x0021); // public super
    u16_be(&mut class, this_class);
    u16_be(&mut class, super_class);
    u16_be(&mut class, 0); // interfaces
    u16_be(&mut class, 0); // fields
    u16_be(&mut class, 1); // methods
    u16_be(&mut class, 0x0009); // public static
    u16_be(&mut class, run);
    u16_be(&mut class, run_descriptor);
    u16_be(&mut class, 1);
    attribute(&mut class, code_name, &body);
    u16_be(&mut class, 1); // class attributes
    let mut source = Vec::new();
    u16_be(&mut source, source_file);
    attribute(&mut class, source_name, &source);

    class
}
