//! JVM opcode byte constants and per-opcode layout metadata (JVMS §6.5).
//!
//! Opcodes are named after their mnemonic in upper case (e.g. [`INVOKESTATIC`] = `0xB8`).
//! [`OPCODES`] maps every byte to its mnemonic and operand layout, which is all the decoder
//! needs to walk a method body without understanding what each instruction does.
#![allow(missing_docs)]

// ── Constants ──────────────────────────────────────────────────────────────
pub const NOP: u8 = 0x00;
pub const ACONST_NULL: u8 = 0x01;
pub const ICONST_0: u8 = 0x03;
pub const BIPUSH: u8 = 0x10;
pub const SIPUSH: u8 = 0x11;
pub const LDC: u8 = 0x12;
pub const LDC_W: u8 = 0x13;
pub const LDC2_W: u8 = 0x14;

// ── Loads / stores ─────────────────────────────────────────────────────────
pub const ILOAD: u8 = 0x15;
pub const ALOAD: u8 = 0x19;
pub const ALOAD_0: u8 = 0x2A;
pub const ISTORE: u8 = 0x36;
pub const ASTORE: u8 = 0x3A;
pub const POP: u8 = 0x57;
pub const DUP: u8 = 0x59;
pub const IADD: u8 = 0x60;
pub const IINC: u8 = 0x84;

// ── Branches ───────────────────────────────────────────────────────────────
pub const IFEQ: u8 = 0x99;
pub const IFNE: u8 = 0x9A;
pub const IF_ICMPGE: u8 = 0xA2;
pub const IF_ACMPNE: u8 = 0xA6;
pub const GOTO: u8 = 0xA7;
pub const JSR: u8 = 0xA8;
pub const RET: u8 = 0xA9;
pub const TABLESWITCH: u8 = 0xAA;
pub const LOOKUPSWITCH: u8 = 0xAB;
pub const IRETURN: u8 = 0xAC;
pub const ARETURN: u8 = 0xB0;
pub const RETURN: u8 = 0xB1;

// ── Member access ──────────────────────────────────────────────────────────
pub const GETSTATIC: u8 = 0xB2;
pub const PUTSTATIC: u8 = 0xB3;
pub const GETFIELD: u8 = 0xB4;
pub const PUTFIELD: u8 = 0xB5;
pub const INVOKEVIRTUAL: u8 = 0xB6;
pub const INVOKESPECIAL: u8 = 0xB7;
pub const INVOKESTATIC: u8 = 0xB8;
pub const INVOKEINTERFACE: u8 = 0xB9;
pub const INVOKEDYNAMIC: u8 = 0xBA;

// ── Objects ────────────────────────────────────────────────────────────────
pub const NEW: u8 = 0xBB;
pub const NEWARRAY: u8 = 0xBC;
pub const ANEWARRAY: u8 = 0xBD;
pub const ATHROW: u8 = 0xBF;
pub const CHECKCAST: u8 = 0xC0;
pub const INSTANCEOF: u8 = 0xC1;
pub const WIDE: u8 = 0xC4;
pub const MULTIANEWARRAY: u8 = 0xC5;
pub const IFNULL: u8 = 0xC6;
pub const IFNONNULL: u8 = 0xC7;
pub const GOTO_W: u8 = 0xC8;
pub const JSR_W: u8 = 0xC9;

/// How the bytes following an opcode are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandLayout {
    /// No operand bytes
    None,
    /// Fixed number of opaque operand bytes (local index, immediate, type code)
    Fixed(u8),
    /// `u16` constant pool index, followed by `extra` opaque bytes
    PoolIndex { extra: u8 },
    /// `u8` constant pool index (`ldc`)
    PoolIndexU8,
    /// Signed 16-bit branch offset
    Branch16,
    /// Signed 32-bit branch offset
    Branch32,
    /// `tableswitch` with alignment padding
    TableSwitch,
    /// `lookupswitch` with alignment padding
    LookupSwitch,
    /// `wide` prefix, size depends on the modified opcode
    Wide,
}

/// Static description of one opcode.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    /// Mnemonic as written by `javap`, empty for unassigned bytes
    pub mnemonic: &'static str,
    /// Operand layout
    pub layout: OperandLayout,
}

impl OpcodeInfo {
    /// Returns `true` for bytes that do not encode a JVM instruction.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.mnemonic.is_empty()
    }
}

const fn op(mnemonic: &'static str, layout: OperandLayout) -> OpcodeInfo {
    OpcodeInfo { mnemonic, layout }
}

use OperandLayout::{
    Branch16 as B16, Branch32 as B32, Fixed as F, LookupSwitch as LS, None as N,
    PoolIndex as P, PoolIndexU8 as P8, TableSwitch as TS, Wide as W,
};

const UNUSED: OpcodeInfo = op("", N);

/// Layout of every opcode byte, indexed by the opcode value.
pub static OPCODES: [OpcodeInfo; 256] = {
    let mut table = [UNUSED; 256];

    let simple: [&str; 202] = [
        "nop", "aconst_null", "iconst_m1", "iconst_0", "iconst_1", "iconst_2", "iconst_3",
        "iconst_4", "iconst_5", "lconst_0", "lconst_1", "fconst_0", "fconst_1", "fconst_2",
        "dconst_0", "dconst_1", "bipush", "sipush", "ldc", "ldc_w", "ldc2_w", "iload", "lload",
        "fload", "dload", "aload", "iload_0", "iload_1", "iload_2", "iload_3", "lload_0",
        "lload_1", "lload_2", "lload_3", "fload_0", "fload_1", "fload_2", "fload_3", "dload_0",
        "dload_1", "dload_2", "dload_3", "aload_0", "aload_1", "aload_2", "aload_3", "iaload",
        "laload", "faload", "daload", "aaload", "baload", "caload", "saload", "istore",
        "lstore", "fstore", "dstore", "astore", "istore_0", "istore_1", "istore_2", "istore_3",
        "lstore_0", "lstore_1", "lstore_2", "lstore_3", "fstore_0", "fstore_1", "fstore_2",
        "fstore_3", "dstore_0", "dstore_1", "dstore_2", "dstore_3", "astore_0", "astore_1",
        "astore_2", "astore_3", "iastore", "lastore", "fastore", "dastore", "aastore",
        "bastore", "castore", "sastore", "pop", "pop2", "dup", "dup_x1", "dup_x2", "dup2",
        "dup2_x1", "dup2_x2", "swap", "iadd", "ladd", "fadd", "dadd", "isub", "lsub", "fsub",
        "dsub", "imul", "lmul", "fmul", "dmul", "idiv", "ldiv", "fdiv", "ddiv", "irem", "lrem",
        "frem", "drem", "ineg", "lneg", "fneg", "dneg", "ishl", "lshl", "ishr", "lshr", "iushr",
        "lushr", "iand", "land", "ior", "lor", "ixor", "lxor", "iinc", "i2l", "i2f", "i2d",
        "l2i", "l2f", "l2d", "f2i", "f2l", "f2d", "d2i", "d2l", "d2f", "i2b", "i2c", "i2s",
        "lcmp", "fcmpl", "fcmpg", "dcmpl", "dcmpg", "ifeq", "ifne", "iflt", "ifge", "ifgt",
        "ifle", "if_icmpeq", "if_icmpne", "if_icmplt", "if_icmpge", "if_icmpgt", "if_icmple",
        "if_acmpeq", "if_acmpne", "goto", "jsr", "ret", "tableswitch", "lookupswitch",
        "ireturn", "lreturn", "freturn", "dreturn", "areturn", "return", "getstatic",
        "putstatic", "getfield", "putfield", "invokevirtual", "invokespecial", "invokestatic",
        "invokeinterface", "invokedynamic", "new", "newarray", "anewarray", "arraylength",
        "athrow", "checkcast", "instanceof", "monitorenter", "monitorexit", "wide",
        "multianewarray", "ifnull", "ifnonnull", "goto_w", "jsr_w",
    ];

    let mut index = 0;
    while index < simple.len() {
        table[index] = op(simple[index], N);
        index += 1;
    }

    // Operand layouts that differ from "no operand"
    table[0x10].layout = F(1); // bipush
    table[0x11].layout = F(2); // sipush
    table[0x12].layout = P8; // ldc
    table[0x13].layout = P { extra: 0 }; // ldc_w
    table[0x14].layout = P { extra: 0 }; // ldc2_w

    let mut local = 0x15; // iload .. aload
    while local <= 0x19 {
        table[local].layout = F(1);
        local += 1;
    }
    let mut local = 0x36; // istore .. astore
    while local <= 0x3A {
        table[local].layout = F(1);
        local += 1;
    }

    table[0x84].layout = F(2); // iinc

    let mut branch = 0x99; // ifeq .. jsr
    while branch <= 0xA8 {
        table[branch].layout = B16;
        branch += 1;
    }
    table[0xA9].layout = F(1); // ret
    table[0xAA].layout = TS;
    table[0xAB].layout = LS;

    let mut member = 0xB2; // getstatic .. invokestatic
    while member <= 0xB8 {
        table[member].layout = P { extra: 0 };
        member += 1;
    }
    table[0xB9].layout = P { extra: 2 }; // invokeinterface count, 0
    table[0xBA].layout = P { extra: 2 }; // invokedynamic 0, 0
    table[0xBB].layout = P { extra: 0 }; // new
    table[0xBC].layout = F(1); // newarray
    table[0xBD].layout = P { extra: 0 }; // anewarray
    table[0xC0].layout = P { extra: 0 }; // checkcast
    table[0xC1].layout = P { extra: 0 }; // instanceof
    table[0xC4].layout = W;
    table[0xC5].layout = P { extra: 1 }; // multianewarray dimensions
    table[0xC6].layout = B16; // ifnull
    table[0xC7].layout = B16; // ifnonnull
    table[0xC8].layout = B32; // goto_w
    table[0xC9].layout = B32; // jsr_w

    table
};

/// Look up the mnemonic of an opcode, `"<reserved>"` for unassigned bytes.
#[must_use]
pub fn mnemonic(opcode: u8) -> &'static str {
    let info = &OPCODES[opcode as usize];
    if info.is_reserved() {
        "<reserved>"
    } else {
        info.mnemonic
    }
}
