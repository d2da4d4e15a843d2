//! Instruction table.
//!
//! Opcodes are identified by their group, the upper nibble of the
//! instruction word, and a sub-key for the groups that pack several
//! instructions together:
//!
//! - `0x0`, `0xE` and `0xF` are identified by the low byte `NN`.
//! - `0x8` is identified by the low nibble `N`.
//! - Every other group has a single instruction, with sub-key `0`.
//!
//! The definitions are compiled into a flat lookup table at startup.
use crate::{bytecode::Instr, ops::*};

/// Operand layout of an instruction, used for disassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    /// No operands.
    None,
    /// `addr`
    Addr,
    /// `V0, addr`
    V0Addr,
    /// `I, addr`
    IAddr,
    /// `Vx, byte`
    RegByte,
    /// `Vx, Vy`
    RegReg,
    /// `Vx, Vy, nibble`
    RegRegNibble,
    /// `Vx`
    Reg,
    /// `Vx, <name>`
    RegFrom(&'static str),
    /// `<name>, Vx`
    IntoReg(&'static str),
}

/// Definition of a single instruction.
#[derive(Clone, Copy)]
pub struct OpDef {
    /// Opcode group, upper nibble.
    pub group: u8,
    /// Sub-key within the group.
    pub sub: u8,
    /// Instruction template as commonly documented, eg. `8XY4`.
    pub pattern: &'static str,
    pub mnemonic: &'static str,
    pub operands: Operands,
    pub exec: OpFn,
}

impl std::fmt::Debug for OpDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpDef")
            .field("pattern", &self.pattern)
            .field("mnemonic", &self.mnemonic)
            .finish()
    }
}

macro_rules! op {
    ($group:expr, $sub:expr, $pattern:literal, $mnemonic:literal, $operands:expr, $exec:expr) => {
        OpDef {
            group: $group,
            sub: $sub,
            pattern: $pattern,
            mnemonic: $mnemonic,
            operands: $operands,
            exec: $exec,
        }
    };
}

/// The base instruction set.
///
/// `0NNN` (SYS addr) was a call into native machine code on the COSMAC VIP,
/// and is left out. Like any other unknown instruction it is skipped.
#[rustfmt::skip]
pub static OPCODES: &[OpDef] = &[
    op!(0x0, 0xE0, "00E0", "CLS",  Operands::None,          cls),
    op!(0x0, 0xEE, "00EE", "RET",  Operands::None,          ret),
    op!(0x1, 0x00, "1NNN", "JP",   Operands::Addr,          jp),
    op!(0x2, 0x00, "2NNN", "CALL", Operands::Addr,          call),
    op!(0x3, 0x00, "3XNN", "SE",   Operands::RegByte,       se_byte),
    op!(0x4, 0x00, "4XNN", "SNE",  Operands::RegByte,       sne_byte),
    op!(0x5, 0x00, "5XY0", "SE",   Operands::RegReg,        se_reg),
    op!(0x6, 0x00, "6XNN", "LD",   Operands::RegByte,       ld_byte),
    op!(0x7, 0x00, "7XNN", "ADD",  Operands::RegByte,       add_byte),
    op!(0x8, 0x00, "8XY0", "LD",   Operands::RegReg,        ld_reg),
    op!(0x8, 0x01, "8XY1", "OR",   Operands::RegReg,        or),
    op!(0x8, 0x02, "8XY2", "AND",  Operands::RegReg,        and),
    op!(0x8, 0x03, "8XY3", "XOR",  Operands::RegReg,        xor),
    op!(0x8, 0x04, "8XY4", "ADD",  Operands::RegReg,        add_reg),
    op!(0x8, 0x05, "8XY5", "SUB",  Operands::RegReg,        sub),
    op!(0x8, 0x06, "8XY6", "SHR",  Operands::Reg,           shr),
    op!(0x8, 0x07, "8XY7", "SUBN", Operands::RegReg,        subn),
    op!(0x8, 0x0E, "8XYE", "SHL",  Operands::Reg,           shl),
    op!(0x9, 0x00, "9XY0", "SNE",  Operands::RegReg,        sne_reg),
    op!(0xA, 0x00, "ANNN", "LD",   Operands::IAddr,         ld_i),
    op!(0xB, 0x00, "BNNN", "JP",   Operands::V0Addr,        jp_v0),
    op!(0xC, 0x00, "CXNN", "RND",  Operands::RegByte,       rnd),
    op!(0xD, 0x00, "DXYN", "DRW",  Operands::RegRegNibble,  drw),
    op!(0xE, 0x9E, "EX9E", "SKP",  Operands::Reg,           skp),
    op!(0xE, 0xA1, "EXA1", "SKNP", Operands::Reg,           sknp),
    op!(0xF, 0x07, "FX07", "LD",   Operands::RegFrom("DT"), ld_vx_dt),
    op!(0xF, 0x0A, "FX0A", "LD",   Operands::RegFrom("K"),  ld_vx_k),
    op!(0xF, 0x15, "FX15", "LD",   Operands::IntoReg("DT"), ld_dt_vx),
    op!(0xF, 0x18, "FX18", "LD",   Operands::IntoReg("ST"), ld_st_vx),
    op!(0xF, 0x1E, "FX1E", "ADD",  Operands::IntoReg("I"),  add_i),
    op!(0xF, 0x29, "FX29", "LD",   Operands::IntoReg("F"),  ld_f),
    op!(0xF, 0x33, "FX33", "LD",   Operands::IntoReg("B"),  ld_b),
    op!(0xF, 0x55, "FX55", "LD",   Operands::IntoReg("[I]"), ld_mem_vx),
    op!(0xF, 0x65, "FX65", "LD",   Operands::RegFrom("[I]"), ld_vx_mem),
];

/// Number of distinct sub-keys a group can have.
const SUB_KEYS: usize = 0x100;

/// Sub-key of the instruction within its group.
#[inline(always)]
pub fn sub_key(instr: Instr) -> u8 {
    match instr.op {
        0x0 | 0xE | 0xF => instr.nn,
        0x8 => instr.n,
        _ => 0,
    }
}

/// Lookup table from (group, sub-key) to instruction definition.
pub struct OpTable {
    entries: Box<[Option<&'static OpDef>]>,
}

impl OpTable {
    pub fn new() -> Self {
        let mut entries = vec![None; 0x10 * SUB_KEYS].into_boxed_slice();

        for def in OPCODES {
            let slot = &mut entries[Self::index(def.group, def.sub)];
            debug_assert!(slot.is_none(), "duplicate opcode {}", def.pattern);
            *slot = Some(def);
        }

        Self { entries }
    }

    #[inline(always)]
    fn index(group: u8, sub: u8) -> usize {
        ((group as usize & 0xF) * SUB_KEYS) | sub as usize
    }

    /// Find the definition of the given instruction.
    ///
    /// Returns `None` for words that don't encode a known instruction.
    #[inline(always)]
    pub fn lookup(&self, instr: Instr) -> Option<&'static OpDef> {
        self.entries[Self::index(instr.op, sub_key(instr))]
    }
}

impl Default for OpTable {
    fn default() -> Self {
        Self::new()
    }
}
