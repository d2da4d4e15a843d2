//! Helpers for extracting data from opcodes.
use std::fmt;

use crate::constants::*;

/// A decoded instruction word with all of its operand fields.
///
/// Every field is extracted up front. Which ones are meaningful
/// depends on the opcode group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr {
    /// Raw big-endian instruction word.
    pub word: u16,
    /// Opcode group, the upper nibble (0xF000).
    pub op: u8,
    /// Register index X (0x0F00).
    pub x: u8,
    /// Register index Y (0x00F0).
    pub y: u8,
    /// 4-bit immediate (0x000F).
    pub n: u8,
    /// 8-bit immediate (0x00FF).
    pub nn: u8,
    /// 12-bit address (0x0FFF).
    pub nnn: Address,
}

impl Instr {
    #[inline(always)]
    pub fn new(word: u16) -> Self {
        let [a, b] = word.to_be_bytes();
        Self {
            word,
            op: a >> 4,
            x: a & 0xF,
            y: b >> 4,
            n: b & 0xF,
            nn: b,
            nnn: word & 0x0FFF,
        }
    }

    /// Combine two consecutive bytes into an instruction.
    #[inline(always)]
    pub fn from_bytes(a: u8, b: u8) -> Self {
        Self::new(u16::from_be_bytes([a, b]))
    }

    /// Read the instruction at the cursor, wrapping around the end of memory.
    #[inline(always)]
    pub fn fetch(ram: &[u8; MEM_SIZE], cursor: usize) -> Self {
        Self::from_bytes(ram[cursor & ADDRESS_MASK], ram[(cursor + 1) & ADDRESS_MASK])
    }

    /// Register index X, suitable for indexing the register file.
    #[inline(always)]
    pub fn vx(&self) -> usize {
        self.x as usize
    }

    /// Register index Y, suitable for indexing the register file.
    #[inline(always)]
    pub fn vy(&self) -> usize {
        self.y as usize
    }
}

impl From<u16> for Instr {
    fn from(word: u16) -> Self {
        Self::new(word)
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.word)
    }
}
