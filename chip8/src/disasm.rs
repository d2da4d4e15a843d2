//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{
    bytecode::Instr,
    constants::MEM_START,
    dispatch::{OpDef, OpTable, Operands},
};

pub struct Disassembler<'a> {
    bytecode: &'a [u8],
    ops: OpTable,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self {
            bytecode,
            ops: OpTable::new(),
        }
    }

    /// Write the whole program, one instruction per line.
    ///
    /// Addresses are where the bytes will live once loaded, starting at [`MEM_START`].
    /// A trailing odd byte is written as data.
    pub fn disassemble<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        for (i, chunk) in self.bytecode.chunks(2).enumerate() {
            let address = MEM_START + i * 2;

            match *chunk {
                [a, b] => self.disassemble_instr(w, address, Instr::from_bytes(a, b))?,
                [a] => writeln!(w, "{address:04X}: {a:02X}   DB 0x{a:02X}")?,
                _ => unreachable!("chunks are never empty"),
            }
        }

        Ok(())
    }

    /// Write a single instruction to the given writer.
    pub fn disassemble_instr<W: FmtWrite>(
        &self,
        w: &mut W,
        address: usize,
        instr: Instr,
    ) -> fmt::Result {
        write!(w, "{address:04X}: {instr} ")?;

        match self.ops.lookup(instr) {
            Some(def) => write_instr(w, def, instr)?,
            None => write!(w, "DW 0x{:04X}", instr.word)?,
        }

        writeln!(w)
    }

    pub fn print_bytecode(&self) -> fmt::Result {
        let mut s = String::new();
        self.disassemble(&mut s)?;
        println!("{}", s);
        Ok(())
    }
}

fn write_instr<W: FmtWrite>(w: &mut W, def: &OpDef, instr: Instr) -> fmt::Result {
    let Instr { x, y, n, nn, nnn, .. } = instr;
    let name = def.mnemonic;

    match def.operands {
        Operands::None => write!(w, "{name}"),
        Operands::Addr => write!(w, "{name:4} 0x{nnn:03X}"),
        Operands::V0Addr => write!(w, "{name:4} V0, 0x{nnn:03X}"),
        Operands::IAddr => write!(w, "{name:4} I, 0x{nnn:03X}"),
        Operands::RegByte => write!(w, "{name:4} V{x:X}, 0x{nn:02X}"),
        Operands::RegReg => write!(w, "{name:4} V{x:X}, V{y:X}"),
        Operands::RegRegNibble => write!(w, "{name:4} V{x:X}, V{y:X}, {n}"),
        Operands::Reg => write!(w, "{name:4} V{x:X}"),
        Operands::RegFrom(k) => write!(w, "{name:4} V{x:X}, {k}"),
        Operands::IntoReg(k) => write!(w, "{name:4} {k}, V{x:X}"),
    }
}
