mod bytecode;
pub mod constants;
mod cpu;
mod disasm;
mod dispatch;
mod display;
mod error;
mod font;
mod keypad;
mod ops;
mod vm;

pub use self::{
    bytecode::Instr,
    dispatch::{OpDef, OpTable, Operands, OPCODES},
    error::{Chip8Error, Chip8Result},
    keypad::{InvalidKeyCode, KeyCode},
    vm::{Flow, Hz},
};

/// Version of this crate, for display in front ends.
pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        cpu::Chip8Cpu,
        disasm::Disassembler,
        error::{Chip8Error, Chip8Result},
        keypad::KeyCode,
        vm::{Chip8Conf, Chip8Vm, Flow},
    };
}
