//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::{Address, MAX_PROGRAM_SIZE};

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chip8Error {
    /// Attempt to load a bytecode program with no bytes.
    EmptyProgram,
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { size: usize },
    /// `RET` executed with nothing on the call stack.
    ///
    /// The program counter points past the faulting instruction.
    StackUnderflow { pc: Address },
    /// `CALL` executed while the call stack is at its configured limit.
    StackOverflow { pc: Address },
    Fmt(fmt::Error),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyProgram => write!(f, "program is empty"),
            Self::LargeProgram { size } => write!(
                f,
                "program too large for VM memory: {size} bytes, maximum is {MAX_PROGRAM_SIZE}"
            ),
            Self::StackUnderflow { pc } => {
                write!(f, "runtime error: call stack underflow at 0x{pc:04X}")
            }
            Self::StackOverflow { pc } => {
                write!(f, "runtime error: call stack overflow at 0x{pc:04X}")
            }
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Chip8Error {}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}
