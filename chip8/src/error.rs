//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::Address;

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

/// Errors that abort an operation on the VM as a whole, such as loading a program.
///
/// Problems encountered while executing instructions are never returned
/// as errors. They are reported as a [`Fault`] and the machine carries on.
#[derive(Debug)]
pub enum Chip8Error {
    /// Failed to read a program image from disk.
    Io(std::io::Error),
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { size: usize, capacity: usize },
    Memory(MemoryError),
    Fmt(fmt::Error),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read program: {err}"),
            Self::LargeProgram { size, capacity } => write!(
                f,
                "program too large for VM memory: {size} bytes, capacity is {capacity} bytes"
            ),
            Self::Memory(err) => write!(f, "{err}"),
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Chip8Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Memory(err) => Some(err),
            Self::Fmt(err) => Some(err),
            Self::LargeProgram { .. } => None,
        }
    }
}

impl From<std::io::Error> for Chip8Error {
    fn from(err: std::io::Error) -> Self {
        Chip8Error::Io(err)
    }
}

impl From<MemoryError> for Chip8Error {
    fn from(err: MemoryError) -> Self {
        Chip8Error::Memory(err)
    }
}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}

/// Invalid memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// Address lies outside of the memory capacity.
    OutOfRange { address: usize },
    /// Program attempted to write into the interpreter's reserved region.
    Protected { address: usize },
}

impl Display for MemoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { address } => {
                write!(f, "memory address 0x{address:04X} is out of range")
            }
            Self::Protected { address } => {
                write!(f, "memory address 0x{address:04X} is reserved")
            }
        }
    }
}

impl std::error::Error for MemoryError {}

/// Recoverable problem encountered while executing an instruction.
///
/// The offending instruction has no effect, the fault is logged,
/// and execution can continue with the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Memory(MemoryError),
    /// Bit pattern does not match any known instruction.
    UnknownOpcode { address: Address, opcode: u16 },
    /// `RET` executed with an empty call stack.
    ///
    /// The program counter is left pointing at the `RET`.
    StackUnderflow { address: Address },
    /// `CALL` executed with the call stack at its configured limit.
    StackOverflow { address: Address, depth: usize },
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(err) => write!(f, "{err}"),
            Self::UnknownOpcode { address, opcode } => {
                write!(f, "0x{address:04X}: unknown opcode {opcode:04X}")
            }
            Self::StackUnderflow { address } => {
                write!(f, "0x{address:04X}: return with empty call stack")
            }
            Self::StackOverflow { address, depth } => {
                write!(f, "0x{address:04X}: call stack overflow at depth {depth}")
            }
        }
    }
}

impl std::error::Error for Fault {}

impl From<MemoryError> for Fault {
    fn from(err: MemoryError) -> Self {
        Fault::Memory(err)
    }
}
