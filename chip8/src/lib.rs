mod clock;
pub mod constants;
mod cpu;
mod disasm;
mod display;
mod error;
mod keypad;
mod memory;
mod opcode;
mod timer;
mod vm;

pub use self::{
    error::{Chip8Error, Fault, MemoryError},
    keypad::{KeyCode, KeyInput, Keypad, SharedKeypad},
    vm::Hz,
};

/// Version of this implementation, reported by drivers.
pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        clock::Clock,
        cpu::Chip8Cpu,
        disasm::{Disassembler, Instr},
        display::Display,
        error::{Chip8Error, Chip8Result, Fault, MemoryError},
        keypad::{KeyCode, KeyInput, Keypad, SharedKeypad},
        memory::Memory,
        opcode::Op,
        timer::Timers,
        vm::{Chip8Conf, Chip8Vm, Flow, Hz, Quirks},
    };
}
