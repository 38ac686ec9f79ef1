//! CPU and memory state.
use crate::{
    constants::*, display::Display, error::MemoryError, memory::Memory, opcode::Op,
    timer::Timers,
};

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the next instruction in memory.
    pub(crate) pc: Address,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register (I) used for temporarily storing an address.
    pub(crate) address: Address,
    pub(crate) timers: Timers,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Memory,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: Vec<Address>,
    /// Screen buffer that is drawn too.
    pub(crate) display: Display,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        let mut ram = Memory::new();
        ram.init_fonts();

        Self {
            pc: MEM_START as Address,
            registers: [0; REGISTER_COUNT],
            address: 0,
            timers: Timers::new(),

            ram,
            stack: Vec::with_capacity(STACK_SIZE),
            display: Display::new(),
        }
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Return registers, timers and buffers to their power-on state.
    ///
    /// Memory is erased and the font reloaded.
    pub(crate) fn reset(&mut self) {
        self.pc = MEM_START as Address;
        self.registers.fill(0);
        self.address = 0;
        self.timers = Timers::new();
        self.stack.clear();
        self.ram.clear();
        self.ram.init_fonts();
        self.display = Display::new();
    }

    #[inline(always)]
    pub fn pc(&self) -> Address {
        self.pc
    }

    #[inline(always)]
    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    /// Index register (I).
    #[inline(always)]
    pub fn address(&self) -> Address {
        self.address
    }

    #[inline(always)]
    pub fn stack(&self) -> &[Address] {
        &self.stack
    }

    #[inline(always)]
    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    #[inline(always)]
    pub fn memory(&self) -> &Memory {
        &self.ram
    }

    #[inline(always)]
    pub fn display(&self) -> &Display {
        &self.display
    }

    /// Extract the instruction at the current program counter.
    #[inline(always)]
    pub fn instr(&self) -> Result<[u8; 2], MemoryError> {
        self.ram.read_instr(self.pc as usize)
    }

    /// Decode the instruction at the current program counter.
    #[inline]
    pub fn op(&self) -> Result<Op, MemoryError> {
        self.instr().map(Op::decode)
    }

    #[inline(always)]
    pub(crate) fn reg(&self, index: u8) -> u8 {
        self.registers[(index & 0xF) as usize]
    }

    #[inline(always)]
    pub(crate) fn set_reg(&mut self, index: u8, value: u8) {
        self.registers[(index & 0xF) as usize] = value;
    }

    /// Write the carry, borrow or collision flag.
    #[inline(always)]
    pub(crate) fn set_flag(&mut self, flag: bool) {
        self.registers[FLAG_REGISTER] = flag as u8;
    }

    /// Move to the next instruction.
    #[inline(always)]
    pub(crate) fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_power_on_state() {
        let cpu = Chip8Cpu::new();

        assert_eq!(cpu.pc(), 0x200);
        assert_eq!(cpu.address(), 0);
        assert!(cpu.stack().is_empty());
        assert_eq!(cpu.registers(), &[0; REGISTER_COUNT]);
        assert_eq!(
            cpu.memory().slice(FONTSET_START as usize, FONTSET_DATA_LENGTH),
            Ok(&FONTSET[..])
        );
    }

    #[test]
    fn test_register_index_masked() {
        let mut cpu = Chip8Cpu::new();

        cpu.set_reg(0x1F, 7);
        assert_eq!(cpu.reg(0xF), 7);

        cpu.set_flag(true);
        assert_eq!(cpu.registers()[FLAG_REGISTER], 1);
    }

    #[test]
    fn test_reset() {
        let mut cpu = Chip8Cpu::new();
        cpu.pc = 0x300;
        cpu.stack.push(0x202);
        cpu.ram.write(0x400, 1).unwrap();
        cpu.display.set(1, 1, true);

        cpu.reset();

        assert_eq!(cpu.pc(), 0x200);
        assert!(cpu.stack().is_empty());
        assert_eq!(cpu.memory().read(0x400), Ok(0));
        assert_eq!(cpu.memory().read(0), Ok(FONTSET[0]));
        assert!(!cpu.display().get(1, 1));
    }
}
