//! Virtual machine.
use std::{
    fmt::{self, Write},
    path::Path,
    time::Duration,
};

use rand::prelude::*;

use crate::{
    constants::*,
    cpu::Chip8Cpu,
    display::Display,
    error::{Chip8Error, Chip8Result, Fault},
    keypad::{KeyCode, KeyInput, Keypad},
    opcode::Op,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    rng: StdRng,
    conf: Chip8Conf,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        let rng = match conf.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Chip8Vm {
            cpu: Chip8Cpu::new(),
            rng,
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Load a program image into memory and reset the machine to start executing it.
    ///
    /// A program that does not fit leaves the current machine state untouched.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if bytecode.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
                capacity: MAX_PROGRAM_SIZE,
            });
        }

        // Start with clean memory to avoid leaking previous program.
        // This also reloads the fonts and sets the program counter to the start.
        self.cpu.reset();

        self.cpu.ram.load(bytecode)?;

        log::debug!("loaded {} byte program", bytecode.len());

        Ok(())
    }

    /// Read a program image from disk and load it.
    pub fn load_file(&mut self, filepath: impl AsRef<Path>) -> Chip8Result<()> {
        let filepath = filepath.as_ref();
        log::info!("load rom: {}", filepath.display());

        let bytecode = std::fs::read(filepath)?;
        self.load_bytecode(&bytecode)
    }

    pub fn cpu(&self) -> &Chip8Cpu {
        &self.cpu
    }

    pub fn display(&self) -> &Display {
        &self.cpu.display
    }

    /// Renderer has presented the display, clear the redraw flag.
    pub fn acknowledge_redraw(&mut self) {
        self.cpu.display.acknowledge_redraw();
    }

    /// Buzzer should sound while the sound timer is counting down.
    pub fn is_buzzing(&self) -> bool {
        self.cpu.timers.is_buzzing()
    }
}

/// Outcome of a single step, so the driver can react without inspecting the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// Display buffer was changed.
    Draw,
    /// Sound timer was set to a non-zero value. The buzzer should start.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
    /// The instruction could not be executed and had no effect.
    Fault(Fault),
}

/// VM Configuration Parameters.
#[derive(Debug, Clone)]
pub struct Chip8Conf {
    /// Seed for the random number instruction. Seeded from OS entropy when `None`.
    pub seed: Option<u64>,
    /// Maximum call depth. Unbounded when `None`.
    pub stack_limit: Option<usize>,
    pub quirks: Quirks,
}

impl Default for Chip8Conf {
    fn default() -> Self {
        Self {
            seed: None,
            stack_limit: Some(STACK_SIZE),
            quirks: Quirks::default(),
        }
    }
}

/// Instruction behaviours that differ between the original COSMAC VIP
/// interpreter and later ones.
///
/// The defaults follow the interpreters most programs since the 1990s were written for.
#[derive(Debug, Default, Clone, Copy)]
pub struct Quirks {
    /// `8xy6` and `8xyE` shift `Vy` into `Vx`, instead of shifting `Vx` in place.
    pub shift_uses_vy: bool,
    /// `Fx55` and `Fx65` leave `I` pointing just past the last register transferred.
    pub load_store_increments_index: bool,
}

/// Clock frequency, in hertz (per second)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hz(pub u64);

impl Default for Hz {
    fn default() -> Self {
        Hz(DEFAULT_CLOCK_FREQUENCY)
    }
}

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Interpreter
impl Chip8Vm {
    /// Count down the delay and sound timers.
    ///
    /// Must be called by the driver at 60Hz, independent of the instruction rate.
    pub fn tick_timers(&mut self) {
        self.cpu.timers.tick();
    }

    /// Execute up to `step_count` instructions.
    ///
    /// Stops early when the machine waits for a key, or an instruction faults.
    pub fn run_steps(&mut self, step_count: usize, keys: &mut impl KeyInput) -> Flow {
        for _ in 0..step_count {
            match self.step(keys) {
                flow @ (Flow::KeyWait | Flow::Fault(_)) => return flow,
                _ => {}
            }
        }

        Flow::Ok
    }

    /// Fetch, decode and execute one instruction.
    ///
    /// Faults are logged and returned, the machine is left ready for the next step.
    pub fn step(&mut self, keys: &mut impl KeyInput) -> Flow {
        match self.try_step(keys) {
            Ok(flow) => flow,
            Err(fault) => {
                log::warn!("{fault}");
                Flow::Fault(fault)
            }
        }
    }

    fn try_step(&mut self, keys: &mut impl KeyInput) -> Result<Flow, Fault> {
        let address = self.cpu.pc;

        // A failed fetch leaves the program counter where it is.
        let op = self.cpu.op()?;

        op_trace(address, &op);

        self.cpu.advance();

        match op {
            Op::ClearScreen => {
                self.cpu.display.clear();
                Ok(Flow::Draw)
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Set the program counter to the value at the top of the stack.
            Op::Return => match self.cpu.stack.pop() {
                Some(return_address) => {
                    self.cpu.pc = return_address;
                    Ok(Flow::Jump)
                }
                None => {
                    // Stay on the offending instruction.
                    self.cpu.pc = address;
                    Err(Fault::StackUnderflow { address })
                }
            },
            Op::System { address: target } => {
                log::debug!("0x{address:04X}: ignoring machine code routine 0x{target:03X}");
                Ok(Flow::Ok)
            }
            Op::Jump { address: target } => {
                self.cpu.pc = target;
                Ok(Flow::Jump)
            }
            // 2nnn (CALL addr)
            //
            // Push the address of the next instruction, then jump.
            Op::Call { address: target } => {
                let depth = self.cpu.stack.len();
                if matches!(self.conf.stack_limit, Some(limit) if depth >= limit) {
                    return Err(Fault::StackOverflow { address, depth });
                }

                self.cpu.stack.push(self.cpu.pc);
                self.cpu.pc = target;
                Ok(Flow::Jump)
            }
            Op::SkipEqByte { vx, nn } => Ok(self.skip_if(self.cpu.reg(vx) == nn)),
            Op::SkipNotEqByte { vx, nn } => Ok(self.skip_if(self.cpu.reg(vx) != nn)),
            Op::SkipEq { vx, vy } => Ok(self.skip_if(self.cpu.reg(vx) == self.cpu.reg(vy))),
            Op::SkipNotEq { vx, vy } => Ok(self.skip_if(self.cpu.reg(vx) != self.cpu.reg(vy))),
            Op::LoadByte { vx, nn } => {
                self.cpu.set_reg(vx, nn);
                Ok(Flow::Ok)
            }
            Op::AddByte { vx, nn } => {
                let x = self.cpu.reg(vx);
                self.cpu.set_reg(vx, x.wrapping_add(nn));
                Ok(Flow::Ok)
            }
            Op::Load { .. }
            | Op::Or { .. }
            | Op::And { .. }
            | Op::Xor { .. }
            | Op::Add { .. }
            | Op::Sub { .. }
            | Op::ShiftRight { .. }
            | Op::SubReverse { .. }
            | Op::ShiftLeft { .. } => {
                self.exec_math(op);
                Ok(Flow::Ok)
            }
            Op::LoadAddress { address: target } => {
                self.cpu.address = target;
                Ok(Flow::Ok)
            }
            Op::JumpOffset { address: target } => {
                self.cpu.pc = target.wrapping_add(self.cpu.reg(0) as Address);
                Ok(Flow::Jump)
            }
            // Cxnn (RND Vx, byte)
            //
            // Set register VX to the result of bitwise AND between a random number and NN.
            Op::Random { vx, nn } => {
                let value = self.rng.gen::<u8>() & nn;
                self.cpu.set_reg(vx, value);
                Ok(Flow::Ok)
            }
            // Dxyn (DRW Vx, Vy, nibble)
            //
            // Sprite is 8 pixels wide, N pixels high, stored in bits located in
            // memory pointed to by address register I.
            //
            // If the drawing operation erases existing pixels in the display buffer,
            // register VF is set to 1, and set to 0 if no display bits are unset.
            Op::Draw { vx, vy, n } => {
                let x = self.cpu.reg(vx) as usize;
                let y = self.cpu.reg(vy) as usize;

                let rows = self.cpu.ram.slice(self.cpu.address as usize, n as usize)?;
                let is_erased = self.cpu.display.draw_sprite(x, y, rows);

                self.cpu.set_flag(is_erased);
                Ok(Flow::Draw)
            }
            Op::SkipKeyPressed { vx } => {
                let key = KeyCode::from_nibble(self.cpu.reg(vx));
                Ok(self.skip_if(keys.is_held(key)))
            }
            Op::SkipKeyNotPressed { vx } => {
                let key = KeyCode::from_nibble(self.cpu.reg(vx));
                Ok(self.skip_if(!keys.is_held(key)))
            }
            Op::LoadDelay { vx } => {
                self.cpu.set_reg(vx, self.cpu.timers.delay);
                Ok(Flow::Ok)
            }
            // Fx0A (LD Vx, K)
            //
            // All execution stops until a key is pressed, then the value of that key is stored in Vx.
            Op::WaitKey { vx } => match keys.take_pending() {
                Some(key) => {
                    self.cpu.set_reg(vx, key.as_u8());
                    Ok(Flow::Ok)
                }
                None => {
                    // rewind the program counter to stall the machine
                    self.cpu.pc = address;
                    Ok(Flow::KeyWait)
                }
            },
            Op::SetDelay { vx } => {
                self.cpu.timers.delay = self.cpu.reg(vx);
                Ok(Flow::Ok)
            }
            Op::SetSound { vx } => {
                self.cpu.timers.sound = self.cpu.reg(vx);
                if self.cpu.timers.is_buzzing() {
                    Ok(Flow::Sound)
                } else {
                    Ok(Flow::Ok)
                }
            }
            Op::AddAddress { vx } => {
                let x = self.cpu.reg(vx) as Address;
                self.cpu.address = self.cpu.address.wrapping_add(x);
                Ok(Flow::Ok)
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            Op::LoadGlyph { vx } => {
                let digit = (self.cpu.reg(vx) & 0xF) as Address;
                self.cpu.address = FONTSET_START + digit * FONTSET_HEIGHT as Address;
                Ok(Flow::Ok)
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            Op::StoreBcd { vx } => {
                let x = self.cpu.reg(vx);
                let cells = self.cpu.ram.program_slice_mut(self.cpu.address as usize, 3)?;
                cells[0] = x / 100 % 10;
                cells[1] = x / 10  % 10;
                cells[2] = x       % 10;
                Ok(Flow::Ok)
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            Op::StoreRegisters { vx } => {
                let count = (vx & 0xF) as usize + 1;
                let cells = self
                    .cpu
                    .ram
                    .program_slice_mut(self.cpu.address as usize, count)?;
                cells.copy_from_slice(&self.cpu.registers[..count]);
                self.bump_index(count);
                Ok(Flow::Ok)
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            Op::LoadRegisters { vx } => {
                let count = (vx & 0xF) as usize + 1;
                let cells = self.cpu.ram.slice(self.cpu.address as usize, count)?;
                self.cpu.registers[..count].copy_from_slice(cells);
                self.bump_index(count);
                Ok(Flow::Ok)
            }
            // Consumed as a no-op so the machine does not spin on it.
            Op::Unknown(opcode) => Err(Fault::UnknownOpcode { address, opcode }),
        }
    }

    /// Execute an arithmetic instruction
    #[inline]
    fn exec_math(&mut self, op: Op) {
        match op {
            // 8XY0 (LD Vx, Vy)
            Op::Load { vx, vy } => self.cpu.set_reg(vx, self.cpu.reg(vy)),
            // 8XY1 (OR Vx, Vy)
            Op::Or { vx, vy } => self.cpu.set_reg(vx, self.cpu.reg(vx) | self.cpu.reg(vy)),
            // 8XY2 (AND Vx, Vy)
            Op::And { vx, vy } => self.cpu.set_reg(vx, self.cpu.reg(vx) & self.cpu.reg(vy)),
            // 8XY3 (XOR Vx, Vy)
            Op::Xor { vx, vy } => self.cpu.set_reg(vx, self.cpu.reg(vx) ^ self.cpu.reg(vy)),
            // 8XY4 (ADD Vx, Vy)
            //
            // Overflow is wrapped.
            // If overflow, set VF to 1, else 0.
            Op::Add { vx, vy } => {
                let (result, carry) = self.cpu.reg(vx).overflowing_add(self.cpu.reg(vy));
                self.cpu.set_reg(vx, result);
                self.cpu.set_flag(carry);
            }
            // 8XY5 (SUB Vx, Vy)
            //
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::Sub { vx, vy } => {
                let (x, y) = (self.cpu.reg(vx), self.cpu.reg(vy));
                self.cpu.set_reg(vx, x.wrapping_sub(y));
                self.cpu.set_flag(x >= y);
            }
            // 8XY6 (SHR Vx)
            //
            // If the least-significant bit of Vx is 1, then VF is set to 1, otherwise 0.
            Op::ShiftRight { vx, vy } => {
                let x = self.shift_source(vx, vy);
                self.cpu.set_reg(vx, x >> 1);
                self.cpu.set_flag(x & 1 == 1);
            }
            // 8XY7 (SUBN Vx, Vy)
            //
            // Subtracts VX from VY, and stores the result in VX.
            Op::SubReverse { vx, vy } => {
                let (x, y) = (self.cpu.reg(vx), self.cpu.reg(vy));
                self.cpu.set_reg(vx, y.wrapping_sub(x));
                self.cpu.set_flag(y >= x);
            }
            // 8XYE (SHL Vx)
            //
            // If the most-significant bit of Vx is 1, then VF is set to 1, otherwise 0.
            Op::ShiftLeft { vx, vy } => {
                let x = self.shift_source(vx, vy);
                self.cpu.set_reg(vx, x << 1);
                self.cpu.set_flag(x >> 7 == 1);
            }
            _ => unreachable!("not an arithmetic instruction: {op}"),
        }
    }

    #[inline(always)]
    fn shift_source(&self, vx: u8, vy: u8) -> u8 {
        if self.conf.quirks.shift_uses_vy {
            self.cpu.reg(vy)
        } else {
            self.cpu.reg(vx)
        }
    }

    #[inline(always)]
    fn skip_if(&mut self, condition: bool) -> Flow {
        if condition {
            self.cpu.advance();
        }
        Flow::Ok
    }

    #[inline(always)]
    fn bump_index(&mut self, count: usize) {
        if self.conf.quirks.load_store_increments_index {
            self.cpu.address = self.cpu.address.wrapping_add(count as Address);
        }
    }
}

/// Troubleshooting
#[allow(dead_code)]
#[doc(hidden)]
impl Chip8Vm {
    /// Returns the contents of the program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for address in (MEM_START..MEM_SIZE).step_by(2).take(count / 2) {
            if let Ok(bytes) = self.cpu.ram.read_instr(address) {
                let [a, b] = bytes;
                writeln!(buf, "{address:04X}: {a:02X}{b:02X} {}", Op::decode(bytes))?;
            }
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();
        write!(buf, "{}", self.cpu.display)?;
        Ok(buf)
    }

    pub fn dump_keys(&self, keypad: &Keypad) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if keypad.any_held() {
            write!(buf, "keys: ")?;
            for key in keypad.iter_held() {
                write!(buf, "{key}")?;
            }
        }

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(address: Address, op: &Op) {
    log::trace!("{address:04X}: {op}");
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: Address, _: &Op) {}
