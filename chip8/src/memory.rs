//! Main memory.
//!
//! ```text
//! +---------------+ 0xFFF  End of RAM
//! |               |
//! | 0x200 - 0xFFF |
//! | Program/Data  |
//! |               |
//! +---------------+ 0x200  Start of most programs
//! | 0x000 - 0x1FF |
//! | Reserved for  |
//! | interpreter   |
//! +---------------+ 0x000  Font
//! ```
use crate::{
    constants::*,
    error::{Chip8Error, Chip8Result, MemoryError},
};

/// Flat, bounds-checked byte addressable memory.
pub struct Memory {
    ram: Box<[u8; MEM_SIZE]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            ram: Box::new([0; MEM_SIZE]),
        }
    }
}

impl Memory {
    pub fn new() -> Self {
        Default::default()
    }

    /// Total number of addressable bytes.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        MEM_SIZE
    }

    #[inline]
    pub fn read(&self, address: usize) -> Result<u8, MemoryError> {
        self.ram
            .get(address)
            .copied()
            .ok_or(MemoryError::OutOfRange { address })
    }

    /// Write a byte anywhere in memory, including the reserved region.
    #[inline]
    pub fn write(&mut self, address: usize, value: u8) -> Result<(), MemoryError> {
        let cell = self
            .ram
            .get_mut(address)
            .ok_or(MemoryError::OutOfRange { address })?;
        *cell = value;
        Ok(())
    }

    /// Borrow `len` bytes starting at `address`.
    pub fn slice(&self, address: usize, len: usize) -> Result<&[u8], MemoryError> {
        let end = Self::check_range(address, len)?;
        Ok(&self.ram[address..end])
    }

    /// Borrow `len` bytes of program space starting at `address`, for writing.
    ///
    /// This is the only way instructions write memory. The whole range is
    /// checked before anything is handed out, so a rejected write leaves
    /// memory untouched.
    pub fn program_slice_mut(
        &mut self,
        address: usize,
        len: usize,
    ) -> Result<&mut [u8], MemoryError> {
        if address < MEM_START {
            return Err(MemoryError::Protected { address });
        }
        let end = Self::check_range(address, len)?;
        Ok(&mut self.ram[address..end])
    }

    /// Fetch the big-endian instruction word at `address`.
    #[inline]
    pub fn read_instr(&self, address: usize) -> Result<[u8; 2], MemoryError> {
        Ok([self.read(address)?, self.read(address + 1)?])
    }

    /// Copy a program image into memory at [`MEM_START`].
    ///
    /// Memory is left untouched when the image is too large.
    pub fn load(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if bytecode.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
                capacity: MAX_PROGRAM_SIZE,
            });
        }

        self.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);

        Ok(())
    }

    /// Write the hexadecimal digit font into the reserved region.
    pub fn init_fonts(&mut self) {
        let start = FONTSET_START as usize;
        self.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    /// Erase all of memory, fonts included.
    pub fn clear(&mut self) {
        self.ram.fill(0);
    }

    /// Returns the end of the range, exclusive.
    fn check_range(address: usize, len: usize) -> Result<usize, MemoryError> {
        let end = address.saturating_add(len);
        if address >= MEM_SIZE {
            Err(MemoryError::OutOfRange { address })
        } else if end > MEM_SIZE {
            Err(MemoryError::OutOfRange { address: MEM_SIZE })
        } else {
            Ok(end)
        }
    }
}
