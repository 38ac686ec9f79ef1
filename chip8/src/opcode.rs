//! Instruction decoding.
//!
//! Each instruction is two bytes, big-endian, with the opcode family in the
//! upper nibble. Families `0`, `8`, `E` and `F` are further identified by the
//! lower nibble or byte.
use std::fmt;

use crate::constants::Address;

/// Decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// 00E0 (CLS)
    ///
    /// Clear the screen.
    ClearScreen,
    /// 00EE (RET)
    ///
    /// Return from the sub-routine.
    Return,
    /// 0nnn (SYS addr)
    ///
    /// Jump to a machine code routine on the original hardware.
    /// Ignored by modern interpreters.
    System { address: Address },
    /// 1nnn (JP addr)
    Jump { address: Address },
    /// 2nnn (CALL addr)
    Call { address: Address },
    /// 3xnn (SE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` equals value `nn`.
    SkipEqByte { vx: u8, nn: u8 },
    /// 4xnn (SNE Vx, byte)
    SkipNotEqByte { vx: u8, nn: u8 },
    /// 5xy0 (SE Vx, Vy)
    SkipEq { vx: u8, vy: u8 },
    /// 6xnn (LD Vx, byte)
    LoadByte { vx: u8, nn: u8 },
    /// 7xnn (ADD Vx, byte)
    ///
    /// Add byte to `Vx`, wrapping. Carry flag is not set.
    AddByte { vx: u8, nn: u8 },

    // ------------------------------------------------------------------------
    // Math
    /// 8xy0 (LD Vx, Vy)
    Load { vx: u8, vy: u8 },
    /// 8xy1 (OR Vx, Vy)
    Or { vx: u8, vy: u8 },
    /// 8xy2 (AND Vx, Vy)
    And { vx: u8, vy: u8 },
    /// 8xy3 (XOR Vx, Vy)
    Xor { vx: u8, vy: u8 },
    /// 8xy4 (ADD Vx, Vy)
    ///
    /// Overflow is wrapped. If overflowed, set VF to 1, else 0.
    Add { vx: u8, vy: u8 },
    /// 8xy5 (SUB Vx, Vy)
    ///
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    Sub { vx: u8, vy: u8 },
    /// 8xy6 (SHR Vx {, Vy})
    ShiftRight { vx: u8, vy: u8 },
    /// 8xy7 (SUBN Vx, Vy)
    ///
    /// Subtracts VX from VY, and stores the result in VX.
    SubReverse { vx: u8, vy: u8 },
    /// 8xyE (SHL Vx {, Vy})
    ShiftLeft { vx: u8, vy: u8 },
    /// 9xy0 (SNE Vx, Vy)
    SkipNotEq { vx: u8, vy: u8 },

    // ------------------------------------------------------------------------
    /// Annn (LD I, addr)
    LoadAddress { address: Address },
    /// Bnnn (JP V0, addr)
    ///
    /// Jump to location nnn + V0.
    JumpOffset { address: Address },
    /// Cxnn (RND Vx, byte)
    Random { vx: u8, nn: u8 },
    /// Dxyn (DRW Vx, Vy, nibble)
    Draw { vx: u8, vy: u8, n: u8 },

    // ------------------------------------------------------------------------
    // Keyboard
    /// Ex9E (SKP Vx)
    SkipKeyPressed { vx: u8 },
    /// ExA1 (SKNP Vx)
    SkipKeyNotPressed { vx: u8 },

    // ------------------------------------------------------------------------
    // Misc
    /// Fx07 (LD Vx, DT)
    LoadDelay { vx: u8 },
    /// Fx0A (LD Vx, K)
    WaitKey { vx: u8 },
    /// Fx15 (LD DT, Vx)
    SetDelay { vx: u8 },
    /// Fx18 (LD ST, Vx)
    SetSound { vx: u8 },
    /// Fx1E (ADD I, Vx)
    AddAddress { vx: u8 },
    /// Fx29 (LD F, Vx)
    LoadGlyph { vx: u8 },
    /// Fx33 (LD B, Vx)
    StoreBcd { vx: u8 },
    /// Fx55 (LD [I], Vx)
    StoreRegisters { vx: u8 },
    /// Fx65 (LD Vx, [I])
    LoadRegisters { vx: u8 },

    /// Bit pattern that matches no instruction.
    Unknown(u16),
}

impl Op {
    /// Decode a two byte instruction.
    #[rustfmt::skip]
    pub fn decode(bytecode: [u8; 2]) -> Op {
        let [a, b] = bytecode;
        let op = a >> 4;                               // 0xF000
        let vx = a & 0xF;                              // 0x0F00
        let vy = b >> 4;                               // 0x00F0
        let n = b & 0xF;                               // 0x000F
        let nn = b;                                    // 0x00FF
        let nnn = (((a as u16) & 0xF) << 8) | b as u16; // 0x0FFF

        match op {
            0x0 => match nnn {
                0x0E0 => Op::ClearScreen,
                0x0EE => Op::Return,
                _ => Op::System { address: nnn },
            },
            0x1 => Op::Jump { address: nnn },
            0x2 => Op::Call { address: nnn },
            0x3 => Op::SkipEqByte { vx, nn },
            0x4 => Op::SkipNotEqByte { vx, nn },
            0x5 if n == 0 => Op::SkipEq { vx, vy },
            0x6 => Op::LoadByte { vx, nn },
            0x7 => Op::AddByte { vx, nn },
            0x8 => match n {
                0x0 => Op::Load { vx, vy },
                0x1 => Op::Or { vx, vy },
                0x2 => Op::And { vx, vy },
                0x3 => Op::Xor { vx, vy },
                0x4 => Op::Add { vx, vy },
                0x5 => Op::Sub { vx, vy },
                0x6 => Op::ShiftRight { vx, vy },
                0x7 => Op::SubReverse { vx, vy },
                0xE => Op::ShiftLeft { vx, vy },
                _ => Op::Unknown(u16::from_be_bytes(bytecode)),
            },
            0x9 if n == 0 => Op::SkipNotEq { vx, vy },
            0xA => Op::LoadAddress { address: nnn },
            0xB => Op::JumpOffset { address: nnn },
            0xC => Op::Random { vx, nn },
            0xD => Op::Draw { vx, vy, n },
            0xE => match nn {
                0x9E => Op::SkipKeyPressed { vx },
                0xA1 => Op::SkipKeyNotPressed { vx },
                _ => Op::Unknown(u16::from_be_bytes(bytecode)),
            },
            0xF => match nn {
                0x07 => Op::LoadDelay { vx },
                0x0A => Op::WaitKey { vx },
                0x15 => Op::SetDelay { vx },
                0x18 => Op::SetSound { vx },
                0x1E => Op::AddAddress { vx },
                0x29 => Op::LoadGlyph { vx },
                0x33 => Op::StoreBcd { vx },
                0x55 => Op::StoreRegisters { vx },
                0x65 => Op::LoadRegisters { vx },
                _ => Op::Unknown(u16::from_be_bytes(bytecode)),
            },
            _ => Op::Unknown(u16::from_be_bytes(bytecode)),
        }
    }

    /// Whether this is a recognised instruction.
    #[inline]
    pub fn is_known(&self) -> bool {
        !matches!(self, Op::Unknown(_))
    }
}

/// Assembly mnemonics, as in Cowgod's technical reference.
impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Op::ClearScreen => write!(f, "CLS"),
            Op::Return => write!(f, "RET"),
            Op::System { address } => write!(f, "SYS 0x{address:03X}"),
            Op::Jump { address } => write!(f, "JP 0x{address:03X}"),
            Op::Call { address } => write!(f, "CALL 0x{address:03X}"),
            Op::SkipEqByte { vx, nn } => write!(f, "SE v{vx:X}, 0x{nn:02X}"),
            Op::SkipNotEqByte { vx, nn } => write!(f, "SNE v{vx:X}, 0x{nn:02X}"),
            Op::SkipEq { vx, vy } => write!(f, "SE v{vx:X}, v{vy:X}"),
            Op::LoadByte { vx, nn } => write!(f, "LD v{vx:X}, 0x{nn:02X}"),
            Op::AddByte { vx, nn } => write!(f, "ADD v{vx:X}, 0x{nn:02X}"),
            // ------
            Op::Load { vx, vy } => write!(f, "LD v{vx:X}, v{vy:X}"),
            Op::Or { vx, vy } => write!(f, "OR v{vx:X}, v{vy:X}"),
            Op::And { vx, vy } => write!(f, "AND v{vx:X}, v{vy:X}"),
            Op::Xor { vx, vy } => write!(f, "XOR v{vx:X}, v{vy:X}"),
            Op::Add { vx, vy } => write!(f, "ADD v{vx:X}, v{vy:X}"),
            Op::Sub { vx, vy } => write!(f, "SUB v{vx:X}, v{vy:X}"),
            Op::ShiftRight { vx, vy } => write!(f, "SHR v{vx:X}, v{vy:X}"),
            Op::SubReverse { vx, vy } => write!(f, "SUBN v{vx:X}, v{vy:X}"),
            Op::ShiftLeft { vx, vy } => write!(f, "SHL v{vx:X}, v{vy:X}"),
            Op::SkipNotEq { vx, vy } => write!(f, "SNE v{vx:X}, v{vy:X}"),
            // ------
            Op::LoadAddress { address } => write!(f, "LD I, 0x{address:03X}"),
            Op::JumpOffset { address } => write!(f, "JP v0, 0x{address:03X}"),
            Op::Random { vx, nn } => write!(f, "RND v{vx:X}, 0x{nn:02X}"),
            Op::Draw { vx, vy, n } => write!(f, "DRW v{vx:X}, v{vy:X}, {n}"),
            // ------
            Op::SkipKeyPressed { vx } => write!(f, "SKP v{vx:X}"),
            Op::SkipKeyNotPressed { vx } => write!(f, "SKNP v{vx:X}"),
            Op::LoadDelay { vx } => write!(f, "LD v{vx:X}, DT"),
            Op::WaitKey { vx } => write!(f, "LD v{vx:X}, K"),
            Op::SetDelay { vx } => write!(f, "LD DT, v{vx:X}"),
            Op::SetSound { vx } => write!(f, "LD ST, v{vx:X}"),
            Op::AddAddress { vx } => write!(f, "ADD I, v{vx:X}"),
            Op::LoadGlyph { vx } => write!(f, "LD F, v{vx:X}"),
            Op::StoreBcd { vx } => write!(f, "LD B, v{vx:X}"),
            Op::StoreRegisters { vx } => write!(f, "LD [I], v{vx:X}"),
            Op::LoadRegisters { vx } => write!(f, "LD v{vx:X}, [I]"),
            Op::Unknown(code) => write!(f, "0x{code:04X}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn decode(code: u16) -> Op {
        Op::decode(code.to_be_bytes())
    }

    #[test]
    fn test_decode_families() {
        assert_eq!(decode(0x00E0), Op::ClearScreen);
        assert_eq!(decode(0x00EE), Op::Return);
        assert_eq!(decode(0x0123), Op::System { address: 0x123 });
        assert_eq!(decode(0x1ABC), Op::Jump { address: 0xABC });
        assert_eq!(decode(0x2600), Op::Call { address: 0x600 });
        assert_eq!(decode(0x3A42), Op::SkipEqByte { vx: 0xA, nn: 0x42 });
        assert_eq!(decode(0x4A42), Op::SkipNotEqByte { vx: 0xA, nn: 0x42 });
        assert_eq!(decode(0x5120), Op::SkipEq { vx: 1, vy: 2 });
        assert_eq!(decode(0x6F01), Op::LoadByte { vx: 0xF, nn: 1 });
        assert_eq!(decode(0x7001), Op::AddByte { vx: 0, nn: 1 });
        assert_eq!(decode(0x9120), Op::SkipNotEq { vx: 1, vy: 2 });
        assert_eq!(decode(0xA123), Op::LoadAddress { address: 0x123 });
        assert_eq!(decode(0xB123), Op::JumpOffset { address: 0x123 });
        assert_eq!(decode(0xC3FF), Op::Random { vx: 3, nn: 0xFF });
        assert_eq!(decode(0xD125), Op::Draw { vx: 1, vy: 2, n: 5 });
    }

    #[test]
    fn test_decode_math() {
        assert_eq!(decode(0x8120), Op::Load { vx: 1, vy: 2 });
        assert_eq!(decode(0x8121), Op::Or { vx: 1, vy: 2 });
        assert_eq!(decode(0x8122), Op::And { vx: 1, vy: 2 });
        assert_eq!(decode(0x8123), Op::Xor { vx: 1, vy: 2 });
        assert_eq!(decode(0x8124), Op::Add { vx: 1, vy: 2 });
        assert_eq!(decode(0x8125), Op::Sub { vx: 1, vy: 2 });
        assert_eq!(decode(0x8126), Op::ShiftRight { vx: 1, vy: 2 });
        assert_eq!(decode(0x8127), Op::SubReverse { vx: 1, vy: 2 });
        assert_eq!(decode(0x812E), Op::ShiftLeft { vx: 1, vy: 2 });
    }

    #[test]
    fn test_decode_misc() {
        assert_eq!(decode(0xE49E), Op::SkipKeyPressed { vx: 4 });
        assert_eq!(decode(0xE4A1), Op::SkipKeyNotPressed { vx: 4 });
        assert_eq!(decode(0xF507), Op::LoadDelay { vx: 5 });
        assert_eq!(decode(0xF50A), Op::WaitKey { vx: 5 });
        assert_eq!(decode(0xF515), Op::SetDelay { vx: 5 });
        assert_eq!(decode(0xF518), Op::SetSound { vx: 5 });
        assert_eq!(decode(0xF51E), Op::AddAddress { vx: 5 });
        assert_eq!(decode(0xF529), Op::LoadGlyph { vx: 5 });
        assert_eq!(decode(0xF533), Op::StoreBcd { vx: 5 });
        assert_eq!(decode(0xF555), Op::StoreRegisters { vx: 5 });
        assert_eq!(decode(0xF565), Op::LoadRegisters { vx: 5 });
    }

    #[test]
    fn test_decode_unknown() {
        for code in [0x5121, 0x9123, 0x8128, 0x812F, 0xE4FF, 0xF5FF, 0xF500] {
            assert_eq!(decode(code), Op::Unknown(code), "{code:04X}");
            assert!(!decode(code).is_known());
        }
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(decode(0x00E0).to_string(), "CLS");
        assert_eq!(decode(0x2600).to_string(), "CALL 0x600");
        assert_eq!(decode(0x6A0F).to_string(), "LD vA, 0x0F");
        assert_eq!(decode(0xD125).to_string(), "DRW v1, v2, 5");
        assert_eq!(decode(0xF30A).to_string(), "LD v3, K");
        assert_eq!(decode(0xFFFF).to_string(), "0xFFFF");
    }
}
