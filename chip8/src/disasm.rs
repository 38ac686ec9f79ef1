//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{
    constants::{Address, MEM_START},
    opcode::Op,
};

/// Decoded instruction with its location in the program.
#[derive(Debug, Clone, Copy)]
pub struct Instr {
    /// Address in memory where the instruction is located.
    pub addr: Address,
    /// The original bytes that were read from the buffer.
    pub bytes: [u8; 2],
    pub op: Op,
}

pub struct Disassembler<'a> {
    bytecode: &'a [u8],
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self { bytecode }
    }

    /// Iterate the program two bytes at a time.
    ///
    /// A trailing odd byte is not an instruction and is skipped.
    pub fn instructions(&self) -> impl Iterator<Item = Instr> + 'a {
        self.bytecode
            .chunks_exact(2)
            .enumerate()
            .map(|(i, pair)| {
                let bytes = [pair[0], pair[1]];
                Instr {
                    addr: (MEM_START + i * 2) as Address,
                    bytes,
                    op: Op::decode(bytes),
                }
            })
    }

    /// Write the whole program to the given writer, one instruction per line.
    ///
    /// Data such as sprites is indistinguishable from code at this level,
    /// so bytes that don't decode are printed as raw words.
    pub fn disassemble<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        for Instr { addr, bytes, op } in self.instructions() {
            let [a, b] = bytes;
            if op.is_known() {
                writeln!(w, "0x{addr:04X} {a:02X}{b:02X}  {op}")?;
            } else {
                writeln!(w, "0x{addr:04X} {a:02X}{b:02X}  ; 0b{a:08b} 0b{b:08b}")?;
            }
        }

        if self.bytecode.len() % 2 == 1 {
            let addr = MEM_START + self.bytecode.len() - 1;
            let a = self.bytecode[self.bytecode.len() - 1];
            writeln!(w, "0x{addr:04X} {a:02X}    ; trailing byte")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_disassemble() {
        #[rustfmt::skip]
        let bytecode = [
            0x00, 0xE0, // CLS
            0xA2, 0x06, // LD I, 0x206
            0xD0, 0x15, // DRW v0, v1, 5
            0xFF, 0x00, // data
            0x01,
        ];

        let mut buf = String::new();
        Disassembler::new(&bytecode).disassemble(&mut buf).unwrap();

        let lines: Vec<&str> = buf.lines().collect();
        assert_eq!(
            lines,
            vec![
                "0x0200 00E0  CLS",
                "0x0202 A206  LD I, 0x206",
                "0x0204 D015  DRW v0, v1, 5",
                "0x0206 FF00  ; 0b11111111 0b00000000",
                "0x0208 01    ; trailing byte",
            ]
        );
    }

    #[test]
    fn test_instruction_addresses() {
        let bytecode = [0x12, 0x00, 0x00, 0xEE];
        let instrs: Vec<Instr> = Disassembler::new(&bytecode).instructions().collect();

        assert_eq!(instrs.len(), 2);
        assert_eq!(instrs[1].addr, 0x202);
        assert_eq!(instrs[1].op, Op::Return);
    }
}
