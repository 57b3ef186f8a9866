//! Helpers for extracting data from opcodes.
use std::fmt;

use crate::constants::*;

/// A single 16-bit instruction word.
///
/// Layout of the operand fields:
///
/// ```text
/// F000  op   opcode family
/// 0F00  x    first register
/// 00F0  y    second register
/// 000F  n    nibble
/// 00FF  nn   byte
/// 0FFF  nnn  address
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr(pub u16);

impl Instr {
    #[inline(always)]
    pub fn from_bytes([a, b]: [u8; 2]) -> Self {
        Self(u16::from_be_bytes([a, b]))
    }

    /// Extract opcode family from the upper nibble.
    #[inline(always)]
    pub fn op(self) -> u8 {
        ((self.0 & 0xF000) >> 12) as u8
    }

    /// Extract operand VX as a register index.
    #[inline(always)]
    pub fn x(self) -> usize {
        ((self.0 & 0x0F00) >> 8) as usize
    }

    /// Extract operand VY as a register index.
    #[inline(always)]
    pub fn y(self) -> usize {
        ((self.0 & 0x00F0) >> 4) as usize
    }

    /// Extract operand N, the lowest nibble.
    #[inline(always)]
    pub fn n(self) -> u8 {
        (self.0 & 0x000F) as u8
    }

    /// Extract operand NN, the lower byte.
    #[inline(always)]
    pub fn nn(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    /// Extract operand NNN, the 12-bit address.
    #[inline(always)]
    pub fn nnn(self) -> Address {
        self.0 & 0x0FFF
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

/// Read the big-endian instruction word at the cursor.
///
/// Both bytes wrap around the end of memory.
#[inline(always)]
pub fn fetch(ram: &[u8; MEM_SIZE], cursor: usize) -> Instr {
    Instr::from_bytes([ram[cursor & MEM_MASK], ram[(cursor + 1) & MEM_MASK]])
}
