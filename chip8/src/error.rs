//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::Address;

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { size: usize },
    /// Subroutine call at the given address exceeded the call stack depth.
    StackOverflow { addr: Address },
    /// Return at the given address was executed with an empty call stack.
    StackUnderflow { addr: Address },
    Fmt(fmt::Error),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LargeProgram { size } => {
                write!(f, "program of {size} bytes is too large for VM memory")
            }
            Self::StackOverflow { addr } => write!(f, "call stack overflow at {addr:04X}"),
            Self::StackUnderflow { addr } => write!(f, "call stack underflow at {addr:04X}"),
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
