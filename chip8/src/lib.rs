//! Chip-8 virtual machine.
//!
//! The [`Chip8Vm`] executes one instruction per call to
//! [`tick`](Chip8Vm::tick). Loading programs from storage, presenting the
//! display buffer and reading host input are left to the caller, optionally
//! through the [`Devices`] trait.
mod bytecode;
pub mod constants;
mod cpu;
mod devices;
mod dispatch;
mod error;
mod font;
mod ops;
mod vm;

pub use self::{
    bytecode::Instr,
    cpu::KeyWait,
    devices::{Devices, InvalidKeyCode, KeyCode},
    error::{Chip8Error, Chip8Result},
    font::FONTSET,
    vm::{check_program_size, Chip8Vm, Flow},
};

/// Version of this interpreter implementation.
pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        devices::{Devices, KeyCode},
        error::{Chip8Error, Chip8Result},
        vm::{Chip8Vm, Flow},
    };
}
