//! IO device interface
use crate::constants::*;

/// Hooks to provide IO devices to the virtual machine.
///
/// See [`Chip8Vm::step_with`](crate::vm::Chip8Vm::step_with).
pub trait Devices {
    /// Checks immediately whether the given key is currently pressed.
    fn is_pressed(&self, key: KeyCode) -> bool;

    /// Blit the display buffer to screen output.
    fn draw(&mut self, display: &DisplayBuffer);

    /// Turn the sound buzzer on or off.
    fn buzz(&mut self, state: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(try_from = "u8"))]
#[repr(u8)]
pub enum KeyCode {
    Key0 = 0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF = 0xF,
}

impl KeyCode {
    /// Every key of the keypad, in order of value.
    #[rustfmt::skip]
    pub const ALL: [KeyCode; KEY_COUNT] = [
        Self::Key0, Self::Key1, Self::Key2, Self::Key3,
        Self::Key4, Self::Key5, Self::Key6, Self::Key7,
        Self::Key8, Self::Key9, Self::KeyA, Self::KeyB,
        Self::KeyC, Self::KeyD, Self::KeyE, Self::KeyF,
    ];

    #[inline(always)]
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let key_id = self.as_u8();
        write!(f, "k{key_id:x}")
    }
}

impl From<KeyCode> for u8 {
    fn from(keycode: KeyCode) -> Self {
        keycode.as_u8()
    }
}

impl TryFrom<u8> for KeyCode {
    type Error = InvalidKeyCode;

    fn try_from(key_id: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(key_id as usize)
            .copied()
            .ok_or(InvalidKeyCode(key_id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidKeyCode(pub u8);

impl std::error::Error for InvalidKeyCode {}

impl std::fmt::Display for InvalidKeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "keycode must be in range 0 <= keycode < 16, got {}",
            self.0
        )
    }
}
