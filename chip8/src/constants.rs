//! Constant values of the Chip-8 architecture.

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 0x10; // 16

/// Register VF doubles as the carry, borrow and collision flag.
pub const FLAG_REGISTER: usize = 0xF;

/// The lower memory space was historically used for the interpreter itself,
/// but is now used for fonts.
pub const MEM_START: usize = 0x200; // 512
pub const MEM_SIZE: usize = 0x1000; // 4096

/// Mask applied to every memory access, wrapping addresses around the 4K space.
pub const MEM_MASK: usize = MEM_SIZE - 1;

/// Levels of nesting allowed in the call stack.
///
/// The stack pointer is incremented before a call writes its return
/// address, so slot 0 is never occupied and at most 15 calls can be nested.
pub const STACK_SIZE: usize = 0x10; // 16

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const DISPLAY_BUFFER_SIZE: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT;

/// Framebuffer cell value of a pixel that is turned off.
pub const PIXEL_OFF: u32 = 0;
/// Framebuffer cell value of a pixel that is turned on.
///
/// All bits are set so the buffer can be uploaded as a texture as-is.
pub const PIXEL_ON: u32 = 0xFFFF_FFFF;

/// Location in low memory where the builtin font glyphs are stored.
pub const FONTSET_START: Address = 0x50;
/// Each glyph is 5 rows high, one byte per row.
pub const FONTSET_HEIGHT: usize = 5;
/// Number of glyphs in the font, one per hexadecimal digit.
pub const FONTSET_GLYPH_COUNT: usize = 16;
pub const FONTSET_DATA_LENGTH: usize = FONTSET_HEIGHT * FONTSET_GLYPH_COUNT; // 80

/// Number of keys ob the keyboard (0x0-0xF)
pub const KEY_COUNT: usize = 16;

/// Type for storing the 12-bit memory addresses.
pub type Address = u16;

/// Framebuffer of 64x32 cells, row-major.
pub type DisplayBuffer = [u32; DISPLAY_BUFFER_SIZE];
