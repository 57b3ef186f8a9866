//! CPU and memory state.
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    bytecode::{self, Instr},
    constants::*,
    error::{Chip8Error, Chip8Result},
    font::FONTSET,
};

/// Progress of the `Fx0A` (`LD Vx, K`) instruction across cycles.
///
/// The instruction only completes once a key has been pressed
/// and then released again.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum KeyWait {
    /// No key has been seen yet.
    #[default]
    Idle,
    /// The given key was pressed, and the machine is waiting for its release.
    Latched(u8),
}

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the current position in the bytecode.
    pub(crate) pc: usize,
    /// Stack pointer, indicating the top of the stack.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// (I) Index register used for temporarily storing an address.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    /// Switch tracking whether the buzzer should be on or off.
    pub(crate) buzzer_state: bool,
    /// Progress of a pending wait for a keypress.
    pub(crate) key_wait: KeyWait,
    /// Keyboard input state, indexed by key value.
    pub(crate) keys: [bool; KEY_COUNT],

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],
    /// Screen buffer that is drawn too.
    pub(crate) display: Box<DisplayBuffer>,
    /// Source of the random numbers for `Cxnn` (`RND Vx, byte`).
    pub(crate) rng: StdRng,

    // ------------------------------------------------------------------------
    // Control
    /// Interrupt for VM loop.
    pub(crate) trap: bool,
    /// Fault raised by the last executed instruction.
    pub(crate) fault: Option<Chip8Error>,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Create a CPU with a deterministic random number generator.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut cpu = Self {
            pc: MEM_START,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            buzzer_state: false,
            key_wait: KeyWait::Idle,
            keys: [false; KEY_COUNT],

            ram: Box::new([0; MEM_SIZE]),
            stack: [0; STACK_SIZE],
            display: Box::new([PIXEL_OFF; DISPLAY_BUFFER_SIZE]),
            rng,

            trap: false,
            fault: None,
        };
        cpu.load_font();
        cpu
    }

    /// Return every register, memory buffer and control flag to its power-on state.
    ///
    /// The random number generator keeps its state.
    pub(crate) fn reset(&mut self) {
        self.ram.fill(0);
        self.stack.fill(0);
        self.display.fill(PIXEL_OFF);
        self.registers.fill(0);
        self.keys.fill(false);

        self.pc = MEM_START;
        self.sp = 0;
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.buzzer_state = false;
        self.key_wait = KeyWait::Idle;
        self.trap = false;
        self.fault = None;

        self.load_font();
    }

    fn load_font(&mut self) {
        let start = FONTSET_START as usize;
        self.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    pub fn interrupt(&mut self) {
        self.trap = true;
    }

    /// Record a fault and trap the machine.
    pub(crate) fn set_fault(&mut self, err: Chip8Error) {
        log::warn!("{err}");
        self.trap = true;
        self.fault = Some(err);
    }

    /// Address of the instruction currently being executed.
    ///
    /// Only meaningful inside a handler, after the program counter was advanced.
    #[inline(always)]
    pub(crate) fn instr_addr(&self) -> Address {
        (self.pc.wrapping_sub(2) & MEM_MASK) as Address
    }

    pub fn clear_display(&mut self) {
        self.display.fill(PIXEL_OFF);
    }

    // ------------------------------------------------------------------------
    // Keypad

    pub fn set_key_state(&mut self, key_id: u8, state: bool) {
        if let Some(key) = self.keys.get_mut(key_id as usize) {
            *key = state;
        }
    }

    /// Keys outside the keypad range are never pressed.
    pub fn key_state(&self, key_id: u8) -> bool {
        self.keys.get(key_id as usize).copied().unwrap_or(false)
    }

    /// Replace the whole keyboard state at once.
    pub fn set_keys(&mut self, keys: [bool; KEY_COUNT]) {
        self.keys = keys;
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_key(&self) -> bool {
        self.keys.iter().any(|pressed| *pressed)
    }

    /// Retrieve the value of the highest key that is pressed down.
    #[inline]
    pub fn last_key(&self) -> Option<u8> {
        self.keys
            .iter()
            .rposition(|pressed| *pressed)
            .map(|index| index as u8)
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub fn clear_keys(&mut self) {
        self.keys.fill(false);
    }

    // ------------------------------------------------------------------------
    // Timers

    /// Count down the delay timer.
    #[inline]
    pub fn tick_delay(&mut self) {
        // The checked_sub implementation uses `unlikely!()` which degrades performance.
        let (val, underflow) = self.delay_timer.overflowing_sub(1);
        if !underflow {
            self.delay_timer = val;
        }
    }

    #[inline]
    pub fn tick_sound(&mut self) {
        // The checked_sub implementation uses `unlikely!()` which degrades performance.
        let (val, underflow) = self.sound_timer.overflowing_sub(1);
        if !underflow {
            self.sound_timer = val;
        }
    }

    // ------------------------------------------------------------------------
    // Memory

    /// Extract the instruction at the current program counter.
    #[inline(always)]
    pub fn instr(&self) -> Instr {
        bytecode::fetch(&self.ram, self.pc)
    }

    #[inline(always)]
    pub fn read(&self, addr: usize) -> u8 {
        self.ram[addr & MEM_MASK]
    }

    #[inline(always)]
    pub fn write(&mut self, addr: usize, value: u8) {
        self.ram[addr & MEM_MASK] = value;
    }

    /// Push a return address onto the call stack.
    pub(crate) fn push(&mut self, ret: Address) -> Chip8Result<()> {
        let sp = self.sp + 1;
        if sp >= STACK_SIZE {
            return Err(Chip8Error::StackOverflow {
                addr: self.instr_addr(),
            });
        }

        self.sp = sp;
        self.stack[sp] = ret;

        Ok(())
    }

    /// Pop the most recent return address off the call stack.
    pub(crate) fn pop(&mut self) -> Chip8Result<Address> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow {
                addr: self.instr_addr(),
            });
        }

        let ret = self.stack[self.sp];
        self.sp -= 1;

        Ok(ret)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_power_on() {
        let cpu = Chip8Cpu::with_seed(0);

        assert_eq!(cpu.pc, MEM_START);
        assert_eq!(cpu.sp, 0);
        assert_eq!(cpu.registers, [0; REGISTER_COUNT]);
        assert!(cpu.display.iter().all(|px| *px == PIXEL_OFF));

        let start = FONTSET_START as usize;
        assert_eq!(&cpu.ram[start..start + FONTSET_DATA_LENGTH], &FONTSET[..]);
        assert!(cpu.ram[MEM_START..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_key_state() {
        let mut cpu = Chip8Cpu::with_seed(0);

        cpu.set_key_state(0, true);
        assert!(cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(!cpu.key_state(7));
        assert_eq!(cpu.last_key(), Some(0));

        cpu.set_key_state(7, true);
        assert!(cpu.key_state(0));
        assert!(cpu.key_state(7));
        assert_eq!(cpu.last_key(), Some(7));

        cpu.set_key_state(0, false);
        assert!(!cpu.key_state(0));
        assert!(cpu.key_state(7));
        assert_eq!(cpu.last_key(), Some(7));

        cpu.set_key_state(15, true);
        assert!(cpu.key_state(15));

        cpu.clear_keys();
        assert!(!cpu.any_key());
        assert_eq!(cpu.last_key(), None);
    }

    #[test]
    fn test_key_out_of_range() {
        let mut cpu = Chip8Cpu::with_seed(0);

        cpu.set_key_state(16, true);
        assert!(!cpu.any_key());
        assert!(!cpu.key_state(16));
        assert!(!cpu.key_state(0xFF));
    }

    #[test]
    fn test_timer_floor() {
        let mut cpu = Chip8Cpu::with_seed(0);
        cpu.delay_timer = 1;

        cpu.tick_delay();
        assert_eq!(cpu.delay_timer, 0);
        cpu.tick_delay();
        assert_eq!(cpu.delay_timer, 0);

        cpu.tick_sound();
        assert_eq!(cpu.sound_timer, 0);
    }

    #[test]
    fn test_stack_depth() {
        let mut cpu = Chip8Cpu::with_seed(0);

        for depth in 1..STACK_SIZE {
            cpu.push(depth as Address).unwrap();
            assert_eq!(cpu.sp, depth);
        }
        assert!(matches!(
            cpu.push(0x300),
            Err(Chip8Error::StackOverflow { .. })
        ));
        assert_eq!(cpu.sp, STACK_SIZE - 1);

        for depth in (1..STACK_SIZE).rev() {
            assert_eq!(cpu.pop().unwrap(), depth as Address);
        }
        assert!(matches!(cpu.pop(), Err(Chip8Error::StackUnderflow { .. })));
        assert_eq!(cpu.sp, 0);
    }

    #[test]
    fn test_memory_wraps() {
        let mut cpu = Chip8Cpu::with_seed(0);

        cpu.write(MEM_SIZE + 3, 0xAB);
        assert_eq!(cpu.ram[3], 0xAB);
        assert_eq!(cpu.read(MEM_SIZE + 3), 0xAB);
    }

    #[test]
    fn test_reset() {
        let mut cpu = Chip8Cpu::with_seed(0);
        cpu.pc = 0x300;
        cpu.registers[3] = 7;
        cpu.ram[FONTSET_START as usize] = 0;
        cpu.key_wait = KeyWait::Latched(2);
        cpu.interrupt();

        cpu.reset();

        assert_eq!(cpu.pc, MEM_START);
        assert_eq!(cpu.registers[3], 0);
        assert_eq!(cpu.ram[FONTSET_START as usize], FONTSET[0]);
        assert_eq!(cpu.key_wait, KeyWait::Idle);
        assert!(!cpu.trap);
    }
}
