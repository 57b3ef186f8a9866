//! Virtual machine.
use std::fmt::{self, Write};

use crate::{
    constants::*,
    cpu::{Chip8Cpu, KeyWait},
    devices::{Devices, KeyCode},
    dispatch,
    error::{Chip8Error, Chip8Result},
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    /// Number of cycles executed since the program was loaded.
    cycles: u64,
}

impl Default for Chip8Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Chip8Vm {
    pub fn new() -> Self {
        Self::from_cpu(Chip8Cpu::new())
    }

    /// Create a VM with a deterministic random number generator,
    /// so the same program and input produce the same run.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_cpu(Chip8Cpu::with_seed(seed))
    }

    fn from_cpu(cpu: Chip8Cpu) -> Self {
        Chip8Vm { cpu, cycles: 0 }
    }

    /// Reset the machine and copy the program into memory at `MEM_START`.
    ///
    /// A program that doesn't fit is rejected before any state is touched.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if !check_program_size(bytecode) {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
            });
        }

        // Start with clean memory to avoid leaking previous program.
        self.reset();

        // Load program into virtual RAM
        self.cpu.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);

        log::debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    /// Clear internal state in preparation for a fresh startup.
    ///
    /// Memory is cleared too, so the program must be loaded again.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.cycles = 0;
    }

    pub fn display_buffer(&self) -> &DisplayBuffer {
        &self.cpu.display
    }
}

/// Returns true if the program fits in VM memory.
pub fn check_program_size(bytecode: &[u8]) -> bool {
    bytecode.len() <= MEM_SIZE - MEM_START
}

/// Control flow hint returned by every cycle, for the caller driving the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// A fault was raised by the instruction.
    Error,
    /// The VM is trapped and no instruction was executed.
    Interrupt,
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
    /// The display buffer was changed and can be presented.
    Draw,
    /// The sound timer was written.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stalls
    /// execution until a key is pressed and released, and loads the key value into `Vx`.
    KeyWait,
}

/// Input
impl Chip8Vm {
    /// Sets the keyboard key input state.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.set_key_state(key.as_u8(), pressed);
    }

    /// Replace the whole keypad state, indexed by key value.
    pub fn set_keys(&mut self, keys: [bool; KEY_COUNT]) {
        self.cpu.set_keys(keys);
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }

    pub fn key_state(&self, key: KeyCode) -> bool {
        self.cpu.key_state(key.as_u8())
    }
}

/// Interpreter
impl Chip8Vm {
    /// Stop the VM before its next cycle.
    pub fn interrupt(&mut self) {
        self.cpu.interrupt();
    }

    /// Clear the interrupt and any pending fault, so cycles can be executed again.
    pub fn resume(&mut self) {
        self.cpu.trap = false;
        self.cpu.fault = None;
    }

    pub fn is_trapped(&self) -> bool {
        self.cpu.trap
    }

    /// Execute a single cycle.
    ///
    /// A fault raised by the instruction is returned as an error,
    /// and leaves the VM trapped until [`resume`](Self::resume) or a reload.
    pub fn tick(&mut self) -> Chip8Result<Flow> {
        match self.step() {
            Flow::Error => match self.cpu.fault.take() {
                Some(err) => Err(err),
                None => Ok(Flow::Error),
            },
            flow => Ok(flow),
        }
    }

    /// Execute up to the given number of cycles.
    ///
    /// Stops early when the VM is trapped. Returns the flow of the last cycle.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.tick()?;
            if flow == Flow::Interrupt {
                break;
            }
        }

        Ok(flow)
    }

    /// Execute a single cycle against host devices.
    ///
    /// The keypad is sampled in full before the instruction is fetched.
    /// Afterwards the display is handed to the devices when it was changed,
    /// and the buzzer is toggled when the sound timer starts or stops.
    pub fn step_with<D: Devices>(&mut self, devices: &mut D) -> Chip8Result<Flow> {
        let mut keys = [false; KEY_COUNT];
        for key in KeyCode::ALL {
            keys[key.as_u8() as usize] = devices.is_pressed(key);
        }
        self.cpu.set_keys(keys);

        let buzzer_state = self.cpu.buzzer_state;
        let flow = self.tick()?;

        if flow == Flow::Draw {
            devices.draw(&self.cpu.display);
        }

        if self.cpu.buzzer_state != buzzer_state {
            devices.buzz(self.cpu.buzzer_state);
        }

        Ok(flow)
    }

    fn step(&mut self) -> Flow {
        if self.cpu.trap {
            // Interrupt signal is set.
            return Flow::Interrupt;
        }

        // Each instruction is two bytes, with the opcode identity in the first 4-bit nibble.
        let instr = self.cpu.instr();
        self.cpu.pc += 2;

        let control_flow = dispatch::dispatch(&mut self.cpu, instr);
        self.cpu.pc &= MEM_MASK;

        if control_flow == Flow::Error {
            return control_flow;
        }

        // Count down timers
        self.cpu.tick_delay();
        self.cpu.tick_sound();

        // Buzzer should be on while sound timer counts down,
        // then turned off when the timer reaches zero.
        self.cpu.buzzer_state = self.cpu.sound_timer > 0;

        self.cycles += 1;

        control_flow
    }
}

/// State inspection
impl Chip8Vm {
    pub fn pc(&self) -> Address {
        self.cpu.pc as Address
    }

    pub fn register(&self, index: usize) -> u8 {
        self.cpu.registers[index & 0xF]
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.cpu.registers
    }

    /// Value of the address register I.
    pub fn index(&self) -> Address {
        self.cpu.address
    }

    pub fn delay_timer(&self) -> u8 {
        self.cpu.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.cpu.sound_timer
    }

    /// Whether the buzzer should currently be sounding.
    pub fn buzzer(&self) -> bool {
        self.cpu.buzzer_state
    }

    /// Number of return addresses on the call stack.
    pub fn stack_depth(&self) -> usize {
        self.cpu.sp
    }

    pub fn key_wait(&self) -> KeyWait {
        self.cpu.key_wait
    }

    pub fn memory(&self) -> &[u8; MEM_SIZE] {
        &self.cpu.ram
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycles
    }

    /// Returns true if the pixel at the coordinate is on.
    ///
    /// Coordinates outside the display are off.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < DISPLAY_WIDTH
            && y < DISPLAY_HEIGHT
            && self.cpu.display[x + y * DISPLAY_WIDTH] != PIXEL_OFF
    }
}

/// Troubleshooting
impl Chip8Vm {
    /// Returns the contents of the memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let iter = self
            .cpu
            .ram
            .iter()
            .enumerate()
            .skip(MEM_START)
            .take(count)
            .step_by(2);
        let mut buf = String::new();

        for (i, op) in iter {
            writeln!(buf, "{:04X}: {:02X}{:02X}", i, op, self.cpu.read(i + 1))?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                if self.pixel(x, y) {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.cpu.any_key() {
            write!(buf, "keys: ")?;
            for key in KeyCode::ALL {
                if self.key_state(key) {
                    write!(buf, "{key}")?;
                }
            }
        }

        Ok(buf)
    }
}
