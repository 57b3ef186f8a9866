//! Instruction handlers.
//!
//! Every handler is called after the program counter has been advanced
//! past the instruction, so skips only need to add another 2 bytes.
use crate::{
    bytecode::Instr,
    constants::*,
    cpu::{Chip8Cpu, KeyWait},
    vm::Flow,
};

// ----------------------------------------------------------------------------
// Flow control

/// 00E0 (CLS)
///
/// Clear display
pub(crate) fn cls(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace("CLS", cpu, instr);

    cpu.clear_display();
    Flow::Draw
}

/// 00EE (RET)
///
/// Return from a subroutine.
/// Set the program counter to the value at the top of the stack.
/// Subtract 1 from the stack pointer.
pub(crate) fn ret(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace("RET", cpu, instr);

    match cpu.pop() {
        Ok(addr) => {
            cpu.pc = addr as usize;
            Flow::Jump
        }
        Err(err) => {
            cpu.set_fault(err);
            Flow::Error
        }
    }
}

/// 1NNN (JP addr)
///
/// Jump to address.
pub(crate) fn jp(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_nnn("JP", cpu, instr);

    cpu.pc = instr.nnn() as usize;
    Flow::Jump
}

/// 2NNN (CALL addr)
///
/// Call subroutine at NNN.
pub(crate) fn call(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_nnn("CALL", cpu, instr);

    match cpu.push((cpu.pc & MEM_MASK) as Address) {
        Ok(()) => {
            cpu.pc = instr.nnn() as usize;
            Flow::Jump
        }
        Err(err) => {
            cpu.set_fault(err);
            Flow::Error
        }
    }
}

/// BNNN (JP V0, addr)
///
/// Jump to address NNN offset by the value of register V0.
pub(crate) fn jp_v0(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_nnn("JP V0", cpu, instr);

    cpu.pc = instr.nnn() as usize + cpu.registers[0] as usize;
    Flow::Jump
}

// ----------------------------------------------------------------------------
// Conditional skips

#[inline(always)]
fn skip_if(cpu: &mut Chip8Cpu, cond: bool) {
    if cond {
        cpu.pc += 2;
    }
}

/// 3XNN (SE Vx, byte)
///
/// Skip the next instruction if register VX equals value NN.
pub(crate) fn se_byte(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xnn("SE", cpu, instr);

    let cond = cpu.registers[instr.x()] == instr.nn();
    skip_if(cpu, cond);
    Flow::Ok
}

/// 4XNN (SNE Vx, byte)
///
/// Skip the next instruction if register VX does not equal value NN.
pub(crate) fn sne_byte(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xnn("SNE", cpu, instr);

    let cond = cpu.registers[instr.x()] != instr.nn();
    skip_if(cpu, cond);
    Flow::Ok
}

/// 5XY0 (SE Vx, Vy)
///
/// Skip the next instruction if register VX equals value VY.
pub(crate) fn se_reg(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xy("SE", cpu, instr);

    let cond = cpu.registers[instr.x()] == cpu.registers[instr.y()];
    skip_if(cpu, cond);
    Flow::Ok
}

/// 9XY0 (SNE Vx, Vy)
///
/// Skip next instruction if Vx != Vy.
pub(crate) fn sne_reg(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xy("SNE", cpu, instr);

    let cond = cpu.registers[instr.x()] != cpu.registers[instr.y()];
    skip_if(cpu, cond);
    Flow::Ok
}

/// EX9E (SKP Vx)
///
/// Skip next instruction if the key with the value of Vx is pressed.
pub(crate) fn skp(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_x("SKP", cpu, instr);

    let cond = cpu.key_state(cpu.registers[instr.x()]);
    skip_if(cpu, cond);
    Flow::Ok
}

/// EXA1 (SKNP Vx)
///
/// Skip next instruction if the key with the value of Vx is not pressed.
pub(crate) fn sknp(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_x("SKNP", cpu, instr);

    let cond = !cpu.key_state(cpu.registers[instr.x()]);
    skip_if(cpu, cond);
    Flow::Ok
}

// ----------------------------------------------------------------------------
// Registers

/// 6XNN (LD Vx, byte)
///
/// Set register VX to value NN.
pub(crate) fn ld_byte(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xnn("LD", cpu, instr);

    cpu.registers[instr.x()] = instr.nn();
    Flow::Ok
}

/// 7XNN (ADD Vx, byte)
///
/// Add value NN to register VX. Carry flag is not set.
pub(crate) fn add_byte(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xnn("ADD", cpu, instr);

    let x = instr.x();
    cpu.registers[x] = cpu.registers[x].wrapping_add(instr.nn());
    Flow::Ok
}

/// 8XY0 (LD Vx, Vy)
///
/// Store the value of register VY in register VX.
pub(crate) fn ld_reg(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xy("LD", cpu, instr);

    cpu.registers[instr.x()] = cpu.registers[instr.y()];
    Flow::Ok
}

/// 8XY1 (OR Vx, Vy)
pub(crate) fn or(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xy("OR", cpu, instr);

    cpu.registers[instr.x()] |= cpu.registers[instr.y()];
    Flow::Ok
}

/// 8XY2 (AND Vx, Vy)
pub(crate) fn and(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xy("AND", cpu, instr);

    cpu.registers[instr.x()] &= cpu.registers[instr.y()];
    Flow::Ok
}

/// 8XY3 (XOR Vx, Vy)
pub(crate) fn xor(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xy("XOR", cpu, instr);

    cpu.registers[instr.x()] ^= cpu.registers[instr.y()];
    Flow::Ok
}

// The flag register is written after the result in all of the arithmetic
// instructions below, so VF holds the flag even when it is the operand.

/// 8XY4 (ADD Vx, Vy)
///
/// ADDs VY to VX, and stores the result in VX.
/// Overflow is wrapped.
/// If overflow, set VF to 1, else 0.
pub(crate) fn add_reg(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xy("ADD", cpu, instr);

    let (x, y) = (cpu.registers[instr.x()], cpu.registers[instr.y()]);
    let result = x as u16 + y as u16;
    cpu.registers[instr.x()] = (result & 0xFF) as u8; // Overflow wrap
    cpu.registers[FLAG_REGISTER] = (result > 0xFF) as u8;
    Flow::Ok
}

/// 8XY5 (SUB Vx, Vy)
///
/// Subtracts VY from VX, and stores the result in VX.
/// VF is set to 0 when there is a borrow, set to 1 when there isn't.
pub(crate) fn sub(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xy("SUB", cpu, instr);

    let (x, y) = (cpu.registers[instr.x()], cpu.registers[instr.y()]);
    cpu.registers[instr.x()] = x.wrapping_sub(y);
    cpu.registers[FLAG_REGISTER] = (x >= y) as u8;
    Flow::Ok
}

/// 8XY7 (SUBN Vx, Vy)
///
/// Subtracts VX from VY, and stores the result in VX.
/// VF is set to 0 when there is a borrow, set to 1 when there isn't.
pub(crate) fn subn(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xy("SUBN", cpu, instr);

    let (x, y) = (cpu.registers[instr.x()], cpu.registers[instr.y()]);
    cpu.registers[instr.x()] = y.wrapping_sub(x);
    cpu.registers[FLAG_REGISTER] = (y >= x) as u8;
    Flow::Ok
}

/// 8XY6 (SHR Vx)
///
/// VF is set to the least-significant bit of Vx, then VX is shifted right by 1.
/// VY is unused.
pub(crate) fn shr(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xy("SHR", cpu, instr);

    let x = cpu.registers[instr.x()];
    cpu.registers[instr.x()] = x >> 1;
    cpu.registers[FLAG_REGISTER] = x & 1;
    Flow::Ok
}

/// 8XYE (SHL Vx)
///
/// VF is set to the most-significant bit of Vx, then VX is shifted left by 1.
/// VY is unused.
pub(crate) fn shl(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xy("SHL", cpu, instr);

    let x = cpu.registers[instr.x()];
    cpu.registers[instr.x()] = x << 1;
    cpu.registers[FLAG_REGISTER] = (x >> 7) & 1;
    Flow::Ok
}

/// CXNN (RND Vx, byte)
///
/// Generate random number.
/// Set register VX to the result of bitwise AND between a random number and NN.
pub(crate) fn rnd(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    use rand::Rng;

    op_trace_xnn("RND", cpu, instr);

    cpu.registers[instr.x()] = instr.nn() & cpu.rng.gen::<u8>();
    Flow::Ok
}

// ----------------------------------------------------------------------------
// Display

/// DXYN (DRW Vx, Vy, nibble)
///
/// Draw sprite to the display buffer, at coordinate as per registers VX and VY.
/// Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
/// memory pointed to by address register I.
///
/// The starting coordinate wraps around the display, but the sprite itself
/// is clipped at the right and bottom edges.
///
/// If the drawing operation erases existing pixels in the display buffer, register VF is set to
/// 1, and set to 0 if no display bits are unset. This is used for collision detection.
pub(crate) fn drw(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xyn("DRW", cpu, instr);

    let x0 = cpu.registers[instr.x()] as usize % DISPLAY_WIDTH;
    let y0 = cpu.registers[instr.y()] as usize % DISPLAY_HEIGHT;
    let addr = cpu.address as usize;
    let mut is_erased = false;

    for r in 0..instr.n() as usize {
        let y = y0 + r;
        if y >= DISPLAY_HEIGHT {
            break;
        }

        // Each row is 8 bits representing the 8 pixels of the sprite.
        let row = cpu.read(addr + r);

        for c in 0..8 {
            let x = x0 + c;
            if x >= DISPLAY_WIDTH {
                break;
            }

            if (row >> (7 - c)) & 1 == 0 {
                continue;
            }

            let px = &mut cpu.display[x + y * DISPLAY_WIDTH];

            // XOR erases a pixel when both the old and new values are both 1.
            is_erased |= *px != PIXEL_OFF;
            *px ^= PIXEL_ON;
        }
    }

    // If a pixel was erased, then a collision occurred.
    cpu.registers[FLAG_REGISTER] = is_erased as u8;
    Flow::Draw
}

// ----------------------------------------------------------------------------
// Timers and keyboard

/// FX07 (LD Vx, DT)
///
/// Set Vx = delay timer value.
pub(crate) fn ld_vx_dt(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xk("LD", cpu, instr, "DT");

    cpu.registers[instr.x()] = cpu.delay_timer;
    Flow::Ok
}

/// FX0A (LD Vx, K)
///
/// Wait for a key to be pressed and released, then store the value of the key in Vx.
///
/// The program counter is rewound while waiting, so the instruction runs again
/// on the next cycle. Timers keep counting down in the meantime.
pub(crate) fn ld_vx_k(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xk("LD", cpu, instr, "K");

    if let KeyWait::Latched(key) = cpu.key_wait {
        if !cpu.key_state(key) {
            cpu.registers[instr.x()] = key;
            cpu.key_wait = KeyWait::Idle;
            return Flow::Ok;
        }
    }

    // The highest pressed key takes over the latch, even while another is held.
    if let Some(key) = cpu.last_key() {
        cpu.key_wait = KeyWait::Latched(key);
    }

    // rewind the program counter to stall the machine
    cpu.pc = cpu.pc.wrapping_sub(2);
    Flow::KeyWait
}

/// FX15 (LD DT, Vx)
///
/// Set delay timer = Vx.
pub(crate) fn ld_dt_vx(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_kx("LD", cpu, instr, "DT");

    cpu.delay_timer = cpu.registers[instr.x()];
    Flow::Ok
}

/// FX18 (LD ST, Vx)
///
/// Set sound timer = Vx.
pub(crate) fn ld_st_vx(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_kx("LD", cpu, instr, "ST");

    cpu.sound_timer = cpu.registers[instr.x()];
    Flow::Sound
}

// ----------------------------------------------------------------------------
// Memory

/// ANNN (LD I, addr)
///
/// Set address register I to value NNN.
pub(crate) fn ld_i(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_nnn("LD I", cpu, instr);

    cpu.address = instr.nnn();
    Flow::Ok
}

/// FX1E (ADD I, Vx)
///
/// Add Vx to I. The flag register is not affected.
pub(crate) fn add_i(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_kx("ADD", cpu, instr, "I");

    let x = cpu.registers[instr.x()] as Address;
    cpu.address = cpu.address.wrapping_add(x);
    Flow::Ok
}

/// FX29 (LD F, Vx)
///
/// Set I = location of sprite for digit Vx.
/// Only the lower nibble of Vx selects the glyph.
pub(crate) fn ld_f(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_kx("LD", cpu, instr, "F");

    let digit = (cpu.registers[instr.x()] & 0xF) as Address;
    cpu.address = FONTSET_START + digit * FONTSET_HEIGHT as Address;
    Flow::Ok
}

/// FX33 (LD B, Vx)
///
/// Store the binary-coded decimal representation of Vx
/// in the memory locations I, I+1, and I+2.
#[rustfmt::skip]
pub(crate) fn ld_b(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_kx("LD", cpu, instr, "B");

    let addr = cpu.address as usize;
    let x = cpu.registers[instr.x()];
    cpu.write(addr,     x / 100);
    cpu.write(addr + 1, x / 10 % 10);
    cpu.write(addr + 2, x % 10);
    Flow::Ok
}

/// FX55 (LD [I], Vx)
///
/// Store registers V0 through Vx in memory starting at location I.
/// The address register is left unchanged.
pub(crate) fn ld_mem_vx(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_kx("LD", cpu, instr, "[I]");

    let addr = cpu.address as usize;
    for v in 0..=instr.x() {
        cpu.write(addr + v, cpu.registers[v]);
    }
    Flow::Ok
}

/// FX65 (LD Vx, [I])
///
/// Read registers V0 through Vx from memory starting at location I.
/// The address register is left unchanged.
pub(crate) fn ld_vx_mem(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    op_trace_xk("LD", cpu, instr, "[I]");

    let addr = cpu.address as usize;
    for v in 0..=instr.x() {
        cpu.registers[v] = cpu.read(addr + v);
    }
    Flow::Ok
}

// ----------------------------------------------------------------------------
// Tracing

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(name: &str, cpu: &Chip8Cpu, _: Instr) {
    log::trace!("{:04X}: {:4}", cpu.instr_addr(), name);
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace_nnn(name: &str, cpu: &Chip8Cpu, instr: Instr) {
    log::trace!("{:04X}: {:4} {:03X}", cpu.instr_addr(), name, instr.nnn());
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace_x(name: &str, cpu: &Chip8Cpu, instr: Instr) {
    log::trace!("{:04X}: {:4} V{:X}", cpu.instr_addr(), name, instr.x());
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace_xnn(name: &str, cpu: &Chip8Cpu, instr: Instr) {
    log::trace!(
        "{:04X}: {:4} V{:X} {:02X}",
        cpu.instr_addr(),
        name,
        instr.x(),
        instr.nn()
    );
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace_xyn(name: &str, cpu: &Chip8Cpu, instr: Instr) {
    log::trace!(
        "{:04X}: {:4} V{:X} V{:X} {:01X}",
        cpu.instr_addr(),
        name,
        instr.x(),
        instr.y(),
        instr.n()
    );
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace_xy(name: &str, cpu: &Chip8Cpu, instr: Instr) {
    log::trace!(
        "{:04X}: {:4} V{:X} V{:X}",
        cpu.instr_addr(),
        name,
        instr.x(),
        instr.y()
    );
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace_xk(name: &str, cpu: &Chip8Cpu, instr: Instr, k: &str) {
    log::trace!("{:04X}: {:4} V{:X} {}", cpu.instr_addr(), name, instr.x(), k);
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace_kx(name: &str, cpu: &Chip8Cpu, instr: Instr, k: &str) {
    log::trace!("{:04X}: {:4} {} V{:X}", cpu.instr_addr(), name, k, instr.x());
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: &str, _: &Chip8Cpu, _: Instr) {}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace_nnn(_: &str, _: &Chip8Cpu, _: Instr) {}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace_x(_: &str, _: &Chip8Cpu, _: Instr) {}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace_xnn(_: &str, _: &Chip8Cpu, _: Instr) {}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace_xyn(_: &str, _: &Chip8Cpu, _: Instr) {}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace_xy(_: &str, _: &Chip8Cpu, _: Instr) {}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace_xk(_: &str, _: &Chip8Cpu, _: Instr, _: &str) {}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace_kx(_: &str, _: &Chip8Cpu, _: Instr, _: &str) {}
