//! Opcode routing.
//!
//! The upper nibble of an instruction selects its family. Families `0x0`,
//! `0x8` and `0xE` are further routed by their lowest nibble, and family `0xF`
//! by its lower byte. Slots without an instruction decode to nothing, and are
//! executed as no-ops.
use crate::{bytecode::Instr, cpu::Chip8Cpu, ops, vm::Flow};

/// Instruction handler, given the machine state and the raw instruction.
pub(crate) type Handler = fn(&mut Chip8Cpu, Instr) -> Flow;

/// Execute a single instruction against the machine state.
#[inline]
pub(crate) fn dispatch(cpu: &mut Chip8Cpu, instr: Instr) -> Flow {
    match decode(instr) {
        Some(handler) => handler(cpu, instr),
        None => {
            log::trace!("{:04X}: unmapped opcode {instr}", cpu.instr_addr());
            Flow::Ok
        }
    }
}

/// Look up the handler for the given instruction.
pub(crate) fn decode(instr: Instr) -> Option<Handler> {
    match instr.op() {
        0x0 => decode_sys(instr.n()),
        0x1 => Some(ops::jp),
        0x2 => Some(ops::call),
        0x3 => Some(ops::se_byte),
        0x4 => Some(ops::sne_byte),
        0x5 => Some(ops::se_reg),
        0x6 => Some(ops::ld_byte),
        0x7 => Some(ops::add_byte),
        0x8 => decode_math(instr.n()),
        0x9 => Some(ops::sne_reg),
        0xA => Some(ops::ld_i),
        0xB => Some(ops::jp_v0),
        0xC => Some(ops::rnd),
        0xD => Some(ops::drw),
        0xE => decode_key(instr.n()),
        0xF => decode_misc(instr.nn()),
        _ => None,
    }
}

/// Family 0, keyed by N.
fn decode_sys(n: u8) -> Option<Handler> {
    match n {
        // 00E0 (CLS)
        0x0 => Some(ops::cls),
        // 00EE (RET)
        0xE => Some(ops::ret),
        _ => None,
    }
}

/// Family 8, keyed by N.
fn decode_math(n: u8) -> Option<Handler> {
    match n {
        0x0 => Some(ops::ld_reg),
        0x1 => Some(ops::or),
        0x2 => Some(ops::and),
        0x3 => Some(ops::xor),
        0x4 => Some(ops::add_reg),
        0x5 => Some(ops::sub),
        0x6 => Some(ops::shr),
        0x7 => Some(ops::subn),
        0xE => Some(ops::shl),
        _ => None,
    }
}

/// Family E, keyed by N.
fn decode_key(n: u8) -> Option<Handler> {
    match n {
        // EXA1 (SKNP Vx)
        0x1 => Some(ops::sknp),
        // EX9E (SKP Vx)
        0xE => Some(ops::skp),
        _ => None,
    }
}

/// Family F, keyed by NN.
fn decode_misc(nn: u8) -> Option<Handler> {
    match nn {
        0x07 => Some(ops::ld_vx_dt),
        0x0A => Some(ops::ld_vx_k),
        0x15 => Some(ops::ld_dt_vx),
        0x18 => Some(ops::ld_st_vx),
        0x1E => Some(ops::add_i),
        0x29 => Some(ops::ld_f),
        0x33 => Some(ops::ld_b),
        0x55 => Some(ops::ld_mem_vx),
        0x65 => Some(ops::ld_vx_mem),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::*;

    #[test]
    fn test_every_family_decodes() {
        // Families without a second level ignore the lower bits.
        for op in (0x1..=0xD_u16).filter(|op| *op != 0x8) {
            assert!(decode(Instr(op << 12)).is_some(), "family {op:X}");
            assert!(decode(Instr(op << 12 | 0x0FFF)).is_some(), "family {op:X}");
        }
    }

    #[test]
    fn test_sparse_slots_decode_to_nothing() {
        for raw in [
            0x00E1, 0x0123, 0x8128, 0x812F, 0xE09F, 0xE0A2, 0xF000, 0xF0FF, 0xF066, 0xF019,
        ] {
            assert!(decode(Instr(raw)).is_none(), "{raw:04X}");
        }
    }

    #[test]
    fn test_second_level_key() {
        // Family 0 and E only look at the lowest nibble.
        assert!(decode(Instr(0x00E0)).is_some());
        assert!(decode(Instr(0x0000)).is_some());
        assert!(decode(Instr(0x00EE)).is_some());
        assert!(decode(Instr(0xE19E)).is_some());
        assert!(decode(Instr(0xE1A1)).is_some());
        // Family F looks at the whole lower byte.
        for nn in [0x07, 0x0A, 0x15, 0x18, 0x1E, 0x29, 0x33, 0x55, 0x65] {
            assert!(decode(Instr(0xF300 | nn)).is_some(), "F3{nn:02X}");
        }
    }

    #[test]
    fn test_unmapped_is_noop() {
        let mut cpu = Chip8Cpu::with_seed(0);
        cpu.registers[1] = 0x12;
        cpu.pc = MEM_START + 2;

        assert_eq!(dispatch(&mut cpu, Instr(0x8128)), Flow::Ok);
        assert_eq!(cpu.pc, MEM_START + 2);
        assert_eq!(cpu.registers[1], 0x12);
        assert!(!cpu.trap);
    }

    #[test]
    fn test_dispatch_routes() {
        let mut cpu = Chip8Cpu::with_seed(0);
        cpu.pc = MEM_START + 2;

        assert_eq!(dispatch(&mut cpu, Instr(0x6A42)), Flow::Ok);
        assert_eq!(cpu.registers[0xA], 0x42);
        assert_eq!(dispatch(&mut cpu, Instr(0x1456)), Flow::Jump);
        assert_eq!(cpu.pc, 0x456);
        assert_eq!(dispatch(&mut cpu, Instr(0xFA18)), Flow::Sound);
        assert_eq!(cpu.sound_timer, 0x42);
    }
}
