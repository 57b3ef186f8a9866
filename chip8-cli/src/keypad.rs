//! Scripted host devices.
use chip8::{constants::*, prelude::*};

use crate::config::KeyPress;

/// Headless devices that replay key presses from the run configuration.
pub struct ScriptedDevices {
    presses: Vec<KeyPress>,
    /// Cycle about to be executed.
    cycle: u64,
    /// Number of frames presented so far.
    pub frames: usize,
}

impl ScriptedDevices {
    pub fn new(presses: Vec<KeyPress>) -> Self {
        Self {
            presses,
            cycle: 0,
            frames: 0,
        }
    }

    pub fn set_cycle(&mut self, cycle: u64) {
        self.cycle = cycle;
    }
}

impl Devices for ScriptedDevices {
    fn is_pressed(&self, key: KeyCode) -> bool {
        self.presses
            .iter()
            .any(|press| press.key == key && press.is_down(self.cycle))
    }

    fn draw(&mut self, display: &DisplayBuffer) {
        self.frames += 1;
        let lit = display.iter().filter(|px| **px != PIXEL_OFF).count();
        log::debug!("frame {}: {lit} pixels on", self.frames);
    }

    fn buzz(&mut self, state: bool) {
        if state {
            log::info!("buzzer on at cycle {}", self.cycle);
        } else {
            log::info!("buzzer off at cycle {}", self.cycle);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    #[rustfmt::skip]
    fn test_scripted_key_wait() {
        let mut vm = Chip8Vm::with_seed(0);
        vm.load_bytecode(&[
            0xF3, 0x0A, // LD v3, K
            0x12, 0x02, // JP 0x202
        ])
        .unwrap();

        let mut devices = ScriptedDevices::new(vec![KeyPress {
            key: KeyCode::KeyB,
            at: 5,
            hold: 2,
        }]);

        for _ in 0..8 {
            devices.set_cycle(vm.cycle_count());
            vm.step_with(&mut devices).unwrap();
        }

        // Pressed on cycles 5 and 6, released on cycle 7.
        assert_eq!(vm.register(3), 0xB);
        assert_eq!(vm.pc(), 0x202);
    }

    #[test]
    fn test_draw_counts_frames() {
        let mut vm = Chip8Vm::with_seed(0);
        vm.load_bytecode(&[0x00, 0xE0, 0x00, 0xE0]).unwrap();

        let mut devices = ScriptedDevices::new(Vec::new());
        vm.step_with(&mut devices).unwrap();
        vm.step_with(&mut devices).unwrap();

        assert_eq!(devices.frames, 2);
    }
}
