//! Entrypoint for CLI
use std::{env, fs, process, time::Instant};

use chip8::{prelude::*, IMPL_VERSION};
use log::{error, info, warn};

mod clock;
mod config;
mod error;
mod keypad;

use self::{
    clock::{Clock, Hz},
    config::RunConfig,
    error::AppError,
    keypad::ScriptedDevices,
};

static USAGE: &str = r#"
usage: chip8 CMD ROM [CONFIG]

commands:
    run     Run the target ROM file, and print the final display

config:
    Optional YAML file with the fields
    clock_frequency, cycles, seed, stop_on_spin and keys.

examples:
    chip8 run maze.rom
    chip8 run breakout.rom breakout.yaml
"#;

fn run_bytecode(filepath: &str, config: RunConfig) -> Result<(), AppError> {
    info!("running bytecode interpreter");

    // Startup fails before the VM exists when the ROM can't be read.
    let bytecode = fs::read(filepath)?;

    let mut vm = match config.seed {
        Some(seed) => Chip8Vm::with_seed(seed),
        None => Chip8Vm::new(),
    };
    vm.load_bytecode(bytecode.as_slice())?;

    if log::log_enabled!(log::Level::Debug) {
        log::debug!("program:\n{}", vm.dump_ram(bytecode.len())?);
    }

    let mut clock = Clock::new(config.clock_frequency.unwrap_or(Hz(0)));
    let mut devices = ScriptedDevices::new(config.keys);

    let start = Instant::now();
    let result = drive(&mut vm, &mut devices, &mut clock, config.cycles, config.stop_on_spin);
    let end = Instant::now();

    println!(
        "time taken: {}ms, cycles: {}, frames: {}",
        end.duration_since(start).as_nanos() as f64 / 1000000.0,
        vm.cycle_count(),
        devices.frames,
    ); // to millis
    println!("{}", vm.dump_display()?);

    result
}

/// Execute cycles until the budget is spent, the program spins or a fault is raised.
fn drive(
    vm: &mut Chip8Vm,
    devices: &mut ScriptedDevices,
    clock: &mut Clock,
    cycles: u64,
    stop_on_spin: bool,
) -> Result<(), AppError> {
    clock.reset();

    for _ in 0..cycles {
        let pc = vm.pc();
        devices.set_cycle(vm.cycle_count());

        match vm.step_with(devices)? {
            Flow::Jump if stop_on_spin && vm.pc() == pc => {
                info!("program spins at {pc:04X}");
                break;
            }
            Flow::Interrupt => {
                warn!("interrupted at {pc:04X}");
                break;
            }
            _ => {}
        }

        clock.wait();
    }

    Ok(())
}

fn main() {
    if let Err(err) = simple_logger::SimpleLogger::new().env().init() {
        eprintln!("{err}");
    }

    match parse_args() {
        Some(Cmd::Run { filepath, config }) => {
            let config = match config {
                Some(path) => RunConfig::from_file(path),
                None => Ok(RunConfig::default()),
            };

            if let Err(err) = config.and_then(|config| run_bytecode(&filepath, config)) {
                error!("{err}");
                process::exit(1);
            }
        }
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            process::exit(64)
        }
    }
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next()?.as_str() {
        "run" => Some(Cmd::Run {
            filepath: args.next()?,
            config: args.next(),
        }),
        _ => None,
    }
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run {
        filepath: String,
        config: Option<String>,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    #[rustfmt::skip]
    fn test_drive_stops_on_spin() {
        let mut vm = Chip8Vm::with_seed(0);
        vm.load_bytecode(&[
            0x60, 0x01, // LD v0, 1
            0x12, 0x02, // JP 0x202
        ])
        .unwrap();

        let mut devices = ScriptedDevices::new(Vec::new());
        let mut clock = Clock::new(Hz(0));
        drive(&mut vm, &mut devices, &mut clock, 100, true).unwrap();

        assert_eq!(vm.cycle_count(), 2);
        assert_eq!(vm.pc(), 0x202);
    }

    #[test]
    fn test_drive_cycle_budget() {
        let mut vm = Chip8Vm::with_seed(0);
        vm.load_bytecode(&[0x12, 0x00]).unwrap();

        let mut devices = ScriptedDevices::new(Vec::new());
        let mut clock = Clock::new(Hz(0));
        drive(&mut vm, &mut devices, &mut clock, 50, false).unwrap();

        assert_eq!(vm.cycle_count(), 50);
    }

    #[test]
    fn test_drive_fault() {
        let mut vm = Chip8Vm::with_seed(0);
        vm.load_bytecode(&[0x00, 0xEE]).unwrap();

        let mut devices = ScriptedDevices::new(Vec::new());
        let mut clock = Clock::new(Hz(0));
        let err = drive(&mut vm, &mut devices, &mut clock, 10, true).unwrap_err();

        assert!(matches!(
            err.kind,
            error::ErrorKind::Chip8(Chip8Error::StackUnderflow { .. })
        ));
    }
}
