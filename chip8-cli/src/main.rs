//! Entrypoint for CLI
mod clock;
mod config;
mod error;

use std::{env, error::Error, fs, time::Instant};

use chip8::{prelude::*, IMPL_VERSION};
use log::{error, info};

use self::{clock::Clock, config::RunConfig, error::AppError};

static USAGE: &str = r#"
usage: chip8 CMD FILE [OPTIONS]

commands:
    run     Run the target ROM file headless, then print the display
    dis     Disassemble the target ROM into readable assembly

options:
    --config PATH     YAML run configuration
    --dump-ram PATH   Write the memory image to a file after running

examples:
    chip8 run breakout.rom
    chip8 run breakout.rom --config breakout.yaml
    chip8 dis breakout.rom
"#;

/// Counters collected during a run.
#[derive(Debug, Default)]
struct RunStats {
    steps: u64,
    ticks: u64,
    draws: u64,
}

fn run_bytecode(cmd: RunCmd) -> Result<(), AppError> {
    info!("running bytecode interpreter");

    let conf = match cmd.config {
        Some(ref filepath) => RunConfig::from_file(filepath)?,
        None => RunConfig::default(),
    };

    info!("load rom: {}", cmd.filepath);
    let bytecode = fs::read(&cmd.filepath)?;

    let mut vm = Chip8Vm::new(conf.vm.clone());
    vm.load_bytecode(bytecode.as_slice())?;

    let start = Instant::now();
    let result = execute(&mut vm, &conf);
    let end = Instant::now();

    println!(
        "time taken: {}ms",
        end.duration_since(start).as_nanos() as f64 / 1000000.0
    ); // to millis

    if let Ok(ref stats) = result {
        println!(
            "steps: {}, timer ticks: {}, draws: {}",
            stats.steps, stats.ticks, stats.draws
        );
    }
    print!("{}", vm.dump_registers()?);
    println!("{}", vm.dump_display()?);

    if let Some(filepath) = cmd.dump_ram {
        info!("dump ram: {filepath}");
        fs::write(filepath, vm.memory().as_slice())?;
    }

    result?;

    Ok(())
}

/// Drive the VM for the configured amount of emulated time.
fn execute(vm: &mut Chip8Vm, conf: &RunConfig) -> Result<RunStats, AppError> {
    let mut clock = Clock::new(conf.cpu_frequency, conf.timer_frequency, conf.throttle);
    let mut stats = RunStats::default();
    let mut events = conf.input.iter().peekable();
    let mut buzzer = false;
    let max_steps = conf.max_steps.unwrap_or(u64::MAX);

    'ticks: for _ in 0..conf.tick_count() {
        clock.wait();

        vm.decrement_timers();
        stats.ticks += 1;

        for _ in 0..clock.budget() {
            if stats.steps >= max_steps {
                break 'ticks;
            }

            // Merge scripted input into the VM
            while let Some(event) = events.next_if(|event| event.at_step <= stats.steps) {
                log::debug!("step {}: {} pressed={}", stats.steps, event.key, event.pressed);
                vm.set_key_state(event.key, event.pressed);
            }

            if vm.step()? == Flow::Draw {
                stats.draws += 1;
            }
            stats.steps += 1;

            if vm.is_buzzer_on() != buzzer {
                buzzer = vm.is_buzzer_on();
                info!("buzzer {}", if buzzer { "on" } else { "off" });
            }
        }

        // Timers may have switched the buzzer off
        if vm.is_buzzer_on() != buzzer {
            buzzer = vm.is_buzzer_on();
            info!("buzzer {}", if buzzer { "on" } else { "off" });
        }
    }

    Ok(stats)
}

fn run_disassembler(filepath: impl AsRef<str>) -> Result<(), AppError> {
    info!("running disassembler");

    let bytecode = fs::read(filepath.as_ref())?;
    Disassembler::new(bytecode.as_slice()).print_bytecode()?;

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init()?;

    let result = match parse_args(env::args().skip(1)) {
        Ok(Cmd::Run(cmd)) => run_bytecode(cmd),
        Ok(Cmd::Dis { filepath }) => run_disassembler(filepath),
        Err(err) => Err(err),
    };

    match result {
        Ok(_) => {}
        Err(err) if err.is_usage() => {
            error!("{err}");
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
        Err(err) => {
            error!("{err}");
            std::process::exit(1)
        }
    }

    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Cmd, AppError> {
    let cmd = args
        .next()
        .ok_or_else(|| AppError::usage("missing command"))?;
    let filepath = consume_arg(&mut args, "FILE")?;

    match cmd.as_str() {
        "run" => {
            let mut run = RunCmd {
                filepath,
                config: None,
                dump_ram: None,
            };

            while let Some(opt) = args.next() {
                match opt.as_str() {
                    "--config" => run.config = Some(consume_arg(&mut args, "--config PATH")?),
                    "--dump-ram" => {
                        run.dump_ram = Some(consume_arg(&mut args, "--dump-ram PATH")?)
                    }
                    _ => return Err(AppError::usage(format!("unknown option: {opt}"))),
                }
            }

            Ok(Cmd::Run(run))
        }
        "dis" => Ok(Cmd::Dis { filepath }),
        _ => Err(AppError::usage(format!("unknown command: {cmd}"))),
    }
}

/// Consumes the next argument, failing with a usage error if it doesn't exist.
fn consume_arg(args: &mut impl Iterator<Item = String>, name: &str) -> Result<String, AppError> {
    args.next()
        .ok_or_else(|| AppError::usage(format!("missing argument {name}")))
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

#[derive(Debug, PartialEq, Eq)]
enum Cmd {
    /// Run file
    Run(RunCmd),
    /// Disassemble
    Dis { filepath: String },
}

#[derive(Debug, PartialEq, Eq)]
struct RunCmd {
    filepath: String,
    config: Option<String>,
    dump_ram: Option<String>,
}
