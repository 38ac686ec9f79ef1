//! Entrypoint for CLI
use std::{env, error::Error, fs, io};

use chip8::{prelude::*, IMPL_VERSION};
use log::{error, info};

mod driver;
mod error;
mod render;
mod script;

use self::{
    driver::{Driver, DriverConf},
    error::AppError,
    script::InputScript,
};

static USAGE: &str = r#"
usage: chip8 CMD FILE [OPTIONS]

commands:
    run     Run the target ROM file, printing the screen as text
    dis     Disassemble the target ROM into readable assembly

run options:
    --hz N          Instructions per second (default 700)
    --frames N      Number of 60Hz frames to run (default 600)
    --scale N       Characters per pixel (default 1)
    --seed N        Seed for the random number generator
    --input FILE    YAML key script to replay
    --shift-vy      Shift instructions read from Vy
    --index-inc     Register load and store advance I
    --fast          Do not pace frames in real time

environment:
    RUST_LOG        Log level filter, e.g. RUST_LOG=debug

examples:
    chip8 run breakout.rom --input keys.yaml --frames 1200
    chip8 dis breakout.rom
"#;

fn run_bytecode(opts: RunOpts) -> Result<(), AppError> {
    info!("running {}", opts.filepath);

    let mut vm = Chip8Vm::new(opts.vm);
    vm.load_file(&opts.filepath)?;

    let script = match opts.input {
        Some(path) => InputScript::from_file(&path)?,
        None => InputScript::default(),
    };

    let mut driver = Driver::new(vm, script, opts.driver);
    let stdout = io::stdout();
    driver.run(&mut stdout.lock())?;

    if log::max_level() >= log::Level::Debug {
        let cpu = driver.vm().cpu();
        log::debug!(
            "pc=0x{:04X} i=0x{:04X} v={:02X?}",
            cpu.pc(),
            cpu.address(),
            cpu.registers()
        );
        log::debug!("keys\n{}", driver.vm().dump_keys(driver.keypad())?);
        log::debug!("final screen\n{}", driver.vm().dump_display()?);
    }

    Ok(())
}

fn run_disassembler(filepath: &str) -> Result<(), AppError> {
    info!("disassembling {filepath}");

    let bytecode = fs::read(filepath)?;

    let mut listing = String::new();
    Disassembler::new(bytecode.as_slice()).disassemble(&mut listing)?;
    print!("{listing}");

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()?;

    let cmd = match parse_args(env::args().skip(1)) {
        Ok(cmd) => cmd,
        Err(err) => {
            error!("{err}");
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    };

    match cmd {
        Cmd::Run(opts) => run_bytecode(opts)?,
        Cmd::Dis { filepath } => run_disassembler(&filepath)?,
    }

    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Cmd, AppError> {
    let cmd = args.next().ok_or_else(|| AppError::usage("missing command"))?;

    match cmd.as_str() {
        "run" => {
            let mut opts = RunOpts::new(consume_arg(&mut args, "FILE")?);

            while let Some(flag) = args.next() {
                match flag.as_str() {
                    "--hz" => opts.driver.hz = Hz(parse_num(&mut args, "--hz")?),
                    "--frames" => opts.driver.frames = parse_num(&mut args, "--frames")?,
                    "--scale" => opts.driver.scale = parse_num(&mut args, "--scale")?,
                    "--seed" => opts.vm.seed = Some(parse_num(&mut args, "--seed")?),
                    "--input" => opts.input = Some(consume_arg(&mut args, "--input")?),
                    "--shift-vy" => opts.vm.quirks.shift_uses_vy = true,
                    "--index-inc" => opts.vm.quirks.load_store_increments_index = true,
                    "--fast" => opts.driver.fast = true,
                    _ => return Err(AppError::usage(format!("unknown option '{flag}'"))),
                }
            }

            Ok(Cmd::Run(opts))
        }
        "dis" => Ok(Cmd::Dis {
            filepath: consume_arg(&mut args, "FILE")?,
        }),
        _ => Err(AppError::usage(format!("unknown command '{cmd}'"))),
    }
}

/// Consumes the next argument, failing with a usage error if it doesn't exist.
fn consume_arg(args: &mut impl Iterator<Item = String>, name: &str) -> Result<String, AppError> {
    args.next()
        .ok_or_else(|| AppError::usage(format!("missing {name}")))
}

fn parse_num<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    name: &str,
) -> Result<T, AppError> {
    let value = consume_arg(args, name)?;
    value
        .parse()
        .map_err(|_| AppError::usage(format!("{name} expects a number, got '{value}'")))
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run(RunOpts),
    /// Disassemble
    Dis { filepath: String },
}

struct RunOpts {
    filepath: String,
    input: Option<String>,
    vm: Chip8Conf,
    driver: DriverConf,
}

impl RunOpts {
    fn new(filepath: String) -> Self {
        Self {
            filepath,
            input: None,
            vm: Chip8Conf::default(),
            driver: DriverConf::default(),
        }
    }
}
