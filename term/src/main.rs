//! Runs CHIP-8 programs in a terminal.
//!
//! The keypad is mapped onto the left-hand side of a QWERTY keyboard:
//!
//! ```text
//! CHIP-8 keypad    QWERTY keyboard
//! 1 2 3 C          1 2 3 4
//! 4 5 6 D          Q W E R
//! 7 8 9 E          A S D F
//! A 0 B F          Z X C V
//! ```

mod input;
mod screen;

use chip8vm_core::{
    DEFAULT_INSTRUCTIONS_PER_SECOND, Fault, Interpreter, Key, PROGRAM_START, Quirks, Scheduler,
    TIMER_HZ, disassemble,
};
use clap::{Parser, ValueEnum};
use input::InputState;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng};
use screen::Screen;
use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum QuirkPreset {
    /// What most programs written since the 90s expect
    Modern,
    /// The original COSMAC VIP interpreter
    Vip,
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// ROM image to run
    rom: PathBuf,

    /// Instructions per second
    #[arg(long, default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND)]
    ips: u32,

    /// Base set of interpreter quirks
    #[arg(long, value_enum, default_value_t = QuirkPreset::Modern)]
    quirks: QuirkPreset,

    /// Shift VY into VX for 8xy6 and 8xyE
    #[arg(long)]
    shift_uses_vy: bool,

    /// Wrap sprites around the screen edges instead of clipping them
    #[arg(long)]
    wrap_sprites: bool,

    /// Leave I past the last register for Fx55 and Fx65
    #[arg(long)]
    load_store_increments_index: bool,

    /// Seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,

    /// Run without a terminal UI and print the final display to stdout
    #[arg(long, conflicts_with = "disassemble")]
    headless: bool,

    /// Number of instructions to run in headless mode
    #[arg(long, default_value_t = 1000)]
    cycles: u64,

    /// Print a listing of the ROM and exit
    #[arg(long)]
    disassemble: bool,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn quirks(&self) -> Quirks {
        let preset = match self.quirks {
            QuirkPreset::Modern => Quirks::default(),
            QuirkPreset::Vip => Quirks::cosmac_vip(),
        };

        Quirks {
            shift_uses_vy: preset.shift_uses_vy || self.shift_uses_vy,
            wrap_sprites: preset.wrap_sprites || self.wrap_sprites,
            load_store_increments_index: preset.load_store_increments_index
                || self.load_store_increments_index,
        }
    }

    fn interactive(&self) -> bool {
        !self.headless && !self.disassemble
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
enum Error {
    Core(#[from] chip8vm_core::Error),
    Fault(#[from] Fault),
    Io(#[from] io::Error),
    #[error("Could not read ROM {}: {source}", path.display())]
    Rom { path: PathBuf, source: io::Error },
}

fn main() -> ExitCode {
    match actual_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn actual_main() -> Result<(), Error> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref(), args.interactive())?;

    if args.disassemble {
        print_listing(&read_rom(&args.rom)?);
        return Ok(());
    }

    let mut interpreter = load_rom(&args.rom, args.quirks())?;

    let mut scheduler = Scheduler::new(args.ips);
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let result = if args.headless {
        run_headless(&mut interpreter, &mut scheduler, args.cycles, &mut rng)
    } else {
        run_interactive(&mut interpreter, &mut scheduler, &mut rng)
    };

    if interpreter.unknown_count() > 0 {
        log::warn!(
            "Skipped {} unknown instructions, last {:?}",
            interpreter.unknown_count(),
            interpreter.last_unknown()
        );
    }
    if let Err(Error::Fault(fault)) = &result {
        log::error!("Halted at 0x{:03X}: {fault}", interpreter.registers().pc());
    }
    result
}

fn read_rom(path: &Path) -> Result<Vec<u8>, Error> {
    let program = std::fs::read(path).map_err(|source| Error::Rom {
        path: path.to_owned(),
        source,
    })?;
    log::info!("Read {} bytes from {}", program.len(), path.display());
    Ok(program)
}

/// A fresh interpreter with the ROM at `path` loaded
fn load_rom(path: &Path, quirks: Quirks) -> Result<Interpreter, Error> {
    let program = read_rom(path)?;

    log::debug!("Using {quirks:?}");
    let mut interpreter = Interpreter::new(quirks);
    interpreter.load_program(&program)?;
    Ok(interpreter)
}

/// Logs go to stderr, or to `log_file` when given. An interactive run owns the
/// terminal, so without a log file nothing is logged.
fn init_logging(log_file: Option<&Path>, interactive: bool) -> Result<(), Error> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));

    match log_file {
        Some(path) => {
            builder.target(env_logger::Target::Pipe(Box::new(File::create(path)?)));
        }
        None if interactive => return Ok(()),
        None => (),
    }

    builder.init();
    Ok(())
}

fn print_listing(program: &[u8]) {
    for (addr, word, instruction) in disassemble(program, PROGRAM_START) {
        println!("{addr:03X}: {word:04X}  {instruction}");
    }
    if let Some(last) = program.last().filter(|_| program.len() % 2 != 0) {
        let addr = PROGRAM_START as usize + program.len() - 1;
        println!("{addr:03X}: {last:02X}    DB {last:02X}");
    }
}

fn run_headless(
    interpreter: &mut Interpreter,
    scheduler: &mut Scheduler,
    cycles: u64,
    rng: &mut StdRng,
) -> Result<(), Error> {
    let frame = scheduler.advance_instructions(interpreter, cycles, || rng.random())?;
    log::info!(
        "Ran {} instructions and {} timer ticks in {:?} of emulated time",
        frame.instructions,
        frame.ticks,
        scheduler.clock()
    );

    print!("{}", screen::render_text(interpreter.framebuffer()));
    Ok(())
}

fn run_interactive(
    interpreter: &mut Interpreter,
    scheduler: &mut Scheduler,
    rng: &mut StdRng,
) -> Result<(), Error> {
    let mut screen = Screen::enter()?;
    let input = Arc::new(Mutex::new(InputState::new(screen.reports_key_release())));
    let _input_thread = input::spawn(Arc::clone(&input))?;

    // Time period of 60 Hz
    let time_period = Duration::from_secs(1) / TIMER_HZ;
    let mut prev_frame = Instant::now();
    let mut tone = false;

    screen.draw(interpreter.framebuffer(), tone)?;

    loop {
        let now = Instant::now();
        let (keypad, redraw) = {
            let mut input = input.lock();
            if input.quit_requested() {
                return Ok(());
            }
            (input.keypad(now), input.take_redraw())
        };

        for key in Key::all() {
            if keypad.is_held(key) {
                interpreter.key_down(key);
            } else {
                interpreter.key_up(key);
            }
        }

        let frame = scheduler.advance(interpreter, now - prev_frame, || rng.random())?;
        prev_frame = now;

        if frame.display_updated || frame.tone != tone || redraw {
            screen.draw(interpreter.framebuffer(), frame.tone)?;
        }
        if frame.tone && !tone {
            screen.bell()?;
        }
        tone = frame.tone;

        let next_frame = now + time_period;
        if let Some(wait) = next_frame.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
    }
}
