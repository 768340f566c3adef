//! LC-3 Emulator - CLI Entry Point
//!
//! Commands:
//! - `lc3-emu run <image>...` - Load one or more images and run until HALT
//! - `lc3-emu info <image>` - Describe an image without running it

use clap::{Parser, Subcommand};
use lc3::cpu::registers::PC_START;
use lc3::{Console, Cpu, CpuState, Keyboard};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "lc3-emu")]
#[command(version)]
#[command(about = "An emulator of the LC-3 16-bit instructional computer")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load program images and run until HALT
    Run {
        /// Image files, loaded in order (later images overwrite earlier ones)
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Initial program counter
        #[arg(short, long, default_value = "0x3000", value_parser = parse_address)]
        start: u16,
        /// Stop after this many instructions
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Write the final machine state as JSON
        #[arg(long)]
        dump_state: Option<PathBuf>,
        /// Use plain stdin/stdout even when attached to a terminal
        #[arg(long)]
        no_tty: bool,
    },
    /// Show the origin and size of an image
    Info {
        /// Image file
        image: PathBuf,
    },
}

/// Exit code when the operator interrupts the machine.
const EXIT_INTERRUPTED: i32 = 130;

/// Exit code when `--max-cycles` stops the machine.
const EXIT_CYCLE_LIMIT: i32 = 2;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run { images, start, max_cycles, dump_state, no_tty }) => {
            let code = run_program(&images, start, max_cycles, dump_state, no_tty);
            process::exit(code);
        }
        Some(Commands::Info { image }) => {
            show_info(&image);
        }
        None => {
            println!("LC-3 Emulator v{}", env!("CARGO_PKG_VERSION"));
            println!("A 16-bit instructional computer emulator");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("❌ Failed to initialize logging: {}", e);
    }
}

/// Parse an address as `0x3000`, `x3000` or decimal.
fn parse_address(text: &str) -> Result<u16, String> {
    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('x'))
        .or_else(|| text.strip_prefix('X'));
    let parsed = match hex {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => text.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", text, e))
}

/// Pick host devices: raw terminal when interactive, byte streams otherwise.
///
/// The flag is true when the raw terminal was chosen.
fn host_devices(no_tty: bool) -> (Box<dyn Keyboard>, Box<dyn Console>, bool) {
    #[cfg(feature = "terminal")]
    {
        use std::io::IsTerminal;
        if !no_tty && std::io::stdin().is_terminal() {
            match lc3::io::TerminalKeyboard::new() {
                Ok(keyboard) => {
                    return (Box::new(keyboard), Box::new(lc3::io::TerminalConsole::new()), true);
                }
                Err(e) => log::warn!("raw terminal unavailable, using stdin: {}", e),
            }
        }
    }
    #[cfg(not(feature = "terminal"))]
    let _ = no_tty;

    (
        Box::new(lc3::io::StdinKeyboard::new()),
        Box::new(lc3::io::StdoutConsole::new()),
        false,
    )
}

fn run_program(
    images: &[PathBuf],
    start: u16,
    max_cycles: Option<u64>,
    dump_state: Option<PathBuf>,
    no_tty: bool,
) -> i32 {
    // Read every image before touching the terminal
    let mut loaded = Vec::with_capacity(images.len());
    for path in images {
        match lc3::read_image(path) {
            Ok(image) => loaded.push(image),
            Err(e) => {
                eprintln!("❌ Failed to load image: {}", e);
                return 1;
            }
        }
    }

    let (keyboard, console, raw_terminal) = host_devices(no_tty);
    let mut cpu = Cpu::with_io(keyboard, console);
    for image in &loaded {
        image.load_into(&mut cpu.mem);
    }
    cpu.regs.pc = start;
    if start != PC_START {
        log::info!("starting at {:#06x} instead of {:#06x}", start, PC_START);
    }

    let result = match max_cycles {
        Some(limit) => cpu.run_limited(limit),
        None => cpu.run(),
    };
    let snapshot = cpu.snapshot();

    // Leave raw mode before reporting
    drop(cpu);
    if raw_terminal {
        println!();
    }

    if let Some(path) = dump_state {
        let written = std::fs::File::create(&path)
            .map_err(|e| e.to_string())
            .and_then(|file| snapshot.write_json(file).map_err(|e| e.to_string()));
        if let Err(e) = written {
            eprintln!("❌ Failed to write state to {}: {}", path.display(), e);
        }
    }

    match (result, snapshot.state) {
        (Err(e), _) => {
            eprintln!("❌ CPU error at PC={:#06x}: {}", snapshot.registers.pc.wrapping_sub(1), e);
            1
        }
        (Ok(_), CpuState::Halted) => 0,
        (Ok(_), CpuState::Interrupted) => {
            eprintln!("⚠️  Interrupted after {} cycles", snapshot.cycles);
            EXIT_INTERRUPTED
        }
        (Ok(_), CpuState::Running) => {
            eprintln!(
                "⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.",
                snapshot.cycles
            );
            EXIT_CYCLE_LIMIT
        }
    }
}

fn show_info(path: &Path) {
    let image = match lc3::read_image(path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            process::exit(1);
        }
    };

    println!("📂 {}", path.display());
    println!("Origin: {:#06x}", image.origin);
    println!("Words:  {}", image.len());
    match image.end() {
        Some(end) => println!("End:    {:#06x}", end),
        None => println!("End:    (empty)"),
    }
    if image.trailing_byte {
        println!("Note:   trailing odd byte ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x3000"), Ok(0x3000));
        assert_eq!(parse_address("x3000"), Ok(0x3000));
        assert_eq!(parse_address("X30ff"), Ok(0x30FF));
        assert_eq!(parse_address("12288"), Ok(0x3000));
        assert!(parse_address("0x10000").is_err());
        assert!(parse_address("start").is_err());
    }

    #[test]
    fn test_no_tty_uses_byte_streams() {
        let (_keyboard, _console, raw_terminal) = host_devices(true);
        assert!(!raw_terminal);
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["lc3-emu", "-vv", "run", "os.obj", "prog.obj", "--start", "x0200"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Run { images, start, max_cycles, .. }) => {
                assert_eq!(images.len(), 2);
                assert_eq!(start, 0x0200);
                assert_eq!(max_cycles, None);
            }
            _ => panic!("expected run command"),
        }
    }
}
