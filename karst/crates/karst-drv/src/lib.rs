//! karst-drv - Interpreter Driver
//!
//! The `karst` binary: argument parsing, the REPL, and file execution.
//!
//! Two modes:
//!
//! - `karst` with no script: a line-at-a-time REPL. Errors are printed
//!   and the session continues; globals persist across lines.
//! - `karst <script>`: reads the whole file and interprets it once.
//!
//! Exit codes follow the sysexits convention the original toolchain used:
//! 0 on success, 64 for usage errors, 65 for compile errors, 70 for
//! runtime errors, 74 when the script file cannot be read.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use karst_vm::{InterpretError, Vm, VmConfig};

/// Exit code for success.
pub const EXIT_OK: u8 = 0;
/// Exit code for command-line misuse.
pub const EXIT_USAGE: u8 = 64;
/// Exit code for compile errors.
pub const EXIT_COMPILE_ERROR: u8 = 65;
/// Exit code for runtime errors.
pub const EXIT_RUNTIME_ERROR: u8 = 70;
/// Exit code for unreadable input files.
pub const EXIT_IO_ERROR: u8 = 74;

/// Parsed command line.
#[derive(Debug, Default)]
pub struct Config {
    /// Script to run; REPL mode when absent.
    pub script: Option<PathBuf>,
    /// Per-instruction execution trace (`--trace`).
    pub trace: bool,
    /// Collect at every allocation opportunity (`--stress-gc`).
    pub stress_gc: bool,
    /// Log collection cycles (`--log-gc`).
    pub log_gc: bool,
}

impl Config {
    /// Parses arguments (without the program name). Flags may appear in
    /// any position; at most one script path is accepted.
    pub fn parse<I, S>(args: I) -> Result<Config, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Config::default();

        for arg in args {
            let arg = arg.as_ref();
            match arg {
                "--trace" => config.trace = true,
                "--stress-gc" => config.stress_gc = true,
                "--log-gc" => config.log_gc = true,
                _ if arg.starts_with("--") => {
                    return Err(format!("unknown option '{}'", arg));
                }
                _ => {
                    if config.script.is_some() {
                        return Err("expected at most one script".to_string());
                    }
                    config.script = Some(PathBuf::from(arg));
                }
            }
        }

        Ok(config)
    }

    /// Builds the VM configuration: environment first, flags on top.
    fn vm_config(&self) -> VmConfig {
        let mut config = VmConfig::from_env();
        config.trace |= self.trace;
        config.gc.stress |= self.stress_gc;
        config.gc.log |= self.log_gc;
        config
    }
}

/// Runs the driver with the given arguments; returns the process exit
/// code.
pub fn run<I, S>(args: I) -> u8
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let config = match Config::parse(args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {}", message);
            eprintln!("Usage: karst [--trace] [--stress-gc] [--log-gc] [script]");
            return EXIT_USAGE;
        }
    };

    let mut vm = match Vm::new(config.vm_config()) {
        Ok(vm) => vm,
        Err(e) => {
            eprintln!("error: {}", e);
            return EXIT_USAGE;
        }
    };

    match &config.script {
        Some(path) => run_file(&mut vm, path),
        None => repl(&mut vm),
    }
}

/// Interprets a whole script file.
fn run_file(vm: &mut Vm, path: &Path) -> u8 {
    let source = match read_script(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return EXIT_IO_ERROR;
        }
    };

    match vm.interpret(&source) {
        Ok(()) => EXIT_OK,
        Err(e) => {
            eprintln!("{}", e);
            exit_code_for(&e)
        }
    }
}

fn read_script(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("could not read script '{}'", path.display()))
}

/// Reads and interprets lines until end of input. Errors keep the
/// session alive.
fn repl(vm: &mut Vm) -> u8 {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            // End of input or a read failure both end the session.
            _ => {
                println!();
                return EXIT_OK;
            }
        };

        if let Err(e) = vm.interpret(&line) {
            eprintln!("{}", e);
        }
    }
}

fn exit_code_for(error: &InterpretError) -> u8 {
    match error {
        InterpretError::Compile(_) => EXIT_COMPILE_ERROR,
        InterpretError::Runtime(_) => EXIT_RUNTIME_ERROR,
    }
}
