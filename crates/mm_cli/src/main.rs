//! Command-line front-end: loads a program, runs it to completion or steps it under
//! an interactive debugger, and reports the result.

#[macro_use]
extern crate log;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use mm_core::HaltReason;

#[derive(Parser)]
#[clap(name = "mm", about = "Model-machine simulator")]
enum Cli {
    /// Load a program, run it to HALT, and print its declared result.
    Run {
        file: PathBuf,
        #[clap(short = 'm', long = "protect-memory")]
        protect_memory: bool,
    },
    /// Load a program and step through it interactively.
    Debug {
        file: PathBuf,
        #[clap(short = 'm', long = "protect-memory")]
        protect_memory: bool,
    },
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn read_source(path: &PathBuf) -> io::Result<String> {
    fs::read_to_string(path)
}

/// Exit code for a halt reason, per the CLI's documented contract: 2 for
/// divide-by-zero or a protected-memory violation, 0 for every other halt.
fn exit_code_for(reason: Option<HaltReason>) -> ExitCode {
    match reason {
        Some(HaltReason::DivisionByZero) | Some(HaltReason::ReadingDirtyMemory) => ExitCode::from(2),
        _ => ExitCode::SUCCESS,
    }
}

fn run(file: PathBuf, protect_memory: bool) -> ExitCode {
    let source = match read_source(&file) {
        Ok(source) => source,
        Err(err) => {
            error!("{}: {err}", file.display());
            return ExitCode::from(1);
        }
    };

    let mut cpu = match mm_loader::load_cpu(&source, protect_memory) {
        Ok(cpu) => cpu,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(1);
        }
    };

    cpu.run();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let _ = cpu.print_result(&mut out);

    exit_code_for(cpu.halt_reason())
}

fn debug(file: PathBuf, protect_memory: bool) -> ExitCode {
    let source = match read_source(&file) {
        Ok(source) => source,
        Err(err) => {
            error!("{}: {err}", file.display());
            return ExitCode::from(1);
        }
    };

    let mut cpu = match mm_loader::load_cpu(&source, protect_memory) {
        Ok(cpu) => cpu,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(1);
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    println!("entering debugger; commands: step, run, print, quit");
    loop {
        print!("(mm) ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        match line.trim() {
            "s" | "step" => {
                let next_ip = cpu.step();
                println!("next ip = {next_ip:#x}");
                if cpu.is_halted() {
                    println!("halted: {:?}", cpu.halt_reason());
                }
            }
            "r" | "run" => {
                cpu.run();
                println!("halted: {:?}", cpu.halt_reason());
            }
            "p" | "print" => {
                let mut out = stdout.lock();
                let _ = cpu.print_result(&mut out);
            }
            "q" | "quit" => break,
            "" => continue,
            other => println!("unknown command: {other}"),
        }
        if cpu.is_halted() {
            break;
        }
    }

    exit_code_for(cpu.halt_reason())
}

fn main() -> ExitCode {
    init_logger();
    match Cli::parse() {
        Cli::Run { file, protect_memory } => run(file, protect_memory),
        Cli::Debug { file, protect_memory } => debug(file, protect_memory),
    }
}
