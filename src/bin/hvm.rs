//! Assembles and runs a program on the hybrid VM.
//!
//! # Usage
//! ```text
//! hvm <input.hasm> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `input.hasm`: Assembly source file to run
//!
//! # Options
//! - `--max-steps <n>`: Fail once `n` steps have executed
//! - `--skip-sense <skip|execute>`: How `ifz`/`ifnz` treat the next instruction
//! - `--trace`: Log every executed instruction
//! - `--symbols`: Print the symbol table before running
//!
//! # Examples
//! ```text
//! hvm demos/greeting.hasm
//! hvm demos/greeting.hasm --max-steps 10000 --trace
//! ```

use hybrid_vm::virtual_machine::output::StdoutOutput;
use hybrid_vm::virtual_machine::source::assemble_file;
use hybrid_vm::virtual_machine::vm::{SkipSense, VM, VmConfig};
use hybrid_vm::{error, info};
use std::env;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut config = VmConfig::default();
    let mut show_symbols = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--max-steps" | "--skip-sense") => {
                i += 1;
                let Some(value) = args.get(i) else {
                    error!("{k} requires an argument");
                    process::exit(1);
                };
                if k == "--max-steps" {
                    let limit = value.parse::<u64>().unwrap_or_else(|_| {
                        error!("Invalid step limit: '{value}' is not a valid number");
                        process::exit(1);
                    });
                    config = config.with_step_limit(limit);
                } else {
                    let sense = SkipSense::from_flag(value).unwrap_or_else(|| {
                        error!("Invalid skip sense: '{value}' (expected skip or execute)");
                        process::exit(1);
                    });
                    config = config.with_skip_sense(sense);
                }
                i += 1;
            }
            "--trace" => {
                config = config.with_trace(true);
                i += 1;
            }
            "--symbols" => {
                show_symbols = true;
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if !Path::new(input_path).exists() {
        error!("Input file does not exist: {}", input_path);
        process::exit(1);
    }

    // The diagnostic has already been logged by the assembler.
    let Ok(program) = assemble_file(input_path) else {
        process::exit(1);
    };

    info!(
        "Assembled {} ({} cells, {} instructions)",
        input_path,
        program.image.len(),
        program.code_len
    );
    if show_symbols {
        for (name, address) in program.symbols.iter() {
            info!("{address:>6}  {name}");
        }
    }

    let mut vm = VM::with_config(program, config).unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1)
    });

    match vm.run(&mut StdoutOutput) {
        Ok(summary) => info!("Halted after {} steps", summary.steps),
        Err(e) => {
            error!(
                "Execution failed after {} steps: {e} (registers: {})",
                vm.steps(),
                vm.registers()
            );
            process::exit(1);
        }
    }
}

const USAGE: &str = "\
Hybrid VM

USAGE:
    {program} <input.hasm> [OPTIONS]

ARGS:
    <input.hasm>    Assembly source file to run

OPTIONS:
    --max-steps <n>               Fail once n steps have executed
    --skip-sense <skip|execute>   How ifz/ifnz treat the next instruction (default: skip)
    --trace                       Log every executed instruction
    --symbols                     Print the symbol table before running
    -h, --help                    Print this help message

EXAMPLES:
    # Run until halt
    {program} demos/greeting.hasm

    # Bound the run and trace each step
    {program} demos/greeting.hasm --max-steps 10000 --trace
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
