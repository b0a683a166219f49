//! TEAL program runner.
//!
//! Parses a TEAL source file, builds the execution context from an optional
//! JSON configuration and runs the program, printing the verdict and the
//! final machine state.
//!
//! # Usage
//! ```text
//! teal <program.teal> [OPTIONS]
//! ```
//!
//! # Options
//! - `-c, --config <file>`: JSON file describing args, transactions and ledger state
//! - `-b, --budget <n>`: Cost budget (overrides the config)
//! - `-t, --trace`: Log every executed instruction
//!
//! # Exit codes
//! `0` approved, `2` rejected, `1` parse, configuration or runtime error.

use std::env;
use std::fs;
use std::process;
use teal_interpreter::config::{InterpreterConfig, load_config};
use teal_interpreter::utils::log::set_trace;
use teal_interpreter::virtual_machine::assembler::{parse, render_diagnostic};
use teal_interpreter::virtual_machine::errors::ErrorKind;
use teal_interpreter::virtual_machine::vm::{ExecuteResult, execute};
use teal_interpreter::{TypedValue, error, info};

const EXIT_APPROVED: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_REJECTED: i32 = 2;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { EXIT_ERROR } else { EXIT_APPROVED });
    }

    let program_path = &args[1];
    let mut config_path: Option<String> = None;
    let mut budget: Option<u64> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--config" | "-c") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(EXIT_ERROR);
                }
                config_path = Some(args[i].clone());
                i += 1;
            }
            k @ ("--budget" | "-b") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(EXIT_ERROR);
                }
                budget = Some(args[i].parse::<u64>().unwrap_or_else(|_| {
                    error!("Invalid budget: '{}' is not a valid number", args[i]);
                    process::exit(EXIT_ERROR);
                }));
                i += 1;
            }
            "--trace" | "-t" => {
                set_trace(true);
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(EXIT_ERROR);
            }
        }
    }

    let source = fs::read_to_string(program_path).unwrap_or_else(|e| {
        error!("Failed to read {}: {}", program_path, e);
        process::exit(EXIT_ERROR);
    });

    let config = match &config_path {
        Some(path) => load_config(path).unwrap_or_else(|e| {
            error!("{e}");
            process::exit(EXIT_ERROR);
        }),
        None => InterpreterConfig::default(),
    };
    let mut ctx = config.into_context().unwrap_or_else(|e| {
        error!("{e}");
        process::exit(EXIT_ERROR);
    });
    if let Some(budget) = budget {
        ctx.budget = budget;
    }

    let program = parse(&source).unwrap_or_else(|e| {
        error!("{}", render_diagnostic(program_path, &source, &e));
        process::exit(EXIT_ERROR);
    });
    info!(
        "Parsed {} (version {}, {} instructions)",
        program_path,
        program.version,
        program.len()
    );

    match execute(&program, &mut ctx) {
        Ok(result) => {
            print_result(&result);
            if result.verdict {
                info!("Program approved");
                process::exit(EXIT_APPROVED);
            }
            error!("Program rejected");
            process::exit(EXIT_REJECTED);
        }
        Err(e) => {
            error!("{}", render_diagnostic(program_path, &source, &e));
            let code = match e.kind() {
                ErrorKind::Rejected => EXIT_REJECTED,
                _ => EXIT_ERROR,
            };
            process::exit(code);
        }
    }
}

fn print_result(result: &ExecuteResult) {
    println!(
        "Verdict: {}",
        if result.verdict { "approved" } else { "rejected" }
    );
    println!("Stack:");
    for (i, value) in result.stack.iter().enumerate() {
        println!("  [{i}] {value}");
    }

    let scratch: Vec<_> = result
        .scratch
        .iter()
        .enumerate()
        .filter(|(_, v)| **v != TypedValue::zero())
        .collect();
    if !scratch.is_empty() {
        println!("Scratch:");
        for (slot, value) in scratch {
            println!("  [{slot}] {value}");
        }
    }

    if !result.logs.is_empty() {
        println!("Logs:");
        for entry in &result.logs {
            println!("  0x{}", hex::encode(entry));
        }
    }

    println!("Cost Profile:");
    let width = result
        .profile
        .iter()
        .map(|(c, _)| c.as_str().len())
        .max()
        .unwrap_or(0)
        .max("total".len());
    for (category, amount) in result.profile.iter() {
        if amount == 0 {
            continue;
        }
        println!("  {:<width$} {:>8}", category.as_str(), amount);
    }
    println!("  {:<width$} {:>8}", "total", result.cost);
}

const USAGE: &str = "\
TEAL Program Runner

USAGE:
    {program} <program.teal> [OPTIONS]

ARGS:
    <program.teal>    TEAL source file to run

OPTIONS:
    -c, --config <file>    JSON file with args, transactions and ledger state
    -b, --budget <n>       Cost budget (defaults to 20000 or the config value)
    -t, --trace            Log every executed instruction
    -h, --help             Print this help message

EXIT CODES:
    0    program approved
    2    program rejected
    1    parse, configuration or runtime error

EXAMPLES:
    # Run with an empty context
    {program} approve.teal

    # Run against a ledger description, tracing each instruction
    {program} escrow.teal -c escrow.json -t
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
