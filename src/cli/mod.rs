//! CLI driver for the Quill compiler front-end.
//!
//! ## Commands
//!
//! - `lex <file>` - tokenize and dump tokens
//! - `parse <file>` - parse and report declarations by kind
//! - `check <file>` - parse and type-check
//! - `repl` (or no arguments) - interactive shell
//! - `quill <file>` - same as `check <file>`
//!
//! Command functions return `CliResult<ExitStatus>` instead of calling
//! `process::exit`; only the top-level `run()` exits the process. Exit code 0
//! means success, 1 means diagnostics were reported.

pub mod commands;
pub mod repl;

use std::path::PathBuf;
use std::process;

use clap::{Parser as ClapParser, Subcommand};
use thiserror::Error;

/// Errors raised by the driver itself, outside the diagnostic pipeline.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

pub type CliResult<T> = Result<T, CliError>;

/// Outcome of a command: whether any diagnostics were reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    HadErrors,
}

impl ExitStatus {
    fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::HadErrors => 1,
        }
    }
}

/// The Quill programming language compiler
#[derive(ClapParser, Debug)]
#[command(name = "quill")]
#[command(version)]
#[command(about = "The Quill programming language compiler front-end", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// File to type check (default action when no subcommand given)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Tokenize a file and dump the token stream
    Lex {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Parse a file and report its declarations
    Parse {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Parse and type-check a file
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Start the interactive shell
    Repl,
}

/// Main CLI entry point. This is the only place that exits the process.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(status) => {
            if status.code() != 0 {
                process::exit(status.code());
            }
        }
        Err(err) => {
            eprintln!("error: {}", err);
            process::exit(1);
        }
    }
}

fn execute(cli: Cli) -> CliResult<ExitStatus> {
    match cli.command {
        Some(Command::Lex { file }) => commands::lex_file(&file),
        Some(Command::Parse { file }) => commands::parse_file(&file),
        Some(Command::Check { file }) => commands::check_file(&file),
        Some(Command::Repl) => repl::run_repl(),
        None => match cli.file {
            Some(file) => commands::check_file(&file),
            None => repl::run_repl(),
        },
    }
}
