#![deny(unsafe_code)]

mod commands;
mod config;
mod exit_code;
mod output;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pathgate_core::VerifyError;

use crate::commands::{capture, cat, check, netfs, write};
use crate::config::Config;

/// Inspect and exercise approved-path verification
#[derive(Parser)]
#[command(name = "pathgate")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Show the identity snapshot taken for a path
    pathgate capture src/main.rs

    # Capture, wait 5s (swap the file meanwhile), then verify
    pathgate check src/main.rs --delay-ms 5000

    # Read or write through a verified handle
    pathgate cat notes.txt
    echo hello | pathgate write out.txt
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress log output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// TOML config file with a [guard] table
    #[arg(long, value_name = "FILE", env = "PATHGATE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a path and print its identity snapshot
    Capture(capture::Args),

    /// Capture a path, optionally wait, then verify it
    Check(check::Args),

    /// Print a file through a verified handle
    Cat(cat::Args),

    /// Write stdin to a file through a verified handle
    Write(write::Args),

    /// Report whether a path is on a network filesystem
    Netfs(netfs::Args),
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exit_code::USAGE_ERROR
            } else {
                exit_code::SUCCESS
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    if !cli.quiet {
        setup_tracing(cli.verbose);
    }

    match run(cli) {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let options = &config.guard;

    match cli.command {
        Commands::Capture(args) => capture::execute(&args, options),
        Commands::Check(args) => check::execute(&args, options),
        Commands::Cat(args) => cat::execute(&args, options),
        Commands::Write(args) => write::execute(&args, options),
        Commands::Netfs(args) => netfs::execute(&args),
    }
}

/// Set up tracing/logging based on verbosity level
fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Map an error to an exit code by finding a verification failure in its chain
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(verify_err) = cause.downcast_ref::<VerifyError>() {
            return if verify_err.is_tamper() {
                exit_code::TAMPER_DETECTED
            } else {
                exit_code::VERIFY_FAILED
            };
        }
    }
    exit_code::GENERAL_ERROR
}
