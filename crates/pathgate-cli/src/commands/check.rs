//! Check command - capture, wait, verify.
//!
//! Useful for reproducing races by hand: start a check with a delay, then
//! swap, delete or symlink the path from another shell.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use pathgate_core::{ApprovedPath, GuardOptions, VerifyStatus};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Path to capture and verify
    pub path: PathBuf,

    /// Milliseconds to wait between capture and verification
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub delay_ms: u64,
}

#[instrument(level = "info", name = "cmd::check", skip_all, fields(path = %args.path.display()))]
pub fn execute(args: &Args, options: &GuardOptions) -> Result<()> {
    let approved = ApprovedPath::capture_with(&args.path, options)?;

    if args.delay_ms > 0 {
        info!(delay_ms = args.delay_ms, "Waiting before verification");
        thread::sleep(Duration::from_millis(args.delay_ms));
    }

    match approved.verify() {
        Ok(()) => {
            println!("{}", VerifyStatus::Ok.message());
            Ok(())
        }
        Err(err) => {
            println!("{}", err.to_json());
            Err(err.into())
        }
    }
}
