use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use pathgate_core::{ApprovedPath, GuardOptions, OpenFlags, verify_and_open_with_options};

#[derive(ClapArgs)]
pub struct Args {
    /// File to read
    pub path: PathBuf,
}

#[instrument(level = "info", name = "cmd::cat", skip_all, fields(path = %args.path.display()))]
pub fn execute(args: &Args, options: &GuardOptions) -> Result<()> {
    let approved = ApprovedPath::capture_with(&args.path, options)?;
    if !approved.existed() {
        anyhow::bail!("File does not exist: {}", args.path.display());
    }

    let mut file = verify_and_open_with_options(&approved, OpenFlags::read(), options)?;
    let mut stdout = io::stdout().lock();
    io::copy(&mut file, &mut stdout).context("Failed to copy file to stdout")?;
    stdout.flush()?;
    Ok(())
}
