//! Write command - stream stdin into a verified handle.
//!
//! Existing files are truncated (or appended to with `--append`) only after
//! their identity is confirmed; new files are created exclusively inside the
//! verified parent directory.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{debug, instrument};

use pathgate_core::{
    ApprovedPath, GuardOptions, OpenFlags, create_file_in_verified_parent,
    verify_and_open_with_options,
};

#[derive(ClapArgs)]
pub struct Args {
    /// File to write
    pub path: PathBuf,

    /// Append instead of truncating
    #[arg(long)]
    pub append: bool,

    /// Fail unless the file is new
    #[arg(long, conflicts_with = "append")]
    pub create_only: bool,
}

#[instrument(level = "info", name = "cmd::write", skip_all, fields(path = %args.path.display()))]
pub fn execute(args: &Args, options: &GuardOptions) -> Result<()> {
    let approved = ApprovedPath::capture_with(&args.path, options)?;

    let mut file = if args.create_only {
        create_file_in_verified_parent(&approved, OpenFlags::write(), options.default_create_mode)?
    } else {
        let flags = if args.append {
            OpenFlags::write().with_append()
        } else {
            OpenFlags::write().with_truncate()
        };
        verify_and_open_with_options(&approved, flags, options)?
    };

    let written = io::copy(&mut io::stdin().lock(), &mut file)
        .with_context(|| format!("Failed to write {}", args.path.display()))?;
    file.flush()?;
    debug!(bytes = written, "Write complete");
    Ok(())
}
