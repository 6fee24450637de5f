//! Capture command - show the identity snapshot taken for a path.
//!
//! # Examples
//!
//! ```bash
//! pathgate capture src/main.rs
//!
//! # Output as JSON for scripting
//! pathgate capture src/main.rs --json
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use pathgate_core::{ApprovedPath, GuardOptions};

use crate::output::{create_table, yes_no};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Path to capture (need not exist; its directory must)
    pub path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::capture", skip_all, fields(path = %args.path.display()))]
pub fn execute(args: &Args, options: &GuardOptions) -> Result<()> {
    let approved = ApprovedPath::capture_with(&args.path, options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&approved)?);
        return Ok(());
    }

    let identity = if approved.existed() {
        approved.identity().to_string()
    } else {
        "(new file)".to_string()
    };

    let mut table = create_table();
    table.set_header(vec!["Property", "Value"]);
    table.add_row(vec!["User Path", &approved.user_path().display().to_string()]);
    table.add_row(vec!["Resolved Path", &approved.resolved_path().display().to_string()]);
    table.add_row(vec!["Parent", &approved.parent_path().display().to_string()]);
    table.add_row(vec!["Existed", yes_no(approved.existed())]);
    table.add_row(vec!["Identity", &identity]);
    table.add_row(vec!["Parent Identity", &approved.parent_identity().to_string()]);
    table.add_row(vec!["Symlink", yes_no(approved.is_symlink())]);
    table.add_row(vec!["Network FS", yes_no(approved.is_network_fs())]);
    println!("{table}");

    Ok(())
}
