use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use serde::Serialize;
use tracing::instrument;

use pathgate_core::is_network_filesystem;

#[derive(ClapArgs)]
pub struct Args {
    /// Path to inspect (need not exist)
    pub path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct NetfsReport {
    path: String,
    network: bool,
}

#[instrument(level = "info", name = "cmd::netfs", skip_all, fields(path = %args.path.display()))]
pub fn execute(args: &Args) -> Result<()> {
    let network = is_network_filesystem(&args.path);

    if args.json {
        let report = NetfsReport {
            path: args.path.display().to_string(),
            network,
        };
        println!("{}", serde_json::to_string(&report)?);
    } else if network {
        println!("{}: network filesystem", args.path.display());
    } else {
        println!("{}: local filesystem", args.path.display());
    }
    Ok(())
}
