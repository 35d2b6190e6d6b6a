//! Release e2e CLI - end-to-end testing for framework releases
//!
//! Resolves prebuilt artifacts from CircleCI and drives RNTester or a freshly
//! scaffolded project through install, build and launch.

use std::path::PathBuf;

use clap::Parser;
use release_e2e::commands::Commands;
use release_e2e::common::{config::Config, logging};
use release_e2e::{cli, Result};

#[derive(Parser)]
#[command(name = "release-e2e", about = "End-to-end release testing harness")]
#[command(version, long_about = None)]
struct Cli {
    /// Show every command and request as it runs
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli::dispatch(cli.command, &config).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
