//! CLI command definitions
//!
//! Defines the clap commands for the release e2e CLI.

use clap::{ArgAction, Subcommand};

use crate::e2e::{Platform, Target};

#[derive(Subcommand)]
pub enum Commands {
    /// Build, install and launch a test app for release verification
    Test {
        /// App to test
        #[arg(long, value_enum, default_value = "rntester")]
        target: Target,

        /// Platform to run on
        #[arg(long, value_enum)]
        platform: Platform,

        /// Use Hermes as the JS engine (false selects JSC)
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        hermes: bool,

        /// CircleCI API token; when set, prebuilt artifacts are downloaded
        /// from CI instead of building locally
        #[arg(long, env = "CIRCLECI_TOKEN", hide_env_values = true)]
        circleci_token: Option<String>,

        /// Branch whose latest CI pipeline provides the artifacts
        #[arg(long, default_value = "main")]
        branch: String,

        /// Print the commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve the CI artifact URLs for a branch
    Artifacts {
        /// Branch whose latest CI pipeline to inspect
        #[arg(long, default_value = "main")]
        branch: String,

        /// CircleCI API token
        #[arg(long, env = "CIRCLECI_TOKEN", hide_env_values = true)]
        circleci_token: String,

        /// CPU ABI for the RNTester APKs (default: ask the connected device)
        #[arg(long)]
        arch: Option<String>,

        /// Download every resolved artifact into the staging directory
        #[arg(long)]
        download: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List Android emulators, optionally launching one
    Emulator {
        /// Launch the first emulator unless a device is already connected
        #[arg(long)]
        launch: bool,
    },

    /// Check whether the JS bundler is running
    Bundler {
        /// Kill the process listening on the bundler port
        #[arg(long)]
        kill: bool,

        /// Bundler port (default from config, 8081)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show the configuration file path and effective settings
    Config,
}
