//! End-to-end release testing flows
//!
//! Drives either RNTester (the in-repo test app) or a freshly scaffolded
//! project through install, build and launch on iOS or Android. Prebuilt
//! artifacts come from CircleCI when a token is given, otherwise everything
//! is built from the local checkout.

mod artifacts;
mod rntester;
mod test_project;

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::bundler;
use crate::circleci::{ArtifactResolver, CiTransport, JsEngine};
use crate::common::config::Config;
use crate::common::Result;
use crate::exec::{CommandRunner, DryRunRunner, SystemRunner};

pub use artifacts::extract_zip;
pub use test_project::{add_maven_local_repository, set_hermes_enabled};

/// App under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Target {
    /// The in-repo test app (packages/rn-tester)
    #[value(name = "rntester", alias = "RNTester")]
    RnTester,
    /// A new project scaffolded from the framework package
    #[value(name = "test-project", alias = "RNTestProject")]
    TestProject,
}

/// Platform to build and launch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Platform {
    #[value(alias = "iOS")]
    Ios,
    #[value(alias = "Android")]
    Android,
}

/// Options for one e2e run
#[derive(Debug, Clone)]
pub struct E2eOptions {
    pub target: Target,
    pub platform: Platform,
    pub hermes: bool,
    /// Use CircleCI artifacts for this branch instead of building locally
    pub circleci_token: Option<String>,
    pub branch: String,
    /// Print mutating commands instead of running them
    pub dry_run: bool,
}

impl E2eOptions {
    pub fn engine(&self) -> JsEngine {
        JsEngine::from_hermes_flag(self.hermes)
    }
}

/// Shared state for the steps of a run
pub struct E2eContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub config: &'a Config,
    pub repo_root: PathBuf,
    pub tmp_dir: PathBuf,
    pub dry_run: bool,
}

impl E2eContext<'_> {
    /// `packages/rn-tester` in the checkout
    pub fn rntester_dir(&self) -> PathBuf {
        self.repo_root.join("packages").join("rn-tester")
    }

    /// `packages/react-native` in the checkout
    pub fn package_dir(&self) -> PathBuf {
        self.repo_root.join("packages").join("react-native")
    }

    fn step(&self, title: &str) {
        println!("\n{} {}", "▶".cyan(), title.bold());
    }
}

/// Run an e2e scenario against the host machine
pub async fn run(opts: E2eOptions, config: &Config) -> Result<()> {
    let runner: Box<dyn CommandRunner> = if opts.dry_run {
        Box::new(DryRunRunner)
    } else {
        Box::new(SystemRunner)
    };

    let ctx = E2eContext {
        runner: runner.as_ref(),
        config,
        repo_root: config.paths.repo_root()?,
        tmp_dir: config.paths.tmp_dir.clone(),
        dry_run: opts.dry_run,
    };

    match &opts.circleci_token {
        Some(token) => {
            let mut resolver =
                ArtifactResolver::with_token(token, &config.paths.tmp_dir, &config.circleci)?;
            resolver.initialize(&opts.branch).await?;
            run_with(&ctx, &opts, Some(&resolver)).await
        }
        None => run_with::<crate::circleci::CircleCiClient>(&ctx, &opts, None).await,
    }
}

/// Run an e2e scenario with an explicit context and optional resolver
pub async fn run_with<T: CiTransport>(
    ctx: &E2eContext<'_>,
    opts: &E2eOptions,
    resolver: Option<&ArtifactResolver<T>>,
) -> Result<()> {
    tracing::info!(
        target = ?opts.target,
        platform = ?opts.platform,
        engine = %opts.engine(),
        ci = resolver.is_some(),
        "Starting e2e run"
    );

    // Local builds stage here too; the resolver only creates it for CI runs
    if !ctx.dry_run {
        std::fs::create_dir_all(&ctx.tmp_dir)?;
    }

    bundler::check_bundler(ctx.runner, ctx.config.bundler.port).await?;

    match opts.target {
        Target::RnTester => rntester::run(ctx, opts, resolver).await?,
        Target::TestProject => test_project::run(ctx, opts, resolver).await?,
    }

    println!("\n{}", "Done. Verify the app behaves as expected.".green().bold());
    Ok(())
}

/// Download through the resolver, or just announce it in dry-run mode
async fn fetch<T: CiTransport>(
    ctx: &E2eContext<'_>,
    resolver: &ArtifactResolver<T>,
    url: &str,
    dest: &Path,
) -> Result<()> {
    if ctx.dry_run {
        println!("  {} {} -> {}", "would download".yellow(), url, dest.display());
        return Ok(());
    }
    println!("  Downloading {}", dest.display());
    resolver.download_artifact(url, dest).await
}
