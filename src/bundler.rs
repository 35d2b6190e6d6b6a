//! JS development bundler (Metro) liveness and lifecycle

use std::path::Path;
use std::time::Duration;

use crate::common::Result;
use crate::exec::{CommandRunner, ShellCommand};

/// Body Metro's `/status` endpoint answers with when it is up
const RUNNING_STATUS: &str = "packager-status:running";

const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Whether a bundler answers on `port`
///
/// Anything other than the expected status body, including a refused
/// connection, counts as not running.
pub async fn is_bundler_running(port: u16) -> bool {
    let url = format!("http://localhost:{port}/status");
    let client = match reqwest::Client::builder().timeout(STATUS_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };

    match client.get(&url).send().await {
        Ok(response) => match response.text().await {
            Ok(body) => body.trim() == RUNNING_STATUS,
            Err(_) => false,
        },
        Err(e) => {
            tracing::debug!(%url, error = %e, "Bundler status check failed");
            false
        }
    }
}

/// PIDs of the processes listening on `port`
pub async fn listening_pids(runner: &dyn CommandRunner, port: u16) -> Result<Vec<u32>> {
    let output = runner
        .output(
            &ShellCommand::new("lsof")
                .arg("-i")
                .arg(format!(":{port}"))
                .args(["-t", "-sTCP:LISTEN"]),
        )
        .await?;

    // lsof exits 1 when nothing matches
    if !output.success() {
        return Ok(Vec::new());
    }
    Ok(parse_pids(&output.stdout))
}

fn parse_pids(stdout: &str) -> Vec<u32> {
    let mut pids: Vec<u32> = stdout
        .split_whitespace()
        .filter_map(|s| s.parse().ok())
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

/// Terminate whatever listens on `port`; returns the PIDs signalled
pub async fn kill_bundler(runner: &dyn CommandRunner, port: u16) -> Result<Vec<u32>> {
    let pids = listening_pids(runner, port).await?;
    if pids.is_empty() {
        return Ok(pids);
    }

    tracing::info!(port, ?pids, "Killing bundler");
    runner
        .run(&ShellCommand::new("kill").args(pids.iter().map(|p| p.to_string())))
        .await?;
    Ok(pids)
}

/// Make sure no stale bundler is serving an old bundle before a test run
pub async fn check_bundler(runner: &dyn CommandRunner, port: u16) -> Result<()> {
    if is_bundler_running(port).await {
        tracing::warn!(port, "A bundler is already running, killing it");
        kill_bundler(runner, port).await?;
    }
    Ok(())
}

/// Start the bundler for the app in `app_dir` without waiting for it
pub fn launch_bundler(runner: &dyn CommandRunner, app_dir: &Path, port: u16) -> Result<()> {
    tracing::info!(dir = %app_dir.display(), port, "Starting bundler");
    runner.spawn_detached(
        &ShellCommand::new("yarn")
            .args(["start", "--port"])
            .arg(port.to_string())
            .current_dir(app_dir),
    )
}
