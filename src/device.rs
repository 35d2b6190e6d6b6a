//! Android emulator and device control
//!
//! Thin wrappers over `emulator` and `adb`. The tools are looked up on PATH
//! first, then under `$ANDROID_HOME`.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::common::{Error, Result};
use crate::exec::{stdout_of, CommandRunner, ShellCommand};

/// Interval between `adb devices` polls while an emulator boots
const BOOT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Locate an Android SDK tool
///
/// Falls back to the bare name so the error surfaces as `ToolNotFound` when
/// the command is run.
pub fn android_tool(name: &str) -> String {
    if let Ok(path) = which::which(name) {
        return path.to_string_lossy().into_owned();
    }

    let subdir = match name {
        "emulator" => "emulator",
        _ => "platform-tools",
    };
    for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
        if let Ok(sdk) = std::env::var(var) {
            let candidate = PathBuf::from(sdk).join(subdir).join(name);
            if candidate.exists() {
                return candidate.to_string_lossy().into_owned();
            }
        }
    }
    name.to_string()
}

fn adb() -> ShellCommand {
    ShellCommand::new(android_tool("adb"))
}

/// Names of the configured Android virtual devices
pub async fn list_avds(runner: &dyn CommandRunner) -> Result<Vec<String>> {
    let stdout = stdout_of(
        runner,
        &ShellCommand::new(android_tool("emulator")).arg("-list-avds"),
    )
    .await?;
    Ok(parse_avds(&stdout))
}

fn parse_avds(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        // The emulator prints INFO/WARNING lines to stdout on some versions
        .filter(|line| !line.is_empty() && !line.starts_with("INFO") && !line.starts_with("WARNING"))
        .map(str::to_string)
        .collect()
}

/// Serials of devices `adb` reports as ready
pub async fn connected_devices(runner: &dyn CommandRunner) -> Result<Vec<String>> {
    let stdout = stdout_of(runner, &adb().arg("devices")).await?;
    Ok(parse_adb_devices(&stdout))
}

fn parse_adb_devices(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip_while(|line| !line.starts_with("List of devices"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(serial), Some("device")) => Some(serial.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// Launch the first AVD unless a device is already connected
///
/// The emulator is started detached and never awaited; this only waits
/// (up to `boot_timeout_secs`) for it to register with adb.
pub async fn maybe_launch_android_emulator(
    runner: &dyn CommandRunner,
    boot_timeout_secs: u64,
) -> Result<()> {
    let devices = connected_devices(runner).await?;
    if let Some(serial) = devices.first() {
        tracing::info!(%serial, "Android device already connected");
        return Ok(());
    }

    let avds = list_avds(runner).await?;
    let avd = avds.first().ok_or(Error::NoEmulator)?;

    tracing::info!(%avd, "Launching Android emulator");
    runner.spawn_detached(&ShellCommand::new(android_tool("emulator")).arg(format!("@{avd}")))?;

    wait_for_device(runner, Duration::from_secs(boot_timeout_secs)).await
}

async fn wait_for_device(runner: &dyn CommandRunner, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if !connected_devices(runner).await?.is_empty() {
            tracing::info!("Emulator is up");
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::Timeout(timeout.as_secs()));
        }
        tokio::time::sleep(BOOT_POLL_INTERVAL).await;
    }
}

/// Primary CPU ABI of the connected device, e.g. `arm64-v8a` or `x86_64`
pub async fn android_cpu_arch(runner: &dyn CommandRunner) -> Result<String> {
    let stdout = stdout_of(
        runner,
        &adb().args(["shell", "getprop", "ro.product.cpu.abi"]),
    )
    .await?;

    let arch = stdout.trim();
    if arch.is_empty() {
        return Err(Error::NotFound(
            "Connected device did not report a CPU architecture".to_string(),
        ));
    }
    Ok(arch.to_string())
}

/// Install an APK, replacing any existing build
pub async fn install_apk(runner: &dyn CommandRunner, apk: &std::path::Path) -> Result<()> {
    runner
        .run(&adb().args(["install", "-r"]).arg(apk.to_string_lossy()))
        .await
}

/// Start an activity, e.g. `com.facebook.react.uiapp/.RNTesterActivity`
pub async fn start_activity(runner: &dyn CommandRunner, component: &str) -> Result<()> {
    runner
        .run(&adb().args(["shell", "am", "start", "-n", component]))
        .await
}
