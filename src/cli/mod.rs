//! CLI command handling
//!
//! Dispatches CLI commands and formats their output.

use colored::Colorize;

use crate::bundler;
use crate::circleci::{ArtifactResolver, CiTransport, JsEngine};
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{paths, Result};
use crate::device;
use crate::e2e::{self, E2eOptions};
use crate::exec::SystemRunner;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Test {
            target,
            platform,
            hermes,
            circleci_token,
            branch,
            dry_run,
        } => {
            let opts = E2eOptions {
                target,
                platform,
                hermes,
                circleci_token,
                branch,
                dry_run,
            };
            e2e::run(opts, config).await
        }

        Commands::Artifacts {
            branch,
            circleci_token,
            arch,
            download,
            json,
        } => {
            let mut resolver =
                ArtifactResolver::with_token(&circleci_token, &config.paths.tmp_dir, &config.circleci)?;
            resolver.initialize(&branch).await?;

            let arch = match arch {
                Some(arch) => Some(arch),
                None => match device::android_cpu_arch(&SystemRunner).await {
                    Ok(arch) => Some(arch),
                    Err(e) => {
                        tracing::warn!("Skipping RNTester APKs: {e}");
                        None
                    }
                },
            };

            let entries = resolve_all(&resolver, arch.as_deref()).await?;

            if json {
                let items: Vec<_> = entries
                    .iter()
                    .map(|(name, url)| serde_json::json!({"name": name, "url": url}))
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "branch": branch,
                        "pipeline": resolver.pipeline().map(|p| p.number),
                        "artifacts": items,
                    }))?
                );
            } else {
                if let Some(pipeline) = resolver.pipeline() {
                    println!("Pipeline #{} for {}:", pipeline.number, branch.bold());
                }
                for (name, url) in &entries {
                    println!("  {:32} {}", name, url.dimmed());
                }
            }

            if download {
                for (name, url) in &entries {
                    let dest = resolver.tmp_path(name);
                    resolver.download_artifact(url, &dest).await?;
                    if !json {
                        println!("  {} {}", "✓".green(), dest.display());
                    }
                }
            }
            Ok(())
        }

        Commands::Emulator { launch } => {
            if launch {
                device::maybe_launch_android_emulator(
                    &SystemRunner,
                    config.device.boot_timeout_secs,
                )
                .await?;
            }

            let avds = device::list_avds(&SystemRunner).await?;
            if avds.is_empty() {
                println!("No Android emulators configured");
            } else {
                println!("Emulators:");
                for avd in &avds {
                    println!("  {}", avd);
                }
            }

            let devices = device::connected_devices(&SystemRunner).await?;
            if devices.is_empty() {
                println!("No devices connected");
            } else {
                println!("Connected:");
                for serial in &devices {
                    println!("  {}", serial);
                }
            }
            Ok(())
        }

        Commands::Bundler { kill, port } => {
            let port = port.unwrap_or(config.bundler.port);
            if kill {
                let pids = bundler::kill_bundler(&SystemRunner, port).await?;
                if pids.is_empty() {
                    println!("Nothing listening on port {}", port);
                } else {
                    println!("Killed {:?} on port {}", pids, port);
                }
            } else if bundler::is_bundler_running(port).await {
                println!("{} Bundler running on port {}", "●".green(), port);
            } else {
                println!("{} No bundler on port {}", "○".dimmed(), port);
            }
            Ok(())
        }

        Commands::Config => {
            match paths::config_path() {
                Some(path) if path.exists() => println!("# {}", path.display()),
                Some(path) => println!("# {} (not present, using defaults)", path.display()),
                None => println!("# no config directory on this platform, using defaults"),
            }
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// Resolve every well-known artifact, named by the file it is saved as
async fn resolve_all<T: CiTransport>(
    resolver: &ArtifactResolver<T>,
    arch: Option<&str>,
) -> Result<Vec<(String, String)>> {
    let mut entries = vec![
        (
            "hermes-ios-debug.tar.gz".to_string(),
            resolver.artifact_url_hermes_debug().await?,
        ),
        (
            "react-native.tgz".to_string(),
            resolver.artifact_url_react_native_package().await?,
        ),
        (
            "maven-local.zip".to_string(),
            resolver.artifact_url_maven_local().await?,
        ),
    ];

    if let Some(arch) = arch {
        for engine in [JsEngine::Hermes, JsEngine::Jsc] {
            entries.push((
                format!("app-{engine}-{arch}-release.apk"),
                resolver.artifact_url_rntester_apk(engine, arch).await?,
            ));
        }
    }
    Ok(entries)
}
