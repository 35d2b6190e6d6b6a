//! Fresh-project flow: scaffold a new app from the framework package and run it

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::artifacts::{self, MAVEN_LOCAL_DIR};
use super::{E2eContext, E2eOptions, Platform};
use crate::circleci::{ArtifactResolver, CiTransport};
use crate::common::{Error, Result};
use crate::exec::ShellCommand;

pub const PROJECT_NAME: &str = "RNTestProject";

/// Framework artifacts the new project is built against
struct Inputs {
    package_tarball: PathBuf,
    maven_local: Option<PathBuf>,
    hermes_tarball: Option<PathBuf>,
}

pub async fn run<T: CiTransport>(
    ctx: &E2eContext<'_>,
    opts: &E2eOptions,
    resolver: Option<&ArtifactResolver<T>>,
) -> Result<()> {
    ctx.step("Preparing framework package");
    let inputs = match resolver {
        Some(resolver) => ci_inputs(ctx, opts, resolver).await?,
        None => local_inputs(ctx, opts).await?,
    };

    let project_dir = ctx.tmp_dir.join(PROJECT_NAME);
    ctx.step(&format!("Creating {} in {}", PROJECT_NAME, project_dir.display()));
    if !ctx.dry_run && project_dir.exists() {
        std::fs::remove_dir_all(&project_dir)?;
    }

    ctx.runner
        .run(
            &ShellCommand::new("npx")
                .args(["@react-native-community/cli", "init", PROJECT_NAME, "--directory"])
                .arg(project_dir.to_string_lossy())
                .arg("--template")
                .arg(inputs.package_tarball.to_string_lossy())
                .arg("--skip-install")
                .current_dir(&ctx.tmp_dir),
        )
        .await?;

    ctx.runner
        .run(&ShellCommand::new("yarn").arg("install").current_dir(&project_dir))
        .await?;

    match opts.platform {
        Platform::Android => {
            let android_dir = project_dir.join("android");
            if !ctx.dry_run {
                if let Some(maven) = &inputs.maven_local {
                    add_maven_local_repository(&android_dir.join("build.gradle"), maven)?;
                }
                set_hermes_enabled(&android_dir.join("gradle.properties"), opts.hermes)?;
            }

            ctx.step("Building and launching on Android");
            ctx.runner
                .run(&ShellCommand::new("yarn").arg("android").current_dir(&project_dir))
                .await?;
        }
        Platform::Ios => {
            ctx.step("Installing pods");
            ctx.runner
                .run(&ShellCommand::new("bundle").arg("install").current_dir(&project_dir))
                .await?;

            let mut pod_install = ShellCommand::new("bundle")
                .args(["exec", "pod", "install"])
                .current_dir(project_dir.join("ios"))
                .env("USE_HERMES", if opts.hermes { "1" } else { "0" });
            if let Some(tarball) = &inputs.hermes_tarball {
                pod_install =
                    pod_install.env("HERMES_ENGINE_TARBALL_PATH", tarball.to_string_lossy());
            }
            ctx.runner.run(&pod_install).await?;

            ctx.step("Building and launching on iOS");
            ctx.runner
                .run(&ShellCommand::new("yarn").arg("ios").current_dir(&project_dir))
                .await?;
        }
    }
    Ok(())
}

async fn ci_inputs<T: CiTransport>(
    ctx: &E2eContext<'_>,
    opts: &E2eOptions,
    resolver: &ArtifactResolver<T>,
) -> Result<Inputs> {
    let package_tarball = artifacts::package_tarball(ctx, resolver).await?;
    let maven_local = match opts.platform {
        Platform::Android => Some(artifacts::maven_local(ctx, resolver).await?),
        Platform::Ios => None,
    };
    let hermes_tarball = match opts.platform {
        Platform::Ios if opts.hermes => Some(artifacts::hermes_tarball(ctx, resolver).await?),
        _ => None,
    };
    Ok(Inputs {
        package_tarball,
        maven_local,
        hermes_tarball,
    })
}

async fn local_inputs(ctx: &E2eContext<'_>, opts: &E2eOptions) -> Result<Inputs> {
    let package_tarball = pack_local(ctx).await?;

    let maven_local = match opts.platform {
        Platform::Android => {
            ctx.runner
                .run(
                    &ShellCommand::new("./gradlew")
                        .arg("publishAllToMavenTempLocal")
                        .current_dir(&ctx.repo_root),
                )
                .await?;
            // Location is fixed by the framework's Gradle build
            Some(std::env::temp_dir().join(MAVEN_LOCAL_DIR))
        }
        Platform::Ios => None,
    };

    Ok(Inputs {
        package_tarball,
        maven_local,
        hermes_tarball: None,
    })
}

#[derive(Deserialize)]
struct PackageManifest {
    name: String,
    version: String,
}

/// `npm pack` the framework package into the staging directory
async fn pack_local(ctx: &E2eContext<'_>) -> Result<PathBuf> {
    let package_dir = ctx.package_dir();
    let manifest_path = package_dir.join("package.json");
    let content = std::fs::read_to_string(&manifest_path).map_err(|e| Error::FileRead {
        path: manifest_path.display().to_string(),
        error: e.to_string(),
    })?;
    let manifest: PackageManifest = serde_json::from_str(&content)?;

    ctx.runner
        .run(
            &ShellCommand::new("npm")
                .args(["pack", "--pack-destination"])
                .arg(ctx.tmp_dir.to_string_lossy())
                .current_dir(&package_dir),
        )
        .await?;

    Ok(ctx.tmp_dir.join(npm_pack_file_name(&manifest.name, &manifest.version)))
}

/// File name `npm pack` gives a package: `@scope/name` becomes `scope-name`
fn npm_pack_file_name(name: &str, version: &str) -> String {
    let name = name.trim_start_matches('@').replace('/', "-");
    format!("{name}-{version}.tgz")
}

/// Point the Android build at a local Maven repository before Maven Central
pub fn add_maven_local_repository(build_gradle: &Path, maven_dir: &Path) -> Result<()> {
    let content = std::fs::read_to_string(build_gradle)?;
    let url = format!("file://{}", maven_dir.display());
    std::fs::write(build_gradle, with_maven_local(&content, &url))?;
    Ok(())
}

fn with_maven_local(content: &str, url: &str) -> String {
    let repo_line = format!("maven {{ url \"{url}\" }}");
    if content.contains(&repo_line) {
        return content.to_string();
    }

    let mut out = String::with_capacity(content.len() + repo_line.len() + 64);
    let mut inserted = false;
    for line in content.lines() {
        if !inserted && line.trim() == "mavenCentral()" {
            let indent = &line[..line.len() - line.trim_start().len()];
            out.push_str(indent);
            out.push_str(&repo_line);
            out.push('\n');
            inserted = true;
        }
        out.push_str(line);
        out.push('\n');
    }

    if !inserted {
        out.push_str(&format!(
            "\nallprojects {{\n    repositories {{\n        {repo_line}\n    }}\n}}\n"
        ));
    }
    out
}

/// Set `hermesEnabled` in the project's gradle.properties
pub fn set_hermes_enabled(gradle_properties: &Path, enabled: bool) -> Result<()> {
    let content = match std::fs::read_to_string(gradle_properties) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    std::fs::write(gradle_properties, with_hermes_enabled(&content, enabled))?;
    Ok(())
}

fn with_hermes_enabled(content: &str, enabled: bool) -> String {
    let setting = format!("hermesEnabled={enabled}");
    let mut found = false;
    let mut lines: Vec<String> = content
        .lines()
        .map(|line| {
            if line.trim_start().starts_with("hermesEnabled=") {
                found = true;
                setting.clone()
            } else {
                line.to_string()
            }
        })
        .collect();
    if !found {
        lines.push(setting);
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
