//! RNTester flows

use super::{artifacts, E2eContext, E2eOptions, Platform};
use crate::bundler;
use crate::circleci::{ArtifactResolver, CiTransport, JsEngine};
use crate::common::Result;
use crate::device;
use crate::exec::ShellCommand;

/// Launcher activity of the RNTester Android app
pub const RNTESTER_ACTIVITY: &str = "com.facebook.react.uiapp/.RNTesterActivity";

const XCODE_WORKSPACE: &str = "RNTesterPods.xcworkspace";

pub async fn run<T: CiTransport>(
    ctx: &E2eContext<'_>,
    opts: &E2eOptions,
    resolver: Option<&ArtifactResolver<T>>,
) -> Result<()> {
    match opts.platform {
        Platform::Ios => run_ios(ctx, opts, resolver).await,
        Platform::Android => run_android(ctx, opts, resolver).await,
    }
}

async fn run_ios<T: CiTransport>(
    ctx: &E2eContext<'_>,
    opts: &E2eOptions,
    resolver: Option<&ArtifactResolver<T>>,
) -> Result<()> {
    let app_dir = ctx.rntester_dir();

    let hermes_tarball = match resolver {
        Some(resolver) if opts.hermes => {
            ctx.step("Downloading Hermes from CircleCI");
            Some(artifacts::hermes_tarball(ctx, resolver).await?)
        }
        _ => None,
    };

    ctx.step("Installing pods");
    ctx.runner
        .run(&ShellCommand::new("bundle").arg("install").current_dir(&app_dir))
        .await?;

    let mut pod_install = ShellCommand::new("bundle")
        .args(["exec", "pod", "install", "--ansi"])
        .current_dir(&app_dir)
        .env("USE_HERMES", if opts.hermes { "1" } else { "0" });
    if let Some(tarball) = &hermes_tarball {
        pod_install = pod_install.env("HERMES_ENGINE_TARBALL_PATH", tarball.to_string_lossy());
    }
    ctx.runner.run(&pod_install).await?;

    ctx.step("Starting bundler");
    bundler::launch_bundler(ctx.runner, &app_dir, ctx.config.bundler.port)?;

    ctx.step("Opening Xcode");
    ctx.runner
        .run(&ShellCommand::new("xed").arg(XCODE_WORKSPACE).current_dir(&app_dir))
        .await?;
    println!("  Build and run the RNTester scheme from Xcode.");
    Ok(())
}

async fn run_android<T: CiTransport>(
    ctx: &E2eContext<'_>,
    opts: &E2eOptions,
    resolver: Option<&ArtifactResolver<T>>,
) -> Result<()> {
    ctx.step("Preparing Android emulator");
    device::maybe_launch_android_emulator(ctx.runner, ctx.config.device.boot_timeout_secs).await?;

    match resolver {
        Some(resolver) => {
            let arch = device::android_cpu_arch(ctx.runner).await?;
            ctx.step(&format!("Downloading RNTester APK ({}, {})", opts.engine(), arch));
            let apk = artifacts::rntester_apk(ctx, resolver, opts.engine(), &arch).await?;

            ctx.step("Installing APK");
            device::install_apk(ctx.runner, &apk).await?;
        }
        None => {
            ctx.step("Building and installing RNTester");
            ctx.runner
                .run(
                    &ShellCommand::new("./gradlew")
                        .arg(gradle_install_task(opts.engine()))
                        .current_dir(&ctx.repo_root),
                )
                .await?;
        }
    }

    // Release builds embed the JS bundle, so no bundler is needed here
    ctx.step("Launching RNTester");
    device::start_activity(ctx.runner, RNTESTER_ACTIVITY).await
}

fn gradle_install_task(engine: JsEngine) -> &'static str {
    match engine {
        JsEngine::Hermes => ":packages:rn-tester:android:app:installHermesRelease",
        JsEngine::Jsc => ":packages:rn-tester:android:app:installJscRelease",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circleci::testing::healthy_ci;
    use crate::circleci::CircleCiClient;
    use crate::common::config::Config;
    use crate::e2e::test_support::{context, options};
    use crate::e2e::{run_with, Target};
    use crate::exec::testing::ScriptedRunner;
    use serde_json::json;

    fn adb() -> String {
        device::android_tool("adb")
    }

    fn android_runner() -> ScriptedRunner {
        ScriptedRunner::default()
            .respond(
                &format!("{} devices", adb()),
                "List of devices attached\nemulator-5554\tdevice\n",
            )
            .respond(&format!("{} shell getprop", adb()), "x86_64\n")
    }

    #[tokio::test]
    async fn test_android_local_build_uses_gradle() {
        let dir = tempfile::tempdir().unwrap();
        let runner = android_runner();
        let mut config = Config::default();
        let ctx = context(&runner, &mut config, dir.path());
        let opts = options(Target::RnTester, Platform::Android, false);

        run_with::<CircleCiClient>(&ctx, &opts, None).await.unwrap();

        let calls = runner.calls();
        assert!(calls.contains(&"./gradlew :packages:rn-tester:android:app:installJscRelease".to_string()));
        assert_eq!(
            calls.last().unwrap(),
            &format!("{} shell am start -n {}", adb(), RNTESTER_ACTIVITY)
        );
        assert!(!calls.iter().any(|c| c.contains("getprop")));
    }

    #[tokio::test]
    async fn test_android_ci_installs_apk_for_device_arch() {
        let dir = tempfile::tempdir().unwrap();
        let runner = android_runner();
        let mut config = Config::default();
        let ctx = context(&runner, &mut config, dir.path());
        let opts = options(Target::RnTester, Platform::Android, true);

        let transport = healthy_ci().route(
            "/project/gh/facebook/react-native/9/artifacts",
            json!({"items": [
                {"path": "rntester-apk/hermes/release/app-hermes-arm64-v8a-release.apk", "url": "https://ci/arm"},
                {"path": "rntester-apk/hermes/release/app-hermes-x86_64-release.apk", "url": "https://ci/x86"},
            ]}),
        );
        let mut resolver =
            ArtifactResolver::new(transport, &ctx.config.circleci, &ctx.tmp_dir).unwrap();
        resolver.initialize("main").await.unwrap();

        run_with(&ctx, &opts, Some(&resolver)).await.unwrap();

        assert_eq!(resolver.transport().downloads(), vec!["https://ci/x86"]);
        let apk = ctx.tmp_dir.join("app-hermes-x86_64-release.apk");
        assert!(apk.is_file());
        assert!(runner
            .calls()
            .contains(&format!("{} install -r {}", adb(), apk.display())));
        assert!(!runner.calls().iter().any(|c| c.contains("gradlew")));
    }

    #[tokio::test]
    async fn test_ios_sets_hermes_env_for_pod_install() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::default();
        let mut config = Config::default();
        let ctx = context(&runner, &mut config, dir.path());
        let opts = options(Target::RnTester, Platform::Ios, true);

        let transport = healthy_ci().route(
            "/project/gh/facebook/react-native/7/artifacts",
            json!({"items": [{"path": "hermes-ios-debug.tar.gz", "url": "https://ci/hermes"}]}),
        );
        let mut resolver =
            ArtifactResolver::new(transport, &ctx.config.circleci, &ctx.tmp_dir).unwrap();
        resolver.initialize("main").await.unwrap();

        run_with(&ctx, &opts, Some(&resolver)).await.unwrap();

        let tarball = ctx.tmp_dir.join("hermes-ios-debug.tar.gz");
        assert!(tarball.is_file());
        let calls = runner.calls();
        assert_eq!(calls[0], "bundle install");
        assert_eq!(
            calls[1],
            format!(
                "USE_HERMES=1 HERMES_ENGINE_TARBALL_PATH={} bundle exec pod install --ansi",
                tarball.display()
            )
        );
        assert_eq!(calls[2], "xed RNTesterPods.xcworkspace");
        assert_eq!(runner.spawned(), vec!["yarn start --port 1"]);
    }

    #[tokio::test]
    async fn test_ios_jsc_skips_hermes_download() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::default();
        let mut config = Config::default();
        let ctx = context(&runner, &mut config, dir.path());
        let opts = options(Target::RnTester, Platform::Ios, false);

        let mut resolver =
            ArtifactResolver::new(healthy_ci(), &ctx.config.circleci, &ctx.tmp_dir).unwrap();
        resolver.initialize("main").await.unwrap();
        run_with(&ctx, &opts, Some(&resolver)).await.unwrap();

        assert!(resolver.transport().downloads().is_empty());
        assert_eq!(runner.calls()[1], "USE_HERMES=0 bundle exec pod install --ansi");
    }

    #[tokio::test]
    async fn test_failing_step_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::default().fail("bundle install", 5);
        let mut config = Config::default();
        let ctx = context(&runner, &mut config, dir.path());
        let opts = options(Target::RnTester, Platform::Ios, false);

        let err = run_with::<CircleCiClient>(&ctx, &opts, None).await.unwrap_err();
        assert!(matches!(err, crate::common::Error::CommandFailed { code: Some(5), .. }));
        assert_eq!(runner.calls().len(), 1);
    }
}
