//! External process execution
//!
//! Every tool the harness drives (adb, emulator, lsof, yarn, gradle, pod,
//! ...) goes through [`CommandRunner`], so the orchestration can be printed
//! instead of executed and exercised in tests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use colored::Colorize;

use crate::common::{Error, Result};

/// A program invocation: program, arguments, working directory, environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn to_tokio(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd.envs(self.env.iter().map(|(k, v)| (k, v)));
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        if e.kind() != std::io::ErrorKind::NotFound {
            return Error::Spawn {
                program: self.program.clone(),
                source: e,
            };
        }
        // The OS reports a missing cwd the same way as a missing program
        match &self.cwd {
            Some(dir) if !dir.is_dir() => Error::MissingWorkingDir {
                program: self.program.clone(),
                dir: dir.display().to_string(),
            },
            _ => Error::ToolNotFound(self.program.clone()),
        }
    }
}

/// Renders as a copy-pasteable shell line, e.g. `USE_HERMES=1 bundle exec pod install`
impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, quote(value))?;
        }
        f.write_str(&quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@=+,%".contains(c))
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code; `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Process-execution facility
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion, capturing stdout and stderr
    async fn output(&self, cmd: &ShellCommand) -> Result<CommandOutput>;

    /// Run to completion with inherited stdio; a non-zero exit is an error
    async fn run(&self, cmd: &ShellCommand) -> Result<()>;

    /// Start in its own process group and return without waiting
    fn spawn_detached(&self, cmd: &ShellCommand) -> Result<()>;
}

/// Stdout of a command that has to succeed
pub async fn stdout_of(runner: &dyn CommandRunner, cmd: &ShellCommand) -> Result<String> {
    let output = runner.output(cmd).await?;
    if !output.success() {
        return Err(Error::command_failed(
            &cmd.to_string(),
            output.code,
            &output.stderr,
        ));
    }
    Ok(output.stdout)
}

/// Runs commands on the host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, cmd: &ShellCommand) -> Result<CommandOutput> {
        tracing::debug!(command = %cmd, "Running");
        let output = cmd
            .to_tokio()
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| cmd.spawn_error(e))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn run(&self, cmd: &ShellCommand) -> Result<()> {
        println!("  {} {}", "$".dimmed(), cmd.to_string().dimmed());
        let status = cmd
            .to_tokio()
            .status()
            .await
            .map_err(|e| cmd.spawn_error(e))?;

        if !status.success() {
            return Err(Error::command_failed(&cmd.to_string(), status.code(), ""));
        }
        Ok(())
    }

    fn spawn_detached(&self, cmd: &ShellCommand) -> Result<()> {
        tracing::debug!(command = %cmd, "Spawning detached");

        let mut command = std::process::Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .envs(cmd.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }

        // New process group so it outlives us and ignores our terminal's signals
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x00000008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x00000200;
            command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        command.spawn().map_err(|e| cmd.spawn_error(e))?;
        Ok(())
    }
}

/// Prints mutating commands instead of running them
///
/// Queries (`output`) still run so device and bundler checks reflect the
/// real machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

#[async_trait]
impl CommandRunner for DryRunRunner {
    async fn output(&self, cmd: &ShellCommand) -> Result<CommandOutput> {
        SystemRunner.output(cmd).await
    }

    async fn run(&self, cmd: &ShellCommand) -> Result<()> {
        print_dry_run(cmd);
        Ok(())
    }

    fn spawn_detached(&self, cmd: &ShellCommand) -> Result<()> {
        print_dry_run(cmd);
        Ok(())
    }
}

fn print_dry_run(cmd: &ShellCommand) {
    match cmd.get_current_dir() {
        Some(dir) => println!("  {} (cd {} && {})", "would run".yellow(), dir.display(), cmd),
        None => println!("  {} {}", "would run".yellow(), cmd),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted runner for unit tests

    use super::*;
    use std::sync::Mutex;

    type Hook = Box<dyn Fn() + Send + Sync>;

    /// Answers `output` from canned responses matched by command-line prefix
    /// and records every invocation
    #[derive(Default)]
    pub struct ScriptedRunner {
        responses: Vec<(String, CommandOutput)>,
        hooks: Vec<(String, Hook)>,
        pub calls: Mutex<Vec<String>>,
        pub spawned: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        pub fn respond(mut self, prefix: &str, stdout: &str) -> Self {
            self.responses.push((
                prefix.to_string(),
                CommandOutput {
                    code: Some(0),
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
            ));
            self
        }

        pub fn fail(mut self, prefix: &str, code: i32) -> Self {
            self.responses.push((
                prefix.to_string(),
                CommandOutput {
                    code: Some(code),
                    stdout: String::new(),
                    stderr: "failed".to_string(),
                },
            ));
            self
        }

        /// Side effect standing in for what a matching `run` would produce
        pub fn on_run(mut self, prefix: &str, hook: impl Fn() + Send + Sync + 'static) -> Self {
            self.hooks.push((prefix.to_string(), Box::new(hook)));
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn spawned(&self) -> Vec<String> {
            self.spawned.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn output(&self, cmd: &ShellCommand) -> Result<CommandOutput> {
            let line = cmd.to_string();
            self.calls.lock().unwrap().push(line.clone());
            Ok(self
                .responses
                .iter()
                .find(|(prefix, _)| line.starts_with(prefix.as_str()))
                .map(|(_, out)| out.clone())
                .unwrap_or_default())
        }

        async fn run(&self, cmd: &ShellCommand) -> Result<()> {
            let line = cmd.to_string();
            self.calls.lock().unwrap().push(line.clone());
            for (prefix, hook) in &self.hooks {
                if line.starts_with(prefix.as_str()) {
                    hook();
                }
            }
            match self
                .responses
                .iter()
                .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            {
                Some((_, out)) if !out.success() => {
                    Err(Error::command_failed(&line, out.code, &out.stderr))
                }
                _ => Ok(()),
            }
        }

        fn spawn_detached(&self, cmd: &ShellCommand) -> Result<()> {
            self.spawned.lock().unwrap().push(cmd.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_quotes_only_when_needed() {
        let cmd = ShellCommand::new("adb")
            .args(["shell", "am", "start", "-n", "com.facebook.react.uiapp/.RNTesterActivity"])
            .env("USE_HERMES", "1");
        assert_eq!(
            cmd.to_string(),
            "USE_HERMES=1 adb shell am start -n com.facebook.react.uiapp/.RNTesterActivity"
        );

        let cmd = ShellCommand::new("echo").arg("it's here").arg("");
        assert_eq!(cmd.to_string(), r"echo 'it'\''s here' ''");
    }

    #[test]
    fn test_last_env_wins() {
        let cmd = ShellCommand::new("pod").env("USE_HERMES", "0").env("USE_HERMES", "1");
        assert_eq!(cmd.get_env("USE_HERMES"), Some("1"));
        assert_eq!(cmd.get_env("MISSING"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_stdout_and_code() {
        let out = SystemRunner
            .output(&ShellCommand::new("sh").args(["-c", "echo hello; exit 3"]))
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.code, Some(3));
        assert!(!out.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_of_fails_on_nonzero_exit() {
        let err = stdout_of(&SystemRunner, &ShellCommand::new("sh").args(["-c", "echo oops >&2; exit 2"]))
            .await
            .unwrap_err();
        match err {
            Error::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(2));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_tool_not_found() {
        let err = SystemRunner
            .output(&ShellCommand::new("definitely-not-a-real-tool-xyz"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(ref p) if p == "definitely-not-a-real-tool-xyz"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_cwd_is_not_reported_as_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-created-yet");

        let err = SystemRunner
            .output(&ShellCommand::new("sh").args(["-c", "true"]).current_dir(&missing))
            .await
            .unwrap_err();
        match err {
            Error::MissingWorkingDir { program, dir } => {
                assert_eq!(program, "sh");
                assert_eq!(dir, missing.display().to_string());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dry_run_prints_instead_of_running() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let touch = ShellCommand::new("touch").arg(marker.to_string_lossy());

        DryRunRunner.run(&touch).await.unwrap();
        DryRunRunner.spawn_detached(&touch).unwrap();
        assert!(!marker.exists());

        // Queries still hit the machine
        let out = DryRunRunner
            .output(&ShellCommand::new("sh").args(["-c", "echo live"]))
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "live");
    }
}
