//! Error types for the release e2e harness
//!
//! Messages are written for the person running the release checklist: they
//! name the CI entity involved and say what to do next.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === CI Resolution Errors ===
    #[error("{0}")]
    NotFound(String),

    #[error("The {name} workflow status is {status}. Please wait for it to finish before testing, or fix it")]
    WorkflowNotReady { name: String, status: String },

    #[error("Can't find a job with name '{0}'. Please verify that it has been executed and that all its dependencies completed successfully")]
    JobNotFound(String),

    #[error("The job {name} status is {status}. A 'success' status is needed to proceed with the testing")]
    JobNotReady { name: String, status: String },

    #[error("No artifact matching '{fragment}' in job '{job}'")]
    ArtifactNotFound { job: String, fragment: String },

    #[error("CI artifacts not resolved yet. Call initialize with a branch name first")]
    NotInitialized,

    #[error("CI artifacts already resolved for this resolver. Create a new one to query another branch")]
    AlreadyInitialized,

    // === Transport Errors ===
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Download failed: {0}")]
    Download(String),

    // === Process Errors ===
    #[error("Command '{command}' failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Tool '{0}' not found in PATH")]
    ToolNotFound(String),

    #[error("Can't run '{program}': working directory '{dir}' does not exist")]
    MissingWorkingDir { program: String, dir: String },

    // === Device Errors ===
    #[error("No Android emulator available. Create one with Android Studio's Device Manager first")]
    NoEmulator,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to extract archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl Error {
    /// Create a workflow-not-ready error
    pub fn workflow_not_ready(name: &str, status: &str) -> Self {
        Self::WorkflowNotReady {
            name: name.to_string(),
            status: status.to_string(),
        }
    }

    /// Create a job-not-ready error
    pub fn job_not_ready(name: &str, status: &str) -> Self {
        Self::JobNotReady {
            name: name.to_string(),
            status: status.to_string(),
        }
    }

    /// Create an artifact-not-found error
    pub fn artifact_not_found(job: &str, fragment: &str) -> Self {
        Self::ArtifactNotFound {
            job: job.to_string(),
            fragment: fragment.to_string(),
        }
    }

    /// Create a command failure from a rendered command line
    pub fn command_failed(command: &str, code: Option<i32>, stderr: &str) -> Self {
        Self::CommandFailed {
            command: command.to_string(),
            code,
            stderr: stderr.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_not_ready_names_workflow_and_status() {
        let msg = Error::workflow_not_ready("tests", "running").to_string();
        assert!(msg.contains("tests"));
        assert!(msg.contains("running"));
        assert!(msg.contains("wait"));
    }

    #[test]
    fn test_command_failed_trims_stderr() {
        let err = Error::command_failed("adb devices", Some(1), "  boom\n");
        assert_eq!(
            err.to_string(),
            "Command 'adb devices' failed with exit code Some(1): boom"
        );
    }
}
