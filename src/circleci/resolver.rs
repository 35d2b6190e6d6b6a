//! Branch → artifact URL resolution
//!
//! [`ArtifactResolver::initialize`] walks pipeline → workflows → jobs once for
//! a branch; afterwards artifact lookups only hit the per-job artifacts
//! endpoint.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use super::client::{CiTransport, CircleCiClient};
use super::types::{Artifact, ItemsPage, Job, Pipeline, Workflow, STATUS_SUCCESS};
use crate::common::config::CircleCiConfig;
use crate::common::{Error, Result};

/// Job building the debug Hermes tarball for iOS
pub const HERMES_DEBUG_JOB: &str = "build_hermes_macos-Debug";
/// Job packaging the npm tarball and the Maven local repository
pub const NPM_PACKAGE_JOB: &str = "build_npm_package";
/// Job building the RNTester APKs
pub const TEST_ANDROID_JOB: &str = "test_android";

/// JS engine an app is built against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsEngine {
    Hermes,
    Jsc,
}

impl JsEngine {
    pub fn from_hermes_flag(hermes: bool) -> Self {
        if hermes {
            JsEngine::Hermes
        } else {
            JsEngine::Jsc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsEngine::Hermes => "hermes",
            JsEngine::Jsc => "jsc",
        }
    }
}

impl fmt::Display for JsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact path of the RNTester release APK for an engine and CPU ABI
pub fn rntester_apk_path(engine: JsEngine, arch: &str) -> String {
    format!("rntester-apk/{engine}/release/app-{engine}-{arch}-release.apk")
}

/// Resolves CI build artifacts for the newest pipeline of a branch
pub struct ArtifactResolver<T = CircleCiClient> {
    transport: T,
    project_slug: String,
    release_workflow: String,
    tests_workflow: String,
    tmp_dir: PathBuf,
    pipeline: Option<Pipeline>,
    /// Jobs of both significant workflows, keyed by name. `None` until
    /// `initialize` succeeds.
    jobs: Option<HashMap<String, Job>>,
}

impl ArtifactResolver<CircleCiClient> {
    /// Build a resolver talking to CircleCI with `token`
    pub fn with_token(
        token: &str,
        tmp_dir: impl Into<PathBuf>,
        config: &CircleCiConfig,
    ) -> Result<Self> {
        let client = CircleCiClient::new(config.api_base.as_str(), token)?;
        Self::new(client, config, tmp_dir)
    }
}

impl<T: CiTransport> ArtifactResolver<T> {
    /// Create a resolver, making sure the staging directory exists
    pub fn new(transport: T, config: &CircleCiConfig, tmp_dir: impl Into<PathBuf>) -> Result<Self> {
        let tmp_dir = tmp_dir.into();
        std::fs::create_dir_all(&tmp_dir)?;

        Ok(Self {
            transport,
            project_slug: format!("gh/{}/{}", config.org, config.repo),
            release_workflow: config.release_workflow.clone(),
            tests_workflow: config.tests_workflow.clone(),
            tmp_dir,
            pipeline: None,
            jobs: None,
        })
    }

    /// Staging directory for downloads
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Path inside the staging directory
    pub fn tmp_path(&self, file_name: &str) -> PathBuf {
        self.tmp_dir.join(file_name)
    }

    /// Pipeline selected by `initialize`
    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    /// Transport the resolver issues its requests through
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Locate the newest pipeline for `branch`, check that both significant
    /// workflows succeeded and collect their jobs
    pub async fn initialize(&mut self, branch: &str) -> Result<()> {
        if self.jobs.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        tracing::info!(branch, "Getting CircleCI information");

        let pipeline = self.last_pipeline(branch).await?;
        tracing::info!(id = %pipeline.id, number = pipeline.number, "Using pipeline");

        let workflows: Vec<Workflow> = self
            .list(&format!("/pipeline/{}/workflow", pipeline.id), &[])
            .await?;
        let release = find_successful_workflow(&workflows, &self.release_workflow)?;
        let tests = find_successful_workflow(&workflows, &self.tests_workflow)?;

        let release_path = format!("/workflow/{}/job", release.id);
        let tests_path = format!("/workflow/{}/job", tests.id);
        let (release_jobs, tests_jobs) = tokio::try_join!(
            self.list::<Job>(&release_path, &[]),
            self.list::<Job>(&tests_path, &[]),
        )?;

        let mut jobs = HashMap::with_capacity(release_jobs.len() + tests_jobs.len());
        for job in release_jobs.into_iter().chain(tests_jobs) {
            jobs.entry(job.name.clone()).or_insert(job);
        }
        tracing::debug!(count = jobs.len(), "Collected jobs");

        self.pipeline = Some(pipeline);
        self.jobs = Some(jobs);
        Ok(())
    }

    /// URL of the first artifact of `job_name` whose path contains `fragment`
    ///
    /// The artifact list is fetched on every call.
    pub async fn find_artifact_url(&self, job_name: &str, fragment: &str) -> Result<String> {
        let jobs = self.jobs.as_ref().ok_or(Error::NotInitialized)?;
        let job = jobs
            .get(job_name)
            .ok_or_else(|| Error::JobNotFound(job_name.to_string()))?;

        if let Some(status) = job.status.as_deref() {
            if status != STATUS_SUCCESS {
                return Err(Error::job_not_ready(job_name, status));
            }
        }

        let job_number = job.job_number.ok_or_else(|| {
            Error::NotFound(format!("Job '{}' has no job number; it never ran", job_name))
        })?;

        let artifacts: Vec<Artifact> = self
            .list(
                &format!("/project/{}/{}/artifacts", self.project_slug, job_number),
                &[],
            )
            .await?;

        artifacts
            .into_iter()
            .find(|artifact| artifact.path.contains(fragment))
            .map(|artifact| artifact.url)
            .ok_or_else(|| Error::artifact_not_found(job_name, fragment))
    }

    /// Debug Hermes engine tarball for iOS
    pub async fn artifact_url_hermes_debug(&self) -> Result<String> {
        self.find_artifact_url(HERMES_DEBUG_JOB, "hermes-ios-debug.tar.gz")
            .await
    }

    /// npm tarball of the framework package
    pub async fn artifact_url_react_native_package(&self) -> Result<String> {
        self.find_artifact_url(NPM_PACKAGE_JOB, "react-native-1000.0.0-")
            .await
    }

    /// Zipped Maven local repository with the Android native modules
    pub async fn artifact_url_maven_local(&self) -> Result<String> {
        self.find_artifact_url(NPM_PACKAGE_JOB, "maven-local.zip")
            .await
    }

    /// RNTester APK for `engine` and the device CPU ABI `arch`
    ///
    /// `arch` comes from the connected device (see
    /// [`crate::device::android_cpu_arch`]).
    pub async fn artifact_url_rntester_apk(&self, engine: JsEngine, arch: &str) -> Result<String> {
        self.find_artifact_url(TEST_ANDROID_JOB, &rntester_apk_path(engine, arch))
            .await
    }

    /// Replace whatever is at `dest` with the content of `url`
    pub async fn download_artifact(&self, url: &str, dest: &Path) -> Result<()> {
        remove_path(dest)?;
        tracing::info!(%url, dest = %dest.display(), "Downloading artifact");
        self.transport.download(url, dest).await
    }

    async fn last_pipeline(&self, branch: &str) -> Result<Pipeline> {
        let path = format!("/project/{}/pipeline", self.project_slug);
        let pipelines: Vec<Pipeline> = self.list(&path, &[("branch", branch)]).await?;

        pipelines.into_iter().next().ok_or_else(|| {
            Error::NotFound(format!(
                "No pipelines found on branch '{}'. Make sure that CI has run at least once",
                branch
            ))
        })
    }

    async fn list<I: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<I>> {
        let body = self.transport.get_json(path, query).await?;
        let page: ItemsPage<I> = serde_json::from_value(body)?;
        if page.next_page_token.is_some() {
            tracing::debug!(path, "More result pages available, using the first one");
        }
        Ok(page.items)
    }
}

fn find_successful_workflow<'a>(workflows: &'a [Workflow], name: &str) -> Result<&'a Workflow> {
    let workflow = workflows
        .iter()
        .find(|w| w.name == name)
        .ok_or_else(|| Error::NotFound(format!("Workflow '{}' not found in pipeline", name)))?;

    if !workflow.is_successful() {
        return Err(Error::workflow_not_ready(&workflow.name, &workflow.status));
    }
    Ok(workflow)
}

/// Remove a file, symlink or directory tree; a missing path is fine
fn remove_path(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path)?,
        Ok(_) => std::fs::remove_file(path)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
