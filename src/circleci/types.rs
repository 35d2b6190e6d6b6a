//! CircleCI v2 API response types
//!
//! Only the fields the resolver reads are modelled; everything else in the
//! payloads is ignored by serde.

use serde::Deserialize;

/// Status string CircleCI reports for a finished, green workflow or job
pub const STATUS_SUCCESS: &str = "success";

/// Envelope shared by every list endpoint
///
/// `next_page_token` is captured but never followed: every list the resolver
/// reads fits in the first page.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemsPage<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// One CI run for a branch
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub number: u64,
}

/// A named group of jobs within a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub status: String,
}

impl Workflow {
    pub fn is_successful(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// A single executed unit within a workflow
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Job {
    pub name: String,
    /// Absent for jobs that never started (blocked or approval jobs)
    #[serde(default)]
    pub job_number: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// An output file produced by a job
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub url: String,
}
