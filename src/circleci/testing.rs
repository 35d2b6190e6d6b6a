//! In-memory CircleCI for unit tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::client::CiTransport;
use crate::common::{Error, Result};

/// Path of the pipeline list for the default project
pub const PIPELINES: &str = "/project/gh/facebook/react-native/pipeline";

/// Canned responses keyed by request path; every GET and download recorded
#[derive(Default)]
pub struct StubTransport {
    routes: HashMap<String, Value>,
    files: HashMap<String, Vec<u8>>,
    pub calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    pub downloads: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn route(mut self, path: &str, body: Value) -> Self {
        self.routes.insert(path.to_string(), body);
        self
    }

    /// Bytes served for `url`; other URLs download as `content of <url>`
    pub fn file(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(url.to_string(), bytes);
        self
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl CiTransport for StubTransport {
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        self.calls.lock().unwrap().push((
            path.to_string(),
            query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        ));
        self.routes.get(path).cloned().ok_or_else(|| Error::HttpStatus {
            url: path.to_string(),
            status: 404,
        })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        self.downloads.lock().unwrap().push(url.to_string());
        match self.files.get(url) {
            Some(bytes) => std::fs::write(dest, bytes)?,
            None => std::fs::write(dest, format!("content of {url}"))?,
        }
        Ok(())
    }
}

pub fn workflows(release_status: &str, tests_status: &str) -> Value {
    json!({"items": [
        {"id": "w1", "name": "package_and_publish_release_dryrun", "status": release_status},
        {"id": "w2", "name": "tests", "status": tests_status},
    ]})
}

/// Pipeline p1 with both workflows green and one job per artifact family
pub fn healthy_ci() -> StubTransport {
    StubTransport::default()
        .route(PIPELINES, json!({"items": [{"id": "p1", "number": 42}]}))
        .route("/pipeline/p1/workflow", workflows("success", "success"))
        .route(
            "/workflow/w1/job",
            json!({"items": [
                {"name": "build_hermes_macos-Debug", "job_number": 7},
                {"name": "build_npm_package", "job_number": 8, "status": "success"},
            ]}),
        )
        .route(
            "/workflow/w2/job",
            json!({"items": [{"name": "test_android", "job_number": 9}]}),
        )
}
