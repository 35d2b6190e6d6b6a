//! HTTP access to the CircleCI v2 REST API
//!
//! [`CiTransport`] is the seam the resolver talks through; [`CircleCiClient`]
//! is the reqwest implementation used outside of tests.

use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;

use crate::common::{Error, Result};

/// Header CircleCI reads the personal API token from
pub const TOKEN_HEADER: &str = "Circle-Token";

const USER_AGENT: &str = concat!("release-e2e/", env!("CARGO_PKG_VERSION"));

/// Minimal request surface the resolver needs from the CI provider
#[async_trait]
pub trait CiTransport: Send + Sync {
    /// GET `path` (relative to the API base, starting with `/`) with query
    /// parameters, returning the decoded JSON body
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value>;

    /// Fetch an absolute `url` into the file at `dest`
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Authenticated CircleCI client
pub struct CircleCiClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl CircleCiClient {
    /// Create a client for `api_base` (e.g. `https://circleci.com/api/v2`)
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

#[async_trait]
impl CiTransport for CircleCiClient {
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value> {
        let url = self.url(path);
        tracing::debug!(%url, ?query, "GET");

        let response = self
            .http
            .get(&url)
            .query(query)
            .header(TOKEN_HEADER, &self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        download_file(&self.http, url, dest).await
    }
}

/// Download a file with progress reporting
///
/// Nothing is written until the server has answered with a success status. A
/// transfer that breaks off midway removes the partial file before returning
/// the error.
pub async fn download_file(http: &reqwest::Client, url: &str, dest: &Path) -> Result<()> {
    let response = http.get(url).send().await?;

    if !response.status().is_success() {
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let total_size = response.content_length().unwrap_or(0);
    let pb = if total_size > 0 {
        let pb = ProgressBar::new(total_size);
        if let Ok(style) =
            ProgressStyle::default_bar().template("  [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    } else {
        ProgressBar::new_spinner()
    };

    let result = write_body(response, dest, &pb).await;
    pb.finish_and_clear();

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(dest).await;
        return Err(e);
    }

    tracing::debug!(%url, dest = %dest.display(), "Downloaded");
    Ok(())
}

async fn write_body(response: reqwest::Response, dest: &Path, pb: &ProgressBar) -> Result<()> {
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| Error::Download(format!("Failed to create {}: {}", dest.display(), e)))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.flush().await?;
    Ok(())
}
