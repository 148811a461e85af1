//! Publishing report files to a remote source-control repository.
//!
//! The [`RepoStore`] trait hides the contents API behind a lookup/create/
//! update seam: a file the lookup cannot find is created, a found file is
//! updated with the revision reference the lookup returned.

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::GitHubSettings;

/// Boxed error type shared by all repository calls.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// The revision reference a lookup returns for an existing file.
#[derive(Debug, Clone)]
pub struct FileRevision {
    pub path: String,
    pub sha: String,
}

/// Create-or-update access to files in a remote repository.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait RepoStore: Send + Sync {
    /// Current revision of the file at `path`, or `None` when it does not exist.
    async fn lookup(&self, path: &str) -> Result<Option<FileRevision>, StoreError>;

    /// Creates a new file.
    async fn create(&self, path: &str, message: &str, content: &str) -> Result<(), StoreError>;

    /// Updates an existing file, passing the prior revision reference.
    async fn update(
        &self,
        path: &str,
        message: &str,
        content: &str,
        sha: &str,
    ) -> Result<(), StoreError>;
}

/// Creates or updates one file depending on whether the lookup finds it.
/// Returns `true` when the file existed and was updated.
pub async fn publish_file<S>(
    store: &S,
    path: &str,
    message: &str,
    content: &str,
) -> Result<bool, StoreError>
where
    S: RepoStore + ?Sized,
{
    match store.lookup(path).await? {
        Some(revision) => {
            debug!(path, sha = %revision.sha, "[PUBLISH] File exists, updating");
            store.update(path, message, content, &revision.sha).await?;
            Ok(true)
        }
        None => {
            debug!(path, "[PUBLISH] File not found, creating");
            store.create(path, message, content).await?;
            Ok(false)
        }
    }
}

/// Publishes every file in `paths` under its file name, with one shared
/// commit message. Returns the number of files pushed.
pub async fn publish_dir<S>(
    store: &S,
    paths: &[PathBuf],
    message: &str,
) -> Result<usize, StoreError>
where
    S: RepoStore + ?Sized,
{
    let mut published = 0;
    for path in paths {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| format!("path {} has no file name", path.display()))?;
        let content = fs::read_to_string(path)?;
        let updated = publish_file(store, file_name, message, &content).await?;
        info!(file = file_name, updated, "[PUBLISH] Pushed file from disk");
        published += 1;
    }
    Ok(published)
}

#[derive(Deserialize)]
struct ContentsResponse {
    path: String,
    sha: String,
}

/// [`RepoStore`] over the GitHub contents API.
pub struct GitHubStore {
    http: reqwest::Client,
    api_base: String,
    owner: String,
    repository: String,
    branch: String,
    token: String,
}

impl GitHubStore {
    pub fn new(settings: &GitHubSettings) -> Result<Self, StoreError> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            api_base: "https://api.github.com".to_string(),
            owner: settings.owner.clone(),
            repository: settings.repository.clone(),
            branch: settings.branch.clone(),
            token: settings.token.clone(),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{path}",
            self.api_base, self.owner, self.repository
        )
    }

    async fn put_contents(
        &self,
        path: &str,
        message: &str,
        content: &str,
        sha: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut body = serde_json::json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": self.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::Value::String(sha.to_string());
        }
        self.http
            .put(self.contents_url(path))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "catalyst-ops")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        info!(path, updating = sha.is_some(), "[PUBLISH] Pushed file");
        Ok(())
    }
}

#[async_trait]
impl RepoStore for GitHubStore {
    async fn lookup(&self, path: &str) -> Result<Option<FileRevision>, StoreError> {
        let response = self
            .http
            .get(self.contents_url(path))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "catalyst-ops")
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let contents: ContentsResponse = response.error_for_status()?.json().await?;
        Ok(Some(FileRevision {
            path: contents.path,
            sha: contents.sha,
        }))
    }

    async fn create(&self, path: &str, message: &str, content: &str) -> Result<(), StoreError> {
        self.put_contents(path, message, content, None).await
    }

    async fn update(
        &self,
        path: &str,
        message: &str,
        content: &str,
        sha: &str,
    ) -> Result<(), StoreError> {
        self.put_contents(path, message, content, Some(sha)).await
    }
}
