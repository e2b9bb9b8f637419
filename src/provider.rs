//! reqwest-backed [`ContentProvider`] for the GitHub REST contents API.
//!
//! Listing: `GET {api_base}/repos/{owner}/{repo}/contents/{path}?ref={reference}`.
//! File metadata: the entry's own `url`, which returns `{content, encoding}`.
//! Raw content: the entry's `download_url`.
//!
//! An optional token is forwarded as `Authorization: Bearer <token>`; without one the
//! client talks to the API anonymously.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, info};

use crate::contract::{ContentProvider, FileMetadata, RemoteEntry};
use crate::error::SyncError;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Repository coordinates for a [`GithubClient`].
#[derive(Debug, Clone)]
pub struct GithubSource {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub reference: String,
}

pub struct GithubClient {
    client: Client,
    source: GithubSource,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(
        source: GithubSource,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("docs-bucket/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::transport(&source.api_base, e))?;
        info!(
            owner = %source.owner,
            repo = %source.repo,
            reference = %source.reference,
            token_set = token.is_some(),
            "Initialised GitHub content provider"
        );
        Ok(Self {
            client,
            source,
            token,
        })
    }

    /// Listing URL for a path relative to the repository root.
    pub fn contents_url(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.source.api_base.trim_end_matches('/'),
            self.source.owner,
            self.source.repo,
            path,
            self.source.reference
        )
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn send(&self, url: &str) -> Result<Response, SyncError> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::transport(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::transport(url, format!("HTTP status {status}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl ContentProvider for GithubClient {
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, SyncError> {
        let url = self.contents_url(path);
        debug!(url = %url, "Listing remote directory");
        let entries: Vec<RemoteEntry> = self
            .send(&url)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::transport(&url, format!("malformed listing: {e}")))?;
        debug!(url = %url, entries = entries.len(), "Listed remote directory");
        Ok(entries)
    }

    async fn fetch_raw(&self, url: &str) -> Result<String, SyncError> {
        self.send(url)
            .await?
            .text()
            .await
            .map_err(|e| SyncError::transport(url, e))
    }

    async fn fetch_metadata(&self, url: &str) -> Result<FileMetadata, SyncError> {
        self.send(url)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::transport(url, format!("malformed metadata: {e}")))
    }
}
