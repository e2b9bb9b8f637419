//! # contract: interfaces between the pipeline and its remote collaborators
//!
//! The collector only ever talks to a [`ContentProvider`], and the change detector only
//! ever talks to a [`BaselineSource`]. Production code plugs in the reqwest-backed
//! clients from [`crate::provider`] and [`crate::detect`]; tests plug in the
//! `mockall`-generated `MockContentProvider` / `MockBaselineSource`.
//!
//! Every call is a single request with no retries. Implementors map all transport
//! problems (timeouts, non-2xx statuses, malformed payloads) to
//! [`SyncError::Transport`].

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::SyncError;

/// Kind of a node in the remote tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    #[serde(rename = "dir")]
    Directory,
    /// Symlinks and submodules; never traversed or staged.
    #[serde(other)]
    Other,
}

/// One node of the remote tree as returned by a listing call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteEntry {
    /// Path relative to the repository root, `/` separated.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Direct raw-content locator, when the provider exposes one.
    #[serde(default)]
    pub download_url: Option<String>,
    /// Locator of the structured metadata document for this entry.
    #[serde(default, rename = "url")]
    pub api_url: Option<String>,
}

impl RemoteEntry {
    pub fn file(path: &str, download_url: Option<&str>, api_url: Option<&str>) -> Self {
        Self {
            path: path.to_string(),
            kind: EntryKind::File,
            download_url: download_url.map(str::to_string),
            api_url: api_url.map(str::to_string),
        }
    }

    pub fn directory(path: &str) -> Self {
        Self {
            path: path.to_string(),
            kind: EntryKind::Directory,
            download_url: None,
            api_url: None,
        }
    }
}

/// Structured metadata for a single file; `content` may be base64 encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileMetadata {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// A file written into the staging area by the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Path relative to the collection root, `/` separated.
    pub relative_path: String,
    pub local_path: PathBuf,
}

/// Read access to a remote repository tree.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// List the entries directly under `path`, in provider order.
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, SyncError>;

    /// Fetch raw text from a direct content locator.
    async fn fetch_raw(&self, url: &str) -> Result<String, SyncError>;

    /// Fetch the structured metadata document of a file.
    async fn fetch_metadata(&self, url: &str) -> Result<FileMetadata, SyncError>;
}

/// Source of the previously published artifact.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BaselineSource: Send + Sync {
    /// Fetch the baseline exactly as published, without any charset handling.
    async fn fetch(&self) -> Result<Vec<u8>, SyncError>;
}
