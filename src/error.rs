//! Error taxonomy shared by every pipeline stage.
//!
//! Whether an error is fatal depends on where it surfaces: `Transport` and `Decode`
//! are recovered per entry during collection, while `EmptyResult` and `ArtifactIo`
//! end the run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Network or HTTP failure talking to the provider or the baseline host.
    #[error("transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// Content that could not be turned into text.
    #[error("decode error for {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("no files were retrieved from {root}")]
    EmptyResult { root: String },

    /// Local read/write failure on the staging area or output artifact.
    #[error("artifact I/O error at {}: {source}", .path.display())]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    pub fn transport(url: impl Into<String>, reason: impl ToString) -> Self {
        SyncError::Transport {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(path: impl Into<String>, reason: impl ToString) -> Self {
        SyncError::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn artifact_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::ArtifactIo {
            path: path.into(),
            source,
        }
    }

    /// Fatal errors end the run; the rest are recovered where they occur.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::EmptyResult { .. } | SyncError::ArtifactIo { .. }
        )
    }
}
