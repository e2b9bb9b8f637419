//! Change detector: compares the fresh artifact with the last published one.
//!
//! Equality is exact, byte for byte. When equality cannot be established (baseline
//! unreachable, local artifact unreadable) the artifact counts as changed, but the
//! status says so via [`ChangeStatus::Unverified`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::contract::BaselineSource;
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Unchanged,
    Changed,
    /// Comparison was impossible; treated as changed.
    Unverified,
}

impl ChangeStatus {
    pub fn has_changed(self) -> bool {
        self != ChangeStatus::Unchanged
    }
}

/// Baseline fetched with a plain HTTP `GET`.
pub struct HttpBaseline {
    client: Client,
    url: String,
}

impl HttpBaseline {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let url = url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::transport(&url, e))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl BaselineSource for HttpBaseline {
    async fn fetch(&self) -> Result<Vec<u8>, SyncError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SyncError::transport(&self.url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::transport(
                &self.url,
                format!("HTTP status {status}"),
            ));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| SyncError::transport(&self.url, e))?;
        Ok(body.to_vec())
    }
}

pub async fn detect<B>(local_artifact: &Path, baseline: &B) -> ChangeStatus
where
    B: BaselineSource + ?Sized,
{
    let remote = match baseline.fetch().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "[DETECT] Baseline fetch failed, assuming changed");
            return ChangeStatus::Unverified;
        }
    };
    let local = match std::fs::read(local_artifact) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %local_artifact.display(), error = %e, "[DETECT] Local artifact unreadable, assuming changed");
            return ChangeStatus::Unverified;
        }
    };

    let status = if local == remote {
        ChangeStatus::Unchanged
    } else {
        ChangeStatus::Changed
    };
    info!(
        ?status,
        local_bytes = local.len(),
        baseline_bytes = remote.len(),
        "[DETECT] Compared artifact with baseline"
    );
    status
}

/// `true` unless the local artifact and the baseline are byte-identical.
pub async fn has_changed<B>(local_artifact: &Path, baseline: &B) -> bool
where
    B: BaselineSource + ?Sized,
{
    detect(local_artifact, baseline).await.has_changed()
}
