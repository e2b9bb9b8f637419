//! High-level pipeline: orchestrates collect → merge → compare for one documentation tree.
//!
//! The run is a small state machine:
//!
//! `Init → Staging → Merging → Comparing → {Publish, NoChange, Failed}`
//!
//! - `Init` prepares a clean staging directory.
//! - `Staging` walks the remote tree; an empty result is fatal, so an empty artifact is
//!   never produced.
//! - `Merging` writes the artifact and strips its leading newlines.
//! - `Comparing` decides between `Publish` and `NoChange`.
//!
//! Any error out of a stage ends the run in `Failed`. The staging directory is a
//! [`StagingArea`] and is removed exactly once whichever terminal state is reached.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Supporting types: [`SynchroniseConfig`], [`SyncReport`], [`Outcome`].

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::collect::{Collector, ExtensionFilter};
use crate::contract::{BaselineSource, ContentProvider};
use crate::detect::{detect, ChangeStatus};
use crate::error::SyncError;
use crate::merge::{merge, strip_leading_newlines};

/// Everything the pipeline needs apart from its remote collaborators.
#[derive(Debug, Clone)]
pub struct SynchroniseConfig {
    /// Remote directory to collect, relative to the repository root.
    pub root_path: String,
    pub artifact_path: PathBuf,
    /// Staging directory; a unique directory under the OS temp dir when unset.
    pub staging_dir: Option<PathBuf>,
    pub filter: ExtensionFilter,
}

impl SynchroniseConfig {
    fn staging_path(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(|| {
            std::env::temp_dir().join(format!("docs-bucket-staging-{}", Uuid::new_v4()))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Staging,
    Merging,
    Comparing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "INIT",
            Stage::Staging => "STAGING",
            Stage::Merging => "MERGING",
            Stage::Comparing => "COMPARING",
        };
        f.write_str(name)
    }
}

/// Successful terminal states. `Failed` is the `Err` side of [`synchronise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    /// The artifact differs from the baseline, or the baseline could not be checked
    /// (`verified == false`).
    Publish { verified: bool },
    NoChange,
}

impl From<ChangeStatus> for Outcome {
    fn from(status: ChangeStatus) -> Self {
        match status {
            ChangeStatus::Unchanged => Outcome::NoChange,
            ChangeStatus::Changed => Outcome::Publish { verified: true },
            ChangeStatus::Unverified => Outcome::Publish { verified: false },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub outcome: Outcome,
    pub staged_files: Vec<String>,
    pub merged_files: usize,
    pub artifact_path: PathBuf,
    pub artifact_bytes: usize,
    pub artifact_sha256: String,
}

impl SyncReport {
    pub fn write_json(&self, path: &Path) -> Result<(), SyncError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            SyncError::artifact_io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        fs::write(path, json).map_err(|e| SyncError::artifact_io(path, e))?;
        info!(path = %path.display(), "[SYNC] Wrote sync report");
        Ok(())
    }
}

/// Local working directory for one run, removed when released or dropped.
#[derive(Debug)]
pub struct StagingArea {
    path: PathBuf,
    released: bool,
}

impl StagingArea {
    /// Create the directory, clearing whatever a previous run may have left there.
    pub fn create(path: PathBuf) -> Result<Self, SyncError> {
        if path.exists() {
            fs::remove_dir_all(&path).map_err(|e| SyncError::artifact_io(&path, e))?;
            debug!(path = %path.display(), "Removed stale staging directory");
        }
        fs::create_dir_all(&path).map_err(|e| SyncError::artifact_io(&path, e))?;
        info!(path = %path.display(), "[SYNC] Created staging directory");
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match fs::remove_dir_all(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "[SYNC] Removed staging directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "[SYNC] Failed to remove staging directory")
            }
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        self.remove();
    }
}

fn enter(stage: &mut Stage, next: Stage) {
    debug!(from = %stage, to = %next, "[SYNC] Stage transition");
    *stage = next;
    info!(stage = %next, "[SYNC] Entering stage");
}

pub async fn synchronise<P, B>(
    config: &SynchroniseConfig,
    provider: &P,
    baseline: &B,
) -> Result<SyncReport, SyncError>
where
    P: ContentProvider + ?Sized,
    B: BaselineSource + ?Sized,
{
    info!(root = %config.root_path, artifact = %config.artifact_path.display(), "[SYNC] Starting documentation synchronisation");

    let mut stage = Stage::Init;
    let result = match StagingArea::create(config.staging_path()) {
        Ok(staging) => {
            let result = run_stages(config, provider, baseline, &staging, &mut stage).await;
            staging.release();
            result
        }
        Err(e) => Err(e),
    };

    match &result {
        Ok(report) => info!(outcome = ?report.outcome, "[SYNC] Synchronisation finished"),
        Err(e) => error!(stage = %stage, error = %e, "[SYNC][ERROR] Synchronisation FAILED"),
    }
    result
}

async fn run_stages<P, B>(
    config: &SynchroniseConfig,
    provider: &P,
    baseline: &B,
    staging: &StagingArea,
    stage: &mut Stage,
) -> Result<SyncReport, SyncError>
where
    P: ContentProvider + ?Sized,
    B: BaselineSource + ?Sized,
{
    enter(stage, Stage::Staging);
    let collector = Collector::new(config.filter.clone());
    let staged = collector
        .collect(provider, &config.root_path, staging.path())
        .await;
    if staged.is_empty() {
        return Err(SyncError::EmptyResult {
            root: config.root_path.clone(),
        });
    }

    enter(stage, Stage::Merging);
    let merged_files = merge(staging.path(), &config.artifact_path)?;
    strip_leading_newlines(&config.artifact_path)?;
    let artifact = fs::read(&config.artifact_path)
        .map_err(|e| SyncError::artifact_io(&config.artifact_path, e))?;

    enter(stage, Stage::Comparing);
    let outcome = Outcome::from(detect(&config.artifact_path, baseline).await);

    Ok(SyncReport {
        outcome,
        staged_files: staged.into_iter().map(|f| f.relative_path).collect(),
        merged_files,
        artifact_path: config.artifact_path.clone(),
        artifact_bytes: artifact.len(),
        artifact_sha256: format!("{:x}", Sha256::digest(&artifact)),
    })
}
