//! On-disk configuration schema and its mapping onto pipeline types.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::collect::ExtensionFilter;
use crate::provider::{GithubSource, DEFAULT_API_BASE};
use crate::synchronise::SynchroniseConfig;

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceSection,
    pub output: OutputSection,
    pub baseline: BaselineSection,
    /// Per-request timeout for every network call.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Overrides the default extension allowlist.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    pub owner: String,
    pub repo: String,
    /// Branch, tag, or commit.
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub root_path: String,
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    pub artifact: PathBuf,
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    /// Where to write the JSON run report, if anywhere.
    #[serde(default)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaselineSection {
    pub url: String,
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(
            owner = %self.source.owner,
            repo = %self.source.repo,
            reference = self.source.reference.as_deref().unwrap_or("main"),
            root_path = %self.source.root_path,
            artifact = %self.output.artifact.display(),
            baseline = %self.baseline.url,
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn github_source(&self) -> GithubSource {
        GithubSource {
            api_base: self
                .source
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            owner: self.source.owner.clone(),
            repo: self.source.repo.clone(),
            reference: self
                .source
                .reference
                .clone()
                .unwrap_or_else(|| "main".to_string()),
        }
    }

    pub fn synchronise_config(&self) -> SynchroniseConfig {
        let filter = match &self.extensions {
            Some(extensions) => ExtensionFilter::new(extensions),
            None => ExtensionFilter::default(),
        };
        SynchroniseConfig {
            root_path: self.source.root_path.clone(),
            artifact_path: self.output.artifact.clone(),
            staging_dir: self.output.staging_dir.clone(),
            filter,
        }
    }
}
