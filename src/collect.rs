//! Tree collector: depth-first walk of the remote tree into a local staging area.
//!
//! Failures are contained to the branch they happen in. A listing that fails drops
//! that subtree, a file that cannot be retrieved or written is skipped, and the walk
//! carries on. The caller always gets back whatever was staged, possibly nothing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::contract::{ContentProvider, EntryKind, FileMetadata, RemoteEntry, StagedFile};
use crate::error::SyncError;

/// Documentation-like extensions staged by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".md", ".mdx", ".markdown", ".txt", ".rst", ".py"];

/// Case-insensitive suffix allowlist.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    suffixes: Vec<String>,
}

impl ExtensionFilter {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let lowered = path.to_lowercase();
        self.suffixes.iter().any(|s| lowered.ends_with(s.as_str()))
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

pub struct Collector {
    filter: ExtensionFilter,
}

impl Collector {
    pub fn new(filter: ExtensionFilter) -> Self {
        Self { filter }
    }

    /// Walk `root_path` and stage every qualifying file under `destination`.
    ///
    /// Each listing is visited files first, then directories, both by path, so the
    /// returned order matches the order [`crate::merge::merge`] concatenates in.
    pub async fn collect<P>(
        &self,
        provider: &P,
        root_path: &str,
        destination: &Path,
    ) -> Vec<StagedFile>
    where
        P: ContentProvider + ?Sized,
    {
        let root = root_path.trim_matches('/');
        info!(root = %root, destination = %destination.display(), "[COLLECT] Starting remote tree walk");

        let mut staged = Vec::new();
        let mut stack = Vec::new();
        if let Some(entries) = self.list(provider, root).await {
            stack.push(entries.into_iter());
        }

        while let Some(level) = stack.last_mut() {
            let Some(entry) = level.next() else {
                stack.pop();
                continue;
            };
            match entry.kind {
                EntryKind::Directory => {
                    if let Some(children) = self.list(provider, &entry.path).await {
                        stack.push(children.into_iter());
                    }
                }
                EntryKind::File => {
                    if !self.filter.matches(&entry.path) {
                        debug!(path = %entry.path, "[COLLECT] Skipping file outside extension allowlist");
                        continue;
                    }
                    if let Some(file) = self.stage(provider, root, &entry, destination).await {
                        staged.push(file);
                    }
                }
                EntryKind::Other => {
                    debug!(path = %entry.path, "[COLLECT] Skipping non-file entry");
                }
            }
        }

        info!(root = %root, staged = staged.len(), "[COLLECT] Remote tree walk finished");
        staged
    }

    async fn list<P>(&self, provider: &P, path: &str) -> Option<Vec<RemoteEntry>>
    where
        P: ContentProvider + ?Sized,
    {
        match provider.list(path).await {
            Ok(mut entries) => {
                entries.sort_by(listing_order);
                Some(entries)
            }
            Err(e) => {
                warn!(path = %path, error = %e, "[COLLECT] Listing failed, skipping subtree");
                None
            }
        }
    }

    async fn stage<P>(
        &self,
        provider: &P,
        root: &str,
        entry: &RemoteEntry,
        destination: &Path,
    ) -> Option<StagedFile>
    where
        P: ContentProvider + ?Sized,
    {
        let Some(relative_path) = relative_to_root(root, &entry.path) else {
            warn!(path = %entry.path, root = %root, "[COLLECT] Entry path escapes the collection root, skipping");
            return None;
        };

        let content = match retrieve(provider, entry).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %entry.path, error = %e, "[COLLECT] Could not retrieve file content, skipping");
                return None;
            }
        };

        let local_path = local_path_for(destination, &relative_path);
        if let Err(e) = write_staged(&local_path, &content) {
            warn!(path = %local_path.display(), error = %e, "[COLLECT] Failed to write staged file, skipping");
            return None;
        }
        debug!(path = %relative_path, size = content.len(), "[COLLECT] Staged file");
        Some(StagedFile {
            relative_path,
            local_path,
        })
    }
}

fn listing_order(a: &RemoteEntry, b: &RemoteEntry) -> Ordering {
    let is_dir = |entry: &RemoteEntry| entry.kind == EntryKind::Directory;
    is_dir(a)
        .cmp(&is_dir(b))
        .then_with(|| a.path.cmp(&b.path))
}

/// Try the direct locator first, then the metadata document.
pub async fn retrieve<P>(provider: &P, entry: &RemoteEntry) -> Result<String, SyncError>
where
    P: ContentProvider + ?Sized,
{
    let mut last_error = None;

    if let Some(url) = &entry.download_url {
        match provider.fetch_raw(url).await {
            Ok(text) => return Ok(text),
            Err(e) => {
                debug!(path = %entry.path, error = %e, "Raw fetch failed, trying metadata");
                last_error = Some(e);
            }
        }
    }

    if let Some(url) = &entry.api_url {
        return provider
            .fetch_metadata(url)
            .await
            .and_then(|metadata| decode_metadata(&entry.path, metadata));
    }

    Err(last_error.unwrap_or_else(|| SyncError::decode(&entry.path, "entry has no content locator")))
}

/// Turn a metadata payload into text. Base64 payloads are decoded lossily so that
/// invalid UTF-8 never fails the run.
pub fn decode_metadata(path: &str, metadata: FileMetadata) -> Result<String, SyncError> {
    let content = match metadata.content {
        Some(content) if !content.is_empty() => content,
        _ => return Err(SyncError::decode(path, "metadata carries no content")),
    };
    match metadata.encoding.as_deref() {
        Some(encoding) if encoding.eq_ignore_ascii_case("base64") => {
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| SyncError::decode(path, e))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Ok(content),
    }
}

/// Path of `path` below `root`, or `None` if it is not inside it or tries to climb out.
fn relative_to_root(root: &str, path: &str) -> Option<String> {
    let path = path.trim_matches('/');
    let relative = if root.is_empty() {
        path
    } else {
        path.strip_prefix(root)?.strip_prefix('/')?
    };
    let escapes = relative
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if escapes {
        None
    } else {
        Some(relative.to_string())
    }
}

fn local_path_for(destination: &Path, relative_path: &str) -> PathBuf {
    relative_path
        .split('/')
        .fold(destination.to_path_buf(), |acc, segment| acc.join(segment))
}

fn write_staged(local_path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = local_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(local_path, content)
}
