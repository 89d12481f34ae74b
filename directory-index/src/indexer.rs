//! File scanning and URI derivation.

use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::{FilterSet, IndexConfig};
use crate::error::Result;

/// Reference point for the cache-busting query parameter.
pub const CACHE_BUST_EPOCH: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// One indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the root, `/`-separated.
    pub path: String,

    /// Published URI including the cache-busting query.
    pub uri: String,
}

/// An immutable, complete copy of the index ordered by path.
pub type Snapshot = Arc<[FileEntry]>;

/// Turns files under a root into [`FileEntry`] values.
#[derive(Debug, Clone)]
pub struct FileIndexer {
    root: PathBuf,
    filters: FilterSet,
    uri_prefix: String,
    follow_symlinks: bool,
}

impl FileIndexer {
    /// Create an indexer for an already resolved root.
    pub fn new(root: impl Into<PathBuf>, config: &IndexConfig) -> Self {
        Self {
            root: root.into(),
            filters: FilterSet::new(&config.filters),
            uri_prefix: config.uri_prefix.clone(),
            follow_symlinks: config.follow_symlinks,
        }
    }

    /// The root every key is relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative key for `path`, or `None` when it is outside the root.
    pub fn relative_key(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts = rel
            .components()
            .map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    /// Build the entry for a regular file, if it is under the root and matches a filter.
    pub fn entry(&self, path: &Path, metadata: &Metadata) -> Option<FileEntry> {
        if !metadata.is_file() || !self.filters.matches(path) {
            return None;
        }
        let key = self.relative_key(path)?;
        let written = match last_write(metadata) {
            Ok(written) => written,
            Err(e) => {
                warn!("No last write time for {}: {e}", path.display());
                return None;
            }
        };

        Some(FileEntry {
            uri: build_uri(&self.uri_prefix, &key, written),
            path: key,
        })
    }

    /// Scan the whole root. An unreadable root is an error; unreadable
    /// entries below it are skipped.
    pub fn scan(&self) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();

        for item in self.walker(&self.root) {
            match item {
                Ok(item) => entries.extend(self.entry_from_walk(&item)),
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => warn!("Skipping unreadable entry: {e}"),
            }
        }

        debug!("Scanned {} files under {}", entries.len(), self.root.display());
        Ok(entries)
    }

    /// Scan a directory below the root, logging every failure.
    pub fn scan_dir(&self, dir: &Path) -> Vec<FileEntry> {
        self.walker(dir)
            .filter_map(|item| match item {
                Ok(item) => self.entry_from_walk(&item),
                Err(e) => {
                    warn!("Skipping unreadable entry: {e}");
                    None
                }
            })
            .collect()
    }

    fn walker(&self, dir: &Path) -> walkdir::IntoIter {
        WalkDir::new(dir).follow_links(self.follow_symlinks).into_iter()
    }

    fn entry_from_walk(&self, item: &DirEntry) -> Option<FileEntry> {
        if !item.file_type().is_file() {
            return None;
        }
        match item.metadata() {
            Ok(metadata) => self.entry(item.path(), &metadata),
            Err(e) => {
                warn!("Failed to read metadata for {}: {e}", item.path().display());
                None
            }
        }
    }
}

/// Time between [`CACHE_BUST_EPOCH`] and the last write of a file, at the
/// precision the file system records.
pub fn last_write(metadata: &Metadata) -> std::io::Result<TimeDelta> {
    let modified: DateTime<Utc> = metadata.modified()?.into();
    Ok(modified - CACHE_BUST_EPOCH)
}

/// Build `<prefix><encoded key>?<seconds>`, with fractional seconds when the
/// write time has them.
pub fn build_uri(prefix: &str, key: &str, written: TimeDelta) -> String {
    let encoded = key
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/");
    format!("{prefix}{encoded}?{}", decimal_secs(written))
}

/// `1700000000.25` style rendering of an offset, trailing zeros dropped.
fn decimal_secs(offset: TimeDelta) -> String {
    let sign = if offset < TimeDelta::zero() { "-" } else { "" };
    let offset = offset.abs();
    let secs = offset.num_seconds();
    let nanos = offset.subsec_nanos();
    if nanos == 0 {
        return format!("{sign}{secs}");
    }
    let fraction = format!("{nanos:09}");
    format!("{sign}{secs}.{}", fraction.trim_end_matches('0'))
}
