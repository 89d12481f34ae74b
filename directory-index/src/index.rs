//! The live directory index.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::event::{EventNormalizer, FileChange};
use crate::indexer::{FileEntry, FileIndexer, Snapshot};
use crate::subscribers::{Callback, SubscriptionId, Subscribers, lock};
use crate::watcher;

/// Listener for index snapshots.
pub type SnapshotCallback = Callback<Snapshot>;

/// Something that publishes [`Snapshot`]s.
pub trait SnapshotSource: Send + Sync {
    /// Register `callback` and call it with the current snapshot before
    /// any later update can reach it.
    fn subscribe_with_current(&self, callback: SnapshotCallback) -> SubscriptionId;

    /// Deregister a listener. Returns `false` if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

struct IndexState {
    files: BTreeMap<String, String>,
    snapshot: Snapshot,
}

impl IndexState {
    fn refresh(&mut self) {
        self.snapshot = self
            .files
            .iter()
            .map(|(path, uri)| FileEntry {
                path: path.clone(),
                uri: uri.clone(),
            })
            .collect();
    }
}

/// A watched view of every matching file under a root directory.
///
/// Snapshots are published to subscribers while the mapping lock is held,
/// so they arrive in the order events were processed. Listeners must not
/// call back into the index from the notification.
pub struct DirectoryIndex {
    config: IndexConfig,
    indexer: FileIndexer,
    state: Mutex<IndexState>,
    subscribers: Subscribers<Snapshot>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl DirectoryIndex {
    /// Scan `config.root` and start watching it.
    ///
    /// Must be called from within a Tokio runtime, which drives the event
    /// task.
    pub fn open(config: IndexConfig) -> Result<Arc<Self>> {
        let runtime = Handle::try_current().map_err(|_| IndexError::NoRuntime)?;
        config.validate()?;
        let root = resolve_root(&config.root)?;

        let (event_tx, event_rx) = mpsc::channel(config.event_buffer);
        let mut notify_watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| {
                if event_tx.blocking_send(res).is_err() {
                    debug!("Directory index dropped; discarding file event");
                }
            },
        )?;
        // Watch before scanning so nothing that changes during the scan is missed.
        notify_watcher.watch(&root, RecursiveMode::Recursive)?;

        let index = Arc::new(Self::scan(root, config)?);
        *lock(&index.watcher) = Some(notify_watcher);

        let normalizer = EventNormalizer::new(index.config.rename_grace());
        runtime.spawn(watcher::process_events(
            Arc::downgrade(&index),
            event_rx,
            normalizer,
        ));

        info!(
            "Watching {} ({} files)",
            index.root().display(),
            index.len()
        );
        Ok(index)
    }

    /// Build an index from a full scan without watching.
    pub(crate) fn scan(root: PathBuf, config: IndexConfig) -> Result<Self> {
        let indexer = FileIndexer::new(root, &config);
        let files: BTreeMap<String, String> = indexer
            .scan()?
            .into_iter()
            .map(|entry| (entry.path, entry.uri))
            .collect();

        let mut state = IndexState {
            files,
            snapshot: Arc::from(Vec::new()),
        };
        state.refresh();

        Ok(Self {
            config,
            indexer,
            state: Mutex::new(state),
            subscribers: Subscribers::new(),
            watcher: Mutex::new(None),
        })
    }

    /// The resolved root directory.
    pub fn root(&self) -> &Path {
        self.indexer.root()
    }

    /// The configuration the index was opened with.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The current mapping.
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&lock(&self.state).snapshot)
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        lock(&self.state).files.len()
    }

    /// Whether no files are indexed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a listener called with the full snapshot after every change.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.subscribers.add(Arc::new(callback))
    }

    /// Deregister a listener.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    /// Stop watching the file system. Returns `false` if already stopped.
    pub fn shutdown(&self) -> bool {
        let stopped = lock(&self.watcher).take().is_some();
        if stopped {
            info!("Stopped watching {}", self.root().display());
        }
        stopped
    }

    /// Whether the file system watch is still active.
    pub fn is_watching(&self) -> bool {
        lock(&self.watcher).is_some()
    }

    /// Apply one change and publish if the mapping changed.
    ///
    /// Events that leave the mapping as it was publish nothing: an upsert
    /// whose last-write time is identical to the indexed one, a removal of a
    /// path that was never indexed, or a file the filters reject. Every
    /// other create, modify, delete or rename publishes exactly once, so
    /// rotators only reset when the set of images or their URIs changed.
    pub(crate) fn apply(&self, change: FileChange) -> bool {
        let mut state = lock(&self.state);

        let changed = match &change {
            FileChange::Upserted(path) => self.upsert(&mut state.files, path),
            FileChange::Removed(path) => self.remove(&mut state.files, path),
            FileChange::Renamed { from, to } => {
                let removed = self.remove(&mut state.files, from);
                let added = self.upsert(&mut state.files, to);
                removed || added
            }
        };

        if changed {
            state.refresh();
            debug!(files = state.files.len(), "Applied {change:?}");
            self.subscribers.notify(&state.snapshot);
        }
        changed
    }

    fn upsert(&self, files: &mut BTreeMap<String, String>, path: &Path) -> bool {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Ignoring event for {}: {e}", path.display());
                return false;
            }
        };

        if metadata.is_dir() {
            let mut changed = false;
            for entry in self.indexer.scan_dir(path) {
                changed |= insert(files, entry);
            }
            changed
        } else {
            self.indexer
                .entry(path, &metadata)
                .is_some_and(|entry| insert(files, entry))
        }
    }

    fn remove(&self, files: &mut BTreeMap<String, String>, path: &Path) -> bool {
        if path == self.root() {
            let changed = !files.is_empty();
            files.clear();
            return changed;
        }
        let Some(key) = self.indexer.relative_key(path) else {
            return false;
        };

        let before = files.len();
        files.remove(&key);
        let prefix = format!("{key}/");
        files.retain(|existing, _| !existing.starts_with(&prefix));
        files.len() != before
    }
}

impl SnapshotSource for DirectoryIndex {
    fn subscribe_with_current(&self, callback: SnapshotCallback) -> SubscriptionId {
        let state = lock(&self.state);
        let id = self.subscribers.add(Arc::clone(&callback));
        callback(&state.snapshot);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }
}

impl std::fmt::Debug for DirectoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryIndex")
            .field("root", &self.root())
            .field("files", &self.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// The URI carries the full-precision write time, so an equal URI means the
/// file was not written again.
fn insert(files: &mut BTreeMap<String, String>, entry: FileEntry) -> bool {
    if files.get(&entry.path) == Some(&entry.uri) {
        return false;
    }
    files.insert(entry.path, entry.uri);
    true
}

fn resolve_root(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        return Err(IndexError::DirectoryNotFound(root.display().to_string()));
    }
    if !root.is_dir() {
        return Err(IndexError::Config(format!(
            "Path is not a directory: {}",
            root.display()
        )));
    }
    Ok(dunce::canonicalize(root)?)
}
