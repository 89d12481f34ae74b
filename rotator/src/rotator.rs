//! A self-paced rotation through one group's files.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use slideshow_directory_index::{FileEntry, Snapshot, SnapshotSource, SubscriptionId, Subscribers};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::RotatorConfig;
use crate::error::{Result, RotatorError};
use crate::interval::interval_for;

/// URIs of the entries under `group`, ordered by path. Falls back to
/// `default_group` when `group` has no entries.
pub fn select_candidates(snapshot: &[FileEntry], group: &str, default_group: &str) -> Vec<String> {
    let matching = |prefix: &str| -> Vec<String> {
        snapshot
            .iter()
            .filter(|entry| entry.path.starts_with(prefix))
            .map(|entry| (entry.path.as_str(), entry.uri.as_str()))
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .map(String::from)
            .collect()
    };

    let candidates = matching(group);
    if candidates.is_empty() {
        matching(default_group)
    } else {
        candidates
    }
}

#[derive(Debug)]
struct RotationState {
    candidates: Vec<String>,
    /// `None` until the first advance after a re-index.
    position: Option<usize>,
    interval: Duration,
    /// Bumped on every re-index so a timer armed before it can tell.
    generation: u64,
    disposed: bool,
}

impl RotationState {
    fn new(interval: Duration) -> Self {
        Self {
            candidates: Vec::new(),
            position: None,
            interval,
            generation: 0,
            disposed: false,
        }
    }

    fn current(&self) -> Option<&str> {
        self.position
            .and_then(|i| self.candidates.get(i))
            .map(String::as_str)
    }

    fn reindex(&mut self, candidates: Vec<String>) {
        self.candidates = candidates;
        self.position = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Step to the next candidate, wrapping past the end, and take its interval.
    fn advance(&mut self, default_interval: Duration) -> Option<String> {
        self.position = Some(match self.position {
            Some(i) if i + 1 < self.candidates.len() => i + 1,
            _ => 0,
        });
        self.interval = self
            .current()
            .map_or(default_interval, |uri| interval_for(uri, default_interval));
        self.current().map(str::to_owned)
    }
}

struct Shared {
    group: String,
    default_group: String,
    default_interval: Duration,
    state: Mutex<RotationState>,
    /// Held across a state change and its notification so listeners see
    /// changes in order and never after disposal.
    publish: Mutex<()>,
    subscribers: Subscribers<Option<String>>,
    rearm: Notify,
}

impl Shared {
    fn reindex(&self, snapshot: &[FileEntry]) {
        let candidates = select_candidates(snapshot, &self.group, &self.default_group);

        let _publish = lock(&self.publish);
        let item = {
            let mut state = lock(&self.state);
            if state.disposed {
                return;
            }
            state.reindex(candidates);
            state.advance(self.default_interval)
        };
        debug!(group = %self.group, item = ?item, "Re-indexed rotation");
        self.subscribers.notify(&item);
        self.rearm.notify_one();
    }

    /// Advance if no re-index happened since the timer was armed at
    /// `generation`. Returns `false` once disposed.
    fn tick(&self, generation: u64) -> bool {
        let _publish = lock(&self.publish);
        let item = {
            let mut state = lock(&self.state);
            if state.disposed {
                return false;
            }
            if state.generation != generation {
                // The re-selected item gets its full interval.
                return true;
            }
            state.advance(self.default_interval)
        };
        debug!(group = %self.group, item = ?item, "Advanced rotation");
        self.subscribers.notify(&item);
        true
    }
}

async fn run_timer(shared: Arc<Shared>) {
    loop {
        let (interval, generation) = {
            let state = lock(&shared.state);
            (state.interval, state.generation)
        };
        tokio::select! {
            () = tokio::time::sleep(interval) => {
                if !shared.tick(generation) {
                    break;
                }
            }
            () = shared.rearm.notified() => {}
        }
    }
}

/// Cycles through the files of one group on a timer.
///
/// Every file is shown for the interval encoded in its name (`-5sec.png`)
/// or the configured default. A new index snapshot restarts the rotation
/// from the first candidate. Listeners are called synchronously from the
/// timer task or the index task; they may read [`Rotator::current_item`]
/// but must not dispose the rotator that is notifying them.
pub struct Rotator {
    shared: Arc<Shared>,
    source: Arc<dyn SnapshotSource>,
    subscription: Mutex<Option<SubscriptionId>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Rotator {
    /// Start rotating `group` over the snapshots of `source`.
    ///
    /// Must be called from within a Tokio runtime, which drives the timer.
    pub fn new(
        group: impl Into<String>,
        source: Arc<dyn SnapshotSource>,
        config: &RotatorConfig,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| RotatorError::NoRuntime)?;
        config.validate()?;

        let shared = Arc::new(Shared {
            group: group.into(),
            default_group: config.default_group.clone(),
            default_interval: config.default_interval(),
            state: Mutex::new(RotationState::new(config.default_interval())),
            publish: Mutex::new(()),
            subscribers: Subscribers::new(),
            rearm: Notify::new(),
        });

        let weak = Arc::downgrade(&shared);
        let subscription = source.subscribe_with_current(Arc::new(move |snapshot: &Snapshot| {
            if let Some(shared) = weak.upgrade() {
                shared.reindex(snapshot);
            }
        }));
        let timer = runtime.spawn(run_timer(Arc::clone(&shared)));

        info!(
            group = %shared.group,
            candidates = lock(&shared.state).candidates.len(),
            "Started rotator"
        );
        Ok(Self {
            shared,
            source,
            subscription: Mutex::new(Some(subscription)),
            timer: Mutex::new(Some(timer)),
        })
    }

    /// The group path this rotator serves.
    pub fn group(&self) -> &str {
        &self.shared.group
    }

    /// The URI currently on display, if there is anything to show.
    pub fn current_item(&self) -> Option<String> {
        lock(&self.shared.state).current().map(str::to_owned)
    }

    /// The ordered URIs being rotated.
    pub fn candidates(&self) -> Vec<String> {
        lock(&self.shared.state).candidates.clone()
    }

    /// How long the current item stays on display.
    pub fn interval(&self) -> Duration {
        lock(&self.shared.state).interval
    }

    /// Register a listener called with the new item on every advance and re-index.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        self.shared
            .subscribers
            .add(Arc::new(move |item: &Option<String>| callback(item.as_deref())))
    }

    /// Deregister a listener.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.subscribers.remove(id)
    }

    /// Whether [`Rotator::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        lock(&self.shared.state).disposed
    }

    /// Stop the timer and detach from the index.
    ///
    /// Safe to call more than once. No listener is called after this returns.
    pub fn dispose(&self) {
        if let Some(id) = lock(&self.subscription).take() {
            self.source.unsubscribe(id);
        }

        {
            let _publish = lock(&self.shared.publish);
            let mut state = lock(&self.shared.state);
            if state.disposed {
                return;
            }
            state.disposed = true;
        }

        self.shared.subscribers.clear();
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
        }
        debug!(group = %self.shared.group, "Disposed rotator");
    }
}

impl Drop for Rotator {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Rotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("Rotator")
            .field("group", &self.shared.group)
            .field("candidates", &state.candidates.len())
            .field("position", &state.position)
            .field("interval", &state.interval)
            .field("disposed", &state.disposed)
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
