//! In-memory snapshot source for tests.

use std::sync::{Arc, Mutex};

use slideshow_directory_index::{
    FileEntry, Snapshot, SnapshotCallback, SnapshotSource, SubscriptionId, Subscribers,
};

use crate::rotator::Rotator;

/// Build a snapshot whose URIs are `<path>?1`.
pub(crate) fn snapshot_of(paths: &[&str]) -> Snapshot {
    paths
        .iter()
        .map(|path| FileEntry {
            path: (*path).to_string(),
            uri: format!("{path}?1"),
        })
        .collect()
}

/// Collect every item a rotator publishes.
pub(crate) fn record(rotator: &Rotator) -> Arc<Mutex<Vec<Option<String>>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    rotator.subscribe(move |item| sink.lock().unwrap().push(item.map(str::to_owned)));
    seen
}

pub(crate) struct TestSource {
    current: Mutex<Snapshot>,
    subscribers: Subscribers<Snapshot>,
}

impl TestSource {
    pub(crate) fn new(paths: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(snapshot_of(paths)),
            subscribers: Subscribers::new(),
        })
    }

    pub(crate) fn publish(&self, paths: &[&str]) {
        let mut current = self.current.lock().unwrap();
        *current = snapshot_of(paths);
        self.subscribers.notify(&*current);
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl SnapshotSource for TestSource {
    fn subscribe_with_current(&self, callback: SnapshotCallback) -> SubscriptionId {
        let current = self.current.lock().unwrap();
        let id = self.subscribers.add(Arc::clone(&callback));
        callback(&*current);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }
}
