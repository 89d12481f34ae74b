//! The task that feeds file system events into the index.

use std::sync::Weak;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::event::{EventNormalizer, FileChange};
use crate::index::DirectoryIndex;

type RawEvent = std::result::Result<notify::Event, notify::Error>;

/// Drain raw notify events until the watcher is dropped.
///
/// Errors are logged and skipped; a bad event never stops the loop.
pub(crate) async fn process_events(
    index: Weak<DirectoryIndex>,
    mut event_rx: mpsc::Receiver<RawEvent>,
    mut normalizer: EventNormalizer,
) {
    loop {
        let received = match normalizer.next_deadline() {
            Some(deadline) => {
                let deadline = tokio::time::Instant::from_std(deadline);
                match tokio::time::timeout_at(deadline, event_rx.recv()).await {
                    Ok(received) => received,
                    Err(_) => {
                        let expired = normalizer.flush(Instant::now());
                        if !apply_all(&index, expired) {
                            break;
                        }
                        continue;
                    }
                }
            }
            None => event_rx.recv().await,
        };

        let Some(result) = received else {
            break;
        };
        let changes = match result {
            Ok(event) => normalizer.push(event, Instant::now()),
            Err(e) => {
                warn!("Watch error: {e}");
                continue;
            }
        };
        if !apply_all(&index, changes) {
            break;
        }
    }

    debug!("Directory index event task stopped");
}

/// Returns `false` once the index is gone.
fn apply_all(index: &Weak<DirectoryIndex>, changes: Vec<FileChange>) -> bool {
    if changes.is_empty() {
        return true;
    }
    let Some(index) = index.upgrade() else {
        return false;
    };
    for change in changes {
        index.apply(change);
    }
    true
}
