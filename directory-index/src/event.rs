//! Normalization of raw notify events into index changes.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};

/// A change the index knows how to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// A file or directory appeared or its contents changed.
    Upserted(PathBuf),

    /// A file or directory is gone.
    Removed(PathBuf),

    /// A file or directory moved; applied as one transition.
    Renamed {
        /// Old location.
        from: PathBuf,
        /// New location.
        to: PathBuf,
    },
}

#[derive(Debug)]
struct PendingRename {
    at: Instant,
    tracker: Option<usize>,
    path: PathBuf,
}

/// Pairs split rename events and turns notify's event zoo into [`FileChange`]s.
///
/// Backends report renames differently: inotify sends the source, the
/// target and then a combined event sharing one tracker cookie, Windows
/// sends source and target back to back, FSEvents only says "something
/// was renamed". Sources wait up to `grace` for a target before they are
/// reported as removals.
#[derive(Debug)]
pub struct EventNormalizer {
    grace: Duration,
    pending: VecDeque<PendingRename>,
    paired: VecDeque<usize>,
}

impl EventNormalizer {
    const MAX_PENDING_RENAMES: usize = 512;
    const MAX_PAIRED_TRACKERS: usize = 64;

    /// Create a normalizer with the given rename pairing window.
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            pending: VecDeque::new(),
            paired: VecDeque::new(),
        }
    }

    /// Whether a rename source is waiting for its target.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// When the oldest waiting rename source expires.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.front().map(|p| p.at + self.grace)
    }

    /// Translate one notify event.
    pub fn push(&mut self, event: notify::Event, now: Instant) -> Vec<FileChange> {
        let mut out = self.flush(now);
        let tracker = event.tracker();

        match event.kind {
            EventKind::Create(_)
            | EventKind::Modify(
                ModifyKind::Data(_) | ModifyKind::Metadata(_) | ModifyKind::Any | ModifyKind::Other,
            ) => {
                out.extend(self.take_pending_for(&event.paths));
                out.extend(event.paths.into_iter().map(FileChange::Upserted));
            }
            EventKind::Remove(_) => {
                out.extend(self.take_pending_for(&event.paths));
                out.extend(event.paths.into_iter().map(FileChange::Removed));
            }
            EventKind::Modify(ModifyKind::Name(mode)) => match mode {
                RenameMode::Both => {
                    let echoed = tracker.is_some_and(|t| self.take_paired(t));
                    if !echoed {
                        out.extend(self.take_pending_for(&event.paths));
                        out.extend(paths_to_renames(event.paths));
                    }
                }
                RenameMode::From => {
                    for path in event.paths {
                        self.pending.push_back(PendingRename {
                            at: now,
                            tracker,
                            path,
                        });
                    }
                    while self.pending.len() > Self::MAX_PENDING_RENAMES {
                        if let Some(p) = self.pending.pop_front() {
                            out.push(FileChange::Removed(p.path));
                        }
                    }
                }
                RenameMode::To => {
                    for to in event.paths {
                        match self.take_pending(tracker) {
                            Some(from) => {
                                if let Some(t) = tracker {
                                    self.remember_paired(t);
                                }
                                out.push(FileChange::Renamed { from, to });
                            }
                            None => out.push(FileChange::Upserted(to)),
                        }
                    }
                }
                RenameMode::Any | RenameMode::Other => {
                    out.extend(self.take_pending_for(&event.paths));
                    out.extend(event.paths.into_iter().map(by_existence));
                }
            },
            EventKind::Any => out.extend(event.paths.into_iter().map(by_existence)),
            EventKind::Access(_) | EventKind::Other => {}
        }

        out
    }

    /// Report rename sources whose window has passed as removals.
    pub fn flush(&mut self, now: Instant) -> Vec<FileChange> {
        let mut out = Vec::new();
        while let Some(p) = self.pending.front() {
            if now.saturating_duration_since(p.at) < self.grace {
                break;
            }
            if let Some(p) = self.pending.pop_front() {
                out.push(FileChange::Removed(p.path));
            }
        }
        out
    }

    fn take_pending(&mut self, tracker: Option<usize>) -> Option<PathBuf> {
        let position = match tracker {
            Some(t) => self.pending.iter().position(|p| p.tracker == Some(t)),
            None => (!self.pending.is_empty()).then_some(0),
        }?;
        self.pending.remove(position).map(|p| p.path)
    }

    /// Sources for paths that see another event first resolve as removals
    /// so the two changes keep their order.
    fn take_pending_for(&mut self, paths: &[PathBuf]) -> Vec<FileChange> {
        let mut out = Vec::new();
        self.pending.retain(|p| {
            if paths.contains(&p.path) {
                out.push(FileChange::Removed(p.path.clone()));
                false
            } else {
                true
            }
        });
        out
    }

    fn remember_paired(&mut self, tracker: usize) {
        self.paired.push_back(tracker);
        if self.paired.len() > Self::MAX_PAIRED_TRACKERS {
            self.paired.pop_front();
        }
    }

    fn take_paired(&mut self, tracker: usize) -> bool {
        match self.paired.iter().position(|t| *t == tracker) {
            Some(i) => {
                self.paired.remove(i);
                true
            }
            None => false,
        }
    }
}

fn by_existence(path: PathBuf) -> FileChange {
    if path.exists() {
        FileChange::Upserted(path)
    } else {
        FileChange::Removed(path)
    }
}

fn paths_to_renames(paths: Vec<PathBuf>) -> Vec<FileChange> {
    let mut out = Vec::new();
    let mut it = paths.into_iter();
    while let Some(from) = it.next() {
        let Some(to) = it.next() else {
            out.push(by_existence(from));
            break;
        };
        out.push(FileChange::Renamed { from, to });
    }
    out
}
