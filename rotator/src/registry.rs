//! Reference-counted registry of rotators.
//!
//! The `RotatorRegistry` hands out one shared [`Rotator`] per group path
//! and disposes it as soon as the last holder lets go, so idle groups keep
//! no timer and no index subscription.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use slideshow_directory_index::SnapshotSource;
use tracing::{debug, info};

use crate::config::RotatorConfig;
use crate::error::Result;
use crate::rotator::Rotator;

struct RegistryEntry {
    rotator: Arc<Rotator>,
    holders: usize,
}

/// Creates rotators on demand and disposes them when unused.
///
/// Every operation runs under one lock, and a rotator whose count drops to
/// zero is disposed before that lock is released, so an entry is present
/// exactly while its rotator is live.
pub struct RotatorRegistry {
    source: Arc<dyn SnapshotSource>,
    config: RotatorConfig,
    entries: Mutex<HashMap<String, RegistryEntry>>,
}

impl RotatorRegistry {
    /// Create an empty registry whose rotators follow `source`.
    pub fn new(source: Arc<dyn SnapshotSource>, config: RotatorConfig) -> Self {
        Self {
            source,
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get the rotator for `group`, creating it if needed, and count one more holder.
    ///
    /// Every successful call must be matched by one [`RotatorRegistry::release`].
    pub fn acquire(&self, group: &str) -> Result<Arc<Rotator>> {
        let mut entries = self.entries();

        if let Some(entry) = entries.get_mut(group) {
            entry.holders += 1;
            debug!(group, holders = entry.holders, "Acquired rotator");
            return Ok(Arc::clone(&entry.rotator));
        }

        let rotator = Arc::new(Rotator::new(
            group,
            Arc::clone(&self.source),
            &self.config,
        )?);
        entries.insert(
            group.to_string(),
            RegistryEntry {
                rotator: Arc::clone(&rotator),
                holders: 1,
            },
        );
        info!(group, live = entries.len(), "Created rotator");
        Ok(rotator)
    }

    /// Like [`RotatorRegistry::acquire`], releasing automatically when the lease drops.
    pub fn lease(self: &Arc<Self>, group: &str) -> Result<RotatorLease> {
        let rotator = self.acquire(group)?;
        Ok(RotatorLease {
            registry: Arc::clone(self),
            group: group.to_string(),
            rotator,
        })
    }

    /// Count one holder less for `group`.
    ///
    /// Returns `true` if this disposed the rotator. Releasing an unknown
    /// group does nothing.
    pub fn release(&self, group: &str) -> bool {
        let mut entries = self.entries();

        let Some(entry) = entries.get_mut(group) else {
            debug!(group, "Ignoring release of unknown group");
            return false;
        };
        entry.holders = entry.holders.saturating_sub(1);
        if entry.holders > 0 {
            debug!(group, holders = entry.holders, "Released rotator");
            return false;
        }

        if let Some(entry) = entries.remove(group) {
            entry.rotator.dispose();
        }
        info!(group, live = entries.len(), "Disposed idle rotator");
        true
    }

    /// Number of holders of `group` (zero if it has no rotator).
    pub fn holders(&self, group: &str) -> usize {
        self.entries().get(group).map_or(0, |entry| entry.holders)
    }

    /// Groups with a live rotator, sorted.
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self.entries().keys().cloned().collect();
        groups.sort();
        groups
    }

    /// Number of live rotators.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether no rotator is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispose every rotator and forget all holders.
    pub fn dispose(&self) {
        let mut entries = self.entries();
        if entries.is_empty() {
            return;
        }

        let count = entries.len();
        for (_, entry) in entries.drain() {
            entry.rotator.dispose();
        }
        info!(count, "Disposed all rotators");
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, RegistryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RotatorRegistry {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for RotatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatorRegistry")
            .field("groups", &self.groups())
            .field("config", &self.config)
            .finish()
    }
}

/// A held rotator that releases itself on drop.
pub struct RotatorLease {
    registry: Arc<RotatorRegistry>,
    group: String,
    rotator: Arc<Rotator>,
}

impl RotatorLease {
    /// The shared rotator.
    pub fn rotator(&self) -> &Arc<Rotator> {
        &self.rotator
    }
}

impl Deref for RotatorLease {
    type Target = Rotator;

    fn deref(&self) -> &Rotator {
        &self.rotator
    }
}

impl Drop for RotatorLease {
    fn drop(&mut self) {
        self.registry.release(&self.group);
    }
}

impl std::fmt::Debug for RotatorLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatorLease")
            .field("group", &self.group)
            .finish()
    }
}
