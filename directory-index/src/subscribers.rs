//! Thread-safe observer lists.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A shared listener invoked with a borrowed value.
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A list of listeners.
///
/// [`Subscribers::notify`] calls listeners synchronously on the calling
/// thread, in subscription order, without holding the list lock, so a
/// listener may subscribe or unsubscribe while being notified.
pub struct Subscribers<T> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriptionId, Callback<T>)>>,
}

impl<T> Subscribers<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Add a listener.
    pub fn add(&self, callback: Callback<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.entries).push((id, callback));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    /// Remove every listener.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    /// Number of listeners.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Whether there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every listener with `value`.
    pub fn notify(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = lock(&self.entries)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(value);
        }
    }
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Subscribers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.len())
            .finish()
    }
}

/// Lock a mutex, recovering the data if a listener panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_notify_in_subscription_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscribers: Subscribers<String> = Subscribers::new();

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            subscribers.add(Arc::new(move |value: &String| {
                seen.lock().unwrap().push(format!("{tag}:{value}"));
            }));
        }
        subscribers.notify(&"x".to_string());

        assert_eq!(*seen.lock().unwrap(), vec!["first:x", "second:x"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let subscribers: Subscribers<u32> = Subscribers::new();
        let a = subscribers.add(Arc::new(|_: &u32| {}));
        let b = subscribers.add(Arc::new(|_: &u32| {}));
        assert_ne!(a, b);

        assert!(subscribers.remove(a));
        assert!(!subscribers.remove(a));
        assert_eq!(subscribers.len(), 1);

        subscribers.clear();
        assert!(subscribers.is_empty());
    }
}
