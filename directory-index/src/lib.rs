//! # Directory Index
//!
//! This crate keeps a live map of every image under a root directory,
//! keyed by relative path and valued by a cache-busted URI, and publishes
//! the complete map to subscribers whenever the file system changes.
//!
//! ## Features
//!
//! - **Initial Scan**: The map is populated before [`DirectoryIndex::open`] returns
//! - **Real-time Watching**: Creates, writes, renames and deletes update the map
//! - **Atomic Renames**: Split rename events are paired into one transition
//! - **Cache Busting**: URIs carry the last write time as a query parameter
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Directory Index                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  notify ──► mpsc ──► EventNormalizer ──► DirectoryIndex         │
//! │                            │                   │                │
//! │                            ▼                   ▼                │
//! │                       FileChange          Snapshot ──► listeners│
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod index;
pub mod indexer;
pub mod subscribers;
mod watcher;

pub use config::{FilterSet, IndexConfig, parse_filters};
pub use error::{IndexError, Result};
pub use event::{EventNormalizer, FileChange};
pub use index::{DirectoryIndex, SnapshotCallback, SnapshotSource};
pub use indexer::{CACHE_BUST_EPOCH, FileEntry, FileIndexer, Snapshot};
pub use subscribers::{Callback, SubscriptionId, Subscribers};
