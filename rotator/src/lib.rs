//! # Rotator
//!
//! Per-group slideshows on top of the directory index.
//!
//! A [`Rotator`] filters the index down to the files whose path starts with
//! its group (or the fallback group when there are none), orders them by
//! path and shows each one for the time encoded in its file name. A
//! [`RotatorRegistry`] shares one rotator per group between any number of
//! viewers and tears it down when the last one leaves.
//!
//! ```text
//! DirectoryIndex ──snapshot──► Rotator("trip") ──item──► viewers
//!                  └─────────► Rotator("home") ──item──► viewers
//!                                   ▲
//!                     RotatorRegistry (acquire / release)
//! ```

pub mod config;
pub mod error;
pub mod interval;
pub mod registry;
pub mod rotator;

#[cfg(test)]
mod test_support;

pub use config::RotatorConfig;
pub use error::{Result, RotatorError};
pub use interval::{interval_for, parse_interval};
pub use registry::{RotatorLease, RotatorRegistry};
pub use rotator::{Rotator, select_candidates};
