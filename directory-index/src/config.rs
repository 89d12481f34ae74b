//! Configuration types for the directory index.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wildmatch::WildMatch;

use crate::error::{IndexError, Result};

/// Configuration for a watched image tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Path to the root directory.
    pub root: PathBuf,

    /// File name patterns to index (`*` and `?` wildcards).
    pub filters: Vec<String>,

    /// Prefix prepended to every published URI.
    pub uri_prefix: String,

    /// Whether to follow symbolic links while scanning.
    pub follow_symlinks: bool,

    /// Capacity of the channel between the OS watcher and the event task.
    pub event_buffer: usize,

    /// How long a rename source waits for its target, in milliseconds.
    pub rename_grace_ms: u64,
}

impl IndexConfig {
    /// Create a new index config for `root` with the default image filters.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            filters: Self::default_filters(),
            uri_prefix: String::new(),
            follow_symlinks: false,
            event_buffer: 1000,
            rename_grace_ms: 250,
        }
    }

    /// Replace the file filters.
    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = filters.into_iter().map(Into::into).collect();
        self
    }

    /// Set the URI prefix.
    pub fn with_uri_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.uri_prefix = prefix.into();
        self
    }

    /// Enable following symbolic links.
    pub fn follow_symlinks(mut self) -> Self {
        self.follow_symlinks = true;
        self
    }

    /// Set the rename pairing window.
    pub fn with_rename_grace(mut self, grace: Duration) -> Self {
        self.rename_grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The rename pairing window as a [`Duration`].
    pub fn rename_grace(&self) -> Duration {
        Duration::from_millis(self.rename_grace_ms)
    }

    /// Get the default image filters.
    fn default_filters() -> Vec<String> {
        ["*.jpg", "*.gif", "*.svg", "*.png"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Check the configuration for values the index cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.filters.is_empty() {
            return Err(IndexError::Config("at least one filter is required".into()));
        }
        if let Some(blank) = self.filters.iter().find(|f| f.trim().is_empty()) {
            return Err(IndexError::InvalidPattern(blank.clone()));
        }
        if self.event_buffer == 0 {
            return Err(IndexError::Config("event_buffer must be positive".into()));
        }
        Ok(())
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new("Images")
    }
}

/// Split a `|`-separated filter list such as `*.jpg|*.png`.
pub fn parse_filters(filters: &str) -> Vec<String> {
    filters
        .split('|')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

/// Compiled file name filters.
#[derive(Debug, Clone)]
pub struct FilterSet {
    patterns: Vec<WildMatch>,
}

impl FilterSet {
    /// Compile the filters of a config.
    pub fn new(filters: &[String]) -> Self {
        Self {
            patterns: filters
                .iter()
                .map(|f| WildMatch::new(&f.to_lowercase()))
                .collect(),
        }
    }

    /// Check whether the file name of `path` matches any filter.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let name = name.to_lowercase();
        self.patterns.iter().any(|p| p.matches(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_index_config_creation() {
        let config = IndexConfig::new("/srv/images")
            .with_filters(["*.webp"])
            .with_uri_prefix("/Images/")
            .with_rename_grace(Duration::from_millis(40));

        assert_eq!(config.root, Path::new("/srv/images"));
        assert_eq!(config.filters, vec!["*.webp".to_string()]);
        assert_eq!(config.uri_prefix, "/Images/");
        assert_eq!(config.rename_grace(), Duration::from_millis(40));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_filters() {
        let empty = IndexConfig::new("/x").with_filters(Vec::<String>::new());
        assert!(matches!(empty.validate(), Err(IndexError::Config(_))));

        let blank = IndexConfig::new("/x").with_filters(["*.png", "  "]);
        assert!(matches!(blank.validate(), Err(IndexError::InvalidPattern(_))));
    }

    #[test]
    fn test_parse_filters() {
        assert_eq!(
            parse_filters("*.jpg|*.gif| *.svg |*.png|"),
            vec!["*.jpg", "*.gif", "*.svg", "*.png"]
        );
    }

    #[test]
    fn test_filter_matching() {
        let filters = FilterSet::new(&IndexConfig::default().filters);

        assert!(filters.matches(Path::new("/imgs/a.png")));
        assert!(filters.matches(Path::new("/imgs/nested/B.JPG")));
        assert!(!filters.matches(Path::new("/imgs/notes.txt")));
        assert!(!filters.matches(Path::new("/imgs/png")));
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: IndexConfig =
            serde_json::from_str(r#"{"root": "/data", "uri_prefix": "/Images/"}"#).unwrap();

        assert_eq!(config.root, Path::new("/data"));
        assert_eq!(config.filters.len(), 4);
        assert_eq!(config.event_buffer, 1000);
    }
}
