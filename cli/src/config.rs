//! Configuration file handling.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use slideshow_directory_index::{IndexConfig, parse_filters};
use slideshow_rotator::RotatorConfig;

use crate::cli::Args;

/// Everything the binary can be configured with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideshowConfig {
    /// The watched image tree.
    pub index: IndexConfig,

    /// How groups rotate.
    pub rotation: RotatorConfig,
}

impl SlideshowConfig {
    /// Read a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parse TOML config text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply command-line overrides.
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(root) = &args.root {
            self.index.root.clone_from(root);
        }
        if let Some(filters) = &args.filters {
            self.index.filters = parse_filters(filters);
        }
        if let Some(prefix) = &args.uri_prefix {
            self.index.uri_prefix.clone_from(prefix);
        }
        if let Some(group) = &args.default_group {
            self.rotation.default_group.clone_from(group);
        }
        self
    }
}
