//! Configuration for rotators.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RotatorError};

/// How rotators pick and pace their items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotatorConfig {
    /// Group prefix shown when a group has no files of its own.
    pub default_group: String,

    /// Display time for files without a `-<N>sec` marker, in seconds.
    pub default_interval_secs: u64,
}

impl RotatorConfig {
    /// Create a config with the stock fallback group and interval.
    pub fn new() -> Self {
        Self {
            default_group: "default".to_string(),
            default_interval_secs: 10,
        }
    }

    /// Set the fallback group.
    pub fn with_default_group(mut self, group: impl Into<String>) -> Self {
        self.default_group = group.into();
        self
    }

    /// Set the fallback display time. Sub-second parts are dropped.
    pub fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval_secs = interval.as_secs();
        self
    }

    /// The fallback display time as a [`Duration`].
    pub fn default_interval(&self) -> Duration {
        Duration::from_secs(self.default_interval_secs)
    }

    /// Check the configuration for values a rotator cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.default_interval_secs == 0 {
            return Err(RotatorError::Config(
                "default_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = RotatorConfig::default();
        assert_eq!(config.default_group, "default");
        assert_eq!(config.default_interval(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let config = RotatorConfig::new().with_default_interval(Duration::from_millis(500));
        assert!(matches!(config.validate(), Err(RotatorError::Config(_))));
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: RotatorConfig = serde_json::from_str(r#"{"default_group": "fallback"}"#).unwrap();
        assert_eq!(config.default_group, "fallback");
        assert_eq!(config.default_interval_secs, 10);
    }
}
