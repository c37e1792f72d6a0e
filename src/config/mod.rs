//! Engine configuration
//!
//! Defaults cover the standard cadence (three touches, seven-day reply
//! window, six-week waves) and can be overridden per install via a TOML
//! file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the three collection documents
    pub storage_root: PathBuf,
    /// Maximum leads snapshotted into a wave at creation
    pub cohort_size: usize,
    /// Reply window applied when a persona template does not set one
    pub default_reply_expected_days: i64,
    /// Touch cap applied when a persona template does not set one
    pub default_max_touches: u32,
    /// Days waiting before a vendor application is flagged as a warning
    pub stalled_warning_days: i64,
    /// Days waiting before a vendor application is flagged as critical
    pub stalled_critical_days: i64,
    /// Bound on collection lock acquisition, in seconds
    pub lock_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            cohort_size: 25,
            default_reply_expected_days: 7,
            default_max_touches: 3,
            stalled_warning_days: 30,
            stalled_critical_days: 45,
            lock_timeout_secs: 5,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Lock acquisition bound as a `Duration`
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }
}

fn default_storage_root() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("cadence"))
        .unwrap_or_else(|| PathBuf::from(".cadence"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cohort_size, 25);
        assert_eq!(config.default_reply_expected_days, 7);
        assert_eq!(config.default_max_touches, 3);
        assert_eq!(config.stalled_warning_days, 30);
        assert_eq!(config.stalled_critical_days, 45);
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            cohort_size = 10
            stalled_critical_days = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.cohort_size, 10);
        assert_eq!(config.stalled_critical_days, 60);
        // Untouched fields keep their defaults
        assert_eq!(config.default_max_touches, 3);
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let result = EngineConfig::load(Some(Path::new("/nonexistent/cadence.toml")));
        assert!(result.is_err());
    }
}
