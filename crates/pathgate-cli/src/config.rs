//! Optional TOML configuration file.
//!
//! ```toml
//! [guard]
//! default_create_mode = 0o600
//! detect_network_fs = true
//! allow_unverified_fallback = false
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use pathgate_core::GuardOptions;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub guard: GuardOptions,
}

impl Config {
    /// Loads `path`, or the defaults when no file was given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&raw)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        debug!(path = %path.display(), guard = ?config.guard, "Loaded config");
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.guard, GuardOptions::default());
    }

    #[test]
    fn test_guard_table() {
        let config = Config::parse(
            "[guard]\ndefault_create_mode = 0o600\ndetect_network_fs = false\n",
        )
        .unwrap();
        assert_eq!(config.guard.default_create_mode, 0o600);
        assert!(!config.guard.detect_network_fs);
        assert!(!config.guard.allow_unverified_fallback);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Config::parse("[guard]\nfollow_symlinks = true\n").is_err());
        assert!(Config::parse("[vault]\nname = \"x\"\n").is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/pathgate.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config file"));
    }
}
