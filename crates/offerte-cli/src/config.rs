//! Configuration file (`offerte.toml`).
//!
//! Looked up in the platform config folder unless `--config` names a file:
//! - macOS: ~/Library/Application Support/nl.Offerte.offerte/
//! - Windows: %APPDATA%/Offerte/offerte/config/
//! - Linux: ~/.config/offerte/
//!
//! ```toml
//! [autosave]
//! enabled = true
//! debounce_ms = 2000
//! max_delay_ms = 30000
//!
//! [store]
//! flags_path = "/home/me/.local/share/offerte/flags.json"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use offerte_autosave::AutoSaveConfig;

const APP_QUALIFIER: &str = "nl";
const APP_ORG: &str = "Offerte";
const APP_NAME: &str = "offerte";
const CONFIG_FILENAME: &str = "offerte.toml";
const FLAGS_FILENAME: &str = "flags.json";

/// Everything read from `offerte.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub autosave: AutoSaveConfig,
    pub store: StoreConfig,
}

/// `[store]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Where onboarding flags are kept. Defaults to the platform data folder.
    pub flags_path: Option<PathBuf>,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
}

/// Default location of `offerte.toml`, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

impl AppConfig {
    /// Load the configuration.
    ///
    /// An explicit path must exist. The default file is optional: when it is
    /// missing (or there is no config folder) the defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path)?
                .with_context(|| format!("Config file not found: {}", path.display()));
        }
        let Some(path) = default_config_path() else {
            tracing::debug!("No config folder on this platform, using defaults");
            return Ok(Self::default());
        };
        Ok(Self::load_from(&path)?.unwrap_or_default())
    }

    /// Parse `path`, or `None` when it does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        let config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(Some(config))
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, debounce_ms: Option<u64>, no_autosave: bool) -> Self {
        if let Some(debounce_ms) = debounce_ms {
            self.autosave.debounce_ms = debounce_ms;
        }
        if no_autosave {
            self.autosave.enabled = false;
        }
        self
    }

    /// Resolved flags file location.
    pub fn flags_path(&self) -> PathBuf {
        self.store
            .flags_path
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join(FLAGS_FILENAME)))
            .unwrap_or_else(|| PathBuf::from(FLAGS_FILENAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        assert_eq!(AppConfig::load_from(&dir.path().join("offerte.toml")).unwrap(), None);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offerte.toml");
        fs::write(&path, "[autosave]\ndebounce_ms = 750\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.autosave.debounce_ms, 750);
        assert!(config.autosave.enabled);
        assert_eq!(config.autosave.max_delay_ms, None);
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offerte.toml");
        fs::write(&path, "[autosave\ndebounce_ms = ").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let config = AppConfig::default().with_overrides(Some(100), true);
        assert_eq!(config.autosave.debounce_ms, 100);
        assert!(!config.autosave.enabled);

        let untouched = AppConfig::default().with_overrides(None, false);
        assert_eq!(untouched, AppConfig::default());
    }

    #[test]
    fn test_flags_path_from_config() {
        let config = AppConfig {
            store: StoreConfig {
                flags_path: Some(PathBuf::from("/tmp/offerte-flags.json")),
            },
            ..AppConfig::default()
        };
        assert_eq!(config.flags_path(), PathBuf::from("/tmp/offerte-flags.json"));
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let config = AppConfig::default().with_overrides(Some(1500), false);
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
