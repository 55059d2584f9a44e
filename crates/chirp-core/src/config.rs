//! Configuration management for chirp.
//!
//! This module provides core configuration that doesn't depend on
//! platform-specific UI libraries.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{API_URL_ENV, APP_NAME, DEFAULT_API_URL};

/// Core configuration structure for the application.
///
/// This contains settings that are platform-agnostic. The hotkey is stored
/// as a string here and parsed by the main application.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Classification endpoint. The `CHIRP_API_URL` environment variable
    /// takes precedence; without either, a local default is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Recording length limit in seconds; the deadline timer terminates an
    /// open session at this bound.
    #[serde(
        default = "default_record_limit",
        skip_serializing_if = "is_default_record_limit"
    )]
    pub record_limit: f32,

    /// Record-toggle hotkey (e.g. "shift+meta+KeyK"), parsed by the app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,
}

fn default_record_limit() -> f32 {
    5.0
}

fn is_default_record_limit(v: &f32) -> bool {
    (*v - default_record_limit()).abs() < f32::EPSILON
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            record_limit: default_record_limit(),
            hotkey: None,
        }
    }
}

impl Config {
    /// Get the config-file endpoint, if set
    pub fn api_url(&self) -> Option<&str> {
        self.api_url.as_deref()
    }

    /// Resolve the classification endpoint once at startup: environment
    /// override, then the config file, then the local default.
    pub fn resolve_api_url(&self) -> String {
        self.resolve_api_url_with(env::var(API_URL_ENV).ok())
    }

    fn resolve_api_url_with(&self, env_override: Option<String>) -> String {
        env_override
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Get the recording limit as a Duration
    pub fn record_limit(&self) -> Duration {
        if self.record_limit > 0.0 {
            Duration::from_secs_f32(self.record_limit)
        } else {
            warn!(
                record_limit = self.record_limit,
                "record_limit must be positive; using the default"
            );
            Duration::from_secs_f32(default_record_limit())
        }
    }

    /// Get the hotkey spec string, if set
    pub fn hotkey_spec(&self) -> Option<&str> {
        self.hotkey.as_deref()
    }
}

/// Manages loading and saving configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the default configuration directory.
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Creates a new ConfigManager with a specified configuration directory.
    #[cfg(test)]
    pub fn with_config_dir<P: AsRef<std::path::Path>>(dir: P) -> Self {
        let config_path = dir.as_ref().join(format!("{}.toml", APP_NAME));
        Self { config_path }
    }

    /// Returns the default path to the configuration file.
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to retrieve configuration directory")?;
        Ok(config_dir.join(APP_NAME).join(format!("{}.toml", APP_NAME)))
    }

    /// Loads the configuration from the config file or returns default.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let config_content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file at {:?}", self.config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file at {:?}", self.config_path))?;

        Ok(config)
    }

    /// Saves the configuration to the config file.
    pub fn save(&self, config: &Config) -> Result<()> {
        let config_dir = self
            .config_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.config_path))?;

        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory at {:?}", config_dir))?;

        let serialized =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, serialized)
            .with_context(|| format!("Failed to write config file at {:?}", self.config_path))?;

        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api_url.is_none());
        assert!(config.hotkey.is_none());
        assert_eq!(config.record_limit(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            api_url: Some("http://classifier.local:9000".to_string()),
            record_limit: 3.0,
            ..Default::default()
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_config_manager_save_load() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());

        let config = Config {
            api_url: Some("http://127.0.0.1:9999".to_string()),
            ..Default::default()
        };

        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(config, loaded);
        assert!(manager.config_path().exists());
    }

    #[test]
    fn test_load_default_when_file_missing() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());
        assert_eq!(manager.load().unwrap(), Config::default());
    }

    #[test]
    fn test_api_url_resolution_order() {
        let config = Config {
            api_url: Some("http://from-file:8000".to_string()),
            ..Default::default()
        };

        // Environment override wins over the file.
        assert_eq!(
            config.resolve_api_url_with(Some("http://from-env:8000".to_string())),
            "http://from-env:8000"
        );
        // Blank override is ignored.
        assert_eq!(
            config.resolve_api_url_with(Some("  ".to_string())),
            "http://from-file:8000"
        );
        // File wins over the default.
        assert_eq!(config.resolve_api_url_with(None), "http://from-file:8000");
        // Nothing configured falls back to the local default.
        assert_eq!(
            Config::default().resolve_api_url_with(None),
            DEFAULT_API_URL
        );
    }

    #[test]
    fn test_record_limit_rejects_non_positive() {
        let config = Config {
            record_limit: 0.0,
            ..Default::default()
        };
        assert_eq!(config.record_limit(), Duration::from_secs(5));

        let config = Config {
            record_limit: -1.0,
            ..Default::default()
        };
        assert_eq!(config.record_limit(), Duration::from_secs(5));
    }
}
