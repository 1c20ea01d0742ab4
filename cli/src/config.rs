// Configuration management for the keepalive CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/keepalive/config.json
// - Linux: ~/.config/keepalive/config.json
// - Windows: %APPDATA%\keepalive\config.json

use anyhow::{bail, Context, Result};
use keepalive_core::KeepAliveSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// API level the simulated OS reports when none is given on the command line
    pub api_level: u32,

    /// Directory for rolling log files; stderr only when unset
    pub log_dir: Option<String>,

    /// Supervisor settings
    pub keepalive: KeepAliveSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_level: 33,
            log_dir: None,
            keepalive: KeepAliveSettings::default(),
        }
    }
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("keepalive");

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            let config: Config =
                serde_json::from_str(&contents).context("Failed to parse config file")?;
            config
                .keepalive
                .validate()
                .context("Invalid keep-alive settings in config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Overwrite the default location with defaults without reading it, so a
    /// corrupt or invalid file can always be recovered
    pub fn reset() -> Result<PathBuf> {
        let path = Self::config_file()?;
        Self::reset_at(&path)?;
        Ok(path)
    }

    pub fn reset_at(path: &Path) -> Result<Self> {
        let config = Config::default();
        config.save_to(path)?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut candidate = self.clone();
        candidate.apply(key, value)?;
        candidate
            .keepalive
            .validate()
            .with_context(|| format!("Rejected value for {}", key))?;
        *self = candidate;
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api_level" => {
                self.api_level = value.parse().context("Invalid API level")?;
            }
            "log_dir" => {
                self.log_dir = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "service_name" => {
                self.keepalive.service_name = value.to_string();
            }
            "channel_id" => {
                self.keepalive.channel.id = value.to_string();
            }
            "notification_title" => {
                self.keepalive.notification.title = value.to_string();
            }
            "notification_text" => {
                self.keepalive.notification.text = value.to_string();
            }
            "heartbeat_enabled" => {
                self.keepalive.heartbeat_enabled = value.parse().context("Invalid boolean")?;
            }
            "heartbeat_interval_secs" => {
                self.keepalive.heartbeat_interval_secs =
                    value.parse().context("Invalid interval")?;
            }
            "background_threshold_secs" => {
                self.keepalive.background_threshold_secs =
                    value.parse().context("Invalid threshold")?;
            }
            _ => bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "api_level" => Some(self.api_level.to_string()),
            "log_dir" => self.log_dir.clone(),
            "service_name" => Some(self.keepalive.service_name.clone()),
            "channel_id" => Some(self.keepalive.channel.id.clone()),
            "notification_title" => Some(self.keepalive.notification.title.clone()),
            "notification_text" => Some(self.keepalive.notification.text.clone()),
            "heartbeat_enabled" => Some(self.keepalive.heartbeat_enabled.to_string()),
            "heartbeat_interval_secs" => {
                Some(self.keepalive.heartbeat_interval_secs.to_string())
            }
            "background_threshold_secs" => {
                Some(self.keepalive.background_threshold_secs.to_string())
            }
            _ => None,
        }
    }

    /// List all configuration keys and values
    pub fn list(&self) -> Vec<(String, String)> {
        KEYS.iter()
            .map(|key| (key.to_string(), self.get(key).unwrap_or_default()))
            .collect()
    }
}

const KEYS: &[&str] = &[
    "api_level",
    "log_dir",
    "service_name",
    "channel_id",
    "notification_title",
    "notification_text",
    "heartbeat_enabled",
    "heartbeat_interval_secs",
    "background_threshold_secs",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_set_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::load_from(&path).unwrap();
        config.set("api_level", "34").unwrap();
        config.set("heartbeat_interval_secs", "30").unwrap();
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.api_level, 34);
        assert_eq!(reloaded.keepalive.heartbeat_interval_secs, 30);
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = Config::default();
        assert!(config.set("heartbeat_interval_secs", "0").is_err());
        assert_eq!(config.keepalive.heartbeat_interval_secs, 15);
        assert!(config.set("api_level", "fourteen").is_err());
        assert!(config.set("no_such_key", "1").is_err());
    }

    #[test]
    fn test_list_covers_all_keys() {
        let config = Config::default();
        let entries = config.list();
        assert_eq!(entries.len(), KEYS.len());
        assert!(entries.contains(&("api_level".to_string(), "33".to_string())));
        assert!(entries.contains(&("log_dir".to_string(), String::new())));
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"keepalive": {"channel": {"id": ""}}}"#).unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_reset_recovers_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"keepalive": {"heartbeat_interval_secs": 0}}"#).unwrap();
        assert!(Config::load_from(&path).is_err());

        let config = Config::reset_at(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }
}
