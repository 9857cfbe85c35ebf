//! Configuration for the reminders facade and its host.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dispatch::DEFAULT_MAIN_QUEUE_NAME;
use crate::error::{ReminderError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Worker pool / main queue settings.
    pub dispatch: DispatchConfig,
    /// Tracing settings for the host binary.
    pub logging: LoggingConfig,
    /// In-memory store settings, used when no platform store is registered.
    pub store: StoreConfig,
}

/// Dispatch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Thread name of the main (delivery) queue.
    pub main_queue_name: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            main_queue_name: DEFAULT_MAIN_QUEUE_NAME.to_owned(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fae_reminders=info".to_owned(),
        }
    }
}

/// In-memory store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Seed a default reminders calendar so new calendars have a source.
    pub seed_default_calendar: bool,
    /// Title of the seeded default calendar.
    pub default_calendar_title: String,
    /// Title of the seeded calendar's source account.
    pub default_source_title: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            seed_default_calendar: true,
            default_calendar_title: "Reminders".to_owned(),
            default_source_title: "On My Device".to_owned(),
        }
    }
}

impl ReminderConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ReminderError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ReminderError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config file path.
    ///
    /// `FAE_REMINDERS_CONFIG_DIR` overrides the directory; otherwise
    /// `dirs::config_dir()/fae-reminders/`.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        config_dir().join("config.toml")
    }
}

fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("FAE_REMINDERS_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("fae-reminders"))
        .unwrap_or_else(|| PathBuf::from("/tmp/fae-reminders-config"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = ReminderConfig::default();
        assert_eq!(config.dispatch.main_queue_name, DEFAULT_MAIN_QUEUE_NAME);
        assert!(config.store.seed_default_calendar);
        assert!(!config.store.default_calendar_title.is_empty());
        assert!(config.logging.filter.contains("fae_reminders"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ReminderConfig::default();
        config.dispatch.main_queue_name = "ui".to_owned();
        config.store.default_calendar_title = "Inbox".to_owned();
        config.save_to_file(&path).unwrap();

        let loaded = ReminderConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: ReminderConfig = toml::from_str(
            r#"
            [store]
            seed_default_calendar = false
            "#,
        )
        .unwrap();
        assert!(!config.store.seed_default_calendar);
        assert_eq!(config.store.default_calendar_title, "Reminders");
        assert_eq!(config.dispatch, DispatchConfig::default());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ReminderConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, ReminderConfig::default());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[dispatch\nmain_queue_name = 3").unwrap();
        assert!(matches!(
            ReminderConfig::from_file(&path),
            Err(ReminderError::Config(_))
        ));
    }
}
