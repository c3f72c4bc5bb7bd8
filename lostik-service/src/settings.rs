//! Service settings
//!
//! Read from a JSON file so a node's radio and slot configuration survive
//! restarts. Every field is optional; missing ones take the defaults of the
//! deployed network.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lostik_protocol::{RadioSettings, TxPower, EXPECTED_FIRMWARE};
use lostik_tdma::{ServiceConfig, SlotPlan, SlotPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading the settings file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings file contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceSettings {
    /// Message database
    pub database: PathBuf,
    /// Serial port; found by USB ID when unset
    pub port: Option<String>,
    pub expected_firmware: String,
    pub radio: RadioSettings,
    pub slot_plan: SlotPlan,
    pub slot_policy: SlotPolicy,
    pub idle_backoff_ms: u64,
    pub read_timeout_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            database: default_database(),
            port: None,
            expected_firmware: EXPECTED_FIRMWARE.to_string(),
            radio: RadioSettings::default(),
            slot_plan: SlotPlan::default(),
            slot_policy: SlotPolicy::default(),
            idle_backoff_ms: 1000,
            read_timeout_ms: 1000,
        }
    }
}

fn default_database() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("lostik").join("lora_chat.db"))
        .unwrap_or_else(|| PathBuf::from("lora_chat.db"))
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub port: Option<String>,
    pub power: Option<TxPower>,
    pub self_learning: bool,
}

impl ServiceSettings {
    /// Get the XDG config directory for lostik
    /// Uses $XDG_CONFIG_HOME/lostik, falls back to ~/.config/lostik
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("lostik"));
            }
        }
        dirs::home_dir().map(|h| h.join(".config").join("lostik"))
    }

    /// Default settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings
    ///
    /// An explicit path must exist. Without one the default location is
    /// used if present, otherwise built-in defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match Self::settings_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply command-line overrides
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(database) = overrides.database {
            self.database = database;
        }
        if overrides.port.is_some() {
            self.port = overrides.port;
        }
        if let Some(power) = overrides.power {
            self.radio.power = power;
        }
        if overrides.self_learning {
            self.slot_policy = SlotPolicy::SelfLearning;
        }
    }

    /// Freeze into the configuration handed to the service
    pub fn to_config(&self) -> ServiceConfig {
        ServiceConfig {
            port: self.port.clone(),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            expected_firmware: self.expected_firmware.clone(),
            radio: self.radio.clone(),
            slot_plan: self.slot_plan,
            slot_policy: self.slot_policy.clone(),
            idle_backoff: Duration::from_millis(self.idle_backoff_ms),
            ..ServiceConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lostik_tdma::SlotId;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "database": "/tmp/chat.db",
                "radio": { "power": "high", "sync_word": "34" },
                "slot_policy": { "mode": "static", "slots": { "0004A30B001A2B3C": 2 } }
            }"#,
        )
        .unwrap();

        let settings = ServiceSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.database, PathBuf::from("/tmp/chat.db"));
        assert_eq!(settings.radio.power, TxPower::High);
        assert_eq!(settings.radio.frequency_hz, 923_300_000);
        assert_eq!(settings.radio.sync_word.as_deref(), Some("34"));
        assert_eq!(settings.slot_plan, SlotPlan::default());

        let config = settings.to_config();
        assert!(config.validate().is_ok());
        match config.slot_policy {
            SlotPolicy::Static { slots } => {
                assert_eq!(slots.get("0004A30B001A2B3C"), Some(SlotId(2)))
            }
            other => panic!("unexpected policy {:?}", other),
        }
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(
            ServiceSettings::load(Some(&path)),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "radio": { "power": "ludicrous" } }"#).unwrap();
        assert!(matches!(
            ServiceSettings::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_overrides_win() {
        let mut settings = ServiceSettings::default();
        settings.apply(Overrides {
            database: Some("/var/lib/lostik/chat.db".into()),
            port: Some("/dev/ttyUSB3".into()),
            power: Some(TxPower::Medium),
            self_learning: true,
        });

        let config = settings.to_config();
        assert_eq!(config.port.as_deref(), Some("/dev/ttyUSB3"));
        assert_eq!(config.radio.power, TxPower::Medium);
        assert_eq!(config.slot_policy, SlotPolicy::SelfLearning);
        assert_eq!(settings.database, PathBuf::from("/var/lib/lostik/chat.db"));
    }

    #[test]
    fn test_round_trip_through_json() {
        let settings = ServiceSettings::default();
        let json = serde_json::to_string_pretty(&settings).unwrap();
        let parsed: ServiceSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, settings);
    }
}
