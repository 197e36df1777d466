//! TOML-based device configuration.
//!
//! Stored at `~/.config/reveille/config.toml`. Every field defaults, so
//! a missing or partially written file never blocks startup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Ringing sound preferences. The core only carries these for the front
/// end; it never plays audio itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 0..=100.
    #[serde(default = "default_volume")]
    pub volume: u32,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: default_volume(),
        }
    }
}

/// Per-device configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Signed-in user identifier (email-like). `None` until first login.
    pub user: Option<String>,
    pub sound: SoundConfig,
}

impl DeviceConfig {
    /// Default on-disk location.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("reveille").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::ReadFailed {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_failed = |source| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        fs::write(path, text).map_err(write_failed)
    }
}

fn default_true() -> bool {
    true
}

fn default_volume() -> u32 {
    80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DeviceConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg, DeviceConfig::default());
        assert!(cfg.sound.enabled);
        assert_eq!(cfg.sound.volume, 80);
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = DeviceConfig {
            user: Some("a@x".into()),
            sound: SoundConfig {
                enabled: false,
                volume: 35,
            },
        };
        cfg.save_to(&path).unwrap();
        assert_eq!(DeviceConfig::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "user = \"a@x\"\n").unwrap();
        let cfg = DeviceConfig::load_from(&path).unwrap();
        assert_eq!(cfg.user.as_deref(), Some("a@x"));
        assert_eq!(cfg.sound, SoundConfig::default());
    }
}
