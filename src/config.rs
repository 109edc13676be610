//! User preferences.
//!
//! Stored as JSON in the platform config directory. Every field has a serde
//! default so older or partial files still load.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Step used by seek-forward / seek-backward.
    #[serde(default = "default_seek_step")]
    pub seek_step_secs: f64,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_rate")]
    pub playback_rate: f32,
    /// Rates offered by the speed picker.
    #[serde(default = "default_speed_presets")]
    pub speed_presets: Vec<f32>,
}

fn default_seek_step() -> f64 {
    10.0
}

fn default_volume() -> f32 {
    1.0
}

fn default_rate() -> f32 {
    1.0
}

fn default_speed_presets() -> Vec<f32> {
    vec![0.5, 0.75, 1.0, 1.25, 1.5, 2.0]
}

impl Default for Config {
    fn default() -> Self {
        Config {
            seek_step_secs: default_seek_step(),
            volume: default_volume(),
            playback_rate: default_rate(),
            speed_presets: default_speed_presets(),
        }
    }
}

impl Config {
    /// `<config dir>/tunebox/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tunebox").join(CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Config::default(),
        }
    }

    /// Load from `path`. A missing, unreadable, corrupt or invalid file yields
    /// the defaults.
    pub fn load_from(path: &Path) -> Self {
        match Self::try_load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), "unusable config file, using defaults: {}", e);
                Config::default()
            }
        }
    }

    /// Load from `path`, failing on a file that exists but cannot be read,
    /// parsed or validated. A missing file yields the defaults.
    pub fn try_load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(Error::InvalidVolume(self.volume));
        }
        if let Some(&bad) = std::iter::once(&self.playback_rate)
            .chain(&self.speed_presets)
            .find(|r| !r.is_finite() || **r <= 0.0)
        {
            return Err(Error::InvalidRate(bad));
        }
        if !self.seek_step_secs.is_finite() || self.seek_step_secs <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "seek step must be positive, got {}",
                self.seek_step_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_player_controls() {
        let config = Config::default();
        assert_eq!(config.seek_step_secs, 10.0);
        assert_eq!(config.volume, 1.0);
        assert_eq!(config.playback_rate, 1.0);
        assert!(config.speed_presets.contains(&1.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{"volume":0.3}"#).unwrap();
        assert_eq!(config.volume, 0.3);
        assert_eq!(config.seek_step_secs, 10.0);
        assert_eq!(config.speed_presets.len(), 6);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunebox").join("config.json");
        let config = Config {
            seek_step_secs: 5.0,
            volume: 0.5,
            playback_rate: 1.25,
            speed_presets: vec![1.0, 2.0],
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn corrupt_or_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        fs::write(&path, "nope").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());

        fs::write(&path, r#"{"volume":3.0}"#).unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn validate_rejects_bad_rates() {
        let config = Config {
            speed_presets: vec![1.0, 0.0],
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidRate(_))));
    }

    #[test]
    fn strict_load_reports_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(Config::try_load_from(&path).unwrap(), Config::default());

        fs::write(&path, "nope").unwrap();
        assert!(matches!(Config::try_load_from(&path), Err(Error::Json(_))));

        fs::write(&path, r#"{"seek_step_secs":0}"#).unwrap();
        assert!(matches!(
            Config::try_load_from(&path),
            Err(Error::InvalidConfig(_))
        ));

        fs::write(&path, r#"{"volume":0.2}"#).unwrap();
        assert_eq!(Config::try_load_from(&path).unwrap().volume, 0.2);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            Config::load_from(&dir.path().join("absent.json")),
            Config::default()
        );
    }
}
