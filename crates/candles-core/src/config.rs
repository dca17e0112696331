//! Candles configuration system.

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{CandlesError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandlesConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// IANA time zone name the trigger time is interpreted in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Local wall-clock time of the daily poll, "HH:MM".
    #[serde(default = "default_trigger_time")]
    pub trigger_time: String,
    #[serde(default)]
    pub discord: DiscordConfig,
}

fn default_database_path() -> String {
    "~/.candles/candles.sqlite".into()
}
fn default_timezone() -> String {
    "America/New_York".into()
}
fn default_trigger_time() -> String {
    "09:00".into()
}

impl Default for CandlesConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            timezone: default_timezone(),
            trigger_time: default_trigger_time(),
            discord: DiscordConfig::default(),
        }
    }
}

impl CandlesConfig {
    /// Load config from the default path (~/.candles/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CandlesError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CandlesError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".candles")
            .join("config.toml")
    }

    /// Parse the configured time zone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| CandlesError::Config(format!("Invalid timezone '{}': {e}", self.timezone)))
    }

    /// Parse the configured trigger time.
    pub fn trigger(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.trigger_time, "%H:%M").map_err(|e| {
            CandlesError::Config(format!(
                "Invalid trigger_time '{}' (expected HH:MM): {e}",
                self.trigger_time
            ))
        })
    }
}

/// Discord channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            enabled: default_true(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse() {
        let config = CandlesConfig::default();
        assert_eq!(config.tz().unwrap(), chrono_tz::America::New_York);
        assert_eq!(
            config.trigger().unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_load_from_toml() {
        let dir = std::env::temp_dir().join("candles-config-test");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "timezone = \"Europe/Paris\"\ntrigger_time = \"07:30\"\n\n[discord]\nbot_token = \"t\"\n",
        )
        .unwrap();

        let config = CandlesConfig::load_from(&path).unwrap();
        assert_eq!(config.tz().unwrap(), chrono_tz::Europe::Paris);
        assert_eq!(
            config.trigger().unwrap(),
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
        assert_eq!(config.discord.bot_token, "t");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_bad_timezone_rejected() {
        let config = CandlesConfig {
            timezone: "Mars/Olympus".into(),
            ..Default::default()
        };
        assert!(config.tz().is_err());
    }
}
