//src/config.rs
use comfy_table::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::history::DEFAULT_HISTORY_SESSIONS;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_CONFIG_DIR: &str = "iron-log";
pub const CONFIG_ENV_VAR: &str = "IRON_LOG_CONFIG_DIR";

const MAX_AUTOSAVE_DELAY_MS: u64 = 60_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine configuration directory.")]
    CannotDetermineConfigDir,
    #[error("I/O error accessing config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config data (TOML): {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid color name: {0}")]
    InvalidColor(String),
    #[error("History session count must be at least 1.")]
    InvalidHistorySessions,
    #[error("Auto-save delay must be between 1 and {max} ms, got {0}.", max = MAX_AUTOSAVE_DELAY_MS)]
    InvalidAutosaveDelay(u64),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub const fn weight_label(self) -> &'static str {
        match self {
            Self::Metric => "kg",
            Self::Imperial => "lbs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum StandardColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    DarkGrey,
    DarkRed,
    DarkGreen,
    DarkYellow,
    DarkBlue,
    DarkMagenta,
    DarkCyan,
    Grey,
}

impl From<StandardColor> for Color {
    fn from(value: StandardColor) -> Self {
        match value {
            StandardColor::Black => Self::Black,
            StandardColor::Red => Self::Red,
            StandardColor::Green => Self::Green,
            StandardColor::Yellow => Self::Yellow,
            StandardColor::Blue => Self::Blue,
            StandardColor::Magenta => Self::Magenta,
            StandardColor::Cyan => Self::Cyan,
            StandardColor::White => Self::White,
            StandardColor::DarkGrey => Self::DarkGrey,
            StandardColor::DarkRed => Self::DarkRed,
            StandardColor::DarkGreen => Self::DarkGreen,
            StandardColor::DarkYellow => Self::DarkYellow,
            StandardColor::DarkBlue => Self::DarkBlue,
            StandardColor::DarkMagenta => Self::DarkMagenta,
            StandardColor::DarkCyan => Self::DarkCyan,
            StandardColor::Grey => Self::Grey,
        }
    }
}

/// Case-insensitive lookup of a color by its variant name.
/// # Errors
/// `ConfigError::InvalidColor` for anything not in `StandardColor`.
pub fn parse_color(color_str: &str) -> Result<StandardColor, ConfigError> {
    StandardColor::iter()
        .find(|color| format!("{color:?}").eq_ignore_ascii_case(color_str))
        .ok_or_else(|| ConfigError::InvalidColor(color_str.to_string()))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ThemeConfig {
    pub header_color: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            header_color: "Green".to_string(),
        }
    }
}

impl ThemeConfig {
    /// Table header color; an unknown name in the file falls back to green.
    pub fn header(&self) -> Color {
        parse_color(&self.header_color).map_or(Color::Green, Color::from)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub units: Units,
    /// How many earlier sessions the history view lists.
    pub history_sessions: usize,
    /// Quiet period before an edit is auto-saved.
    pub autosave_delay_ms: u64,
    pub theme: ThemeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            units: Units::default(),
            history_sessions: DEFAULT_HISTORY_SESSIONS,
            autosave_delay_ms: 500,
            theme: ThemeConfig::default(),
        }
    }
}

impl Config {
    pub const fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// # Errors
    /// `ConfigError::InvalidHistorySessions` for zero.
    pub fn set_history_sessions(&mut self, count: usize) -> Result<(), ConfigError> {
        if count == 0 {
            return Err(ConfigError::InvalidHistorySessions);
        }
        self.history_sessions = count;
        Ok(())
    }

    /// # Errors
    /// `ConfigError::InvalidAutosaveDelay` outside 1..=60000 ms.
    pub fn set_autosave_delay_ms(&mut self, delay_ms: u64) -> Result<(), ConfigError> {
        if delay_ms == 0 || delay_ms > MAX_AUTOSAVE_DELAY_MS {
            return Err(ConfigError::InvalidAutosaveDelay(delay_ms));
        }
        self.autosave_delay_ms = delay_ms;
        Ok(())
    }

    /// Stores the canonical variant name so the file round-trips cleanly.
    /// # Errors
    /// `ConfigError::InvalidColor`.
    pub fn set_header_color(&mut self, color_name: &str) -> Result<StandardColor, ConfigError> {
        let color = parse_color(color_name)?;
        self.theme.header_color = format!("{color:?}");
        Ok(color)
    }
}

/// `$IRON_LOG_CONFIG_DIR/config.toml` if set, otherwise the platform config dir.
/// The directory is created if missing.
/// # Errors
/// `CannotDetermineConfigDir` or `Io`.
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir_path = match std::env::var(CONFIG_ENV_VAR).ok() {
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if !path.is_dir() {
                warn!(
                    env = CONFIG_ENV_VAR,
                    path = %path.display(),
                    "config directory does not exist, creating it"
                );
            }
            path
        }
        None => dirs::config_dir()
            .ok_or(ConfigError::CannotDetermineConfigDir)?
            .join(APP_CONFIG_DIR),
    };

    if !config_dir_path.exists() {
        fs::create_dir_all(&config_dir_path)?;
    }

    Ok(config_dir_path.join(CONFIG_FILE_NAME))
}

/// Loads the config, writing the defaults first if the file does not exist.
/// # Errors
/// `Io`, `TomlParse` or `TomlSerialize`.
pub fn load_config(config_path: &Path) -> Result<Config, ConfigError> {
    if !config_path.exists() {
        debug!(path = %config_path.display(), "writing default config");
        let default_config = Config::default();
        save_config(config_path, &default_config)?;
        return Ok(default_config);
    }
    let config_content = fs::read_to_string(config_path)?;
    let config: Config = toml::from_str(&config_content)?;
    Ok(config)
}

/// # Errors
/// `Io` or `TomlSerialize`.
pub fn save_config(config_path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    let config_content = toml::to_string_pretty(config)?;
    fs::write(config_path, config_content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = toml::from_str("units = \"imperial\"\n").unwrap();
        assert_eq!(config.units, Units::Imperial);
        assert_eq!(config.history_sessions, DEFAULT_HISTORY_SESSIONS);
        assert_eq!(config.autosave_delay(), Duration::from_millis(500));
        assert_eq!(config.theme.header_color, "Green");
    }

    #[test]
    fn parse_color_is_case_insensitive() {
        assert_eq!(parse_color("darkblue").unwrap(), StandardColor::DarkBlue);
        assert!(matches!(
            parse_color("ultraviolet"),
            Err(ConfigError::InvalidColor(_))
        ));
    }

    #[test]
    fn setters_reject_out_of_range_values() {
        let mut config = Config::default();
        assert!(config.set_history_sessions(0).is_err());
        assert!(config.set_autosave_delay_ms(0).is_err());
        assert!(config.set_autosave_delay_ms(MAX_AUTOSAVE_DELAY_MS + 1).is_err());
        config.set_autosave_delay_ms(250).unwrap();
        config.set_header_color("CYAN").unwrap();
        assert_eq!(config.theme.header_color, "Cyan");
        assert_eq!(config.autosave_delay_ms, 250);
    }

    #[test]
    fn load_writes_defaults_then_round_trips() {
        let dir = std::env::temp_dir().join(format!("iron-log-config-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE_NAME);
        let _ = fs::remove_dir_all(&dir);

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, Config::default());
        assert!(path.exists());

        let mut changed = loaded;
        changed.history_sessions = 5;
        save_config(&path, &changed).unwrap();
        assert_eq!(load_config(&path).unwrap().history_sessions, 5);

        let _ = fs::remove_dir_all(&dir);
    }
}
