use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::play_state::{DEFAULT_LINE_CLEAR_FRAME_DELAY_US, PlayConfig};

pub const MAX_START_LEVEL: u32 = 19;
pub const MIN_LINE_CLEAR_FRAME_DELAY_US: u32 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSettings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub start_level: u32,
    #[serde(default = "default_line_clear_frame_delay_us")]
    pub line_clear_frame_delay_us: u32,
    #[serde(default = "default_debug_intents")]
    pub debug_intents: bool,
    /// Fixed piece seed; `None` lets the caller reseed from its own entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            version: default_version(),
            start_level: 0,
            line_clear_frame_delay_us: default_line_clear_frame_delay_us(),
            debug_intents: default_debug_intents(),
            seed: None,
        }
    }
}

impl GameSettings {
    pub fn sanitized(mut self) -> Self {
        self.version = default_version();
        self.start_level = self.start_level.min(MAX_START_LEVEL);
        self.line_clear_frame_delay_us = self
            .line_clear_frame_delay_us
            .max(MIN_LINE_CLEAR_FRAME_DELAY_US);
        self
    }

    pub fn play_config(&self) -> PlayConfig {
        PlayConfig {
            start_level: self.start_level.min(MAX_START_LEVEL),
            line_clear_frame_delay_us: self
                .line_clear_frame_delay_us
                .max(MIN_LINE_CLEAR_FRAME_DELAY_US),
            debug_intents: self.debug_intents,
        }
    }
}

fn default_version() -> u32 {
    1
}

fn default_line_clear_frame_delay_us() -> u32 {
    DEFAULT_LINE_CLEAR_FRAME_DELAY_US
}

fn default_debug_intents() -> bool {
    cfg!(debug_assertions)
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os("LEDTRIS_SETTINGS_PATH") {
            return Self::new(explicit);
        }

        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut path = base;
        path.push("ledtris");
        path.push("settings.json");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files yield the defaults.
    pub fn load(&self) -> GameSettings {
        let Ok(bytes) = fs::read(&self.path) else {
            return GameSettings::default();
        };
        serde_json::from_slice::<GameSettings>(&bytes)
            .map(GameSettings::sanitized)
            .unwrap_or_else(|err| {
                tracing::warn!(path = %self.path.display(), %err, "ignoring unreadable settings");
                GameSettings::default()
            })
    }

    pub fn save(&self, settings: &GameSettings) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(settings)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_clamps_expected_fields() {
        let settings = GameSettings {
            version: 99,
            start_level: 40,
            line_clear_frame_delay_us: 3,
            ..GameSettings::default()
        }
        .sanitized();

        assert_eq!(settings.version, 1);
        assert_eq!(settings.start_level, MAX_START_LEVEL);
        assert_eq!(settings.line_clear_frame_delay_us, MIN_LINE_CLEAR_FRAME_DELAY_US);
    }

    #[test]
    fn serde_defaults_fill_missing_fields() {
        let parsed: GameSettings =
            serde_json::from_str(r#"{"start_level":7}"#).expect("settings JSON should parse");
        assert_eq!(parsed.start_level, 7);
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.line_clear_frame_delay_us, DEFAULT_LINE_CLEAR_FRAME_DELAY_US);
        assert_eq!(parsed.debug_intents, cfg!(debug_assertions));
        assert_eq!(parsed.seed, None);
    }

    #[test]
    fn play_config_carries_start_level() {
        let settings = GameSettings {
            start_level: 5,
            debug_intents: true,
            ..GameSettings::default()
        };
        let config = settings.play_config();
        assert_eq!(config.start_level, 5);
        assert!(config.debug_intents);
    }
}
