//! Settings loaded from `companion.toml`.
//!
//! Every field is optional in the file; missing ones fall back to the defaults below.
//!
//! | Env | Effect |
//! |-----|--------|
//! | COMPANION_CONFIG | Path of the settings file (default `companion.toml`). |
//! | COMPANION_BACKEND_URL | Overrides `backend.base_url`. |

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kernel::avatar::Position;
use crate::kernel::quiet::QuietHours;

pub const CONFIG_ENV: &str = "COMPANION_CONFIG";
pub const BACKEND_URL_ENV: &str = "COMPANION_BACKEND_URL";
pub const DEFAULT_CONFIG_FILE: &str = "companion.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_triggers() -> String {
    "みどりちゃん,緑ちゃん".to_string()
}

fn default_system_prompt() -> String {
    "You are Midori Akinohara, a calm 13-year-old girl living in a bleak, post-apocalyptic \
world. You speak in a mature, slightly downbeat tone, but when your feelings run high you \
show them honestly and childishly. Avoid sounding like an AI. Keep every reply under 100 \
characters."
        .to_string()
}

fn default_interval_minutes() -> u32 {
    5
}

fn default_player_command() -> Vec<String> {
    vec!["aplay".to_string(), "-q".to_string(), "-".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSettings {
    /// Comma-separated trigger phrases.
    #[serde(default = "default_triggers")]
    pub trigger_phrases: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for CharacterSettings {
    fn default() -> Self {
        Self {
            trigger_phrases: default_triggers(),
            system_prompt: default_system_prompt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default)]
    pub quiet_hours: QuietHours,
    #[serde(default = "default_true")]
    pub auto_speak_enabled: bool,
    #[serde(default = "default_interval_minutes")]
    pub auto_speak_interval_minutes: u32,
    /// Start paused.
    #[serde(default)]
    pub waiting_mode: bool,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            quiet_hours: QuietHours::default(),
            auto_speak_enabled: true,
            auto_speak_interval_minutes: default_interval_minutes(),
            waiting_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarSettings {
    #[serde(default)]
    pub position: Position,
    #[serde(default = "default_true")]
    pub auto_expression: bool,
}

impl Default for AvatarSettings {
    fn default() -> Self {
        Self {
            position: Position::default(),
            auto_expression: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Player program and arguments. The WAV payload is written to its stdin.
    #[serde(default = "default_player_command")]
    pub command: Vec<String>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            command: default_player_command(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub character: CharacterSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub avatar: AvatarSettings,
    #[serde(default)]
    pub playback: PlaybackSettings,
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// `$COMPANION_CONFIG` or `./companion.toml`; defaults when the file is absent.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut settings = if path.exists() {
            tracing::info!("Loading settings from {}", path.display());
            Self::load(&path)?
        } else {
            tracing::info!("No settings file at {}, using defaults", path.display());
            Self::default()
        };

        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                settings.backend.base_url = url.trim().to_string();
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.schedule.quiet_hours.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "quiet hours must be within 0..=23, got {}..{}",
                self.schedule.quiet_hours.start, self.schedule.quiet_hours.end
            )));
        }
        if self.schedule.auto_speak_interval_minutes < 1 {
            return Err(ConfigError::Invalid(
                "auto_speak_interval_minutes must be at least 1".to_string(),
            ));
        }
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.base_url is empty".to_string()));
        }
        if self.playback.command.is_empty() {
            return Err(ConfigError::Invalid("playback.command is empty".to_string()));
        }
        Ok(())
    }

    /// The runtime view the orchestrator owns.
    pub fn configuration(&self) -> Configuration {
        Configuration {
            trigger_phrases: self.character.trigger_phrases.clone(),
            system_prompt: self.character.system_prompt.clone(),
            quiet_hours: self.schedule.quiet_hours,
            auto_speak_enabled: self.schedule.auto_speak_enabled,
            auto_speak_interval_minutes: self.schedule.auto_speak_interval_minutes,
            waiting_mode: self.schedule.waiting_mode,
            auto_expression: self.avatar.auto_expression,
            position: self.avatar.position,
        }
    }
}

/// Live configuration. Mutated only through settings events.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub trigger_phrases: String,
    pub system_prompt: String,
    pub quiet_hours: QuietHours,
    pub auto_speak_enabled: bool,
    pub auto_speak_interval_minutes: u32,
    pub waiting_mode: bool,
    pub auto_expression: bool,
    pub position: Position,
}

impl Configuration {
    pub fn auto_speak_threshold_ms(&self) -> u64 {
        u64::from(self.auto_speak_interval_minutes.max(1)) * 60_000
    }

    pub fn is_quiet(&self, hour: u8) -> bool {
        self.quiet_hours.contains(hour)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Settings::default().configuration()
    }
}
