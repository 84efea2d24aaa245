//! Configuration for the antenne relay.
//!
//! Layered with figment: built-in defaults, an optional TOML file, the
//! bare environment names the bot has always read (`DISCORD_TOKEN`,
//! `TARGET_GUILD_ID`, ...), `ANTENNE_*` prefixed variables, then CLI
//! overrides. [`Settings::resolve`] validates the result and turns it
//! into the core's `RelayConfig` / `ProbeConfig` plus the bot token.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use antenne_core::{CommunityId, ProbeConfig, RelayConfig, RoomId, Target, UserId};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── Settings ────────────────────────────────────────────────────────

/// Bare environment names read without a prefix.
const LEGACY_ENV: [&str; 8] = [
    "DISCORD_TOKEN",
    "KICK_CHANNEL_SLUG",
    "TARGET_GUILD_ID",
    "TARGET_VOICE_CHANNEL_ID",
    "TARGET_USER_ID",
    "CHECK_INTERVAL_MS",
    "KICK_TIMEOUT_MS",
    "AUDIO_DIRECTORY",
];

/// Flat settings as read from every layer, before validation.
///
/// Field names match the lowercased environment names so one struct
/// serves the TOML file and both env layers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Bot token (plaintext here; wrapped in a secret on resolve).
    pub discord_token: Option<String>,

    /// Kick channel slug to watch.
    pub kick_channel_slug: String,

    pub target_guild_id: Option<u64>,
    pub target_voice_channel_id: Option<u64>,
    pub target_user_id: Option<u64>,

    /// Evaluation interval.
    pub check_interval_ms: u64,

    /// Bound on a single status API request.
    pub kick_timeout_ms: u64,

    /// Flat directory of tracks.
    pub audio_directory: PathBuf,

    /// Accepted track extensions, case-insensitive.
    pub audio_extensions: Vec<String>,

    /// Status API root.
    pub kick_api_base: String,

    pub connect_timeout_ms: u64,
    pub reconnect_window_ms: u64,
    pub retry_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            discord_token: None,
            kick_channel_slug: "triskel".into(),
            target_guild_id: None,
            target_voice_channel_id: None,
            target_user_id: None,
            check_interval_ms: 30_000,
            kick_timeout_ms: 10_000,
            audio_directory: PathBuf::from("audios"),
            audio_extensions: vec!["mp3".into()],
            kick_api_base: "https://kick.com".into(),
            connect_timeout_ms: 20_000,
            reconnect_window_ms: 5_000,
            retry_delay_ms: 1_000,
        }
    }
}

/// Command-line overrides; the last layer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_directory: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_interval_ms: Option<u64>,
}

/// Validated configuration, ready to hand to the core and the adapter.
#[derive(Debug)]
pub struct Resolved {
    pub token: SecretString,
    pub relay: RelayConfig,
    pub probe: ProbeConfig,
}

impl Settings {
    /// Validate and convert. Every failure is fatal at startup.
    pub fn resolve(self) -> Result<Resolved, ConfigError> {
        let token = self
            .discord_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::invalid("discord_token", "a bot token is required"))?;

        let target = Target {
            community: CommunityId::new(required_id("target_guild_id", self.target_guild_id)?),
            room: RoomId::new(required_id(
                "target_voice_channel_id",
                self.target_voice_channel_id,
            )?),
            user: UserId::new(required_id("target_user_id", self.target_user_id)?),
        };

        let channel = self.kick_channel_slug.trim();
        if channel.is_empty() {
            return Err(ConfigError::invalid("kick_channel_slug", "must not be empty"));
        }

        let base_url: Url = self
            .kick_api_base
            .parse()
            .map_err(|e| ConfigError::invalid("kick_api_base", format!("{e}: {}", self.kick_api_base)))?;

        let extensions: Vec<String> = self
            .audio_extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if extensions.is_empty() {
            return Err(ConfigError::invalid(
                "audio_extensions",
                "at least one extension is required",
            ));
        }

        let mut relay = RelayConfig::new(target, self.audio_directory.clone());
        relay.extensions = extensions;
        relay.check_interval = positive_ms("check_interval_ms", self.check_interval_ms)?;
        relay.connect_timeout = positive_ms("connect_timeout_ms", self.connect_timeout_ms)?;
        relay.reconnect_window = positive_ms("reconnect_window_ms", self.reconnect_window_ms)?;
        relay.retry_delay = positive_ms("retry_delay_ms", self.retry_delay_ms)?;

        let mut probe = ProbeConfig::new(base_url, channel);
        probe.timeout = positive_ms("kick_timeout_ms", self.kick_timeout_ms)?;

        Ok(Resolved {
            token: SecretString::from(token.to_owned()),
            relay,
            probe,
        })
    }

    /// TOML rendering with the token masked, for `--check-config`.
    pub fn redacted(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.discord_token.is_some() {
            shown.discord_token = Some("********".into());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

fn required_id(field: &str, value: Option<u64>) -> Result<u64, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::invalid(field, "must be non-zero")),
        Some(id) => Ok(id),
        None => Err(ConfigError::invalid(field, "is required")),
    }
}

fn positive_ms(field: &str, ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::invalid(field, "must be greater than zero"));
    }
    Ok(Duration::from_millis(ms))
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "libre-antenne", "antenne").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("antenne");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Provider stack. `file` is read when present and skipped otherwise.
pub fn figment(file: Option<&Path>, overrides: &Overrides) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));
    if let Some(path) = file {
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(Env::raw().only(&LEGACY_ENV))
        .merge(Env::prefixed("ANTENNE_"))
        .merge(Serialized::defaults(overrides))
}

/// Load settings. An explicit `path` must exist; otherwise the platform
/// config file is used when present.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(p) if !p.is_file() => {
            return Err(ConfigError::NotFound { path: p.to_path_buf() });
        }
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    Ok(figment(Some(&file), overrides).extract()?)
}

/// Create the audio directory if it does not exist yet.
pub fn ensure_audio_dir(relay: &RelayConfig) -> Result<(), ConfigError> {
    std::fs::create_dir_all(&relay.audio_dir)?;
    Ok(())
}
