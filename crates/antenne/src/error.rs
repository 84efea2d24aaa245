//! CLI error types with miette diagnostics.
//!
//! Every startup failure maps to a user-facing error with help text and a
//! stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use antenne_config::ConfigError;
use antenne_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const PLATFORM: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration: {field} {reason}")]
    #[diagnostic(
        code(antenne::config),
        help(
            "Set DISCORD_TOKEN, TARGET_GUILD_ID, TARGET_VOICE_CHANNEL_ID and TARGET_USER_ID\n\
             in the environment (or ANTENNE_* / the config file).\n\
             Inspect the effective settings with: antenne --check-config"
        )
    )]
    InvalidConfig { field: String, reason: String },

    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(antenne::no_config),
        help("Pass an existing file with --config, or omit it to use environment variables.")
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(antenne::config))]
    Config(ConfigError),

    // ── Platform ─────────────────────────────────────────────────────
    #[error("Livestream probe could not be created")]
    #[diagnostic(code(antenne::probe), help("Check kick_api_base in your configuration."))]
    Probe {
        #[source]
        source: CoreError,
    },

    #[cfg(feature = "discord")]
    #[error(transparent)]
    #[diagnostic(
        code(antenne::discord),
        help("Check DISCORD_TOKEN and that the bot was invited with the voice permissions.")
    )]
    Discord(#[from] antenne_discord::DiscordError),

    #[cfg(not(feature = "discord"))]
    #[error("This build has no chat platform backend")]
    #[diagnostic(
        code(antenne::no_backend),
        help("Rebuild with: cargo build --release -p antenne --features discord")
    )]
    NoBackend,
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::InvalidConfig { field, reason },
            ConfigError::NotFound { path } => Self::NoConfig {
                path: path.display().to_string(),
            },
            other => Self::Config(other),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig { .. } | Self::NoConfig { .. } | Self::Config(_) => {
                exit_code::CONFIG
            }
            #[cfg(feature = "discord")]
            Self::Discord(_) => exit_code::PLATFORM,
            #[cfg(not(feature = "discord"))]
            Self::NoBackend => exit_code::PLATFORM,
            Self::Probe { .. } => exit_code::GENERAL,
        }
    }
}
