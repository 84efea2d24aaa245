use thiserror::Error;

/// Startup failures of the Discord client.
#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("Discord client error: {0}")]
    Client(#[from] serenity::Error),

    #[error("Discord gateway not ready after {timeout_ms}ms")]
    ReadyTimeout { timeout_ms: u64 },

    #[error("Discord gateway closed before becoming ready")]
    GatewayClosed,
}
