// ── Core error types ──
//
// Errors surfaced by the relay and the platform seams. Probes never
// return these to the evaluator; they log and degrade to `false`.
// The `From<antenne_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

use crate::model::{CommunityId, RoomId, UserId};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Resolution errors ────────────────────────────────────────────
    #[error("Community not found: {id}")]
    CommunityNotFound { id: CommunityId },

    #[error("Voice room not found: {id}")]
    RoomNotFound { id: RoomId },

    #[error("Room {id} is not voice-capable ({kind})")]
    NotVoiceCapable { id: RoomId, kind: String },

    #[error("Member not found: {id}")]
    MemberNotFound { id: UserId },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Voice connection not ready after {timeout_ms}ms")]
    ConnectTimeout { timeout_ms: u64 },

    #[error("Voice connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Voice connection lost and not recovered within {timeout_ms}ms")]
    ReconnectTimeout { timeout_ms: u64 },

    // ── Playback errors ──────────────────────────────────────────────
    #[error("Failed to play {track}: {reason}")]
    Playback { track: String, reason: String },

    // ── Status API errors ────────────────────────────────────────────
    #[error("Status API request timed out after {timeout_ms}ms")]
    StatusTimeout { timeout_ms: u64 },

    #[error("Status API error: {message}")]
    StatusApi {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Platform errors ──────────────────────────────────────────────
    #[error("Platform error: {message}")]
    Platform { message: String },
}

impl CoreError {
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }

    /// Returns `true` if a bounded wait fired rather than a hard failure.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout { .. } | Self::ReconnectTimeout { .. } | Self::StatusTimeout { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<antenne_api::Error> for CoreError {
    fn from(err: antenne_api::Error) -> Self {
        match err {
            antenne_api::Error::Timeout { timeout_ms } => CoreError::StatusTimeout { timeout_ms },
            antenne_api::Error::Transport(ref e) if e.is_timeout() => {
                CoreError::StatusTimeout { timeout_ms: 0 }
            }
            antenne_api::Error::Transport(e) => CoreError::StatusApi {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            antenne_api::Error::Status { status } => CoreError::StatusApi {
                message: format!("HTTP {status}"),
                status: Some(status),
            },
            antenne_api::Error::InvalidUrl(e) => CoreError::StatusApi {
                message: format!("Invalid URL: {e}"),
                status: None,
            },
            antenne_api::Error::Deserialization { message, body: _ } => CoreError::StatusApi {
                message: format!("Deserialization error: {message}"),
                status: None,
            },
        }
    }
}
