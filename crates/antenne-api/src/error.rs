use thiserror::Error;

/// Top-level error type for the `antenne-api` crate.
///
/// Covers every failure mode of a status lookup: transport, timeout,
/// non-success HTTP status, and body decoding. `antenne-core` folds these
/// into its own taxonomy, and the probes degrade all of them to "offline".
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request did not complete within the configured bound.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Status API ──────────────────────────────────────────────────
    /// The status endpoint answered with a non-success HTTP status.
    #[error("Status API returned HTTP {status}")]
    Status { status: u16 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the request was cut short by a timeout, either
    /// ours or the one baked into the HTTP client.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next evaluation tick.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Status { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the channel does not exist on the status API.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_transient() {
        let err = Error::Timeout { timeout_ms: 10_000 };
        assert!(err.is_timeout());
        assert!(err.is_transient());
    }

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        assert!(Error::Status { status: 503 }.is_transient());
        assert!(Error::Status { status: 429 }.is_transient());
        assert!(!Error::Status { status: 403 }.is_transient());
    }

    #[test]
    fn not_found_detection() {
        assert!(Error::Status { status: 404 }.is_not_found());
        assert!(!Error::Status { status: 500 }.is_not_found());
        assert!(!Error::Timeout { timeout_ms: 1 }.is_not_found());
    }
}
