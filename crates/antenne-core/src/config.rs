// ── Runtime configuration ──
//
// These types describe *what* the relay watches and how long it waits.
// They never touch disk or the environment: the binary builds them via
// `antenne-config` and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::model::{CommunityId, RoomId, UserId};

/// The single community/room/user triple the relay is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub community: CommunityId,
    pub room: RoomId,
    pub user: UserId,
}

/// Relay timing and playlist source.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub target: Target,
    /// Flat directory scanned for tracks on every new connection.
    pub audio_dir: PathBuf,
    /// Accepted file extensions, compared case-insensitively.
    pub extensions: Vec<String>,
    /// How often the evaluator runs.
    pub check_interval: Duration,
    /// Bound on a fresh connection reaching `Ready`.
    pub connect_timeout: Duration,
    /// Bound on each recovery signal after an unsolicited disconnect.
    pub reconnect_window: Duration,
    /// Delay before retrying once every track failed to start.
    pub retry_delay: Duration,
}

impl RelayConfig {
    pub fn new(target: Target, audio_dir: impl Into<PathBuf>) -> Self {
        Self {
            target,
            audio_dir: audio_dir.into(),
            extensions: vec!["mp3".into()],
            check_interval: Duration::from_millis(30_000),
            connect_timeout: Duration::from_millis(20_000),
            reconnect_window: Duration::from_millis(5_000),
            retry_delay: Duration::from_millis(1_000),
        }
    }
}

/// Livestream status source.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Status API root (e.g., `https://kick.com`).
    pub base_url: Url,
    /// Channel slug to watch.
    pub channel: String,
    /// Bound on a single status request.
    pub timeout: Duration,
}

impl ProbeConfig {
    pub fn new(base_url: Url, channel: impl Into<String>) -> Self {
        Self {
            base_url,
            channel: channel.into(),
            timeout: Duration::from_millis(10_000),
        }
    }
}
