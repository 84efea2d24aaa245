//! Presence-triggered audio relay.
//!
//! Two probes (livestream liveness, target user presence) feed a
//! [`ConditionEvaluator`] on a fixed [`Scheduler`] tick. While both hold,
//! the [`AudioRelay`] keeps one voice connection in the target room and
//! loops the audio directory; as soon as either fails it leaves.
//!
//! The chat platform and its audio pipeline are reached only through the
//! traits in [`platform`], so the state machine runs against fakes in
//! tests and against `antenne-discord` in production.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod platform;
pub mod playlist;
pub mod probe;
pub mod relay;
pub mod scheduler;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ProbeConfig, RelayConfig, Target};
pub use error::CoreError;
pub use evaluator::{Action, ConditionEvaluator, Evaluation};
pub use model::{
    Community, CommunityId, ConditionSnapshot, Room, RoomId, RoomKind, Track, UserId,
};
pub use platform::{
    AudioEvent, AudioOutput, ChatPlatform, PlaybackStatus, VoiceConnection, VoiceStatus,
};
pub use playlist::PlaylistStore;
pub use probe::{LiveSignal, LivestreamProbe, PresenceProbe};
pub use relay::{AudioRelay, ConnectOutcome, ConnectionState};
pub use scheduler::Scheduler;
