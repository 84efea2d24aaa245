// ── Platform seams ──
//
// The chat platform and its audio pipeline are external collaborators.
// The relay only talks to them through these traits; `antenne-discord`
// provides the production implementation and the tests provide fakes.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use crate::error::CoreError;
use crate::model::{Community, CommunityId, Room, RoomId, Track, UserId};

// ── Voice connection ────────────────────────────────────────────────

/// Status of a platform voice connection, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum VoiceStatus {
    Signalling,
    Connecting,
    Ready,
    Disconnected,
    Destroyed,
}

impl VoiceStatus {
    /// A status that shows the platform is re-establishing the link on
    /// its own after a drop.
    pub fn is_recovering(self) -> bool {
        matches!(self, Self::Signalling | Self::Connecting | Self::Ready)
    }
}

/// A joined voice room.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Subscribe to status transitions. The receiver starts at the
    /// current status.
    fn status(&self) -> watch::Receiver<VoiceStatus>;

    /// Route the platform audio output into this connection.
    async fn subscribe_audio(&self) -> Result<(), CoreError>;

    /// Leave the room and release the connection. Calling it twice is
    /// allowed; the second call is a no-op.
    async fn destroy(&self) -> Result<(), CoreError>;
}

// ── Audio output ────────────────────────────────────────────────────

/// Mirror of the audio pipeline's own state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing,
}

/// Notification emitted by the audio pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEvent {
    /// The pipeline has nothing left to play.
    Idle,
    /// A track started.
    Playing { track: String },
    /// The pipeline reported an error while playing.
    Error { message: String },
}

/// The platform audio pipeline.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Create a playable resource from `track` and start it, replacing
    /// whatever was playing.
    async fn play(&self, track: &Track) -> Result<(), CoreError>;

    /// Stop playback and drop the current resource.
    async fn stop(&self);

    /// Current pipeline state.
    fn status(&self) -> PlaybackStatus;

    /// Subscribe to pipeline notifications.
    fn events(&self) -> broadcast::Receiver<AudioEvent>;
}

// ── Chat platform ───────────────────────────────────────────────────

/// Operations the relay consumes from the chat platform client.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Community from the client's local cache, if present.
    fn cached_community(&self, id: CommunityId) -> Option<Community>;

    /// Community fetched from the platform.
    async fn fetch_community(&self, id: CommunityId) -> Result<Community, CoreError>;

    /// The voice room `user` currently sits in, if any.
    async fn member_voice_room(
        &self,
        community: &Community,
        user: UserId,
    ) -> Result<Option<RoomId>, CoreError>;

    /// Resolve a room by id, cache first.
    async fn resolve_room(&self, community: &Community, room: RoomId) -> Result<Room, CoreError>;

    /// Start joining `room`. The returned connection reports progress
    /// through [`VoiceConnection::status`].
    async fn join(
        &self,
        community: &Community,
        room: RoomId,
    ) -> Result<Arc<dyn VoiceConnection>, CoreError>;
}
