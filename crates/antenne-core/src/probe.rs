// ── Condition probes ──
//
// Read-only checks against external services. Every failure is logged
// here and collapsed to `false`; nothing propagates to the evaluator.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use antenne_api::transport::TransportConfig;
use antenne_api::KickClient;

use crate::config::ProbeConfig;
use crate::error::CoreError;
use crate::model::{Community, RoomId, UserId};
use crate::platform::ChatPlatform;

// ── Livestream ──────────────────────────────────────────────────────

/// Source of the "is the stream live" condition.
#[async_trait]
pub trait LiveSignal: Send + Sync {
    /// Never fails; an unreachable source reads as offline.
    async fn is_live(&self) -> bool;
}

/// Liveness of one Kick channel.
#[derive(Debug, Clone)]
pub struct LivestreamProbe {
    client: KickClient,
    channel: String,
}

impl LivestreamProbe {
    pub fn new(config: &ProbeConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig::default().with_timeout(config.timeout);
        let client = KickClient::new(config.base_url.clone(), &transport)?;
        Ok(Self::with_client(client, config.channel.clone()))
    }

    pub fn with_client(client: KickClient, channel: impl Into<String>) -> Self {
        Self {
            client,
            channel: channel.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl LiveSignal for LivestreamProbe {
    async fn is_live(&self) -> bool {
        match self.client.channel(&self.channel).await {
            Ok(resp) => {
                let live = resp.is_live();
                if let Some(stream) = resp.livestream.as_ref().filter(|_| live) {
                    debug!(
                        channel = %self.channel,
                        title = stream.session_title.as_deref().unwrap_or(""),
                        viewers = stream.viewer_count.unwrap_or(0),
                        "livestream detected"
                    );
                }
                live
            }
            Err(e) if e.is_timeout() => {
                warn!(channel = %self.channel, "status API request timed out");
                false
            }
            Err(e) => {
                error!(channel = %self.channel, error = %e, "failed to check live status");
                false
            }
        }
    }
}

// ── Presence ────────────────────────────────────────────────────────

/// Whether the target user sits in the target voice room.
#[derive(Clone)]
pub struct PresenceProbe {
    platform: Arc<dyn ChatPlatform>,
    user: UserId,
    room: RoomId,
}

impl PresenceProbe {
    pub fn new(platform: Arc<dyn ChatPlatform>, user: UserId, room: RoomId) -> Self {
        Self {
            platform,
            user,
            room,
        }
    }

    /// Fail-closed: any lookup error reads as absent.
    pub async fn is_user_in_target_voice(&self, community: &Community) -> bool {
        match self.platform.member_voice_room(community, self.user).await {
            Ok(current) => {
                let present = current == Some(self.room);
                if !present {
                    debug!(user = %self.user, room = ?current.map(RoomId::get), "target user not in target room");
                }
                present
            }
            Err(e) => {
                error!(user = %self.user, community = %community.id, error = %e, "unable to fetch target member");
                false
            }
        }
    }
}
