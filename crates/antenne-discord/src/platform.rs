// ── Discord platform ──
//
// Guild, channel and voice-state lookups go to the gateway cache first and
// fall back to REST. Voice presence is cache-only: Discord exposes voice
// states through the gateway, not through a member fetch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serenity::all::{
    Cache, Channel, ChannelId, ChannelType, GuildChannel, GuildId, Http, UserId as DiscordUserId,
};
use songbird::events::{CoreEvent, Event, EventContext, EventHandler};
use songbird::{Call, Songbird};
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use antenne_core::{
    ChatPlatform, Community, CommunityId, CoreError, Room, RoomId, RoomKind, UserId,
    VoiceConnection, VoiceStatus,
};

use crate::player::SongbirdPlayer;

/// [`ChatPlatform`] over a serenity client with songbird registered.
pub struct DiscordPlatform {
    cache: Arc<Cache>,
    http: Arc<Http>,
    songbird: Arc<Songbird>,
    player: Arc<SongbirdPlayer>,
}

impl DiscordPlatform {
    pub fn new(
        cache: Arc<Cache>,
        http: Arc<Http>,
        songbird: Arc<Songbird>,
        player: Arc<SongbirdPlayer>,
    ) -> Self {
        Self {
            cache,
            http,
            songbird,
            player,
        }
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    fn cached_community(&self, id: CommunityId) -> Option<Community> {
        self.cache.guild(GuildId::new(id.get())).map(|guild| Community {
            id,
            name: guild.name.clone(),
        })
    }

    async fn fetch_community(&self, id: CommunityId) -> Result<Community, CoreError> {
        let guild = self
            .http
            .get_guild(GuildId::new(id.get()))
            .await
            .map_err(|e| {
                debug!(guild_id = %id, error = %e, "guild fetch failed");
                CoreError::CommunityNotFound { id }
            })?;

        Ok(Community {
            id,
            name: guild.name,
        })
    }

    async fn member_voice_room(
        &self,
        community: &Community,
        user: UserId,
    ) -> Result<Option<RoomId>, CoreError> {
        let guild = self
            .cache
            .guild(GuildId::new(community.id.get()))
            .ok_or(CoreError::CommunityNotFound { id: community.id })?;

        Ok(guild
            .voice_states
            .get(&DiscordUserId::new(user.get()))
            .and_then(|state| state.channel_id)
            .map(|channel| RoomId::new(channel.get())))
    }

    async fn resolve_room(&self, community: &Community, room: RoomId) -> Result<Room, CoreError> {
        let channel_id = ChannelId::new(room.get());
        let cached = self
            .cache
            .guild(GuildId::new(community.id.get()))
            .and_then(|guild| guild.channels.get(&channel_id).map(room_from_channel));
        if let Some(found) = cached {
            return Ok(found);
        }

        match self.http.get_channel(channel_id).await {
            Ok(Channel::Guild(channel)) => Ok(room_from_channel(&channel)),
            Ok(_) => Ok(Room {
                id: room,
                name: String::new(),
                kind: RoomKind::Other,
            }),
            Err(e) => {
                error!(channel_id = %room, error = %e, "unable to fetch voice channel");
                Err(CoreError::RoomNotFound { id: room })
            }
        }
    }

    async fn join(
        &self,
        community: &Community,
        room: RoomId,
    ) -> Result<Arc<dyn VoiceConnection>, CoreError> {
        let connection = SongbirdConnection::new(
            Arc::clone(&self.songbird),
            Arc::clone(&self.player),
            GuildId::new(community.id.get()),
        );
        connection.start(ChannelId::new(room.get()));
        Ok(connection)
    }
}

fn room_from_channel(channel: &GuildChannel) -> Room {
    Room {
        id: RoomId::new(channel.id.get()),
        name: channel.name.clone(),
        kind: room_kind(channel.kind),
    }
}

fn room_kind(kind: ChannelType) -> RoomKind {
    match kind {
        ChannelType::Voice => RoomKind::Voice,
        ChannelType::Stage => RoomKind::Stage,
        ChannelType::Text | ChannelType::News => RoomKind::Text,
        _ => RoomKind::Other,
    }
}

// ── Voice connection ────────────────────────────────────────────────

/// One songbird call, from the join request to its removal.
///
/// Starts in `Signalling`; the background join moves it to `Ready` or
/// `Destroyed`. Driver events then report drops and recoveries.
pub struct SongbirdConnection {
    songbird: Arc<Songbird>,
    player: Arc<SongbirdPlayer>,
    guild: GuildId,
    status: Arc<watch::Sender<VoiceStatus>>,
    call: OnceLock<Arc<Mutex<Call>>>,
    destroyed: AtomicBool,
}

impl SongbirdConnection {
    fn new(songbird: Arc<Songbird>, player: Arc<SongbirdPlayer>, guild: GuildId) -> Arc<Self> {
        let (status, _) = watch::channel(VoiceStatus::Signalling);
        Arc::new(Self {
            songbird,
            player,
            guild,
            status: Arc::new(status),
            call: OnceLock::new(),
            destroyed: AtomicBool::new(false),
        })
    }

    fn start(self: &Arc<Self>, channel: ChannelId) {
        let this = Arc::clone(self);

        tokio::spawn(async move {
            this.set_status(VoiceStatus::Connecting);
            match this.songbird.join(this.guild, channel).await {
                Ok(call) => {
                    if this.destroyed.load(Ordering::SeqCst) {
                        debug!(guild_id = %this.guild, "join finished after destroy, leaving");
                        if let Err(e) = this.songbird.remove(this.guild).await {
                            warn!(guild_id = %this.guild, error = %e, "failed to leave stale voice call");
                        }
                        return;
                    }

                    {
                        let mut handler = call.lock().await;
                        for event in [
                            CoreEvent::DriverConnect,
                            CoreEvent::DriverReconnect,
                            CoreEvent::DriverDisconnect,
                        ] {
                            handler.add_global_event(
                                Event::Core(event),
                                DriverEvents {
                                    status: Arc::clone(&this.status),
                                },
                            );
                        }
                    }

                    let _ = this.call.set(call);
                    info!(guild_id = %this.guild, channel_id = %channel, "voice call established");
                    this.set_status(VoiceStatus::Ready);
                }
                Err(e) => {
                    error!(guild_id = %this.guild, channel_id = %channel, error = %e, "voice join failed");
                    this.set_status(VoiceStatus::Destroyed);
                }
            }
        });
    }

    fn set_status(&self, next: VoiceStatus) {
        set_unless_destroyed(&self.status, next);
    }
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    fn status(&self) -> watch::Receiver<VoiceStatus> {
        self.status.subscribe()
    }

    async fn subscribe_audio(&self) -> Result<(), CoreError> {
        let call = self.call.get().ok_or_else(|| CoreError::ConnectionFailed {
            reason: "voice call not established".into(),
        })?;
        self.player.attach(Arc::clone(call)).await;
        Ok(())
    }

    /// Safe to repeat: a second call finds no call to remove, and a call
    /// interrupted before `remove` finished gets another try.
    async fn destroy(&self) -> Result<(), CoreError> {
        self.destroyed.store(true, Ordering::SeqCst);
        self.status.send_replace(VoiceStatus::Destroyed);

        if let Some(call) = self.call.get() {
            self.player.detach(call).await;
        }

        match self.songbird.remove(self.guild).await {
            Ok(()) | Err(songbird::error::JoinError::NoCall) => Ok(()),
            Err(e) => Err(CoreError::platform(format!("failed to leave voice channel: {e}"))),
        }
    }
}

/// Driver lifecycle into connection status.
struct DriverEvents {
    status: Arc<watch::Sender<VoiceStatus>>,
}

#[async_trait]
impl EventHandler for DriverEvents {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        match ctx {
            EventContext::DriverConnect(_) | EventContext::DriverReconnect(_) => {
                debug!("voice driver connected");
                set_unless_destroyed(&self.status, VoiceStatus::Ready);
            }
            EventContext::DriverDisconnect(data) => {
                warn!(kind = ?data.kind, reason = ?data.reason, "voice driver disconnected");
                set_unless_destroyed(&self.status, VoiceStatus::Disconnected);
            }
            _ => {}
        }
        None
    }
}

fn set_unless_destroyed(status: &watch::Sender<VoiceStatus>, next: VoiceStatus) {
    status.send_if_modified(|current| {
        if *current == VoiceStatus::Destroyed || *current == next {
            return false;
        }
        *current = next;
        true
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn channel_kinds_map_to_rooms() {
        assert_eq!(room_kind(ChannelType::Voice), RoomKind::Voice);
        assert_eq!(room_kind(ChannelType::Stage), RoomKind::Stage);
        assert_eq!(room_kind(ChannelType::Text), RoomKind::Text);
        assert_eq!(room_kind(ChannelType::Category), RoomKind::Other);
    }

    #[test]
    fn destroyed_status_is_terminal() {
        let (status, rx) = watch::channel(VoiceStatus::Ready);
        set_unless_destroyed(&status, VoiceStatus::Disconnected);
        assert_eq!(*rx.borrow(), VoiceStatus::Disconnected);

        status.send_replace(VoiceStatus::Destroyed);
        set_unless_destroyed(&status, VoiceStatus::Ready);
        assert_eq!(*rx.borrow(), VoiceStatus::Destroyed);
    }
}
