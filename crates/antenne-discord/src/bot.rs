// ── Discord client lifecycle ──
//
// Build the serenity client with songbird as its voice manager, run the
// gateway on a background task, and wait for the first READY.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serenity::all::{Client, Context, EventHandler, GatewayIntents, Ready, ShardManager};
use songbird::{SerenityInit, Songbird};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use antenne_core::{AudioOutput, ChatPlatform};

use crate::error::DiscordError;
use crate::platform::DiscordPlatform;
use crate::player::SongbirdPlayer;

/// Running Discord client plus the adapters the relay needs.
pub struct DiscordBot {
    platform: Arc<DiscordPlatform>,
    player: Arc<SongbirdPlayer>,
    shard_manager: Arc<ShardManager>,
    gateway: JoinHandle<()>,
}

impl DiscordBot {
    /// Start the gateway and wait up to `ready_timeout` for READY.
    pub async fn start(token: &SecretString, ready_timeout: Duration) -> Result<Self, DiscordError> {
        let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;
        let (ready_tx, mut ready_rx) = watch::channel(false);
        let songbird = Songbird::serenity();

        let mut client = Client::builder(token.expose_secret(), intents)
            .event_handler(ReadyHandler { ready: ready_tx })
            .register_songbird_with(Arc::clone(&songbird))
            .await?;

        let player = Arc::new(SongbirdPlayer::new());
        let platform = Arc::new(DiscordPlatform::new(
            Arc::clone(&client.cache),
            Arc::clone(&client.http),
            songbird,
            Arc::clone(&player),
        ));
        let shard_manager = Arc::clone(&client.shard_manager);

        let gateway = tokio::spawn(async move {
            if let Err(e) = client.start().await {
                error!(error = %e, "Discord client stopped");
            }
        });

        let timeout_ms = u64::try_from(ready_timeout.as_millis()).unwrap_or(u64::MAX);
        match tokio::time::timeout(ready_timeout, ready_rx.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => {
                shard_manager.shutdown_all().await;
                return Err(DiscordError::GatewayClosed);
            }
            Err(_) => {
                warn!(timeout_ms, "Discord gateway did not become ready");
                shard_manager.shutdown_all().await;
                return Err(DiscordError::ReadyTimeout { timeout_ms });
            }
        }

        Ok(Self {
            platform,
            player,
            shard_manager,
            gateway,
        })
    }

    pub fn platform(&self) -> Arc<dyn ChatPlatform> {
        Arc::clone(&self.platform) as Arc<dyn ChatPlatform>
    }

    pub fn output(&self) -> Arc<dyn AudioOutput> {
        Arc::clone(&self.player) as Arc<dyn AudioOutput>
    }

    /// Close every shard and wait for the gateway task to finish.
    pub async fn shutdown(self) {
        self.shard_manager.shutdown_all().await;
        if let Err(e) = self.gateway.await {
            warn!(error = %e, "gateway task failed");
        }
        info!("Discord client shut down");
    }
}

struct ReadyHandler {
    ready: watch::Sender<bool>,
}

#[async_trait]
impl EventHandler for ReadyHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "logged in to Discord");
        self.ready.send_replace(true);
    }
}
