// ── Audio relay ──
//
// Owns the voice connection lifecycle and playlist playback. All session
// state (connection handle, playlist, cursor, pending retry) lives behind
// one async mutex; handlers that wait on the platform without holding it
// re-check the session generation before acting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::error::CoreError;
use crate::model::Community;
use crate::platform::{AudioEvent, AudioOutput, ChatPlatform, PlaybackStatus, VoiceConnection, VoiceStatus};
use crate::playlist::PlaylistStore;

// ── ConnectionState ─────────────────────────────────────────────────

/// Relay connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Reconnecting,
    Destroyed,
}

/// What [`AudioRelay::connect`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Joined and playback started (or was already running).
    Ready,
    /// A live connection already existed; nothing was done.
    AlreadyConnected,
    /// The audio directory had no tracks; no join was attempted.
    EmptyPlaylist,
}

// ── AudioRelay ──────────────────────────────────────────────────────

/// Voice connection and playback owner.
///
/// Cheaply cloneable via `Arc<RelayInner>`. Background tasks (connection
/// watcher, deferred playback retry) hold clones and are cancelled with
/// the session that spawned them.
#[derive(Clone)]
pub struct AudioRelay {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    platform: Arc<dyn ChatPlatform>,
    output: Arc<dyn AudioOutput>,
    config: RelayConfig,
    decision: AtomicBool,
    state: watch::Sender<ConnectionState>,
    session: Mutex<Session>,
    cancel: CancellationToken,
}

struct Session {
    connection: Option<Arc<dyn VoiceConnection>>,
    playlist: PlaylistStore,
    generation: u64,
    cancel: CancellationToken,
    retry_pending: bool,
}

impl AudioRelay {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        output: Arc<dyn AudioOutput>,
        config: RelayConfig,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();
        let playlist = PlaylistStore::new(&config.audio_dir, &config.extensions);

        Self {
            inner: Arc::new(RelayInner {
                platform,
                output,
                session: Mutex::new(Session {
                    connection: None,
                    playlist,
                    generation: 0,
                    cancel: cancel.child_token(),
                    retry_pending: false,
                }),
                config,
                decision: AtomicBool::new(false),
                state,
                cancel,
            }),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    // ── State observation ────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn playback_status(&self) -> PlaybackStatus {
        self.inner.output.status()
    }

    pub async fn playlist_len(&self) -> usize {
        self.inner.session.lock().await.playlist.len()
    }

    pub async fn cursor(&self) -> usize {
        self.inner.session.lock().await.playlist.cursor()
    }

    /// Whether a connection exists that the platform has not destroyed.
    pub async fn has_live_connection(&self) -> bool {
        let session = self.inner.session.lock().await;
        session
            .connection
            .as_ref()
            .is_some_and(|c| *c.status().borrow() != VoiceStatus::Destroyed)
    }

    // ── Decision ─────────────────────────────────────────────────

    /// Record the latest "should be connected" decision. Event handlers
    /// read it before advancing playback.
    pub fn set_decision(&self, should_connect: bool) {
        self.inner.decision.store(should_connect, Ordering::SeqCst);
    }

    pub fn decision(&self) -> bool {
        self.inner.decision.load(Ordering::SeqCst)
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Join the target room and start playback.
    ///
    /// Resolves the room, rescans the playlist, joins, and waits for the
    /// platform to report `Ready`. On timeout or failure the half-open
    /// connection is destroyed and the relay falls back to
    /// [`Disconnected`](ConnectionState::Disconnected).
    pub async fn connect(&self, community: &Community) -> Result<ConnectOutcome, CoreError> {
        let mut session = self.inner.session.lock().await;

        if let Some(conn) = session.connection.as_ref() {
            if *conn.status().borrow() != VoiceStatus::Destroyed {
                debug!("voice connection already present");
                return Ok(ConnectOutcome::AlreadyConnected);
            }
            self.teardown(&mut session).await;
        }

        let target = self.inner.config.target.room;
        let room = self.inner.platform.resolve_room(community, target).await?;
        if !room.is_voice_capable() {
            return Err(CoreError::NotVoiceCapable {
                id: room.id,
                kind: room.kind.to_string(),
            });
        }

        if session.playlist.refresh() == 0 {
            warn!(dir = %session.playlist.dir().display(), "skipping voice connection because the playlist is empty");
            return Ok(ConnectOutcome::EmptyPlaylist);
        }

        self.set_state(ConnectionState::Connecting);
        let connection = match self.inner.platform.join(community, target).await {
            Ok(conn) => conn,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        session.generation += 1;
        session.cancel = self.inner.cancel.child_token();
        session.retry_pending = false;
        session.connection = Some(Arc::clone(&connection));

        let mut status = connection.status();
        let timeout = self.inner.config.connect_timeout;
        let reached = wait_for_status(&mut status, timeout, |s| {
            matches!(s, VoiceStatus::Ready | VoiceStatus::Destroyed)
        })
        .await;

        match reached {
            Some(VoiceStatus::Ready) => {}
            Some(other) => {
                error!(room = %room.id, status = %other, "failed to establish voice connection");
                self.teardown(&mut session).await;
                return Err(CoreError::ConnectionFailed {
                    reason: format!("connection went {other} before becoming ready"),
                });
            }
            None => {
                error!(room = %room.id, timeout_ms = millis(timeout), "voice connection not ready in time");
                self.teardown(&mut session).await;
                return Err(CoreError::ConnectTimeout {
                    timeout_ms: millis(timeout),
                });
            }
        }

        if let Err(e) = connection.subscribe_audio().await {
            error!(error = %e, "failed to subscribe audio output");
            self.teardown(&mut session).await;
            return Err(e);
        }

        self.set_state(ConnectionState::Ready);
        info!(room = %room.name, tracks = session.playlist.len(), "connected to voice channel, starting playback");

        self.spawn_connection_watcher(connection, session.generation, session.cancel.clone());

        if self.inner.output.status() == PlaybackStatus::Idle {
            self.play_next_locked(&mut session).await;
        }

        Ok(ConnectOutcome::Ready)
    }

    /// Leave the room, stop playback and rewind the playlist.
    ///
    /// Idempotent: with no connection this only makes sure the output is
    /// stopped. Teardown errors are logged, never returned.
    pub async fn disconnect(&self) {
        let mut session = self.inner.session.lock().await;
        self.teardown(&mut session).await;
    }

    /// Clear the decision and disconnect; stops every background task
    /// spawned by this relay.
    pub async fn shutdown(&self) {
        self.set_decision(false);
        self.disconnect().await;
        self.inner.cancel.cancel();
        debug!("relay shut down");
    }

    // ── Playback ─────────────────────────────────────────────────

    /// Start the next track if a session is up and no retry is pending.
    pub async fn play_next(&self) {
        let mut session = self.inner.session.lock().await;
        if session.connection.is_none() || session.retry_pending {
            return;
        }
        self.play_next_locked(&mut session).await;
    }

    /// Handle the audio output going idle.
    pub async fn on_playback_idle(&self) {
        let mut session = self.inner.session.lock().await;
        if !self.may_advance(&mut session).await {
            return;
        }
        self.play_next_locked(&mut session).await;
    }

    /// Handle a track that failed after it started.
    ///
    /// Treated like a failed start: skip to the next track, and defer the
    /// next attempt by `retry_delay` once the failure wraps the playlist.
    pub async fn on_playback_error(&self) {
        let mut session = self.inner.session.lock().await;
        if !self.may_advance(&mut session).await {
            return;
        }

        if session.playlist.cursor() == 0 {
            self.schedule_retry(&mut session);
            return;
        }
        self.play_next_locked(&mut session).await;
    }

    /// Forward audio output events to the relay until shutdown.
    pub fn listen(&self) -> JoinHandle<()> {
        let relay = self.clone();
        let mut events = self.inner.output.events();
        let cancel = self.inner.cancel.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    event = events.recv() => event,
                };

                match event {
                    Ok(AudioEvent::Idle) => relay.on_playback_idle().await,
                    Ok(AudioEvent::Playing { track }) => debug!(track = %track, "audio output playing"),
                    Ok(AudioEvent::Error { message }) => {
                        error!(error = %message, "audio player error");
                        relay.on_playback_error().await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "audio events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    // ── Internals ────────────────────────────────────────────────

    fn set_state(&self, next: ConnectionState) {
        self.inner.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(from = %current, to = %next, "relay state");
            *current = next;
            true
        });
    }

    /// Shared gate for the output event handlers. Leaves the room when the
    /// decision dropped or the playlist emptied.
    async fn may_advance(&self, session: &mut Session) -> bool {
        if session.connection.is_none() {
            return false;
        }

        if !self.decision() {
            info!("conditions no longer met, leaving voice channel");
            self.teardown(session).await;
            return false;
        }

        if session.playlist.is_empty() {
            warn!("audio playlist is empty, disconnecting from voice channel");
            self.teardown(session).await;
            return false;
        }

        !session.retry_pending
    }

    async fn teardown(&self, session: &mut Session) {
        session.cancel.cancel();
        session.retry_pending = false;

        // The handle stays in the session until `destroy` returns so an
        // interrupted teardown is finished by the next one.
        if let Some(conn) = session.connection.clone() {
            self.set_state(ConnectionState::Destroyed);
            if let Err(e) = conn.destroy().await {
                error!(error = %e, "error destroying voice connection");
            }
            session.connection = None;
        }

        self.inner.output.stop().await;
        session.playlist.reset_cursor();
        self.set_state(ConnectionState::Disconnected);
    }

    /// Start tracks from the cursor until one plays.
    ///
    /// A failure that wraps the cursor back to the first track means the
    /// whole list failed in this pass; the next attempt is deferred by
    /// `retry_delay` instead of spinning.
    async fn play_next_locked(&self, session: &mut Session) {
        loop {
            let Some(track) = session.playlist.next() else {
                return;
            };

            match self.inner.output.play(&track).await {
                Ok(()) => {
                    info!(track = %track, "now playing");
                    return;
                }
                Err(e) => {
                    error!(track = %track.path.display(), error = %e, "failed to play track");

                    if session.playlist.cursor() == 0 {
                        self.schedule_retry(session);
                        return;
                    }
                    if !self.decision() || session.connection.is_none() {
                        return;
                    }
                }
            }
        }
    }

    fn schedule_retry(&self, session: &mut Session) {
        if session.retry_pending {
            return;
        }
        session.retry_pending = true;

        let relay = self.clone();
        let cancel = session.cancel.clone();
        let generation = session.generation;
        let delay = self.inner.config.retry_delay;
        debug!(delay_ms = millis(delay), "every track failed, retrying later");

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => relay.retry_playback(generation).await,
            }
        });
    }

    async fn retry_playback(&self, generation: u64) {
        let mut session = self.inner.session.lock().await;
        if session.generation != generation {
            return;
        }
        session.retry_pending = false;

        if !self.decision() || session.connection.is_none() {
            return;
        }
        self.play_next_locked(&mut session).await;
    }

    fn spawn_connection_watcher(
        &self,
        connection: Arc<dyn VoiceConnection>,
        generation: u64,
        cancel: CancellationToken,
    ) {
        let relay = self.clone();

        tokio::spawn(async move {
            let mut status = connection.status();
            loop {
                let dropped = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return,
                    res = status.wait_for(|s| matches!(s, VoiceStatus::Disconnected | VoiceStatus::Destroyed)) => {
                        res.map(|s| *s)
                    }
                };

                match dropped {
                    Ok(VoiceStatus::Disconnected) => {
                        if !relay.recover(&mut status, generation, &cancel).await {
                            return;
                        }
                    }
                    Ok(_) | Err(_) => {
                        relay.on_connection_closed(generation).await;
                        return;
                    }
                }
            }
        });
    }

    /// Race the platform's own recovery against `reconnect_window`.
    ///
    /// Returns `true` when the connection is back to `Ready` and the
    /// watcher should keep going.
    async fn recover(
        &self,
        status: &mut watch::Receiver<VoiceStatus>,
        generation: u64,
        cancel: &CancellationToken,
    ) -> bool {
        {
            let session = self.inner.session.lock().await;
            if session.generation != generation || session.connection.is_none() {
                return false;
            }
            self.set_state(ConnectionState::Reconnecting);
        }
        warn!("voice connection dropped, waiting for automatic recovery");

        let window = self.inner.config.reconnect_window;
        let signal = tokio::select! {
            biased;
            () = cancel.cancelled() => return false,
            signal = wait_for_status(status, window, |s| s.is_recovering()) => signal,
        };

        let recovered = match signal {
            Some(VoiceStatus::Ready) => true,
            Some(_) => {
                let timeout = self.inner.config.connect_timeout;
                let ready = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return false,
                    ready = wait_for_status(status, timeout, |s| {
                        matches!(s, VoiceStatus::Ready | VoiceStatus::Destroyed)
                    }) => ready,
                };
                ready == Some(VoiceStatus::Ready)
            }
            None => false,
        };

        let mut session = self.inner.session.lock().await;
        if session.generation != generation || session.connection.is_none() {
            return false;
        }

        if recovered {
            self.set_state(ConnectionState::Ready);
            info!("voice connection recovered");
            true
        } else {
            warn!(window_ms = millis(window), "voice connection disconnected and could not automatically recover");
            self.teardown(&mut session).await;
            false
        }
    }

    async fn on_connection_closed(&self, generation: u64) {
        let mut session = self.inner.session.lock().await;
        if session.generation != generation || session.connection.is_none() {
            return;
        }
        warn!("voice connection closed by the platform");
        self.teardown(&mut session).await;
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Wait until `pred` holds or `bound` elapses. `None` on timeout or when
/// the status channel closes.
async fn wait_for_status(
    status: &mut watch::Receiver<VoiceStatus>,
    bound: Duration,
    pred: impl FnMut(&VoiceStatus) -> bool,
) -> Option<VoiceStatus> {
    match tokio::time::timeout(bound, status.wait_for(pred)).await {
        Ok(Ok(reached)) => Some(*reached),
        Ok(Err(_)) | Err(_) => None,
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
