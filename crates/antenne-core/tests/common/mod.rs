#![allow(dead_code, clippy::unwrap_used)]
// Shared fakes for the relay and evaluator integration tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch, Notify};

use antenne_core::{
    AudioEvent, AudioOutput, ChatPlatform, Community, CommunityId, CoreError, LiveSignal,
    PlaybackStatus, RelayConfig, Room, RoomId, RoomKind, Target, Track, UserId, VoiceConnection,
    VoiceStatus,
};

pub const COMMUNITY: CommunityId = CommunityId::new(100);
pub const ROOM: RoomId = RoomId::new(200);
pub const OTHER_ROOM: RoomId = RoomId::new(201);
pub const USER: UserId = UserId::new(300);

pub fn target() -> Target {
    Target {
        community: COMMUNITY,
        room: ROOM,
        user: USER,
    }
}

pub fn community() -> Community {
    Community {
        id: COMMUNITY,
        name: "radio".into(),
    }
}

pub fn relay_config(dir: &Path) -> RelayConfig {
    RelayConfig::new(target(), dir)
}

pub fn audio_dir(names: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        std::fs::write(dir.path().join(name), b"ID3").unwrap();
    }
    dir
}

/// Wait on a watch channel without hanging the test forever.
pub async fn settle<T>(rx: &mut watch::Receiver<T>, pred: impl FnMut(&T) -> bool) {
    tokio::time::timeout(Duration::from_secs(30), rx.wait_for(pred))
        .await
        .unwrap()
        .unwrap();
}

// ── Voice connection ────────────────────────────────────────────────

pub struct FakeConnection {
    status: watch::Sender<VoiceStatus>,
    pub subscribed: AtomicBool,
    pub destroys: AtomicUsize,
    destroys_done: AtomicUsize,
    destroy_delay: Mutex<Duration>,
}

impl FakeConnection {
    pub fn new(initial: VoiceStatus) -> Arc<Self> {
        let (status, _) = watch::channel(initial);
        Arc::new(Self {
            status,
            subscribed: AtomicBool::new(false),
            destroys: AtomicUsize::new(0),
            destroys_done: AtomicUsize::new(0),
            destroy_delay: Mutex::new(Duration::ZERO),
        })
    }

    pub fn set(&self, next: VoiceStatus) {
        self.status.send_replace(next);
    }

    pub fn current(&self) -> VoiceStatus {
        *self.status.borrow()
    }

    pub fn destroy_count(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    /// Number of `destroy` calls that ran to completion.
    pub fn completed_destroys(&self) -> usize {
        self.destroys_done.load(Ordering::SeqCst)
    }

    /// Make `destroy` take `delay` before leaving the room.
    pub fn set_destroy_delay(&self, delay: Duration) {
        *self.destroy_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    fn status(&self) -> watch::Receiver<VoiceStatus> {
        self.status.subscribe()
    }

    async fn subscribe_audio(&self) -> Result<(), CoreError> {
        self.subscribed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), CoreError> {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        let delay = *self.destroy_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.status.send_replace(VoiceStatus::Destroyed);
        self.destroys_done.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Chat platform ───────────────────────────────────────────────────

pub struct FakePlatform {
    community: Mutex<Option<Community>>,
    member_room: Mutex<Option<RoomId>>,
    member_error: AtomicBool,
    room_kind: Mutex<RoomKind>,
    /// Status a freshly joined connection starts in.
    join_status: Mutex<VoiceStatus>,
    pub joins: AtomicUsize,
    pub fetches: AtomicUsize,
    connections: Mutex<Vec<Arc<FakeConnection>>>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            community: Mutex::new(Some(community())),
            member_room: Mutex::new(Some(ROOM)),
            member_error: AtomicBool::new(false),
            room_kind: Mutex::new(RoomKind::Voice),
            join_status: Mutex::new(VoiceStatus::Ready),
            joins: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            connections: Mutex::new(Vec::new()),
        })
    }

    pub fn set_community(&self, community: Option<Community>) {
        *self.community.lock().unwrap() = community;
    }

    pub fn set_member_room(&self, room: Option<RoomId>) {
        *self.member_room.lock().unwrap() = room;
    }

    pub fn fail_member_lookup(&self, fail: bool) {
        self.member_error.store(fail, Ordering::SeqCst);
    }

    pub fn set_room_kind(&self, kind: RoomKind) {
        *self.room_kind.lock().unwrap() = kind;
    }

    pub fn set_join_status(&self, status: VoiceStatus) {
        *self.join_status.lock().unwrap() = status;
    }

    pub fn join_count(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    pub fn last_connection(&self) -> Arc<FakeConnection> {
        Arc::clone(self.connections.lock().unwrap().last().unwrap())
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    fn cached_community(&self, id: CommunityId) -> Option<Community> {
        self.community
            .lock()
            .unwrap()
            .clone()
            .filter(|c| c.id == id)
    }

    async fn fetch_community(&self, id: CommunityId) -> Result<Community, CoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.cached_community(id)
            .ok_or(CoreError::CommunityNotFound { id })
    }

    async fn member_voice_room(
        &self,
        _community: &Community,
        user: UserId,
    ) -> Result<Option<RoomId>, CoreError> {
        if self.member_error.load(Ordering::SeqCst) {
            return Err(CoreError::MemberNotFound { id: user });
        }
        Ok(*self.member_room.lock().unwrap())
    }

    async fn resolve_room(&self, _community: &Community, room: RoomId) -> Result<Room, CoreError> {
        Ok(Room {
            id: room,
            name: "stage".into(),
            kind: *self.room_kind.lock().unwrap(),
        })
    }

    async fn join(
        &self,
        _community: &Community,
        _room: RoomId,
    ) -> Result<Arc<dyn VoiceConnection>, CoreError> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        let conn = FakeConnection::new(*self.join_status.lock().unwrap());
        self.connections.lock().unwrap().push(Arc::clone(&conn));
        Ok(conn)
    }
}

// ── Audio output ────────────────────────────────────────────────────

pub struct FakeOutput {
    status: Mutex<PlaybackStatus>,
    fail: AtomicBool,
    pub attempts: AtomicUsize,
    pub stops: AtomicUsize,
    played: Mutex<Vec<String>>,
    events: broadcast::Sender<AudioEvent>,
}

impl FakeOutput {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            status: Mutex::new(PlaybackStatus::Idle),
            fail: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            played: Mutex::new(Vec::new()),
            events,
        })
    }

    /// Make every `play` call fail.
    pub fn fail_all(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Simulate the current track failing after it started.
    pub fn break_current(&self) {
        *self.status.lock().unwrap() = PlaybackStatus::Idle;
        let _ = self.events.send(AudioEvent::Error {
            message: "corrupt frame".into(),
        });
    }

    /// Simulate the current track running out.
    pub fn finish(&self) {
        *self.status.lock().unwrap() = PlaybackStatus::Idle;
        let _ = self.events.send(AudioEvent::Idle);
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    async fn play(&self, track: &Track) -> Result<(), CoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Playback {
                track: track.name.clone(),
                reason: "decoder rejected input".into(),
            });
        }
        *self.status.lock().unwrap() = PlaybackStatus::Playing;
        self.played.lock().unwrap().push(track.name.clone());
        Ok(())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        *self.status.lock().unwrap() = PlaybackStatus::Idle;
    }

    fn status(&self) -> PlaybackStatus {
        *self.status.lock().unwrap()
    }

    fn events(&self) -> broadcast::Receiver<AudioEvent> {
        self.events.subscribe()
    }
}

// ── Live signal ─────────────────────────────────────────────────────

pub struct FakeLive {
    live: AtomicBool,
    pub calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl FakeLive {
    pub fn new(live: bool) -> Arc<Self> {
        Arc::new(Self {
            live: AtomicBool::new(live),
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    /// A probe that blocks every call until `gate` is notified.
    pub fn gated(live: bool, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            live: AtomicBool::new(live),
            calls: AtomicUsize::new(0),
            gate: Some(gate),
        })
    }

    pub fn set(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveSignal for FakeLive {
    async fn is_live(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.live.load(Ordering::SeqCst)
    }
}
