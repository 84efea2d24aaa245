// ── Songbird audio output ──
//
// One track at a time on whichever call is attached. Only events from
// the current track handle are forwarded: `play_only_input` stops the
// previous track, and its end event must not advance the playlist.

use std::sync::Arc;

use async_trait::async_trait;
use songbird::events::{Event, EventContext, EventHandler, TrackEvent};
use songbird::input::{File, Input};
use songbird::tracks::TrackHandle;
use songbird::Call;
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, warn};

use antenne_core::{AudioEvent, AudioOutput, CoreError, PlaybackStatus, Track};

const EVENT_CAPACITY: usize = 32;

/// Audio output backed by a songbird call.
pub struct SongbirdPlayer {
    call: Mutex<Option<Arc<Mutex<Call>>>>,
    shared: Arc<Shared>,
}

struct Shared {
    current: Mutex<Option<TrackHandle>>,
    status: watch::Sender<PlaybackStatus>,
    events: broadcast::Sender<AudioEvent>,
}

impl Shared {
    /// Clear `handle` if it is still the current track. Returns whether
    /// it was.
    async fn release(&self, handle: &TrackHandle) -> bool {
        let mut current = self.current.lock().await;
        if current.as_ref().is_some_and(|h| h.uuid() == handle.uuid()) {
            *current = None;
            self.status.send_replace(PlaybackStatus::Idle);
            return true;
        }
        false
    }
}

impl SongbirdPlayer {
    pub fn new() -> Self {
        let (status, _) = watch::channel(PlaybackStatus::Idle);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            call: Mutex::new(None),
            shared: Arc::new(Shared {
                current: Mutex::new(None),
                status,
                events,
            }),
        }
    }

    /// Route playback into `call`.
    pub async fn attach(&self, call: Arc<Mutex<Call>>) {
        *self.call.lock().await = Some(call);
    }

    /// Forget `call` if it is the attached one.
    pub async fn detach(&self, call: &Arc<Mutex<Call>>) {
        let mut attached = self.call.lock().await;
        if attached.as_ref().is_some_and(|c| Arc::ptr_eq(c, call)) {
            *attached = None;
        }
    }
}

impl Default for SongbirdPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioOutput for SongbirdPlayer {
    async fn play(&self, track: &Track) -> Result<(), CoreError> {
        let failed = |reason: String| CoreError::Playback {
            track: track.name.clone(),
            reason,
        };

        tokio::fs::metadata(&track.path)
            .await
            .map_err(|e| failed(e.to_string()))?;

        let call = self
            .call
            .lock()
            .await
            .clone()
            .ok_or_else(|| failed("no voice connection attached".into()))?;

        let input: Input = File::new(track.path.clone()).into();
        let handle = {
            let mut current = self.shared.current.lock().await;
            *current = None;
            let handle = call.lock().await.play_only_input(input);
            *current = Some(handle.clone());
            handle
        };

        for (event, kind) in [
            (TrackEvent::End, TrackOutcome::Ended),
            (TrackEvent::Error, TrackOutcome::Failed),
        ] {
            let handler = TrackEvents {
                shared: Arc::clone(&self.shared),
                handle: handle.clone(),
                name: track.name.clone(),
                kind,
            };
            if let Err(e) = handle.add_event(Event::Track(event), handler) {
                self.shared.release(&handle).await;
                return Err(failed(e.to_string()));
            }
        }

        self.shared.status.send_replace(PlaybackStatus::Playing);
        let _ = self.shared.events.send(AudioEvent::Playing {
            track: track.name.clone(),
        });
        Ok(())
    }

    async fn stop(&self) {
        self.shared.current.lock().await.take();
        if let Some(call) = self.call.lock().await.clone() {
            call.lock().await.stop();
        }
        self.shared.status.send_replace(PlaybackStatus::Idle);
    }

    fn status(&self) -> PlaybackStatus {
        *self.shared.status.borrow()
    }

    fn events(&self) -> broadcast::Receiver<AudioEvent> {
        self.shared.events.subscribe()
    }
}

// ── Track events ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum TrackOutcome {
    Ended,
    Failed,
}

struct TrackEvents {
    shared: Arc<Shared>,
    handle: TrackHandle,
    name: String,
    kind: TrackOutcome,
}

#[async_trait]
impl EventHandler for TrackEvents {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if !self.shared.release(&self.handle).await {
            return None;
        }

        match self.kind {
            TrackOutcome::Ended => {
                debug!(track = %self.name, "track finished");
                let _ = self.shared.events.send(AudioEvent::Idle);
            }
            TrackOutcome::Failed => {
                let message = match ctx {
                    EventContext::Track(tracks) => tracks
                        .first()
                        .map(|(state, _)| format!("{:?}", state.playing))
                        .unwrap_or_default(),
                    _ => String::new(),
                };
                warn!(track = %self.name, error = %message, "track failed while playing");
                // The relay skips ahead on this event; no separate idle notification.
                let _ = self.shared.events.send(AudioEvent::Error {
                    message: format!("{}: {message}", self.name),
                });
            }
        }
        None
    }
}
