// ── Condition evaluator ──
//
// One tick: resolve the community, run both probes concurrently, derive
// the decision, and drive the relay. At most one tick runs at a time;
// a tick that finds another in flight returns without side effects.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

use crate::model::{Community, CommunityId, ConditionSnapshot};
use crate::platform::{ChatPlatform, PlaybackStatus};
use crate::probe::{LiveSignal, PresenceProbe};
use crate::relay::AudioRelay;

/// Relay call issued by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Action {
    Connect,
    PlayNext,
    Hold,
    Disconnect,
}

/// Result of one [`ConditionEvaluator::evaluate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Another evaluation was in flight; nothing was done.
    Skipped,
    /// The target community could not be resolved; the relay was
    /// disconnected.
    CommunityUnavailable,
    Decided {
        snapshot: ConditionSnapshot,
        action: Action,
    },
}

/// Orchestrates probes and relay.
pub struct ConditionEvaluator {
    platform: Arc<dyn ChatPlatform>,
    live: Arc<dyn LiveSignal>,
    presence: PresenceProbe,
    relay: AudioRelay,
    community: CommunityId,
    in_flight: AtomicBool,
    last_decision: AtomicBool,
}

impl ConditionEvaluator {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        live: Arc<dyn LiveSignal>,
        relay: AudioRelay,
    ) -> Self {
        let target = relay.config().target;
        let presence = PresenceProbe::new(Arc::clone(&platform), target.user, target.room);

        Self {
            platform,
            live,
            presence,
            relay,
            community: target.community,
            in_flight: AtomicBool::new(false),
            last_decision: AtomicBool::new(false),
        }
    }

    pub fn relay(&self) -> &AudioRelay {
        &self.relay
    }

    /// Run one evaluation cycle unless one is already running.
    pub async fn evaluate(&self) -> Evaluation {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("evaluation already in progress, dropping tick");
            return Evaluation::Skipped;
        }
        let _guard = InFlight(&self.in_flight);

        self.cycle().await
    }

    async fn cycle(&self) -> Evaluation {
        let Some(community) = self.resolve_community().await else {
            warn!(community = %self.community, "target community unavailable");
            self.last_decision.store(false, Ordering::SeqCst);
            self.relay.set_decision(false);
            self.relay.disconnect().await;
            return Evaluation::CommunityUnavailable;
        };

        let (live, user_present) = tokio::join!(
            self.live.is_live(),
            self.presence.is_user_in_target_voice(&community),
        );
        let snapshot = ConditionSnapshot { live, user_present };
        let should_connect = snapshot.should_connect();
        let was_connected = self.last_decision.swap(should_connect, Ordering::SeqCst);
        debug!(live, user_present, should_connect, "conditions evaluated");

        self.relay.set_decision(should_connect);

        let action = if should_connect {
            self.pursue(&community).await
        } else {
            if was_connected {
                info!("conditions not met, leaving voice channel if connected");
            }
            self.relay.disconnect().await;
            Action::Disconnect
        };

        Evaluation::Decided { snapshot, action }
    }

    async fn pursue(&self, community: &Community) -> Action {
        if !self.relay.has_live_connection().await {
            match self.relay.connect(community).await {
                Ok(outcome) => debug!(?outcome, "connect finished"),
                Err(e) => warn!(error = %e, "voice connection attempt failed"),
            }
            return Action::Connect;
        }

        if self.relay.playback_status() == PlaybackStatus::Idle && self.relay.playlist_len().await > 0 {
            self.relay.play_next().await;
            return Action::PlayNext;
        }

        Action::Hold
    }

    /// Community from the platform cache, falling back to a fetch.
    async fn resolve_community(&self) -> Option<Community> {
        if let Some(community) = self.platform.cached_community(self.community) {
            return Some(community);
        }

        match self.platform.fetch_community(self.community).await {
            Ok(community) => Some(community),
            Err(e) => {
                error!(community = %self.community, error = %e, "unable to fetch target community");
                None
            }
        }
    }
}

/// Clears the in-flight flag when the cycle ends, including when the
/// cycle future is dropped mid-way.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
