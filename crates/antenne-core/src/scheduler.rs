// ── Scheduler ──
//
// Fires the evaluator once at startup and then on a fixed interval until
// cancelled, then shuts the relay down.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::evaluator::ConditionEvaluator;

pub struct Scheduler {
    evaluator: Arc<ConditionEvaluator>,
    interval: Duration,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(
        evaluator: Arc<ConditionEvaluator>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            evaluator,
            interval,
            cancel,
        }
    }

    /// Run until the cancellation token fires.
    ///
    /// Each tick runs on its own task so a slow cycle never delays the
    /// timer; overlapping ticks are dropped by the evaluator's in-flight
    /// guard. Cycles still running at cancellation are awaited, never
    /// aborted: a cycle may be halfway through leaving the room.
    pub async fn run(self) {
        let relay = self.evaluator.relay().clone();
        let listener = relay.listen();

        let outcome = self.evaluator.evaluate().await;
        debug!(?outcome, "startup evaluation finished");

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = JoinSet::new();

        while !self.cancel.is_cancelled() {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "evaluation task failed");
                    }
                }
                _ = ticker.tick() => {
                    let evaluator = Arc::clone(&self.evaluator);
                    cycles.spawn(async move {
                        let outcome = evaluator.evaluate().await;
                        debug!(?outcome, "evaluation finished");
                    });
                }
            }
        }

        if !cycles.is_empty() {
            debug!(in_flight = cycles.len(), "waiting for running evaluations");
        }
        while let Some(joined) = cycles.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "evaluation task failed");
            }
        }

        info!("scheduler stopped, leaving voice channel");
        relay.shutdown().await;
        if let Err(e) = listener.await {
            warn!(error = %e, "audio event listener failed");
        }
    }
}
