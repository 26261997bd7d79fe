use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use super::batcher::BatchInferenceServer;
use super::handler::Evaluator;
use crate::communication::{ReadyReceiver, RunCounters};
use crate::error::{CoachError, Result};
use crate::telemetry::ProgressReporter;

/// Services signals until the completion counter reaches the worker count.
///
/// Delivery waits on the queue without a timeout; a separate ticker wakes the
/// loop every poll interval so progress is reported and completion or failure
/// is noticed even when no worker is signalling.
pub(crate) async fn serving_loop<E: Evaluator>(
    server: &BatchInferenceServer<'_, E>,
    ready: &mut ReadyReceiver,
    counters: &RunCounters,
    progress: &mut ProgressReporter,
) -> Result<usize> {
    let mut ticker = tokio::time::interval(server.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut serviced = 0;

    while counters.completed() < server.workers() {
        if counters.has_failed() {
            return Err(CoachError::WorkerFailed);
        }

        tokio::select! {
            signal = ready.recv() => match signal {
                Some(signal) => {
                    server.service(signal).await?;
                    serviced += 1;
                }
                None => {
                    // every worker dropped its sender
                    debug!("readiness queue closed");
                    break;
                }
            },
            _ = ticker.tick() => {}
        }

        progress.observe(counters.games_played());
    }

    if counters.has_failed() || counters.completed() < server.workers() {
        warn!(
            completed = counters.completed(),
            workers = server.workers(),
            "workers exited without completing"
        );
        return Err(CoachError::WorkerFailed);
    }
    progress.observe(counters.games_played());
    Ok(serviced)
}

/// Services whatever is left in the queue once all workers reported completion.
pub(crate) async fn drain_trailing<E: Evaluator>(
    server: &BatchInferenceServer<'_, E>,
    ready: &mut ReadyReceiver,
) -> Result<usize> {
    let mut drained = 0;
    loop {
        match ready.try_recv() {
            Ok(signal) => {
                server.service(signal).await?;
                drained += 1;
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
    if drained > 0 {
        debug!(drained, "serviced trailing signals");
    }
    Ok(drained)
}
