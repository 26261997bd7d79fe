use std::sync::Arc;
use std::time::Duration;
use tracing::trace;
use super::batch::{drain_trailing, serving_loop};
use super::handler::{Evaluator, InputBatch};
use crate::communication::{ReadyReceiver, ReadySignal, RunCounters, WorkerSlot};
use crate::error::{CoachError, Result};
use crate::telemetry::ProgressReporter;

/// Single consumer of the readiness queue.
///
/// Every worker assembles a full batch before it signals, so the server never
/// merges requests: one signal is one forward pass on one slot, and results are
/// routed by slot id rather than by arrival order.
pub struct BatchInferenceServer<'a, E> {
    evaluator: &'a E,
    slots: &'a [Arc<WorkerSlot>],
    workers: usize,
    poll_interval: Duration,
}

/// Outcome of [`BatchInferenceServer::serve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServeReport {
    pub signals_serviced: usize,
    pub completed_workers: usize,
    pub games_played: usize,
    pub elapsed: Duration,
    pub games_per_second: Option<f64>,
}

impl<'a, E> BatchInferenceServer<'a, E>
where
    E: Evaluator,
{
    /// Serves `slots`, expecting every slot to be bound to one worker.
    pub fn new(evaluator: &'a E, slots: &'a [Arc<WorkerSlot>], poll_interval: Duration) -> Self {
        Self {
            evaluator,
            slots,
            workers: slots.len(),
            poll_interval,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Runs one forward pass for `signal` and wakes the slot's worker.
    ///
    /// The input buffer stays read-locked while the evaluator runs, so the
    /// evaluator reads the worker's batch in place.
    pub async fn service(&self, signal: ReadySignal) -> Result<()> {
        let slot = self
            .slots
            .get(signal.slot.0)
            .filter(|slot| slot.id() == signal.slot)
            .ok_or(CoachError::UnknownSlot(signal.slot))?;
        let shape = slot.shape();

        let prediction = {
            let input = slot.input().read().await;
            self.evaluator
                .process(InputBatch::new(&input, shape))
                .await
                .map_err(CoachError::Collaborator)?
        };

        check_len(signal, "policy", shape.policy_len(), prediction.policy.len())?;
        check_len(signal, "value", shape.value_len(), prediction.value.len())?;

        slot.policy().write().await.copy_from_slice(&prediction.policy);
        slot.value().write().await.copy_from_slice(&prediction.value);

        if !slot.event().set() {
            return Err(CoachError::DoubleService(signal.slot));
        }
        trace!(slot = %signal.slot, "batch served");
        Ok(())
    }

    /// Services readiness signals until every worker has reported completion.
    ///
    /// Signals still queued when the loop exits are left for [`Self::drain`].
    pub async fn serve(
        &self,
        ready: &mut ReadyReceiver,
        counters: &RunCounters,
        target_games: usize,
    ) -> Result<ServeReport> {
        let mut progress = ProgressReporter::new(target_games, self.poll_interval);
        let signals_serviced = serving_loop(self, ready, counters, &mut progress).await?;
        Ok(ServeReport {
            signals_serviced,
            completed_workers: counters.completed(),
            games_played: counters.games_played(),
            elapsed: progress.elapsed(),
            games_per_second: progress.meter().games_per_second(),
        })
    }

    /// Services every signal already sitting in the queue. Returns how many there were.
    pub async fn drain(&self, ready: &mut ReadyReceiver) -> Result<usize> {
        drain_trailing(self, ready).await
    }
}

fn check_len(signal: ReadySignal, buffer: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(CoachError::ShapeMismatch {
            slot: signal.slot,
            buffer,
            expected,
            actual,
        })
    }
}
