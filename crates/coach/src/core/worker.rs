//! Lifecycle of the self-play worker threads of one iteration.

use std::sync::Arc;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use crate::communication::{ReadySender, RunCounters, SlotId, WorkerSlot};
use crate::error::{CoachError, Result};
use crate::selfplay::{run_agent, RecordSender, SelfPlayFactory, WorkerContext, WorkerSummary};

/// Handles to the worker threads spawned for one iteration.
///
/// Each worker runs on tokio's blocking pool, so workers are real OS threads
/// and may block on their slot event without stalling the server.
pub struct WorkerPool {
    handles: Vec<(SlotId, JoinHandle<Result<WorkerSummary>>)>,
}

impl WorkerPool {
    /// Spawns one worker per slot. `assignments[i]` is the number of games of slot `i`.
    ///
    /// # Panics
    ///
    /// When `assignments` and `slots` differ in length.
    pub fn spawn<F>(
        factory: &F,
        slots: &[Arc<WorkerSlot>],
        assignments: &[usize],
        ready: &ReadySender,
        records: &RecordSender,
        counters: &RunCounters,
    ) -> Self
    where
        F: SelfPlayFactory,
    {
        assert_eq!(slots.len(), assignments.len(), "one game assignment per slot");

        let handles = slots
            .iter()
            .zip(assignments)
            .map(|(slot, &games)| {
                let ctx = WorkerContext::new(
                    slot.clone(),
                    ready.clone(),
                    records.clone(),
                    counters.clone(),
                    games,
                );
                let agent = factory.create(slot.id());
                let handle = tokio::task::spawn_blocking(move || run_agent(agent, ctx));
                (slot.id(), handle)
            })
            .collect::<Vec<_>>();

        debug!(workers = handles.len(), "spawned self-play workers");
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every worker to exit.
    ///
    /// All workers are joined even when one of them failed; the first failure
    /// is returned.
    pub async fn join(self) -> Result<Vec<WorkerSummary>> {
        let (slots, handles): (Vec<_>, Vec<_>) = self.handles.into_iter().unzip();
        let results = join_all(handles).await;

        let mut summaries = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (slot, joined) in slots.into_iter().zip(results) {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(source) => Err(CoachError::WorkerJoin { slot, source }),
            };
            match outcome {
                Ok(summary) => summaries.push(summary),
                Err(err) => {
                    warn!(%slot, %err, "worker exited with an error");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(summaries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::{allocate_slots, ready_queue, SlotShape};
    use crate::selfplay::record_channel;
    use crate::testing::{CountingAgent, PanickingAgent};

    #[tokio::test]
    async fn test_join_collects_every_summary() {
        let slots = allocate_slots(3, SlotShape::new(1, 1, 1, 1));
        let (ready_tx, _ready_rx) = ready_queue();
        let (record_tx, mut record_rx) = record_channel();
        let counters = RunCounters::new();

        // agents that never evaluate do not need a server
        let factory = |_slot: SlotId| CountingAgent::new(0);
        let pool = WorkerPool::spawn(&factory, &slots, &[2, 1, 0], &ready_tx, &record_tx, &counters);
        assert_eq!(pool.len(), 3);
        drop(record_tx);

        let mut summaries = pool.join().await.unwrap();
        summaries.sort_by_key(|summary| summary.slot);
        let games = summaries.iter().map(|summary| summary.games_played).collect::<Vec<_>>();
        assert_eq!(games, vec![2, 1, 0]);
        assert_eq!(counters.completed(), 3);
        assert_eq!(counters.games_played(), 3);

        let mut records = 0;
        while record_rx.recv().await.is_some() {
            records += 1;
        }
        assert_eq!(records, 3);
    }

    #[tokio::test]
    async fn test_join_reports_panicked_worker() {
        let slots = allocate_slots(2, SlotShape::new(1, 1, 1, 1));
        let (ready_tx, _ready_rx) = ready_queue();
        let (record_tx, _record_rx) = record_channel();
        let counters = RunCounters::new();

        let factory = |_slot: SlotId| PanickingAgent;
        let pool = WorkerPool::spawn(&factory, &slots, &[1, 1], &ready_tx, &record_tx, &counters);

        let err = pool.join().await.unwrap_err();
        assert!(matches!(err, CoachError::WorkerJoin { .. }));
        assert!(counters.has_failed());
        assert_eq!(counters.completed(), 0);
    }
}
