use std::sync::Arc;
use tracing::{debug, warn};
use super::client::{Evaluation, SlotClient};
use super::core_trait::SelfPlay;
use super::record::{GameRecord, RecordSender};
use crate::communication::{Pill, ReadySender, RunCounters, SlotId, SlotShape, WorkerSlot};
use crate::error::{CoachError, Result};

/// Everything a self-play agent may touch while it runs.
pub struct WorkerContext {
    client: SlotClient,
    records: RecordSender,
    counters: RunCounters,
    games_assigned: usize,
    games_finished: usize,
    records_emitted: usize,
}

impl WorkerContext {
    pub fn new(
        slot: Arc<WorkerSlot>,
        ready: ReadySender,
        records: RecordSender,
        counters: RunCounters,
        games_assigned: usize,
    ) -> Self {
        Self {
            client: SlotClient::new(slot, ready),
            records,
            counters,
            games_assigned,
            games_finished: 0,
            records_emitted: 0,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.client.slot()
    }

    pub fn shape(&self) -> SlotShape {
        self.client.shape()
    }

    pub fn games_assigned(&self) -> usize {
        self.games_assigned
    }

    pub fn games_finished(&self) -> usize {
        self.games_finished
    }

    /// See [`SlotClient::evaluate`].
    pub fn evaluate<F>(&mut self, fill: F) -> Result<Evaluation<'_>>
    where
        F: FnOnce(&mut [f32]),
    {
        self.client.evaluate(fill)
    }

    /// Pushes a finished training example to the shared output channel.
    pub fn emit(&mut self, record: GameRecord) -> Result<()> {
        self.records.send(record).map_err(|_| CoachError::ServerGone)?;
        self.records_emitted += 1;
        self.counters.mark_record_emitted();
        Ok(())
    }

    pub fn finish_game(&mut self) {
        self.games_finished += 1;
        self.counters.mark_game_played();
    }

    fn summary(&self) -> WorkerSummary {
        WorkerSummary {
            slot: self.slot(),
            games_played: self.games_finished,
            records_emitted: self.records_emitted,
            evaluations: self.client.evaluations(),
        }
    }
}

/// What one worker did during an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSummary {
    pub slot: SlotId,
    pub games_played: usize,
    pub records_emitted: usize,
    pub evaluations: usize,
}

/// Body of a worker thread: play the assigned games, then report completion once.
pub(crate) fn run_agent<A: SelfPlay>(mut agent: A, mut ctx: WorkerContext) -> Result<WorkerSummary> {
    let slot = ctx.slot();
    let _pill = Pill::new(ctx.counters.clone(), slot);
    let games = ctx.games_assigned;
    debug!(%slot, games, "worker started");

    if let Err(err) = agent.play(games, &mut ctx) {
        warn!(%slot, %err, "worker stopped early");
        ctx.counters.mark_failed();
        return Err(CoachError::Collaborator(err));
    }

    if ctx.games_finished != games {
        warn!(%slot, assigned = games, finished = ctx.games_finished, "worker finished a different number of games than assigned");
    }
    ctx.counters.mark_completed();
    let summary = ctx.summary();
    debug!(%slot, evaluations = summary.evaluations, records = summary.records_emitted, "worker completed");
    Ok(summary)
}
