use std::sync::Arc;
use tokio::sync::RwLockReadGuard;
use tracing::trace;
use crate::communication::{ReadySender, ReadySignal, SlotId, SlotShape, WorkerSlot};
use crate::error::{CoachError, Result};

/// Worker-side handle to one slot.
///
/// [`SlotClient::evaluate`] takes `&mut self` and the returned [`Evaluation`]
/// borrows the client, so a worker can never have two requests outstanding on
/// its slot: it cannot signal again before it has consumed the previous result.
pub struct SlotClient {
    slot: Arc<WorkerSlot>,
    ready: ReadySender,
    evaluations: usize,
}

impl SlotClient {
    pub fn new(slot: Arc<WorkerSlot>, ready: ReadySender) -> Self {
        Self {
            slot,
            ready,
            evaluations: 0,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot.id()
    }

    pub fn shape(&self) -> SlotShape {
        self.slot.shape()
    }

    /// Number of completed round trips to the evaluator.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Fills the input buffer, announces it and blocks until results are written.
    ///
    /// `fill` receives the whole `(batch, rows, cols)` input buffer. Must be
    /// called from a blocking thread.
    pub fn evaluate<F>(&mut self, fill: F) -> Result<Evaluation<'_>>
    where
        F: FnOnce(&mut [f32]),
    {
        {
            let mut input = self.slot.input().blocking_write();
            fill(&mut input);
        }

        let slot = self.slot.id();
        self.ready
            .send(ReadySignal::new(slot))
            .map_err(|_| CoachError::ServerGone)?;
        trace!(%slot, "batch announced");

        self.slot.event().wait()?;
        self.evaluations += 1;

        Ok(Evaluation {
            shape: self.slot.shape(),
            policy: self.slot.policy().blocking_read(),
            value: self.slot.value().blocking_read(),
        })
    }
}

/// Read view of a slot's output buffers after the server answered.
pub struct Evaluation<'a> {
    shape: SlotShape,
    policy: RwLockReadGuard<'a, Box<[f32]>>,
    value: RwLockReadGuard<'a, Box<[f32]>>,
}

impl Evaluation<'_> {
    pub fn batch_size(&self) -> usize {
        self.shape.batch
    }

    /// Policy row for the position at `row` of the submitted batch.
    ///
    /// # Panics
    ///
    /// When `row` is not below [`Self::batch_size`].
    pub fn policy(&self, row: usize) -> &[f32] {
        let actions = self.shape.actions;
        &self.policy[row * actions..(row + 1) * actions]
    }

    /// Value for the position at `row`.
    ///
    /// # Panics
    ///
    /// When `row` is not below [`Self::batch_size`].
    pub fn value(&self, row: usize) -> f32 {
        self.value[row]
    }

    pub fn policies(&self) -> &[f32] {
        &self.policy
    }

    pub fn values(&self) -> &[f32] {
        &self.value
    }
}
