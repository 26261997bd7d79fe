use tokio::sync::mpsc;
use super::slot::SlotId;

/// "This slot's input buffer is fully written, evaluate it."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadySignal {
    pub slot: SlotId,
}

impl ReadySignal {
    pub fn new(slot: SlotId) -> Self {
        Self { slot }
    }
}

/// Producer half of the readiness queue, cloned into every worker.
pub type ReadySender = mpsc::UnboundedSender<ReadySignal>;

/// Consumer half of the readiness queue, owned by the inference server.
pub type ReadyReceiver = mpsc::UnboundedReceiver<ReadySignal>;

/// Creates the multi-producer/single-consumer readiness queue for one iteration.
pub fn ready_queue() -> (ReadySender, ReadyReceiver) {
    mpsc::unbounded_channel()
}
