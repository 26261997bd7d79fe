//! Error type shared by every stage of the coordination layer.

use crate::communication::SlotId;

/// Errors surfaced by the coach.
///
/// Empty queues and bounded-wait timeouts are normal flow and never show up
/// here. Everything in this enum is fatal to the run that produced it.
#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to extract configuration: {0}")]
    ConfigExtraction(#[from] Box<figment::Error>),

    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataset codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// The evaluator produced a tensor that does not fit the slot buffers.
    #[error("{slot}: {buffer} buffer holds {expected} values but the evaluator produced {actual}")]
    ShapeMismatch {
        slot: SlotId,
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A slot was serviced while its previous result was still unconsumed.
    #[error("{0} was serviced again before its worker consumed the previous result")]
    DoubleService(SlotId),

    #[error("readiness signal for unknown {0}")]
    UnknownSlot(SlotId),

    /// The slot event was closed while a worker waited on it.
    #[error("slot event closed while waiting for inference")]
    Aborted,

    /// A channel towards the controller was dropped under a live worker.
    #[error("the inference server is no longer receiving")]
    ServerGone,

    /// The persisted dataset does not hold every record the workers emitted.
    #[error("iteration {iteration}: workers emitted {emitted} samples but {persisted} were persisted")]
    SampleCountMismatch {
        iteration: u32,
        emitted: usize,
        persisted: usize,
    },

    #[error("a self-play worker failed before completing its games")]
    WorkerFailed,

    #[error("failed to join worker for {slot}: {source}")]
    WorkerJoin {
        slot: SlotId,
        #[source]
        source: tokio::task::JoinError,
    },

    /// Error raised by an external collaborator (search, network, trainer, arena).
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

pub type Result<T, E = CoachError> = std::result::Result<T, E>;
