use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One training example produced by a self-play worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Board state, `rows * cols` values.
    pub state: Vec<f32>,
    /// Search policy target, one value per action.
    pub policy: Vec<f32>,
    /// Game outcome from the perspective of the player to move.
    pub value: f32,
}

impl GameRecord {
    pub fn new(state: Vec<f32>, policy: Vec<f32>, value: f32) -> Self {
        Self { state, policy, value }
    }
}

pub type RecordSender = mpsc::UnboundedSender<GameRecord>;
pub type RecordReceiver = mpsc::UnboundedReceiver<GameRecord>;

/// Creates the shared output channel of one iteration.
pub fn record_channel() -> (RecordSender, RecordReceiver) {
    mpsc::unbounded_channel()
}
