use async_trait::async_trait;
use crate::dataset::TrainingSet;

/// Mean losses of one training pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Losses {
    pub policy: f64,
    pub value: f64,
}

impl Losses {
    pub fn new(policy: f64, value: f64) -> Self {
        Self { policy, value }
    }

    pub fn total(&self) -> f64 {
        self.policy + self.value
    }
}

/// The optimisation collaborator. Updates the network in place.
#[async_trait]
pub trait Trainer: Send {
    async fn train(&mut self, data: &TrainingSet, batch_size: usize) -> anyhow::Result<Losses>;
}
