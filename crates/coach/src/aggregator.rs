//! Drains the shared output channel into persisted per-iteration datasets.

use std::path::PathBuf;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};
use crate::dataset::{DatasetStore, IterationDataset};
use crate::error::Result;
use crate::selfplay::RecordReceiver;

/// Where and how much one iteration persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedDataset {
    pub iteration: u32,
    pub records: usize,
    pub path: PathBuf,
}

pub struct SampleAggregator {
    store: DatasetStore,
    poll_interval: Duration,
}

impl SampleAggregator {
    pub fn new(store: DatasetStore, poll_interval: Duration) -> Self {
        Self { store, poll_interval }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Takes exactly the records queued when draining starts.
    ///
    /// Each receive waits at most one poll interval; a receive that times out
    /// or finds the channel closed ends the drain early with what was taken.
    pub async fn drain(&self, iteration: u32, records: &mut RecordReceiver) -> IterationDataset {
        let expected = records.len();
        let mut drained = Vec::with_capacity(expected);

        while drained.len() < expected {
            match timeout(self.poll_interval, records.recv()).await {
                Ok(Some(record)) => drained.push(record),
                Ok(None) => {
                    warn!(iteration, expected, drained = drained.len(), "record channel closed while draining");
                    break;
                }
                Err(_) => {
                    warn!(iteration, expected, drained = drained.len(), "record channel went quiet while draining");
                    break;
                }
            }
        }

        IterationDataset::new(iteration, drained)
    }

    /// Drains the channel and persists the full dataset for `iteration`.
    pub async fn collect(&self, iteration: u32, records: &mut RecordReceiver) -> Result<PersistedDataset> {
        let dataset = self.drain(iteration, records).await;
        let path = self.store.save(&dataset)?;
        info!(iteration, records = dataset.len(), path = %path.display(), "saved iteration samples");
        Ok(PersistedDataset {
            iteration,
            records: dataset.len(),
            path,
        })
    }
}
