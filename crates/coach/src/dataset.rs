//! Persisted per-iteration datasets and the windowed training view over them.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::error::Result;
use crate::selfplay::GameRecord;

/// Every record drained during one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationDataset {
    iteration: u32,
    records: Vec<GameRecord>,
}

impl IterationDataset {
    pub fn new(iteration: u32, records: Vec<GameRecord>) -> Self {
        Self { iteration, records }
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<GameRecord> {
        self.records
    }
}

/// Directory of `iteration-NNNN-samples.bin` files.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    dir: PathBuf,
}

impl DatasetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, iteration: u32) -> PathBuf {
        self.dir.join(format!("iteration-{iteration:04}-samples.bin"))
    }

    pub fn save(&self, dataset: &IterationDataset) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(dataset.iteration);
        let writer = BufWriter::new(File::create(&path)?);
        bincode::serialize_into(writer, dataset)?;
        debug!(path = %path.display(), records = dataset.len(), "dataset saved");
        Ok(path)
    }

    pub fn load(&self, iteration: u32) -> Result<IterationDataset> {
        let reader = BufReader::new(File::open(self.path_for(iteration))?);
        Ok(bincode::deserialize_from(reader)?)
    }

    /// Concatenates the `history` most recent datasets ending at `iteration`.
    pub fn load_window(&self, iteration: u32, history: u32) -> Result<TrainingSet> {
        let iterations = window(iteration, history);
        let mut records = vec![];
        for idx in iterations.clone() {
            records.extend(self.load(idx)?.into_records());
        }
        Ok(TrainingSet { records, iterations })
    }
}

/// Iterations covered by a training window of `history` datasets (at least one).
pub fn window(iteration: u32, history: u32) -> RangeInclusive<u32> {
    let history = history.max(1);
    let first = (iteration + 1).saturating_sub(history).max(1);
    first..=iteration
}

/// Training examples from a window of iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    records: Vec<GameRecord>,
    iterations: RangeInclusive<u32>,
}

impl TrainingSet {
    pub fn new(records: Vec<GameRecord>, iterations: RangeInclusive<u32>) -> Self {
        Self { records, iterations }
    }

    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    pub fn iterations(&self) -> &RangeInclusive<u32> {
        &self.iterations
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One shuffled pass over the set in minibatches of `batch_size`; the last may be short.
    pub fn shuffled_batches<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<Vec<&GameRecord>> {
        let mut order = (0..self.records.len()).collect::<Vec<_>>();
        order.shuffle(rng);
        order
            .chunks(batch_size.max(1))
            .map(|chunk| chunk.iter().map(|&idx| &self.records[idx]).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use crate::error::CoachError;

    fn record(value: f32) -> GameRecord {
        GameRecord::new(vec![value; 4], vec![0.5, 0.5], value)
    }

    #[test]
    fn test_window_bounds() {
        assert_eq!(window(1, 4), 1..=1);
        assert_eq!(window(3, 1), 3..=3);
        assert_eq!(window(10, 4), 7..=10);
        assert_eq!(window(2, 0), 2..=2);
    }

    #[test]
    fn test_save_keeps_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        let dataset = IterationDataset::new(7, (0..25).map(|v| record(v as f32)).collect());

        let path = store.save(&dataset).unwrap();
        assert!(path.ends_with("iteration-0007-samples.bin"));

        let loaded = store.load(7).unwrap();
        assert_eq!(loaded.len(), 25);
        assert_eq!(loaded, dataset);
    }

    #[test]
    fn test_load_window_concatenates_recent_iterations() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        for iteration in 1..=4 {
            let records = (0..iteration).map(|_| record(iteration as f32)).collect();
            store.save(&IterationDataset::new(iteration, records)).unwrap();
        }

        let set = store.load_window(4, 2).unwrap();
        assert_eq!(set.iterations(), &(3..=4));
        assert_eq!(set.len(), 7);
        assert!(set.records().iter().all(|r| r.value >= 3.0));
    }

    #[test]
    fn test_missing_dataset_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        assert!(matches!(store.load_window(2, 2), Err(CoachError::Io(_))));
    }

    #[test]
    fn test_shuffled_batches_cover_the_set_once() {
        let set = TrainingSet::new((0..10).map(|v| record(v as f32)).collect(), 1..=1);
        let mut rng = StdRng::seed_from_u64(7);

        let batches = set.shuffled_batches(4, &mut rng);
        let sizes = batches.iter().map(Vec::len).collect::<Vec<_>>();
        assert_eq!(sizes, vec![4, 4, 2]);

        let mut values = batches.iter().flatten().map(|r| r.value as i32).collect::<Vec<_>>();
        values.sort();
        assert_eq!(values, (0..10).collect::<Vec<_>>());
    }
}
