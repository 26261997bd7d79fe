use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Inner {
    completed: AtomicUsize,
    games_played: AtomicUsize,
    records_emitted: AtomicUsize,
    failed: AtomicBool,
}

/// Shared counters for one run, handed to every worker at spawn time.
///
/// `completed` and `games_played` are the only values written concurrently
/// by several workers, so every write is a single atomic increment.
#[derive(Debug, Clone, Default)]
pub struct RunCounters {
    inner: Arc<Inner>,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of workers that finished all of their assigned games.
    pub fn completed(&self) -> usize {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// Number of games finished across all workers this iteration.
    pub fn games_played(&self) -> usize {
        self.inner.games_played.load(Ordering::Acquire)
    }

    /// Number of game records pushed to the output channel this iteration.
    pub fn records_emitted(&self) -> usize {
        self.inner.records_emitted.load(Ordering::Acquire)
    }

    pub fn has_failed(&self) -> bool {
        self.inner.failed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_completed(&self) -> usize {
        self.inner.completed.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn mark_game_played(&self) -> usize {
        self.inner.games_played.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn mark_record_emitted(&self) -> usize {
        self.inner.records_emitted.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn mark_failed(&self) {
        self.inner.failed.store(true, Ordering::Release);
    }

    /// Zeroes every counter and clears the failure flag.
    pub fn reset(&self) {
        self.inner.completed.store(0, Ordering::Release);
        self.inner.games_played.store(0, Ordering::Release);
        self.inner.records_emitted.store(0, Ordering::Release);
        self.inner.failed.store(false, Ordering::Release);
    }
}
