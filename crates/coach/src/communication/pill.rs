use std::thread;
use tracing::error;
use super::counters::RunCounters;
use super::slot::SlotId;

/// # Pill
///
/// Carried by every worker thread for its whole lifetime. If the thread
/// unwinds, dropping the pill trips the run's failure flag so the inference
/// server stops waiting on a worker that will never report completion.
pub(crate) struct Pill {
    counters: RunCounters,
    slot: SlotId,
}

impl Pill {
    pub(crate) fn new(counters: RunCounters, slot: SlotId) -> Self {
        Self { counters, slot }
    }
}

impl Drop for Pill {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(slot = %self.slot, "self-play worker panicked");
            self.counters.mark_failed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pill_does_not_trip_in_normal_case() {
        let counters = RunCounters::new();
        {
            let _pill = Pill::new(counters.clone(), SlotId(0));
        }
        assert!(!counters.has_failed());
    }

    #[test]
    fn test_pill_trips_when_worker_panics() {
        let counters = RunCounters::new();

        let handle = {
            let counters = counters.clone();
            thread::spawn(move || {
                let _pill = Pill::new(counters, SlotId(1));
                panic!("Intentional panic in worker thread");
            })
        };

        assert!(handle.join().is_err(), "Thread should have panicked");
        assert!(counters.has_failed());
    }
}
