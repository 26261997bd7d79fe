use std::fmt;
use std::sync::Arc;
use parking_lot::{Condvar, Mutex};
use tokio::sync::RwLock;
use crate::error::{CoachError, Result};

/// Identifies one worker slot, and therefore the worker bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// Fixed buffer geometry of every slot.
///
/// The input buffer is laid out `(batch, rows, cols)`, the policy buffer
/// `(batch, actions)` and the value buffer `(batch, 1)`, all row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotShape {
    pub batch: usize,
    pub rows: usize,
    pub cols: usize,
    pub actions: usize,
}

impl SlotShape {
    pub fn new(batch: usize, rows: usize, cols: usize, actions: usize) -> Self {
        Self { batch, rows, cols, actions }
    }

    /// Number of values describing a single board.
    pub fn state_len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn input_len(&self) -> usize {
        self.batch * self.state_len()
    }

    pub fn policy_len(&self) -> usize {
        self.batch * self.actions
    }

    pub fn value_len(&self) -> usize {
        self.batch
    }
}

/// Observable state of a [`SlotEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    /// No result is waiting for the worker.
    Pending,
    /// The server wrote results and the worker has not consumed them yet.
    Ready,
    /// The run is being torn down; waiters are released with [`CoachError::Aborted`].
    Closed,
}

/// Binary event owned by one slot: set by the server, consumed by the worker.
pub struct SlotEvent {
    state: Mutex<EventState>,
    condvar: Condvar,
}

impl SlotEvent {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EventState::Pending),
            condvar: Condvar::new(),
        }
    }

    pub fn state(&self) -> EventState {
        *self.state.lock()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == EventState::Ready
    }

    /// Moves the event from `Pending` to `Ready` and wakes the worker.
    ///
    /// Returns `false` when the event was not pending, which means the slot
    /// still holds an unconsumed result (or the run is closing).
    pub fn set(&self) -> bool {
        let mut state = self.state.lock();
        if *state != EventState::Pending {
            return false;
        }
        *state = EventState::Ready;
        self.condvar.notify_all();
        true
    }

    /// Blocks the calling thread until the event is ready, then consumes it.
    ///
    /// Must only be called from a blocking worker thread.
    pub fn wait(&self) -> Result<()> {
        let mut state = self.state.lock();
        loop {
            match *state {
                EventState::Ready => {
                    *state = EventState::Pending;
                    return Ok(());
                }
                EventState::Closed => return Err(CoachError::Aborted),
                EventState::Pending => self.condvar.wait(&mut state),
            }
        }
    }

    /// Releases every waiter with [`CoachError::Aborted`] until the next reset.
    pub fn close(&self) {
        *self.state.lock() = EventState::Closed;
        self.condvar.notify_all();
    }

    pub fn reset(&self) {
        *self.state.lock() = EventState::Pending;
    }
}

impl Default for SlotEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SlotEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotEvent").field("state", &self.state()).finish()
    }
}

/// A worker's dedicated channel to the evaluator.
///
/// Buffers are allocated once and reused for every iteration of a run. Each
/// buffer has a single writer at any time: the worker writes `input`, the
/// server writes `policy` and `value`, and the event handshake orders the two.
#[derive(Debug)]
pub struct WorkerSlot {
    id: SlotId,
    shape: SlotShape,
    input: RwLock<Box<[f32]>>,
    policy: RwLock<Box<[f32]>>,
    value: RwLock<Box<[f32]>>,
    event: SlotEvent,
}

impl WorkerSlot {
    pub fn new(id: SlotId, shape: SlotShape) -> Self {
        Self {
            id,
            shape,
            input: RwLock::new(zeroed(shape.input_len())),
            policy: RwLock::new(zeroed(shape.policy_len())),
            value: RwLock::new(zeroed(shape.value_len())),
            event: SlotEvent::new(),
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn shape(&self) -> SlotShape {
        self.shape
    }

    pub fn input(&self) -> &RwLock<Box<[f32]>> {
        &self.input
    }

    pub fn policy(&self) -> &RwLock<Box<[f32]>> {
        &self.policy
    }

    pub fn value(&self) -> &RwLock<Box<[f32]>> {
        &self.value
    }

    pub fn event(&self) -> &SlotEvent {
        &self.event
    }

    /// Returns the event to `Pending` between iterations. Buffers keep their contents.
    pub fn reset(&self) {
        self.event.reset();
    }
}

/// Allocates one slot per worker.
pub fn allocate_slots(count: usize, shape: SlotShape) -> Vec<Arc<WorkerSlot>> {
    (0..count)
        .map(|idx| Arc::new(WorkerSlot::new(SlotId(idx), shape)))
        .collect()
}

fn zeroed(len: usize) -> Box<[f32]> {
    vec![0.0; len].into_boxed_slice()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn shape() -> SlotShape {
        SlotShape::new(2, 3, 3, 10)
    }

    #[test]
    fn test_slot_buffers_follow_shape() {
        let slot = WorkerSlot::new(SlotId(4), shape());

        assert_eq!(slot.id(), SlotId(4));
        assert_eq!(slot.input().blocking_read().len(), 18);
        assert_eq!(slot.policy().blocking_read().len(), 20);
        assert_eq!(slot.value().blocking_read().len(), 2);
        assert_eq!(slot.event().state(), EventState::Pending);
    }

    #[test]
    fn test_set_only_succeeds_from_pending() {
        let event = SlotEvent::new();

        assert!(event.set());
        assert!(event.is_ready());
        // a second set without the worker consuming is a double service
        assert!(!event.set());

        event.wait().unwrap();
        assert_eq!(event.state(), EventState::Pending);
        assert!(event.set());
    }

    #[test]
    fn test_wait_blocks_until_set() {
        let event = Arc::new(SlotEvent::new());
        let waiter = {
            let event = event.clone();
            thread::spawn(move || event.wait())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        assert!(event.set());
        waiter.join().unwrap().unwrap();
        assert_eq!(event.state(), EventState::Pending);
    }

    #[test]
    fn test_close_releases_waiters() {
        let event = Arc::new(SlotEvent::new());
        let waiters = (0..3)
            .map(|_| {
                let event = event.clone();
                thread::spawn(move || event.wait())
            })
            .collect::<Vec<_>>();

        thread::sleep(Duration::from_millis(50));
        event.close();

        for waiter in waiters {
            assert!(matches!(waiter.join().unwrap(), Err(CoachError::Aborted)));
        }
        assert!(!event.set());
    }

    #[test]
    fn test_reset_matches_fresh_slot() {
        let fresh = WorkerSlot::new(SlotId(0), shape());
        let used = WorkerSlot::new(SlotId(0), shape());

        used.input().blocking_write()[0] = 7.0;
        assert!(used.event().set());
        used.reset();
        assert_eq!(used.event().state(), fresh.event().state());

        used.event().close();
        used.reset();
        assert_eq!(used.event().state(), fresh.event().state());
        assert_eq!(used.shape(), fresh.shape());
        assert_eq!(used.input().blocking_read().len(), fresh.input().blocking_read().len());
        // buffers survive reset untouched
        assert_eq!(used.input().blocking_read()[0], 7.0);
    }

    #[test]
    fn test_allocate_slots_assigns_sequential_ids() {
        let slots = allocate_slots(3, shape());
        let ids = slots.iter().map(|slot| slot.id()).collect::<Vec<_>>();
        assert_eq!(ids, vec![SlotId(0), SlotId(1), SlotId(2)]);
        assert_eq!(SlotId(2).to_string(), "slot-2");
    }
}
