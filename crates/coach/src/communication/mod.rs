//! Shared-memory protocol between self-play workers and the inference server.
//!
//! A worker owns exactly one [`WorkerSlot`]. It writes a batch into the slot's
//! input buffer, pushes a [`ReadySignal`] onto the shared queue and blocks on
//! the slot's [`SlotEvent`]. The server answers by writing the policy and value
//! buffers and setting the event. [`RunCounters`] track completion.

mod counters;
mod pill;
mod signal;
mod slot;

pub use counters::RunCounters;
pub(crate) use pill::Pill;
pub use signal::{ready_queue, ReadyReceiver, ReadySender, ReadySignal};
pub use slot::{allocate_slots, EventState, SlotEvent, SlotId, SlotShape, WorkerSlot};
