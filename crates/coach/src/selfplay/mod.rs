//! Worker-side contract of self-play generation.
//!
//! * [`SelfPlay`] - the search collaborator run on each worker thread.
//! * [`WorkerContext`] - the agent's access to its slot, the output channel and the counters.
//! * [`GameRecord`] - one training example pushed to the output channel.

mod client;
mod context;
mod core_trait;
mod record;

pub use client::{Evaluation, SlotClient};
pub use context::{WorkerContext, WorkerSummary};
pub(crate) use context::run_agent;
pub use core_trait::{split_games, SelfPlay, SelfPlayFactory};
pub use record::{record_channel, GameRecord, RecordReceiver, RecordSender};
