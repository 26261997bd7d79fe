//! # Coach
//!
//! Coordination layer for AlphaZero-style self-play training: many search
//! workers share one neural-network evaluator through a batched inference
//! server, and their games become training data for the next network.
//!
//! ## Overview
//!
//! A training run is a sequence of iterations. Every iteration
//!
//! 1. spawns one self-play worker thread per slot,
//! 2. serves their evaluation requests until every worker reports completion,
//! 3. persists every emitted training example as that iteration's dataset,
//! 4. trains the network on a window of the most recent datasets,
//! 5. pits the new network against random, greedy and best baselines, and
//!    promotes it when it wins often enough against best.
//!
//! Search, game rules, the network, the optimiser and match play are external
//! collaborators behind the [`selfplay::SelfPlay`], [`core::Evaluator`],
//! [`training::Trainer`], [`checkpoint::Checkpointed`] and [`arena::Arena`]
//! traits.
//!
//! ## Architecture
//!
//! ### Slots
//!
//! Each worker owns a [`communication::WorkerSlot`]: fixed input, policy and
//! value buffers plus a binary event. A worker fills its input buffer, pushes
//! its slot id onto the readiness queue and blocks on the event. The server
//! reads the input in place, writes the outputs and sets the event.
//!
//! ### Server
//!
//! [`core::BatchInferenceServer`] is the single consumer of the readiness
//! queue. It races queue delivery against a poll-interval ticker so that
//! progress is logged and worker failures are noticed while nobody signals.
//!
//! ### Controller
//!
//! [`controller::IterationController`] owns the slots for the whole run and
//! walks every iteration through its phases, tearing the workers down and
//! resetting the slots before training starts.
//!
//! ## Features
//!
//! - **candle** - Enables the candle evaluator adapter
//! - **burn** - Enables the burn evaluator adapter
//!
//! ## Configuration
//!
//! [`config::CoachConfig`] layers defaults, an optional TOML file and
//! `COACH_*` environment variables.

pub mod aggregator;
pub mod arena;
pub mod backend;
pub mod checkpoint;
pub mod communication;
pub mod config;
pub mod controller;
pub mod core;
pub mod dataset;
pub mod error;
pub mod selfplay;
pub mod telemetry;
pub mod training;

#[cfg(test)]
pub(crate) mod testing;

pub use config::CoachConfig;
pub use controller::{IterationController, IterationPhase, IterationReport, Network};
pub use error::{CoachError, Result};
