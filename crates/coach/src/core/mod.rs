//! # Inference scheduling core
//!
//! * [`handler`] - the [`Evaluator`] contract and the borrowed [`InputBatch`] it receives.
//! * [`batcher`] - [`BatchInferenceServer`], the single consumer of readiness signals.
//! * `batch` - the serving and draining loops driven by the server.
//! * [`worker`] - [`WorkerPool`], spawning and joining the self-play worker threads.
//!
mod batch;
pub mod batcher;
pub mod handler;
pub mod worker;

pub use batcher::{BatchInferenceServer, ServeReport};
pub use handler::{Evaluator, InputBatch, Prediction};
pub use worker::WorkerPool;
