//! # Tensor Backends
//!
//! Adapters from tensor libraries to the [`Evaluator`](crate::core::Evaluator)
//! contract, so a two-headed network can be served without hand-written glue.
//!
//! ## Feature Flags
//!
//! - `candle`: [`candle::CandleEvaluator`] over a [`candle::CandleNetwork`]
//! - `burn`: [`burn::BurnEvaluator`] over a [`burn::BurnNetwork`]
//!
//! Both adapters copy the slot's input buffer into a `(batch, rows, cols)`
//! tensor and flatten the two heads back into row-major `f32` vectors. Output
//! lengths are checked by the server, not here.

#[cfg_attr(docsrs, doc(cfg(feature = "candle")))]
#[cfg(feature = "candle")]
/// Candle evaluator.
///
/// Only available when the `candle` feature flag is enabled.
pub mod candle;

#[cfg_attr(docsrs, doc(cfg(feature = "burn")))]
#[cfg(feature = "burn")]
/// Burn evaluator.
///
/// Only available when the `burn` feature flag is enabled. Burn tensors carry
/// their rank in the type, so the network signature fixes a rank-3 input and
/// rank-2 heads.
pub mod burn;
