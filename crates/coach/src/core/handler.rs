use async_trait::async_trait;
use crate::communication::SlotShape;

/// A slot's input buffer, borrowed for the duration of one forward pass.
#[derive(Debug, Clone, Copy)]
pub struct InputBatch<'a> {
    data: &'a [f32],
    shape: SlotShape,
}

impl<'a> InputBatch<'a> {
    pub fn new(data: &'a [f32], shape: SlotShape) -> Self {
        Self { data, shape }
    }

    /// Row-major `(batch, rows, cols)` values.
    pub fn data(&self) -> &'a [f32] {
        self.data
    }

    pub fn shape(&self) -> SlotShape {
        self.shape
    }

    pub fn batch_size(&self) -> usize {
        self.shape.batch
    }

    /// The board at position `row` of the batch.
    ///
    /// # Panics
    ///
    /// When `row` is not below [`Self::batch_size`].
    pub fn state(&self, row: usize) -> &'a [f32] {
        let len = self.shape.state_len();
        &self.data[row * len..(row + 1) * len]
    }
}

/// Output of one forward pass over a full slot batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Row-major `(batch, actions)` policy.
    pub policy: Vec<f32>,
    /// One value per batch row.
    pub value: Vec<f32>,
}

impl Prediction {
    pub fn new(policy: Vec<f32>, value: Vec<f32>) -> Self {
        Self { policy, value }
    }
}

/// The neural-network evaluator.
///
/// `process` must be a pure function of its input for fixed weights. The
/// server validates the output lengths against the slot; implementations do
/// not need to.
///
/// # Example
///
/// ```ignore
/// struct Uniform;
///
/// #[async_trait]
/// impl Evaluator for Uniform {
///     async fn process(&self, input: InputBatch<'_>) -> anyhow::Result<Prediction> {
///         let shape = input.shape();
///         let p = 1.0 / shape.actions as f32;
///         Ok(Prediction::new(vec![p; shape.policy_len()], vec![0.0; shape.value_len()]))
///     }
/// }
/// ```
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn process(&self, input: InputBatch<'_>) -> anyhow::Result<Prediction>;
}
