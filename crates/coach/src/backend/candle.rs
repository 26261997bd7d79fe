use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use crate::core::{Evaluator, InputBatch, Prediction};

/// A two-headed network over candle tensors.
///
/// `forward` receives a `(batch, rows, cols)` tensor and returns the policy
/// head `(batch, actions)` and the value head with `batch` elements.
pub trait CandleNetwork: Send + Sync {
    fn forward(&self, input: &Tensor) -> candle_core::Result<(Tensor, Tensor)>;
}

pub struct CandleEvaluator<M> {
    model: M,
    device: Device,
}

impl<M: CandleNetwork> CandleEvaluator<M> {
    pub fn new(model: M, device: Device) -> Self {
        Self { model, device }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

#[async_trait]
impl<M: CandleNetwork> Evaluator for CandleEvaluator<M> {
    async fn process(&self, input: InputBatch<'_>) -> anyhow::Result<Prediction> {
        let shape = input.shape();
        let boards = Tensor::from_slice(input.data(), (shape.batch, shape.rows, shape.cols), &self.device)?;
        let (policy, value) = self.model.forward(&boards)?;
        Ok(Prediction::new(flatten(&policy)?, flatten(&value)?))
    }
}

fn flatten(tensor: &Tensor) -> candle_core::Result<Vec<f32>> {
    tensor.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::SlotShape;

    struct MeanNetwork {
        actions: usize,
    }

    impl CandleNetwork for MeanNetwork {
        fn forward(&self, input: &Tensor) -> candle_core::Result<(Tensor, Tensor)> {
            let batch = input.dim(0)?;
            let policy = Tensor::full(1.0 / self.actions as f32, (batch, self.actions), input.device())?;
            let value = input.flatten_from(1)?.mean(1)?;
            Ok((policy, value))
        }
    }

    #[tokio::test]
    async fn test_candle_evaluator_flattens_heads() {
        let evaluator = CandleEvaluator::new(MeanNetwork { actions: 4 }, Device::Cpu);
        let shape = SlotShape::new(2, 1, 2, 4);
        let data = [1.0, 3.0, -2.0, 0.0];

        let prediction = evaluator.process(InputBatch::new(&data, shape)).await.unwrap();

        assert_eq!(prediction.policy, vec![0.25; 8]);
        assert_eq!(prediction.value, vec![2.0, -1.0]);
    }
}
