use async_trait::async_trait;
use burn::prelude::{Backend, Tensor};
use burn::tensor::TensorData;
use crate::core::{Evaluator, InputBatch, Prediction};

/// A two-headed network over burn tensors.
///
/// `forward` receives a `(batch, rows, cols)` tensor and returns the policy
/// head `(batch, actions)` and the value head `(batch, 1)`.
pub trait BurnNetwork<B: Backend>: Send + Sync {
    fn forward(&self, input: Tensor<B, 3>) -> (Tensor<B, 2>, Tensor<B, 2>);
}

pub struct BurnEvaluator<B: Backend, M> {
    model: M,
    device: B::Device,
}

impl<B, M> BurnEvaluator<B, M>
where
    B: Backend,
    M: BurnNetwork<B>,
{
    pub fn new(model: M, device: B::Device) -> Self {
        Self { model, device }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

#[async_trait]
impl<B, M> Evaluator for BurnEvaluator<B, M>
where
    B: Backend,
    M: BurnNetwork<B>,
{
    async fn process(&self, input: InputBatch<'_>) -> anyhow::Result<Prediction> {
        let shape = input.shape();
        let data = TensorData::new(input.data().to_vec(), [shape.batch, shape.rows, shape.cols]);
        let boards = Tensor::<B, 3>::from_data(data, &self.device);
        let (policy, value) = self.model.forward(boards);
        Ok(Prediction::new(flatten(policy)?, flatten(value)?))
    }
}

fn flatten<B: Backend>(tensor: Tensor<B, 2>) -> anyhow::Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| anyhow::anyhow!("failed to read tensor data: {err:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use crate::communication::SlotShape;

    struct SumNetwork {
        actions: usize,
    }

    impl<B: Backend> BurnNetwork<B> for SumNetwork {
        fn forward(&self, input: Tensor<B, 3>) -> (Tensor<B, 2>, Tensor<B, 2>) {
            let [batch, _, _] = input.dims();
            let policy = Tensor::<B, 2>::ones([batch, self.actions], &input.device()).div_scalar(self.actions as f32);
            let value = input.sum_dim(2).sum_dim(1).reshape([batch, 1]);
            (policy, value)
        }
    }

    #[tokio::test]
    async fn test_burn_evaluator_flattens_heads() {
        let evaluator = BurnEvaluator::<NdArray, _>::new(SumNetwork { actions: 2 }, Default::default());
        let shape = SlotShape::new(2, 2, 1, 2);
        let data = [1.0, 2.0, 0.5, -0.5];

        let prediction = evaluator.process(InputBatch::new(&data, shape)).await.unwrap();

        assert_eq!(prediction.policy, vec![0.5; 4]);
        assert_eq!(prediction.value, vec![3.0, 0.0]);
    }
}
