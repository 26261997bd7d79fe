//! A network with no weights beyond a value bias. Policy is always uniform.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use async_trait::async_trait;
use coach::checkpoint::Checkpointed;
use coach::core::{Evaluator, InputBatch, Prediction};
use coach::dataset::TrainingSet;
use coach::training::{Losses, Trainer};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniformNetwork {
    generation: u32,
    value_bias: f32,
}

impl UniformNetwork {
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[async_trait]
impl Evaluator for UniformNetwork {
    async fn process(&self, input: InputBatch<'_>) -> anyhow::Result<Prediction> {
        let shape = input.shape();
        let p = 1.0 / shape.actions as f32;
        Ok(Prediction::new(vec![p; shape.policy_len()], vec![self.value_bias; shape.value_len()]))
    }
}

#[async_trait]
impl Trainer for UniformNetwork {
    async fn train(&mut self, data: &TrainingSet, batch_size: usize) -> anyhow::Result<Losses> {
        let mut rng = StdRng::seed_from_u64(u64::from(self.generation));
        let mut policy_loss = 0.0;
        let mut value_loss = 0.0;
        let mut steps = 0usize;

        for batch in data.shuffled_batches(batch_size, &mut rng) {
            let n = batch.len() as f32;
            let target = batch.iter().map(|record| record.value).sum::<f32>() / n;
            value_loss += batch
                .iter()
                .map(|record| f64::from((record.value - self.value_bias).powi(2)))
                .sum::<f64>()
                / batch.len() as f64;
            policy_loss += batch
                .iter()
                .map(|record| cross_entropy_vs_uniform(&record.policy))
                .sum::<f64>()
                / batch.len() as f64;
            self.value_bias += 0.1 * (target - self.value_bias);
            steps += 1;
        }

        self.generation += 1;
        let steps = steps.max(1) as f64;
        debug!(generation = self.generation, bias = self.value_bias, "trained");
        Ok(Losses::new(policy_loss / steps, value_loss / steps))
    }
}

impl Checkpointed for UniformNetwork {
    fn save_checkpoint(&self, path: &Path) -> anyhow::Result<()> {
        bincode::serialize_into(BufWriter::new(File::create(path)?), self)?;
        Ok(())
    }

    fn load_checkpoint(&mut self, path: &Path) -> anyhow::Result<()> {
        *self = bincode::deserialize_from(BufReader::new(File::open(path)?))?;
        Ok(())
    }
}

fn cross_entropy_vs_uniform(target: &[f32]) -> f64 {
    let log_q = -(target.len().max(1) as f64).ln();
    -target.iter().map(|p| f64::from(*p) * log_q).sum::<f64>()
}
