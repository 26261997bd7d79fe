//! In-process collaborators for unit tests.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use crate::arena::{Arena, MatchOutcome, Opponent};
use crate::checkpoint::Checkpointed;
use crate::core::{Evaluator, InputBatch, Prediction};
use crate::dataset::TrainingSet;
use crate::selfplay::{GameRecord, SelfPlay, WorkerContext};
use crate::telemetry::ScalarSink;
use crate::training::{Losses, Trainer};

/// Uniform policy; the value of each row is the first cell of its board.
fn echo(input: &InputBatch<'_>) -> Prediction {
    let shape = input.shape();
    let policy = vec![1.0 / shape.actions as f32; shape.policy_len()];
    let value = (0..input.batch_size())
        .map(|row| input.state(row).first().copied().unwrap_or_default())
        .collect();
    Prediction::new(policy, value)
}

#[derive(Debug, Default)]
pub struct EchoEvaluator {
    calls: AtomicUsize,
}

impl EchoEvaluator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Evaluator for EchoEvaluator {
    async fn process(&self, input: InputBatch<'_>) -> anyhow::Result<Prediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(echo(&input))
    }
}

/// Produces a policy one value short of the slot geometry.
#[derive(Debug, Default)]
pub struct MisshapenEvaluator;

#[async_trait]
impl Evaluator for MisshapenEvaluator {
    async fn process(&self, input: InputBatch<'_>) -> anyhow::Result<Prediction> {
        let mut prediction = echo(&input);
        prediction.policy.pop();
        Ok(prediction)
    }
}

/// Plays every game as a fixed number of evaluations followed by one record.
#[derive(Debug, Clone, Copy)]
pub struct CountingAgent {
    evals_per_game: usize,
}

impl CountingAgent {
    pub fn new(evals_per_game: usize) -> Self {
        Self { evals_per_game }
    }
}

impl SelfPlay for CountingAgent {
    fn play(&mut self, games: usize, ctx: &mut WorkerContext) -> anyhow::Result<()> {
        let marker = ctx.slot().0 as f32;
        let state_len = ctx.shape().state_len();
        for _ in 0..games {
            let mut policy = vec![0.0; ctx.shape().actions];
            let mut value = 0.0;
            for _ in 0..self.evals_per_game {
                let evaluation = ctx.evaluate(|boards| boards.fill(marker))?;
                policy.copy_from_slice(evaluation.policy(0));
                value = evaluation.value(0);
            }
            ctx.emit(GameRecord::new(vec![marker; state_len], policy, value))?;
            ctx.finish_game();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FailingAgent;

impl SelfPlay for FailingAgent {
    fn play(&mut self, _games: usize, _ctx: &mut WorkerContext) -> anyhow::Result<()> {
        anyhow::bail!("search blew up")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PanickingAgent;

impl SelfPlay for PanickingAgent {
    fn play(&mut self, _games: usize, _ctx: &mut WorkerContext) -> anyhow::Result<()> {
        panic!("worker panicked mid-game")
    }
}

/// Echo evaluator whose weights are a version number.
///
/// Training bumps the version and remembers how many samples it saw.
/// Checkpoints hold the version as text.
#[derive(Debug, Clone, Default)]
pub struct ScriptedNetwork {
    version: u32,
    trained_on: Vec<usize>,
}

impl ScriptedNetwork {
    pub fn with_version(version: u32) -> Self {
        Self {
            version,
            trained_on: vec![],
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn trained_on(&self) -> Vec<usize> {
        self.trained_on.clone()
    }
}

#[async_trait]
impl Evaluator for ScriptedNetwork {
    async fn process(&self, input: InputBatch<'_>) -> anyhow::Result<Prediction> {
        Ok(echo(&input))
    }
}

#[async_trait]
impl Trainer for ScriptedNetwork {
    async fn train(&mut self, data: &TrainingSet, _batch_size: usize) -> anyhow::Result<Losses> {
        self.trained_on.push(data.len());
        self.version += 1;
        Ok(Losses::new(0.5, 0.25))
    }
}

impl Checkpointed for ScriptedNetwork {
    fn save_checkpoint(&self, path: &Path) -> anyhow::Result<()> {
        fs::write(path, self.version.to_string())?;
        Ok(())
    }

    fn load_checkpoint(&mut self, path: &Path) -> anyhow::Result<()> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        self.version = text.trim().parse()?;
        Ok(())
    }
}

/// Returns the same outcome against every opponent and logs who was played.
#[derive(Debug, Clone)]
pub struct ScriptedArena {
    outcome: MatchOutcome,
    opponents: Arc<Mutex<Vec<&'static str>>>,
}

impl ScriptedArena {
    pub fn new(outcome: MatchOutcome) -> Self {
        Self {
            outcome,
            opponents: Arc::default(),
        }
    }

    pub fn opponents(&self) -> Arc<Mutex<Vec<&'static str>>> {
        self.opponents.clone()
    }
}

#[async_trait]
impl<N> Arena<N> for ScriptedArena
where
    N: Send + Sync,
{
    async fn play_match(&mut self, _candidate: &N, opponent: Opponent<'_, N>, _games: usize) -> anyhow::Result<MatchOutcome> {
        self.opponents.lock().push(opponent.label());
        Ok(self.outcome)
    }
}

/// Keeps every scalar in memory; clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryScalarSink {
    rows: Arc<Mutex<Vec<(String, f64, u32)>>>,
}

impl MemoryScalarSink {
    pub fn values(&self, tag: &str) -> Vec<f64> {
        self.rows
            .lock()
            .iter()
            .filter(|(t, _, _)| t == tag)
            .map(|(_, value, _)| *value)
            .collect()
    }
}

impl ScalarSink for MemoryScalarSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u32) {
        self.rows.lock().push((tag.to_string(), value, step));
    }
}
