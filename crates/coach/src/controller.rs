//! The iteration state machine.
//!
//! One iteration walks `SpawningWorkers → Serving → Draining →
//! PersistingSamples → TearingDownWorkers → Training → Evaluating` and returns
//! to `Idle`. Slots and counters live for the whole run; the readiness queue,
//! the record channel and the worker threads live for one iteration.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use crate::aggregator::SampleAggregator;
use crate::arena::{Arena, EvaluationReport, MatchOutcome, Opponent, PromotionDecision};
use crate::checkpoint::{CheckpointStore, CheckpointTag, Checkpointed};
use crate::communication::{allocate_slots, ready_queue, RunCounters, WorkerSlot};
use crate::config::CoachConfig;
use crate::core::{BatchInferenceServer, Evaluator, WorkerPool};
use crate::dataset::DatasetStore;
use crate::error::{CoachError, Result};
use crate::selfplay::{record_channel, split_games, SelfPlayFactory, WorkerSummary};
use crate::telemetry::{CsvScalarSink, ScalarSink, TracingScalarSink};
use crate::training::{Losses, Trainer};

/// A network the controller can serve, train and snapshot.
pub trait Network: Evaluator + Trainer + Checkpointed {}

impl<T> Network for T where T: Evaluator + Trainer + Checkpointed {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationPhase {
    Idle,
    SpawningWorkers,
    Serving,
    Draining,
    PersistingSamples,
    TearingDownWorkers,
    Training,
    Evaluating,
    /// Reached after the last configured iteration.
    Finished,
}

impl fmt::Display for IterationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Self-play half of an iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// Completion counter when serving ended.
    pub completed_workers: usize,
    /// Games-played counter when serving ended.
    pub games_played: usize,
    /// Records pushed by workers during the iteration.
    pub records_emitted: usize,
    pub records_persisted: usize,
    pub signals_serviced: usize,
    /// Signals still queued after every worker had completed.
    pub trailing_signals: usize,
    pub dataset_path: PathBuf,
    pub workers: Vec<WorkerSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    pub iteration: u32,
    pub generation: GenerationReport,
    pub losses: Losses,
    pub evaluation: EvaluationReport,
}

/// Drives a full training run.
///
/// `network` is the model being served and trained; `previous` is a second
/// instance used to hold the best checkpoint during evaluation.
pub struct IterationController<N, F, A> {
    config: CoachConfig,
    network: N,
    previous: N,
    factory: F,
    arena: A,
    slots: Vec<Arc<WorkerSlot>>,
    counters: RunCounters,
    aggregator: SampleAggregator,
    checkpoints: CheckpointStore,
    scalars: Box<dyn ScalarSink>,
    phase: IterationPhase,
}

impl<N, F, A> IterationController<N, F, A>
where
    N: Network,
    F: SelfPlayFactory,
    A: Arena<N>,
{
    /// Allocates the slots of the run and saves `network` as the initial best.
    pub fn new(config: CoachConfig, network: N, previous: N, factory: F, arena: A) -> Result<Self> {
        let slots = allocate_slots(config.workers, config.slot_shape());
        let aggregator = SampleAggregator::new(DatasetStore::new(&config.data_dir), config.poll_interval());
        let checkpoints = CheckpointStore::new(&config.checkpoint_dir);
        let scalars: Box<dyn ScalarSink> = match &config.metrics_path {
            Some(path) => Box::new(CsvScalarSink::create(path)?),
            None => Box::new(TracingScalarSink),
        };

        checkpoints.save(&network, CheckpointTag::Best)?;
        info!(
            workers = config.workers,
            batch = config.process_batch_size,
            games = config.games_per_iteration,
            iterations = config.iterations,
            "coach ready"
        );

        Ok(Self {
            config,
            network,
            previous,
            factory,
            arena,
            slots,
            counters: RunCounters::new(),
            aggregator,
            checkpoints,
            scalars,
            phase: IterationPhase::Idle,
        })
    }

    /// Replaces the scalar destination chosen from the configuration.
    pub fn with_scalar_sink(mut self, sink: impl ScalarSink + 'static) -> Self {
        self.scalars = Box::new(sink);
        self
    }

    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    pub fn phase(&self) -> IterationPhase {
        self.phase
    }

    pub fn slots(&self) -> &[Arc<WorkerSlot>] {
        &self.slots
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn datasets(&self) -> &DatasetStore {
        self.aggregator.store()
    }

    /// Runs every configured iteration.
    pub async fn learn(&mut self) -> Result<Vec<IterationReport>> {
        let mut reports = Vec::with_capacity(self.config.iterations as usize);
        for iteration in 1..=self.config.iterations {
            reports.push(self.run_iteration(iteration).await?);
        }
        enter(&mut self.phase, IterationPhase::Finished);
        self.scalars.flush();
        Ok(reports)
    }

    #[instrument(name = "iteration", skip(self))]
    pub async fn run_iteration(&mut self, iteration: u32) -> Result<IterationReport> {
        info!("------ ITER {iteration} ------");
        let generation = self.generate(iteration).await?;
        let losses = self.train(iteration).await?;
        let evaluation = self.evaluate(iteration).await?;
        enter(&mut self.phase, IterationPhase::Idle);

        Ok(IterationReport {
            iteration,
            generation,
            losses,
            evaluation,
        })
    }

    /// Self-play generation: every phase from spawning to teardown.
    async fn generate(&mut self, iteration: u32) -> Result<GenerationReport> {
        enter(&mut self.phase, IterationPhase::SpawningWorkers);
        self.counters.reset();
        let (ready_tx, mut ready_rx) = ready_queue();
        let (record_tx, mut record_rx) = record_channel();
        let assignments = split_games(self.config.games_per_iteration, self.slots.len());
        let pool = WorkerPool::spawn(&self.factory, &self.slots, &assignments, &ready_tx, &record_tx, &self.counters);
        // workers hold the only senders from here on
        drop(ready_tx);
        drop(record_tx);

        let server = BatchInferenceServer::new(&self.network, &self.slots, self.config.poll_interval());

        enter(&mut self.phase, IterationPhase::Serving);
        let served = match server.serve(&mut ready_rx, &self.counters, self.config.games_per_iteration).await {
            Ok(served) => served,
            Err(err) => {
                abort_workers(&self.slots, pool).await;
                return Err(err);
            }
        };
        info!(
            games = served.games_played,
            signals = served.signals_serviced,
            elapsed = format_args!("{:.1}s", served.elapsed.as_secs_f64()),
            games_per_second = served.games_per_second.unwrap_or(0.0),
            "self-play finished"
        );

        enter(&mut self.phase, IterationPhase::Draining);
        let trailing_signals = match server.drain(&mut ready_rx).await {
            Ok(drained) => drained,
            Err(err) => {
                abort_workers(&self.slots, pool).await;
                return Err(err);
            }
        };
        if let Some(blocked) = self.slots.iter().find(|slot| slot.event().is_ready()) {
            debug!(slot = %blocked.id(), "result still waiting for its worker");
        }

        enter(&mut self.phase, IterationPhase::PersistingSamples);
        let persisted = self.aggregator.collect(iteration, &mut record_rx).await;

        enter(&mut self.phase, IterationPhase::TearingDownWorkers);
        let joined = pool.join().await;
        for slot in &self.slots {
            slot.reset();
        }
        drop(ready_rx);
        drop(record_rx);
        let records_emitted = self.counters.records_emitted();
        self.counters.reset();

        let persisted = persisted?;
        let workers = joined?;
        check_persisted(iteration, records_emitted, persisted.records)?;

        Ok(GenerationReport {
            completed_workers: served.completed_workers,
            games_played: served.games_played,
            records_emitted,
            records_persisted: persisted.records,
            signals_serviced: served.signals_serviced,
            trailing_signals,
            dataset_path: persisted.path,
            workers,
        })
    }

    async fn train(&mut self, iteration: u32) -> Result<Losses> {
        enter(&mut self.phase, IterationPhase::Training);
        let data = self
            .aggregator
            .store()
            .load_window(iteration, self.config.history_length)?;
        info!(
            samples = data.len(),
            first = data.iterations().start(),
            last = data.iterations().end(),
            "training"
        );

        let losses = self
            .network
            .train(&data, self.config.train_batch_size)
            .await
            .map_err(CoachError::Collaborator)?;
        self.scalars.add_scalar("loss/policy", losses.policy, iteration);
        self.scalars.add_scalar("loss/value", losses.value, iteration);
        self.scalars.add_scalar("loss/total", losses.total(), iteration);

        self.checkpoints.save(&self.network, CheckpointTag::Iteration(iteration))?;
        Ok(losses)
    }

    async fn evaluate(&mut self, iteration: u32) -> Result<EvaluationReport> {
        enter(&mut self.phase, IterationPhase::Evaluating);
        self.checkpoints.load(&mut self.previous, CheckpointTag::Best)?;
        let games = self.config.arena_games;

        let random = self.play(iteration, Opponent::Random, games).await?;
        let greedy = self.play(iteration, Opponent::Greedy, games).await?;
        let best = {
            let outcome = self
                .arena
                .play_match(&self.network, Opponent::Previous(&self.previous), games)
                .await
                .map_err(CoachError::Collaborator)?;
            self.record_match(iteration, "best", &outcome);
            outcome
        };

        let decision = PromotionDecision::decide(&best, self.config.update_threshold);
        match decision {
            PromotionDecision::Promote => {
                info!("accepting new best model");
                self.checkpoints.save(&self.network, CheckpointTag::Best)?;
            }
            PromotionDecision::Reject => info!("rejecting new model"),
            PromotionDecision::NoDecisiveGames => info!("no decisive games against best; keeping previous best"),
        }

        Ok(EvaluationReport {
            random,
            greedy,
            best,
            decision,
        })
    }

    async fn play(&mut self, iteration: u32, opponent: Opponent<'_, N>, games: usize) -> Result<MatchOutcome> {
        let label = opponent.label();
        info!(opponent = label, games, "pitting against baseline");
        let outcome = self
            .arena
            .play_match(&self.network, opponent, games)
            .await
            .map_err(CoachError::Collaborator)?;
        self.record_match(iteration, label, &outcome);
        Ok(outcome)
    }

    fn record_match(&mut self, iteration: u32, label: &str, outcome: &MatchOutcome) {
        info!(
            opponent = label,
            new_wins = outcome.candidate_wins,
            opponent_wins = outcome.opponent_wins,
            draws = outcome.draws,
            "match finished"
        );
        match outcome.win_rate() {
            Some(rate) => self.scalars.add_scalar(&format!("win_rate/{label}"), rate, iteration),
            None => debug!(opponent = label, "win rate undefined without decisive games"),
        }
    }
}

/// Every emitted record must reach the iteration dataset.
fn check_persisted(iteration: u32, emitted: usize, persisted: usize) -> Result<()> {
    if emitted == persisted {
        Ok(())
    } else {
        warn!(iteration, emitted, persisted, "persisted sample count differs from emitted count");
        Err(CoachError::SampleCountMismatch {
            iteration,
            emitted,
            persisted,
        })
    }
}

fn enter(phase: &mut IterationPhase, next: IterationPhase) {
    debug!(from = %phase, to = %next, "phase transition");
    *phase = next;
}

/// Releases every blocked worker and waits for all of them to exit.
async fn abort_workers(slots: &[Arc<WorkerSlot>], pool: WorkerPool) {
    warn!(workers = pool.len(), "aborting self-play workers");
    for slot in slots {
        slot.event().close();
    }
    if let Err(err) = pool.join().await {
        debug!(%err, "worker error while aborting");
    }
    for slot in slots {
        slot.reset();
    }
}
