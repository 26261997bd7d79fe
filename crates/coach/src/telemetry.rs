//! Progress and scalar telemetry.
//!
//! [`ProgressReporter`] turns the games-played counter into a throughput
//! estimate while the server runs. [`ScalarSink`] receives per-iteration
//! training and evaluation scalars.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Running average of seconds spent per finished game.
#[derive(Debug, Clone, Default)]
pub struct ThroughputMeter {
    sum: f64,
    count: usize,
}

impl ThroughputMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `games` games that took `per_game` each.
    pub fn update(&mut self, per_game: Duration, games: usize) {
        self.sum += per_game.as_secs_f64() * games as f64;
        self.count += games;
    }

    pub fn observed_games(&self) -> usize {
        self.count
    }

    pub fn avg_seconds_per_game(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn games_per_second(&self) -> Option<f64> {
        self.avg_seconds_per_game()
            .filter(|secs| *secs > 0.0)
            .map(|secs| 1.0 / secs)
    }
}

/// Logs generation progress from successive games-played readings.
#[derive(Debug)]
pub struct ProgressReporter {
    meter: ThroughputMeter,
    target: usize,
    seen: usize,
    started: Instant,
    last_advance: Instant,
    last_log: Option<Instant>,
    log_every: Duration,
}

impl ProgressReporter {
    pub fn new(target: usize, log_every: Duration) -> Self {
        let now = Instant::now();
        Self {
            meter: ThroughputMeter::new(),
            target,
            seen: 0,
            started: now,
            last_advance: now,
            last_log: None,
            log_every,
        }
    }

    pub fn meter(&self) -> &ThroughputMeter {
        &self.meter
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Feeds the current games-played reading.
    pub fn observe(&mut self, played: usize) {
        let now = Instant::now();
        if played > self.seen {
            let delta = played - self.seen;
            let per_game = now.duration_since(self.last_advance).div_f64(delta as f64);
            self.meter.update(per_game, delta);
            self.seen = played;
            self.last_advance = now;
        }

        let due = self
            .last_log
            .is_none_or(|last| now.duration_since(last) >= self.log_every);
        if !due {
            return;
        }
        self.last_log = Some(now);

        let sample_time = self.meter.avg_seconds_per_game().unwrap_or(0.0);
        let eta = self.target.saturating_sub(self.seen) as f64 * sample_time;
        if self.seen > 0 {
            info!(
                played = self.seen,
                target = self.target,
                sample_time = format_args!("{sample_time:.3}s"),
                elapsed = format_args!("{:.1}s", self.elapsed().as_secs_f64()),
                eta = format_args!("{eta:.1}s"),
                "generating samples"
            );
        } else {
            debug!(target = self.target, "waiting for the first finished game");
        }
    }
}

/// Destination for scalar metrics keyed by tag and iteration.
pub trait ScalarSink: Send {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u32);

    fn flush(&mut self) {}
}

/// Emits scalars as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingScalarSink;

impl ScalarSink for TracingScalarSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u32) {
        info!(tag, value, step, "scalar");
    }
}

/// Appends scalars to a CSV file with a `step,tag,value` header.
pub struct CsvScalarSink {
    writer: BufWriter<File>,
}

impl CsvScalarSink {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "step,tag,value")?;
        Ok(Self { writer })
    }
}

impl ScalarSink for CsvScalarSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u32) {
        if let Err(err) = writeln!(self.writer, "{step},{tag},{value}") {
            tracing::warn!(%err, tag, "failed to write scalar");
        }
    }

    fn flush(&mut self) {
        if let Err(err) = self.writer.flush() {
            tracing::warn!(%err, "failed to flush scalars");
        }
    }
}

impl Drop for CsvScalarSink {
    fn drop(&mut self) {
        self.flush();
    }
}
