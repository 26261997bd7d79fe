//! Run configuration.
//!
//! Values are layered with figment: built-in defaults, then an optional TOML
//! file, then `COACH_*` environment variables. The merged result is validated
//! before it is handed out.

use std::path::{Path, PathBuf};
use std::time::Duration;
use figment::{
    Figment, Provider,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::communication::SlotShape;
use crate::error::{CoachError, Result};

/// Environment variable naming an extra TOML file to merge.
pub const CONFIG_PATH_ENV: &str = "COACH_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CoachConfig {
    /// Number of self-play workers, and therefore of slots.
    #[validate(range(min = 1))]
    pub workers: usize,

    /// Positions per evaluation request of one worker.
    #[validate(range(min = 1))]
    pub process_batch_size: usize,

    #[validate(range(min = 1))]
    pub train_batch_size: usize,

    /// Games played across all workers per iteration.
    #[validate(range(min = 1))]
    pub games_per_iteration: usize,

    #[validate(range(min = 1))]
    pub iterations: u32,

    /// Number of most recent iteration datasets used for training.
    #[validate(range(min = 1))]
    pub history_length: u32,

    /// Minimum win rate against best for a new network to be promoted.
    #[validate(range(min = 0.0, max = 1.0))]
    pub update_threshold: f64,

    /// Games per evaluation match.
    #[validate(range(min = 1))]
    pub arena_games: usize,

    /// Bounded wait of the server ticker and the sample drain.
    #[validate(range(min = 1))]
    pub poll_interval_ms: u64,

    #[validate(range(min = 1))]
    pub board_rows: usize,

    #[validate(range(min = 1))]
    pub board_cols: usize,

    #[validate(range(min = 1))]
    pub action_size: usize,

    pub data_dir: PathBuf,

    pub checkpoint_dir: PathBuf,

    /// CSV file receiving scalar metrics. Scalars go to the log when unset.
    pub metrics_path: Option<PathBuf>,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            process_batch_size: 64,
            train_batch_size: 512,
            games_per_iteration: 256,
            iterations: 10,
            history_length: 4,
            update_threshold: 0.55,
            arena_games: 40,
            poll_interval_ms: 1000,
            board_rows: 8,
            board_cols: 8,
            action_size: 65,
            data_dir: PathBuf::from("data"),
            checkpoint_dir: PathBuf::from("checkpoint"),
            metrics_path: None,
        }
    }
}

impl CoachConfig {
    /// Defaults, then `$COACH_CONFIG_PATH` if set, then `COACH_*` variables.
    pub fn figment() -> Figment {
        let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_default();
        Self::defaults()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("COACH_").ignore(&["config_path"]))
    }

    /// Like [`Self::figment`], with `path` merged between defaults and environment.
    pub fn figment_with_file(path: &Path) -> Figment {
        Self::defaults()
            .merge(Toml::file(path))
            .merge(Env::prefixed("COACH_").ignore(&["config_path"]))
    }

    /// Built-in defaults only.
    pub fn defaults() -> Figment {
        Figment::from(Serialized::defaults(CoachConfig::default()))
    }

    /// Loads [`Self::figment`]. A `$COACH_CONFIG_PATH` naming a missing file is an error.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            require_file(Path::new(&path))?;
        }
        Self::extract_from(Self::figment())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        require_file(path)?;
        Self::extract_from(Self::figment_with_file(path))
    }

    /// Extracts and validates a configuration from any provider.
    ///
    /// # Example
    /// ```rust,ignore
    /// let config = CoachConfig::extract_from(
    ///     CoachConfig::figment()
    ///         .merge(("workers", 8usize))
    ///         .merge(("iterations", 2u32))
    /// )?;
    /// ```
    pub fn extract_from<T: Provider>(provider: T) -> Result<Self> {
        let config: Self = Figment::from(provider)
            .extract()
            .map_err(|e| CoachError::ConfigExtraction(Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn slot_shape(&self) -> SlotShape {
        SlotShape::new(self.process_batch_size, self.board_rows, self.board_cols, self.action_size)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CoachError::Config(format!("config file {} does not exist", path.display())))
    }
}
