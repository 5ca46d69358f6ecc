//! Run configuration.
//!
//! Every recognized option is a named, typed field with a documented
//! default; unknown behavior is a validation error, not a silent fallback.

use crate::curriculum::CurriculumSchedule;
use crate::error::{TrainError, TrainResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Step cap applied in dry-run mode.
pub const DRY_RUN_STEPS: u64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Parent directory for run artifact directories.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// Resume an existing run directory instead of creating a new one.
    #[serde(default)]
    pub resume_id: Option<String>,
    #[serde(default)]
    pub model: ModelConfig,
    pub training: TrainingConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl TrainConfig {
    pub fn from_yaml_file(path: &Path) -> TrainResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&text)?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> TrainResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> TrainResult<()> {
        let t = &self.training;
        if t.batch_size == 0 {
            return Err(TrainError::config("training.batch_size must be positive"));
        }
        if t.train_steps == 0 {
            return Err(TrainError::config("training.train_steps must be positive"));
        }
        if t.save_every_steps == 0 {
            return Err(TrainError::config(
                "training.save_every_steps must be positive",
            ));
        }
        if !(t.learning_rate.is_finite() && t.learning_rate > 0.0) {
            return Err(TrainError::config(
                "training.learning_rate must be positive and finite",
            ));
        }
        if self.tracking.log_every_steps == 0 {
            return Err(TrainError::config(
                "tracking.log_every_steps must be positive",
            ));
        }
        if let Some(pool) = t.num_training_examples {
            if pool < t.batch_size as u64 {
                return Err(TrainError::config(format!(
                    "training.num_training_examples ({pool}) smaller than batch_size ({})",
                    t.batch_size
                )));
            }
        }
        t.curriculum.validate()?;
        if t.curriculum.dims.end > self.model.n_dims {
            return Err(TrainError::config(format!(
                "curriculum dims.end ({}) exceeds model.n_dims ({})",
                t.curriculum.dims.end, self.model.n_dims
            )));
        }
        if self.model.family == ModelFamily::Mlp && self.model.hidden_size == 0 {
            return Err(TrainError::config("model.hidden_size must be positive"));
        }
        Ok(())
    }

    /// Dry-run: terminal-plateau curriculum, capped steps, no durable
    /// side effects (the loop and sinks honor the flag separately).
    pub fn apply_dry_run(&mut self) {
        self.training.curriculum.plateau();
        self.training.train_steps = self.training.train_steps.min(DRY_RUN_STEPS);
        self.tracking.enabled = false;
        self.storage.kind = StorageKind::None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Linear,
    Mlp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model family to train.
    #[serde(default = "default_family")]
    pub family: ModelFamily,
    /// Full input dimensionality (curriculum truncates below this).
    #[serde(default = "default_n_dims")]
    pub n_dims: usize,
    /// Hidden width for the mlp family.
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            family: default_family(),
            n_dims: default_n_dims(),
            hidden_size: default_hidden_size(),
        }
    }
}

fn default_family() -> ModelFamily {
    ModelFamily::Linear
}

fn default_n_dims() -> usize {
    20
}

fn default_hidden_size() -> usize {
    64
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("runs")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Gaussian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    LinearRegression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    #[serde(default = "default_train_steps")]
    pub train_steps: u64,
    /// Overwrite `state.pt` every this many steps.
    #[serde(default = "default_save_every")]
    pub save_every_steps: u64,
    /// Snapshot `model_<step>.pt` every this many steps; 0 disables.
    #[serde(default)]
    pub keep_every_steps: u64,
    /// Bounded training pool size; enables per-example seed selection.
    #[serde(default)]
    pub num_training_examples: Option<u64>,
    /// Root seed for all per-step randomness.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_data")]
    pub data: DataKind,
    #[serde(default = "default_task")]
    pub task: TaskKind,
    pub curriculum: CurriculumSchedule,
}

fn default_batch_size() -> usize {
    64
}

fn default_learning_rate() -> f32 {
    1e-3
}

fn default_train_steps() -> u64 {
    5000
}

fn default_save_every() -> u64 {
    1000
}

fn default_seed() -> u64 {
    42
}

fn default_data() -> DataKind {
    DataKind::Gaussian
}

fn default_task() -> TaskKind {
    TaskKind::LinearRegression
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Emit to the tracking sink at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Emit every this many steps.
    #[serde(default = "default_log_every")]
    pub log_every_steps: u64,
    /// Human-readable run name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_every_steps: default_log_every(),
            name: None,
            notes: None,
        }
    }
}

fn default_log_every() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    None,
    Dir,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_kind")]
    pub kind: StorageKind,
    /// Mirror root for `kind: dir`.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Endpoint URL for `kind: http`.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: default_storage_kind(),
            root: None,
            endpoint: None,
        }
    }
}

fn default_storage_kind() -> StorageKind {
    StorageKind::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::AxisSchedule;

    fn minimal_yaml() -> &'static str {
        r"
training:
  curriculum:
    dims: { start: 2, end: 10, increment: 2, interval: 500 }
    points: { start: 8, end: 24, increment: 4, interval: 1000 }
"
    }

    #[test]
    fn test_defaults_fill_in() {
        let config: TrainConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(config.model.family, ModelFamily::Linear);
        assert_eq!(config.model.n_dims, 20);
        assert_eq!(config.training.batch_size, 64);
        assert_eq!(config.training.save_every_steps, 1000);
        assert_eq!(config.training.keep_every_steps, 0);
        assert!(config.tracking.enabled);
        assert_eq!(config.storage.kind, StorageKind::None);
        config.validate().unwrap();
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config: TrainConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        let dumped = config.to_yaml().unwrap();
        let parsed: TrainConfig = serde_yaml::from_str(&dumped).unwrap();
        assert_eq!(parsed.training.curriculum, config.training.curriculum);
        assert_eq!(parsed.training.seed, config.training.seed);
    }

    #[test]
    fn test_pool_smaller_than_batch_rejected() {
        let mut config: TrainConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.training.num_training_examples = Some(10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_log_interval_rejected() {
        let mut config: TrainConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.tracking.log_every_steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dims_exceeding_model_rejected() {
        let mut config: TrainConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.training.curriculum.dims = AxisSchedule {
            start: 2,
            end: 40,
            increment: 2,
            interval: 500,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dry_run_caps_and_plateaus() {
        let mut config: TrainConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.training.train_steps = 50_000;
        config.apply_dry_run();

        assert_eq!(config.training.train_steps, DRY_RUN_STEPS);
        assert_eq!(config.training.curriculum.dims.start, 10);
        assert_eq!(config.training.curriculum.points.start, 24);
        assert!(!config.tracking.enabled);
        assert_eq!(config.storage.kind, StorageKind::None);
    }
}
