//! # curricle-core — curriculum training orchestration
//!
//! The resumable core of a trainer for synthetic in-context-learning
//! tasks: a monotone difficulty curriculum, seed-keyed deterministic
//! sampling, a fixed-order step loop, and an atomic checkpoint/resume
//! protocol that reconstructs training progress exactly.
//!
//! The accelerator-shaped collaborators (model, optimizer, data and task
//! samplers, tracking and storage sinks) live behind traits; reference
//! implementations are provided so the crate trains end-to-end on CPU.

pub mod checkpoint;
pub mod config;
pub mod curriculum;
pub mod data;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod model;
pub mod optim;
pub mod report;
pub mod seeds;
pub mod step;
pub mod storage;
pub mod task;
pub mod tracking;
pub mod trainer;

pub use checkpoint::{CheckpointManager, LoadOutcome, TrainingState};
pub use config::{
    DataKind, ModelConfig, ModelFamily, StorageKind, TaskKind, TrainConfig, TrainingConfig,
};
pub use curriculum::{AxisSchedule, Curriculum, CurriculumPosition, CurriculumSchedule};
pub use data::{BatchSeeds, DataSampler, GaussianSampler};
pub use error::{TrainError, TrainResult};
pub use layout::RunLayout;
pub use metrics::{MetricLogEntry, MetricsAggregator};
pub use model::{Model, ModelState, build_model};
pub use optim::{Adam, Optimizer, OptimizerState};
pub use seeds::SeedSampler;
pub use step::{StepOutcome, run_step};
pub use storage::{DirObjectStore, HttpObjectStore, ObjectStore};
pub use task::{LinearRegressionSampler, Task, TaskSampler};
pub use tracking::{JsonlTracker, NoopTracker, TrackingSink};
pub use trainer::{LoopPhase, RunContext, TrainingLoop};
