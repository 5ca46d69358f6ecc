//! Error types for the curricle-core crate.

use std::path::PathBuf;
use thiserror::Error;

pub type TrainResult<T> = std::result::Result<T, TrainError>;

/// Top-level error type for training operations.
///
/// `InvalidSampleRequest`, `CorruptCheckpoint`, `NonFiniteLoss` and `Config`
/// are fatal and halt the loop. `Sink` covers best-effort side channels
/// (tracking, uploads) and is caught and logged at the call site.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("invalid sample request: {requested} seeds from a pool of {pool}")]
    InvalidSampleRequest { requested: usize, pool: u64 },

    #[error("corrupt checkpoint at {}: {source}", .path.display())]
    CorruptCheckpoint {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("non-finite loss {loss} at step {step}")]
    NonFiniteLoss { step: u64, loss: f64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("sink error: {0}")]
    Sink(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("state encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TrainError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Whether the error may be recovered locally (logged, not propagated).
    pub fn is_best_effort(&self) -> bool {
        matches!(self, Self::Sink(_))
    }
}
