//! Checkpoint persistence and restore.
//!
//! Two kinds of artifact: the single mutable latest state (`state.pt`,
//! overwritten on every save) and immutable step-named weight snapshots
//! (`model_<step>.pt`, one per configured interval). Both are written
//! atomically so a resuming process never observes a torn file.

use crate::error::{TrainError, TrainResult};
use crate::layout::RunLayout;
use crate::model::ModelState;
use crate::optim::OptimizerState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything needed to reconstruct training progress exactly.
///
/// `step` is the 0-based index of the last completed optimization step.
/// The curriculum position is not stored; it is replayed from `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    pub step: u64,
    pub model: ModelState,
    pub optimizer: OptimizerState,
    pub saved_at: DateTime<Utc>,
}

/// Tagged restore result: a missing checkpoint is an expected fresh start,
/// never inferred from path existence by callers.
#[derive(Debug)]
pub enum LoadOutcome {
    Fresh,
    Restored(TrainingState),
}

/// Write a state blob through a `.partial` staging file and rename it into
/// place, so a concurrently starting resume process never reads a torn blob.
fn commit_blob(path: &Path, bytes: &[u8]) -> TrainResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let staging = path.with_extension("partial");
    std::fs::write(&staging, bytes)?;
    std::fs::rename(&staging, path)?;
    Ok(())
}

pub struct CheckpointManager {
    layout: RunLayout,
}

impl CheckpointManager {
    pub fn new(layout: RunLayout) -> Self {
        Self { layout }
    }

    /// Overwrite the latest resumable state.
    pub fn save(&self, state: &TrainingState) -> TrainResult<()> {
        let bytes = bincode::serialize(state)?;
        commit_blob(&self.layout.state_path(), &bytes)?;
        tracing::debug!(step = state.step, "checkpoint saved");
        Ok(())
    }

    /// Load the latest state if one exists.
    ///
    /// An existing file that fails to decode is `CorruptCheckpoint`, not
    /// `Fresh`: silently restarting from step 0 would discard a run.
    pub fn load(&self) -> TrainResult<LoadOutcome> {
        let path = self.layout.state_path();
        if !path.exists() {
            return Ok(LoadOutcome::Fresh);
        }
        let bytes = std::fs::read(&path)?;
        let state = bincode::deserialize(&bytes)
            .map_err(|source| TrainError::CorruptCheckpoint { path, source })?;
        Ok(LoadOutcome::Restored(state))
    }

    /// Write an immutable step-named weights snapshot.
    pub fn snapshot(&self, step: u64, model: &ModelState) -> TrainResult<PathBuf> {
        let path = self.layout.snapshot_path(step);
        let bytes = bincode::serialize(model)?;
        commit_blob(&path, &bytes)?;
        tracing::debug!(step, path = %path.display(), "model snapshot written");
        Ok(path)
    }

    /// Read back a snapshot (post-hoc trajectory inspection).
    pub fn load_snapshot(&self, step: u64) -> TrainResult<ModelState> {
        let path = self.layout.snapshot_path(step);
        let bytes = std::fs::read(&path)?;
        bincode::deserialize(&bytes).map_err(|source| TrainError::CorruptCheckpoint { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_state(step: u64) -> TrainingState {
        TrainingState {
            step,
            model: ModelState {
                family: "linear".into(),
                n_dims: 3,
                params: vec![0.25, -1.5, 3.0e-7],
            },
            optimizer: OptimizerState {
                t: step + 1,
                m: vec![0.1, 0.2, 0.3],
                v: vec![0.01, 0.02, 0.03],
            },
            saved_at: Utc::now(),
        }
    }

    fn manager(dir: &TempDir) -> CheckpointManager {
        CheckpointManager::new(RunLayout::new(dir.path().join("run")))
    }

    #[test]
    fn test_save_load_roundtrip_is_exact() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);
        let state = sample_state(42);

        mgr.save(&state).unwrap();
        match mgr.load().unwrap() {
            LoadOutcome::Restored(loaded) => assert_eq!(loaded, state),
            LoadOutcome::Fresh => panic!("expected restored state"),
        }
    }

    #[test]
    fn test_save_leaves_no_staging_file() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);

        mgr.save(&sample_state(3)).unwrap();

        let state_path = RunLayout::new(dir.path().join("run")).state_path();
        assert!(state_path.exists());
        assert!(!state_path.with_extension("partial").exists());
    }

    #[test]
    fn test_missing_checkpoint_is_fresh() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);
        assert!(matches!(mgr.load().unwrap(), LoadOutcome::Fresh));
    }

    #[test]
    fn test_corrupt_checkpoint_is_not_fresh() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);
        let state_path = RunLayout::new(dir.path().join("run")).state_path();
        std::fs::create_dir_all(state_path.parent().unwrap()).unwrap();
        std::fs::write(&state_path, b"\x00\x01 not a checkpoint").unwrap();

        let err = mgr.load().unwrap_err();
        assert!(matches!(err, TrainError::CorruptCheckpoint { .. }));
    }

    #[test]
    fn test_save_overwrites_latest() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);

        mgr.save(&sample_state(1)).unwrap();
        mgr.save(&sample_state(2)).unwrap();

        match mgr.load().unwrap() {
            LoadOutcome::Restored(loaded) => assert_eq!(loaded.step, 2),
            LoadOutcome::Fresh => panic!("expected restored state"),
        }
    }

    #[test]
    fn test_snapshots_never_collide() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);

        let a = mgr.snapshot(100, &sample_state(100).model).unwrap();
        let mut other = sample_state(200).model;
        other.params[0] = 99.0;
        let b = mgr.snapshot(200, &other).unwrap();

        assert_ne!(a, b);
        assert_eq!(mgr.load_snapshot(100).unwrap().params[0], 0.25);
        assert_eq!(mgr.load_snapshot(200).unwrap().params[0], 99.0);
    }
}
