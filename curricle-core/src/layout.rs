//! Filesystem layout for a single run's artifacts.
//!
//! One run owns one directory: `out_dir/<run_id>/`. Concurrent writers
//! against the same directory are not supported.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Latest resumable state, unconditionally overwritten on save.
    pub fn state_path(&self) -> PathBuf {
        self.root.join("state.pt")
    }

    /// Immutable step-named weights snapshot.
    pub fn snapshot_path(&self, step: u64) -> PathBuf {
        self.root.join(format!("model_{step}.pt"))
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.root.join("metrics.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    pub fn loss_curve_path(&self) -> PathBuf {
        self.root.join("loss_curve.png")
    }

    /// Tracking sink output (append-only event log).
    pub fn events_path(&self) -> PathBuf {
        self.root.join("events.jsonl")
    }

    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }
}
