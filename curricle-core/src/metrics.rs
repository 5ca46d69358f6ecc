//! Per-step metric aggregation.
//!
//! Raw loss is normalized by a closed-form "no-information" baseline into
//! an excess loss that is comparable across curriculum positions. Entries
//! buffer in memory; persistence happens only at designated flush points.

use crate::curriculum::CurriculumPosition;
use crate::error::TrainResult;
use crate::task::PointwiseFn;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricLogEntry {
    pub step: u64,
    pub loss: f64,
    pub excess_loss: f64,
    pub per_position_loss: Vec<f64>,
    pub n_points: usize,
    pub n_dims: usize,
}

#[derive(Debug, Default)]
pub struct MetricsAggregator {
    entries: Vec<MetricLogEntry>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expected loss of a predictor with no information about the task:
    /// the average over sequence positions of `max(n_dims - position, 0)`.
    pub fn baseline(position: &CurriculumPosition) -> f64 {
        let sum: f64 = (0..position.n_points)
            .map(|idx| position.n_dims_truncated.saturating_sub(idx) as f64)
            .sum();
        sum / position.n_points as f64
    }

    /// Append one entry. In-memory only; no I/O.
    pub fn record(
        &mut self,
        step: u64,
        loss: f64,
        output: &Array2<f32>,
        targets: &Array2<f32>,
        pointwise: &PointwiseFn,
        position: &CurriculumPosition,
    ) {
        let elementwise = pointwise(output, targets);
        let (batch, n_points) = elementwise.dim();
        let mut per_position = vec![0.0f64; n_points];
        for p in 0..n_points {
            let mut acc = 0.0f64;
            for b in 0..batch {
                acc += f64::from(elementwise[[b, p]]);
            }
            per_position[p] = acc / batch.max(1) as f64;
        }

        self.entries.push(MetricLogEntry {
            step,
            loss,
            excess_loss: loss / Self::baseline(position),
            per_position_loss: per_position,
            n_points: position.n_points,
            n_dims: position.n_dims_truncated,
        });
    }

    pub fn entries(&self) -> &[MetricLogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&MetricLogEntry> {
        self.entries.last()
    }

    /// Reload history persisted by an earlier process, keeping only entries
    /// before the resume point so a re-flush stays idempotent.
    pub fn preload(&mut self, path: &Path, before_step: u64) -> TrainResult<()> {
        if !path.exists() {
            return Ok(());
        }
        let mut prior: Vec<MetricLogEntry> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        prior.retain(|e| e.step < before_step);
        self.entries = prior;
        Ok(())
    }

    /// Write the full history to `path`, staging through a `.partial` sibling
    /// so an interrupted flush never leaves a truncated log behind.
    pub fn flush(&self, path: &Path) -> TrainResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let staging = path.with_extension("partial");
        std::fs::write(&staging, serde_json::to_string_pretty(&self.entries)?)?;
        std::fs::rename(&staging, path)?;
        Ok(())
    }
}
