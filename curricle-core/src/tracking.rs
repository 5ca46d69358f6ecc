//! Experiment tracking sinks.
//!
//! Tracking is best-effort: the loop logs sink failures and keeps
//! training. Implementations therefore return `TrainError::Sink` for every
//! failure mode so callers can recognize them uniformly.

use crate::error::{TrainError, TrainResult};
use crate::metrics::MetricLogEntry;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

pub trait TrackingSink: Send {
    fn log(&mut self, entry: &MetricLogEntry) -> TrainResult<()>;
}

/// Discards everything (dry-run, tracking disabled).
pub struct NoopTracker;

impl TrackingSink for NoopTracker {
    fn log(&mut self, _entry: &MetricLogEntry) -> TrainResult<()> {
        Ok(())
    }
}

/// Appends one JSON record per emission to an `events.jsonl` file.
#[derive(Debug)]
pub struct JsonlTracker {
    file: File,
}

impl JsonlTracker {
    pub fn create(path: &Path) -> TrainResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TrainError::sink(format!("events log dir: {e}")))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| TrainError::sink(format!("events log open: {e}")))?;
        Ok(Self { file })
    }
}

impl TrackingSink for JsonlTracker {
    fn log(&mut self, entry: &MetricLogEntry) -> TrainResult<()> {
        let line = serde_json::to_string(entry)
            .map_err(|e| TrainError::sink(format!("events log encode: {e}")))?;
        writeln!(self.file, "{line}").map_err(|e| TrainError::sink(format!("events log write: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(step: u64) -> MetricLogEntry {
        MetricLogEntry {
            step,
            loss: 1.5,
            excess_loss: 0.5,
            per_position_loss: vec![2.0, 1.0],
            n_points: 2,
            n_dims: 3,
        }
    }

    #[test]
    fn test_jsonl_tracker_appends_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");

        let mut tracker = JsonlTracker::create(&path).unwrap();
        tracker.log(&entry(0)).unwrap();
        tracker.log(&entry(10)).unwrap();
        drop(tracker);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: MetricLogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.step, 0);
    }

    #[test]
    fn test_failures_are_sink_errors() {
        let err = JsonlTracker::create(Path::new("/dev/null/impossible/events.jsonl")).unwrap_err();
        assert!(err.is_best_effort());
    }
}
