//! Run summary artifacts.

use crate::error::{TrainError, TrainResult};
use crate::metrics::MetricLogEntry;
use plotters::prelude::*;
use std::path::Path;

fn draw_err<E: std::fmt::Display>(e: E) -> TrainError {
    TrainError::Report(e.to_string())
}

/// Render the loss and excess-loss curves to a PNG.
///
/// Drawn without text elements so rendering does not depend on system
/// fonts being installed.
pub fn render_loss_curve(entries: &[MetricLogEntry], path: &Path) -> TrainResult<()> {
    if entries.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let x_min = entries[0].step as f64;
    let x_max = entries[entries.len() - 1].step as f64 + 1.0;
    let y_max = entries
        .iter()
        .flat_map(|e| [e.loss, e.excess_loss])
        .fold(0.0f64, f64::max)
        .max(1e-9);

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max * 1.05)
        .map_err(draw_err)?;

    chart
        .draw_series(LineSeries::new(
            entries.iter().map(|e| (e.step as f64, e.loss)),
            &BLUE,
        ))
        .map_err(draw_err)?;
    chart
        .draw_series(LineSeries::new(
            entries.iter().map(|e| (e.step as f64, e.excess_loss)),
            &RED,
        ))
        .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_renders_png_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("loss_curve.png");
        let entries: Vec<_> = (0..20)
            .map(|step| MetricLogEntry {
                step,
                loss: 10.0 / (step + 1) as f64,
                excess_loss: 1.0 / (step + 1) as f64,
                per_position_loss: vec![],
                n_points: 8,
                n_dims: 5,
            })
            .collect();

        render_loss_curve(&entries, &path).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_empty_history_renders_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("loss_curve.png");
        render_loss_curve(&[], &path).unwrap();
        assert!(!path.exists());
    }
}
