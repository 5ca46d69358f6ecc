//! curricle CLI — drives one curriculum training run from a YAML config.
//!
//! A fatal training error exits non-zero and leaves the last saved
//! checkpoint intact; re-invoking with the same run id resumes from it.

use anyhow::Context;
use clap::Parser;
use curricle_core::config::{DataKind, StorageKind, TaskKind, TrainConfig};
use curricle_core::data::{DataSampler, GaussianSampler};
use curricle_core::model::build_model;
use curricle_core::optim::Adam;
use curricle_core::storage::{DirObjectStore, HttpObjectStore, ObjectStore};
use curricle_core::task::{LinearRegressionSampler, TaskSampler};
use curricle_core::tracking::{JsonlTracker, NoopTracker, TrackingSink};
use curricle_core::trainer::{RunContext, TrainingLoop};
use curricle_core::RunLayout;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Curriculum-driven trainer for synthetic in-context-learning tasks
#[derive(Parser, Debug)]
#[command(name = "curricle", version, about, long_about = None)]
struct Cli {
    /// Path to the run configuration file (YAML)
    config: PathBuf,

    /// Exercise the loop without durable side effects: curriculum pinned
    /// to its terminal plateau, steps capped, sinks disabled
    #[arg(long)]
    dry_run: bool,

    /// Override the configured output directory
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = TrainConfig::from_yaml_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(ref out_dir) = cli.out_dir {
        config.out_dir = out_dir.clone();
    }
    config.validate().context("invalid configuration")?;
    if cli.dry_run {
        config.apply_dry_run();
    }

    let _log_guard = init_tracing(&cli, &config);

    let run_id = if cli.dry_run {
        "dry-run".to_string()
    } else {
        config
            .resume_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    };
    let layout = RunLayout::new(config.out_dir.join(&run_id));
    if !cli.dry_run {
        layout.ensure()
            .with_context(|| format!("creating run directory {}", layout.root().display()))?;
        // Freeze the effective configuration alongside the artifacts.
        let frozen = config.to_yaml().context("serializing configuration")?;
        std::fs::write(layout.config_path(), frozen).context("freezing config.yaml")?;
    }
    tracing::info!(%run_id, config = %cli.config.display(), dry_run = cli.dry_run, "run configured");

    let model = build_model(&config.model, config.training.seed);
    let optimizer = Adam::new(model.params().len(), config.training.learning_rate);
    let data_sampler: Box<dyn DataSampler> = match config.training.data {
        DataKind::Gaussian => Box::new(GaussianSampler::new(config.model.n_dims)),
    };
    let task_sampler: Box<dyn TaskSampler> = match config.training.task {
        TaskKind::LinearRegression => Box::new(LinearRegressionSampler::new(config.model.n_dims)),
    };

    let tracker: Box<dyn TrackingSink> = if cli.dry_run || !config.tracking.enabled {
        Box::new(NoopTracker)
    } else {
        Box::new(JsonlTracker::create(&layout.events_path()).context("opening events log")?)
    };

    let store: Option<Box<dyn ObjectStore>> = match config.storage.kind {
        StorageKind::None => None,
        StorageKind::Dir => {
            let root = config
                .storage
                .root
                .clone()
                .ok_or_else(|| anyhow::anyhow!("storage.kind is 'dir' but storage.root is unset"))?;
            Some(Box::new(DirObjectStore::new(root)))
        }
        StorageKind::Http => {
            let endpoint = config.storage.endpoint.clone().ok_or_else(|| {
                anyhow::anyhow!("storage.kind is 'http' but storage.endpoint is unset")
            })?;
            Some(Box::new(HttpObjectStore::new(endpoint)))
        }
    };

    let ctx = RunContext {
        config,
        run_id,
        layout,
        dry_run: cli.dry_run,
    };
    let mut training_loop = TrainingLoop::new(
        ctx,
        model,
        Box::new(optimizer),
        data_sampler,
        task_sampler,
        tracker,
        store,
    )?;
    training_loop.run().context("training failed")?;

    Ok(())
}

/// Human-readable stderr logging, plus a JSON file log under the output
/// directory for non-dry runs. Returns the appender guard.
fn init_tracing(cli: &Cli, config: &TrainConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    if cli.dry_run {
        tracing_subscriber::registry().with(stderr_layer).init();
        return None;
    }

    let log_dir = config.out_dir.join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "curricle.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_config_and_flags() {
        let cli = Cli::try_parse_from(["curricle", "conf.yaml", "--dry-run", "-vv"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("conf.yaml"));
        assert!(cli.dry_run);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_cli_requires_config_path() {
        assert!(Cli::try_parse_from(["curricle"]).is_err());
    }
}
