//! The training loop driver.
//!
//! Composes the curriculum, samplers, step executor, metrics, and
//! checkpointing into a resumable state machine. Side effects within one
//! iteration happen in a fixed order, and the resumable state is only ever
//! saved after the step it describes has fully completed, so a checkpoint
//! at step N is always a valid N-step model.

use crate::checkpoint::{CheckpointManager, LoadOutcome, TrainingState};
use crate::config::TrainConfig;
use crate::curriculum::Curriculum;
use crate::data::{BatchSeeds, DataSampler};
use crate::error::{TrainError, TrainResult};
use crate::layout::RunLayout;
use crate::metrics::MetricsAggregator;
use crate::model::Model;
use crate::optim::Optimizer;
use crate::report;
use crate::seeds::{SeedSampler, TASK_SEED_OFFSET, step_seed};
use crate::step::run_step;
use crate::storage::{ObjectStore, upload_run_artifacts};
use crate::task::TaskSampler;
use crate::tracking::TrackingSink;
use chrono::Utc;

/// Explicit per-run context handed to the loop; nothing is looked up from
/// ambient global state.
pub struct RunContext {
    pub config: TrainConfig,
    pub run_id: String,
    pub layout: RunLayout,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Initializing,
    Restoring,
    Running,
    Finalizing,
    Done,
}

pub struct TrainingLoop {
    ctx: RunContext,
    curriculum: Curriculum,
    model: Box<dyn Model>,
    optimizer: Box<dyn Optimizer>,
    data_sampler: Box<dyn DataSampler>,
    task_sampler: Box<dyn TaskSampler>,
    metrics: MetricsAggregator,
    checkpoints: CheckpointManager,
    tracker: Box<dyn TrackingSink>,
    store: Option<Box<dyn ObjectStore>>,
    phase: LoopPhase,
}

impl TrainingLoop {
    pub fn new(
        ctx: RunContext,
        model: Box<dyn Model>,
        optimizer: Box<dyn Optimizer>,
        data_sampler: Box<dyn DataSampler>,
        task_sampler: Box<dyn TaskSampler>,
        tracker: Box<dyn TrackingSink>,
        store: Option<Box<dyn ObjectStore>>,
    ) -> TrainResult<Self> {
        let curriculum = Curriculum::new(ctx.config.training.curriculum.clone())?;
        let checkpoints = CheckpointManager::new(ctx.layout.clone());
        Ok(Self {
            ctx,
            curriculum,
            model,
            optimizer,
            data_sampler,
            task_sampler,
            metrics: MetricsAggregator::new(),
            checkpoints,
            tracker,
            store,
            phase: LoopPhase::Initializing,
        })
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    /// Drive the run to completion. Terminal: a loop cannot be re-run.
    pub fn run(&mut self) -> TrainResult<()> {
        if self.phase != LoopPhase::Initializing {
            return Err(TrainError::config("training loop already consumed"));
        }

        let start_step = self.restore()?;
        self.phase = LoopPhase::Running;
        let total = self.ctx.config.training.train_steps;
        for step in start_step..total {
            self.run_iteration(step)?;
        }

        self.phase = LoopPhase::Finalizing;
        self.finalize()?;
        self.phase = LoopPhase::Done;
        Ok(())
    }

    fn restore(&mut self) -> TrainResult<u64> {
        self.phase = LoopPhase::Restoring;
        match self.checkpoints.load()? {
            LoadOutcome::Fresh => {
                tracing::info!(run_id = %self.ctx.run_id, "no checkpoint found, starting fresh");
                Ok(0)
            }
            LoadOutcome::Restored(state) => {
                self.model.load_state_dict(&state.model)?;
                self.optimizer.load_state_dict(&state.optimizer)?;
                // The checkpoint records the last completed step and the
                // curriculum advanced once after it, so the restored
                // position needs step + 1 replayed advances.
                let advances = state.step + 1;
                self.curriculum =
                    Curriculum::replay(self.ctx.config.training.curriculum.clone(), advances)?;

                let resume_at = state.step + 1;
                if let Err(e) = self.metrics.preload(&self.ctx.layout.metrics_path(), resume_at) {
                    tracing::warn!(error = %e, "metric history unreadable, starting log empty");
                }
                tracing::info!(
                    run_id = %self.ctx.run_id,
                    restored_step = state.step,
                    resume_at,
                    "resumed from checkpoint"
                );
                Ok(resume_at)
            }
        }
    }

    fn run_iteration(&mut self, step: u64) -> TrainResult<()> {
        let position = self.curriculum.position();
        let training = &self.ctx.config.training;

        let data_seeds = match training.num_training_examples {
            Some(pool) => {
                let mut sampler = SeedSampler::seeded(step_seed(training.seed, step));
                BatchSeeds::PerExample(sampler.sample(pool, training.batch_size)?)
            }
            None => BatchSeeds::Step(step_seed(training.seed, step)),
        };
        let task_seeds = data_seeds.offset(TASK_SEED_OFFSET);

        let xs = self.data_sampler.sample_xs(
            position.n_points,
            training.batch_size,
            position.n_dims_truncated,
            &data_seeds,
        );
        let task = self.task_sampler.sample(training.batch_size, &task_seeds);
        let ys = task.evaluate(&xs);

        let loss_fn = task.training_metric();
        let outcome = run_step(
            self.model.as_mut(),
            self.optimizer.as_mut(),
            &xs,
            &ys,
            &loss_fn,
            step,
        )?;

        let pointwise = task.metric();
        self.metrics
            .record(step, outcome.loss, &outcome.output, &ys, &pointwise, &position);

        let tracking = &self.ctx.config.tracking;
        if !self.ctx.dry_run && tracking.enabled && step % tracking.log_every_steps == 0 {
            if let Some(entry) = self.metrics.last() {
                if let Err(e) = self.tracker.log(entry) {
                    tracing::warn!(error = %e, step, "tracking sink unavailable");
                }
            }
        }

        self.curriculum.advance();

        if !self.ctx.dry_run {
            let training = &self.ctx.config.training;
            if step % training.save_every_steps == 0 {
                let state = TrainingState {
                    step,
                    model: self.model.state_dict(),
                    optimizer: self.optimizer.state_dict(),
                    saved_at: Utc::now(),
                };
                self.checkpoints.save(&state)?;
            }
            if training.keep_every_steps > 0 && step > 0 && step % training.keep_every_steps == 0 {
                self.checkpoints.snapshot(step, &self.model.state_dict())?;
            }
        }

        tracing::debug!(
            step,
            loss = outcome.loss,
            n_points = position.n_points,
            n_dims = position.n_dims_truncated,
            "step complete"
        );
        Ok(())
    }

    fn finalize(&mut self) -> TrainResult<()> {
        if self.ctx.dry_run {
            tracing::info!("dry run complete, skipping durable artifacts");
            return Ok(());
        }

        self.metrics.flush(&self.ctx.layout.metrics_path())?;
        if let Err(e) =
            report::render_loss_curve(self.metrics.entries(), &self.ctx.layout.loss_curve_path())
        {
            tracing::warn!(error = %e, "loss curve rendering failed");
        }

        if let Some(store) = &self.store {
            let uploaded =
                upload_run_artifacts(store.as_ref(), self.ctx.layout.root(), &self.ctx.run_id);
            tracing::info!(uploaded, "artifact upload complete");
        }

        tracing::info!(
            run_id = %self.ctx.run_id,
            steps = self.ctx.config.training.train_steps,
            "run finalized"
        );
        Ok(())
    }
}
