use crate::config::{FairnessMode, SchedulerConfig};
use crate::engine::ScenarioEngine;
use crate::error::{ErrorKind, ModelRunError};
use crate::scheduler::model::{PassSummary, Processed, RunOutcome};
use crate::scheduler::worker::ModelRunWorker;
use crate::storage::entity::model_run;
use crate::storage::repository::ModelRunRepository;
use futures::FutureExt;
use log::{debug, error, info, warn};
use sea_orm::{DatabaseConnection, DbErr};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::sleep;

/// Polls storage for ready runs and drives each through the worker, one at a
/// time. A run is never left marked running once its attempt ends.
pub struct SchedulerService {
    db: Arc<DatabaseConnection>,
    engine: Arc<dyn ScenarioEngine>,
    config: SchedulerConfig,
}

impl SchedulerService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        engine: Arc<dyn ScenarioEngine>,
        config: SchedulerConfig,
    ) -> Self {
        Self { db, engine, config }
    }

    /// Clears running flags left behind by a process that died mid-run.
    pub async fn recover(&self) -> Result<u64, DbErr> {
        let n = ModelRunRepository::reset_stale_running(self.db.as_ref()).await?;
        if n > 0 {
            info!("Recovered {} model runs left marked running", n);
        } else {
            debug!("No interrupted model runs to recover");
        }
        Ok(n)
    }

    async fn use_ranking(&self) -> bool {
        match self.config.fairness {
            FairnessMode::On => true,
            FairnessMode::Off => false,
            FairnessMode::Auto => {
                ModelRunRepository::supports_windowed_ranking(self.db.as_ref()).await
            }
        }
    }

    /// The runs the next pass will attempt, in order.
    pub async fn select_runs(&self) -> Result<Vec<model_run::Model>, DbErr> {
        if self.use_ranking().await {
            ModelRunRepository::ready_runs_ranked(self.db.as_ref(), self.config.fairness_window)
                .await
        } else {
            ModelRunRepository::ready_runs_fifo(self.db.as_ref()).await
        }
    }

    pub async fn poll_once(&self) -> Result<PassSummary, ModelRunError> {
        let runs = self.select_runs().await?;
        let mut summary = PassSummary {
            selected: runs.len(),
            ..Default::default()
        };
        for run in runs {
            match self.process(run).await? {
                Processed::Skipped | Processed::Finished(RunOutcome::Requeued) => {
                    summary.skipped += 1
                }
                Processed::Finished(_) => summary.completed += 1,
                Processed::Failed(_) => summary.failed += 1,
            }
        }
        if summary.selected > 0 {
            info!(
                "Pass done: {} selected, {} completed, {} failed, {} skipped",
                summary.selected, summary.completed, summary.failed, summary.skipped
            );
        }
        Ok(summary)
    }

    /// Claim, solve, then complete or release. Errors are returned only in
    /// debug mode or when the running flag itself cannot be cleared.
    pub async fn process(&self, run: model_run::Model) -> Result<Processed, ModelRunError> {
        let db = self.db.as_ref();
        let run_id = run.id;
        if !ModelRunRepository::claim(db, run_id).await? {
            debug!("Model run {} was claimed elsewhere; skipping", run_id);
            return Ok(Processed::Skipped);
        }
        info!("Starting model run {} ({}) for user {}", run_id, run.name, run.user_id);

        let attempt = AssertUnwindSafe(ModelRunWorker::run(db, self.engine.as_ref(), &run))
            .catch_unwind()
            .await;
        let result = match attempt {
            Ok(result) => result,
            Err(panic) => Err(ModelRunError::Internal(panic_message(panic.as_ref()))),
        };

        match result {
            Ok(RunOutcome::Completed {
                result_set_id,
                in_calibration,
            }) => {
                info!(
                    "✓ Model run {} complete: result set {}{}",
                    run_id,
                    result_set_id,
                    if in_calibration { "" } else { " (out of calibration)" }
                );
                Ok(Processed::Finished(RunOutcome::Completed {
                    result_set_id,
                    in_calibration,
                }))
            }
            Ok(RunOutcome::Requeued) => {
                // flags already reset by whoever requeued it
                Ok(Processed::Finished(RunOutcome::Requeued))
            }
            Ok(RunOutcome::Discarded) => {
                // normally a no-op; the row is gone
                ModelRunRepository::release(db, run_id, None).await?;
                Ok(Processed::Finished(RunOutcome::Discarded))
            }
            Err(e) => {
                let kind = e.kind();
                match kind {
                    ErrorKind::Infrastructure => {
                        warn!("✗ Model run {} failed, will retry: {}", run_id, e)
                    }
                    _ => error!("✗ Model run {} failed ({:?}): {}", run_id, kind, e),
                }
                ModelRunRepository::release(db, run_id, Some(format!("failed: {}", e))).await?;
                if self.config.debug {
                    return Err(e);
                }
                Ok(Processed::Failed(kind))
            }
        }
    }

    /// Polls until `shutdown` flips to true. In debug mode the first error
    /// ends the loop.
    pub async fn run_forever(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ModelRunError> {
        info!(
            "Scheduler started (poll every {:?}, fairness {:?}, window {})",
            self.config.poll_interval, self.config.fairness, self.config.fairness_window
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            match self.poll_once().await {
                // more work may be waiting behind the window
                Ok(summary) if summary.completed > 0 => continue,
                Ok(_) => {}
                Err(e) if self.config.debug => return Err(e),
                Err(e) => error!("Scheduler pass failed: {}", e),
            }
            tokio::select! {
                _ = sleep(self.config.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
        }
        info!("Scheduler stopped");
        Ok(())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic".to_string()
    }
}
