use crate::dataset::RecordSet;
use crate::engine::{EngineOutput, EngineRequest, ScenarioEngine};
use crate::error::ModelRunError;
use crate::modification::ModificationResolver;
use crate::results::{IngestContext, ResultsIngestor};
use crate::scheduler::model::RunOutcome;
use crate::storage::entity::model_run;
use crate::storage::repository::{
    AreaRepository, ModelRunRepository, ModificationRepository, ResultRepository,
};
use log::{info, warn};
use sea_orm::{ConnectionTrait, DatabaseTransaction, TransactionTrait};

pub struct ModelRunWorker;

impl ModelRunWorker {
    /// Resolve modifications, solve, ingest. The caller claims the run; a
    /// completed run has its flags cleared here, together with the results.
    pub async fn run<C>(
        db: &C,
        engine: &dyn ScenarioEngine,
        run: &model_run::Model,
    ) -> Result<RunOutcome, ModelRunError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        // 1. load the run's area and modification rows
        let calibration_set = AreaRepository::calibration_set(db, run.calibration_set_id)
            .await?
            .ok_or(ModelRunError::UnresolvedReference {
                entity: "calibration set",
                id: run.calibration_set_id,
            })?;
        let area = AreaRepository::find(db, calibration_set.model_area_id)
            .await?
            .ok_or(ModelRunError::UnresolvedReference {
                entity: "model area",
                id: calibration_set.model_area_id,
            })?;
        let catalog = AreaRepository::catalog(db, area).await?;
        let region_mods = ModificationRepository::region_modifications(db, run.id).await?;
        let crop_mods = ModificationRepository::crop_modifications(db, run.id).await?;

        // 2. resolve; fails before the engine is touched
        let resolution =
            ModificationResolver::new(&catalog).resolve(run.id, &region_mods, &crop_mods)?;
        let excluded = resolution.excluded_regions();

        let base_result_set = if resolution.static_regions.is_empty() {
            None
        } else {
            let base_run = ModelRunRepository::find_base_run(db, run, catalog.area.id)
                .await?
                .ok_or(ModelRunError::MissingBaseCase { run_id: run.id })?;
            let set = ResultRepository::latest_for_run(db, base_run.id)
                .await?
                .ok_or(ModelRunError::MissingBaseCase { run_id: run.id })?;
            Some(set)
        };

        // 3. build the engine's input frames
        let calibration = calibration_set.as_data_frame(db, &excluded).await?;
        let rainfall = if catalog.area.supports_rainfall {
            let set = match run.rainfall_set_id {
                Some(id) => AreaRepository::rainfall_set(db, id).await?,
                None => AreaRepository::latest_rainfall_set(db, catalog.area.id).await?,
            };
            match set {
                Some(set) => Some(set.as_data_frame(db, &excluded).await?),
                None => None,
            }
        } else {
            None
        };

        info!(
            "Model run {}: {} calibration rows, {} static and {} removed regions",
            run.id,
            calibration.len(),
            resolution.static_regions.len(),
            resolution.removed_regions.len()
        );

        // 4. solve
        let engine_version = engine.version().await?;
        let output = engine
            .run(EngineRequest {
                model_run_id: run.id,
                model_area: catalog.area.name.clone(),
                calibration,
                rainfall,
                adjustments: resolution.adjustments,
            })
            .await?;
        info!(
            "Model run {}: engine {} returned {} rows, {} infeasibilities",
            run.id,
            engine_version,
            output.results.len(),
            output.infeasibilities.len()
        );

        if !ModelRunRepository::exists(db, run.id).await? {
            warn!("Model run {} was deleted while solving; discarding output", run.id);
            return Ok(RunOutcome::Discarded);
        }

        // 5. store, replace older sets and complete in one transaction
        let txn = db.begin().await?;
        let stored = Self::store(
            &txn,
            IngestContext {
                run,
                catalog: &catalog,
                static_regions: &resolution.static_regions,
                base_result_set: base_result_set.as_ref(),
                engine_version: &engine_version,
            },
            output,
        )
        .await;
        match stored {
            Ok(Some(outcome)) => {
                txn.commit().await?;
                Ok(outcome)
            }
            Ok(None) => {
                txn.rollback().await?;
                warn!(
                    "Model run {} was requeued while solving; its results were not kept",
                    run.id
                );
                Ok(RunOutcome::Requeued)
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!("Rollback for model run {} failed: {}", run.id, rollback);
                }
                Err(e)
            }
        }
    }

    /// None when the run no longer holds its running flag.
    async fn store(
        txn: &DatabaseTransaction,
        ctx: IngestContext<'_>,
        output: EngineOutput,
    ) -> Result<Option<RunOutcome>, ModelRunError> {
        let run_id = ctx.run.id;
        let set = ResultsIngestor::ingest(txn, ctx, output).await?;
        let replaced = ResultRepository::delete_other_sets(txn, run_id, set.id).await?;
        if !ModelRunRepository::mark_complete(txn, run_id).await? {
            return Ok(None);
        }
        if replaced > 0 {
            info!("Model run {}: replaced {} older result sets", run_id, replaced);
        }
        Ok(Some(RunOutcome::Completed {
            result_set_id: set.id,
            in_calibration: set.in_calibration,
        }))
    }
}
