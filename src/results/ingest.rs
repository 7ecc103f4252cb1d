use super::infeasibility::{crop_frequencies, render_summary};
use crate::dataset::{finite_or_null, DataRow, NumericColumns, WritableColumns};
use crate::engine::EngineOutput;
use crate::error::ModelRunError;
use crate::storage::entity::{infeasibility, model_run, rainfall_result, result, result_set};
use crate::storage::repository::{AreaCatalog, ResultRepository};
use log::{error, info, warn};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, TransactionTrait,
};
use std::collections::{BTreeSet, HashMap};

/// What the ingestor needs besides the engine output.
pub struct IngestContext<'a> {
    pub run: &'a model_run::Model,
    pub catalog: &'a AreaCatalog,
    pub static_regions: &'a BTreeSet<i32>,
    /// Source of the rows copied in for static regions.
    pub base_result_set: Option<&'a result_set::Model>,
    pub engine_version: &'a str,
}

pub struct ResultsIngestor;

impl ResultsIngestor {
    /// Persists one engine output as a new result set inside its own
    /// transaction, so readers never see a partly written set. Nested under an
    /// outer transaction this becomes a savepoint.
    pub async fn ingest<C>(
        db: &C,
        ctx: IngestContext<'_>,
        output: EngineOutput,
    ) -> Result<result_set::Model, ModelRunError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = db.begin().await?;
        let set = ResultRepository::create_set(&txn, ctx.run.id, ctx.engine_version).await?;
        let loaded = match Self::load(&txn, &ctx, set.id, output).await {
            Ok(()) => ResultRepository::find_set(&txn, set.id)
                .await
                .map_err(ModelRunError::from)
                .and_then(|found| {
                    found.ok_or(ModelRunError::UnresolvedReference {
                        entity: "result set",
                        id: set.id,
                    })
                }),
            Err(e) => Err(e),
        };
        match loaded {
            Ok(stored) => {
                txn.commit().await?;
                Ok(stored)
            }
            Err(e) => {
                warn!(
                    "Rolling back result set {} of model run {}: {}",
                    set.id, ctx.run.id, e
                );
                if let Err(rollback) = txn.rollback().await {
                    error!("Rollback of result set {} failed: {}", set.id, rollback);
                    if let Err(cleanup) = ResultRepository::delete_set(db, set.id).await {
                        error!("Could not delete partial result set {}: {}", set.id, cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    async fn load<C: ConnectionTrait>(
        db: &C,
        ctx: &IngestContext<'_>,
        set_id: i32,
        output: EngineOutput,
    ) -> Result<(), ModelRunError> {
        let codes = CodeBook::new(ctx.catalog);
        let mut calibration = CalibrationFlag::default();
        let mut unknown_columns = BTreeSet::new();

        let mut results = Vec::with_capacity(output.results.len());
        for row in output.results.iter() {
            let (region_id, crop_id) = codes.resolve(row)?;
            let mut am = result::ActiveModel {
                result_set_id: Set(set_id),
                region_id: Set(region_id),
                crop_id: Set(crop_id),
                year: Set(row.year),
                ..Default::default()
            };
            unknown_columns.extend(am.set_columns(&row.values));
            calibration.observe(row.get("net_revenue"));
            results.push(am);
        }

        let mut rainfall = Vec::new();
        if let Some(frame) = &output.rainfall_results {
            for row in frame.iter() {
                let (region_id, crop_id) = codes.resolve(row)?;
                let mut am = rainfall_result::ActiveModel {
                    result_set_id: Set(set_id),
                    region_id: Set(region_id),
                    crop_id: Set(crop_id),
                    year: Set(row.year),
                    ..Default::default()
                };
                unknown_columns.extend(am.set_columns(&row.values));
                calibration.observe(row.get("net_revenue"));
                rainfall.push(am);
            }
        }
        if !unknown_columns.is_empty() {
            warn!(
                "Model run {}: ignoring engine columns {:?}",
                ctx.run.id, unknown_columns
            );
        }

        if !ctx.static_regions.is_empty() {
            let base = ctx
                .base_result_set
                .ok_or(ModelRunError::MissingBaseCase { run_id: ctx.run.id })?;
            let (copied, copied_rainfall) =
                Self::copy_static_rows(db, base, ctx.static_regions, set_id, &mut calibration)
                    .await?;
            info!(
                "Model run {}: copied {} base-case rows for {} static regions",
                ctx.run.id,
                copied.len() + copied_rainfall.len(),
                ctx.static_regions.len()
            );
            results.extend(copied);
            rainfall.extend(copied_rainfall);
        }

        ResultRepository::insert_results(db, results).await?;
        ResultRepository::insert_rainfall_results(db, rainfall).await?;

        let mut infeasible_rows = Vec::with_capacity(output.infeasibilities.len());
        for inf in &output.infeasibilities {
            let region_id = codes.region(&inf.region)?;
            infeasible_rows.push(infeasibility::ActiveModel {
                result_set_id: Set(set_id),
                model_run_id: Set(ctx.run.id),
                region_id: Set(region_id),
                year: Set(inf.year),
                description: Set(inf.description.clone()),
                ..Default::default()
            });
        }
        ResultRepository::insert_infeasibilities(db, infeasible_rows).await?;

        let frequencies = crop_frequencies(
            &output.infeasibilities,
            output
                .results
                .iter()
                .map(|r| (r.region.as_str(), r.year, r.crop.as_str())),
        );
        ResultRepository::finish_set(
            db,
            set_id,
            calibration.in_calibration(),
            render_summary(&frequencies),
        )
        .await?;
        Ok(())
    }

    async fn copy_static_rows<C: ConnectionTrait>(
        db: &C,
        base: &result_set::Model,
        static_regions: &BTreeSet<i32>,
        set_id: i32,
        calibration: &mut CalibrationFlag,
    ) -> Result<(Vec<result::ActiveModel>, Vec<rainfall_result::ActiveModel>), ModelRunError> {
        let region_ids: Vec<i32> = static_regions.iter().copied().collect();

        let base_rows = result::Entity::find()
            .filter(result::Column::ResultSetId.eq(base.id))
            .filter(result::Column::RegionId.is_in(region_ids.clone()))
            .all(db)
            .await?;
        let mut copied = Vec::with_capacity(base_rows.len());
        for m in base_rows {
            let mut am = result::ActiveModel {
                result_set_id: Set(set_id),
                region_id: Set(m.region_id),
                crop_id: Set(m.crop_id),
                year: Set(m.year),
                ..Default::default()
            };
            for (name, value) in m.numeric_columns() {
                am.set_column(name, value);
            }
            calibration.observe(m.net_revenue);
            copied.push(am);
        }

        let base_rainfall = rainfall_result::Entity::find()
            .filter(rainfall_result::Column::ResultSetId.eq(base.id))
            .filter(rainfall_result::Column::RegionId.is_in(region_ids))
            .all(db)
            .await?;
        let mut copied_rainfall = Vec::with_capacity(base_rainfall.len());
        for m in base_rainfall {
            let mut am = rainfall_result::ActiveModel {
                result_set_id: Set(set_id),
                region_id: Set(m.region_id),
                crop_id: Set(m.crop_id),
                year: Set(m.year),
                ..Default::default()
            };
            for (name, value) in m.numeric_columns() {
                am.set_column(name, value);
            }
            calibration.observe(m.net_revenue);
            copied_rainfall.push(am);
        }
        Ok((copied, copied_rainfall))
    }
}

/// Once a null or negative net revenue is seen the set stays out of calibration.
#[derive(Debug)]
struct CalibrationFlag(bool);

impl Default for CalibrationFlag {
    fn default() -> Self {
        Self(true)
    }
}

impl CalibrationFlag {
    fn observe(&mut self, net_revenue: Option<f64>) {
        match finite_or_null(net_revenue) {
            Some(v) if v >= 0.0 => {}
            _ => self.0 = false,
        }
    }

    fn in_calibration(&self) -> bool {
        self.0
    }
}

/// Region external ids and crop codes of one model area.
struct CodeBook<'a> {
    model_area_id: i32,
    regions: HashMap<&'a str, i32>,
    crops: HashMap<&'a str, i32>,
}

impl<'a> CodeBook<'a> {
    fn new(catalog: &'a AreaCatalog) -> Self {
        Self {
            model_area_id: catalog.area.id,
            regions: catalog
                .regions
                .iter()
                .map(|r| (r.external_id.as_str(), r.id))
                .collect(),
            crops: catalog
                .crops
                .iter()
                .map(|c| (c.crop_code.as_str(), c.id))
                .collect(),
        }
    }

    fn region(&self, code: &str) -> Result<i32, ModelRunError> {
        self.regions
            .get(code)
            .copied()
            .ok_or_else(|| ModelRunError::UnknownCode {
                entity: "region",
                code: code.to_string(),
                model_area_id: self.model_area_id,
            })
    }

    fn resolve(&self, row: &DataRow) -> Result<(i32, i32), ModelRunError> {
        let region = self.region(&row.region)?;
        let crop = self
            .crops
            .get(row.crop.as_str())
            .copied()
            .ok_or_else(|| ModelRunError::UnknownCode {
                entity: "crop",
                code: row.crop.clone(),
                model_area_id: self.model_area_id,
            })?;
        Ok((region, crop))
    }
}
