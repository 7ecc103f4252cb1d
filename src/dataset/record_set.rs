use crate::dataset::{DataFrame, DataRow, NumericColumns};
use crate::error::ModelRunError;
use crate::storage::entity::{
    calibrated_parameter, calibration_set, crop, input_data_item, input_data_set,
    rainfall_parameter, rainfall_result, rainfall_set, region, result, result_set,
};
use async_trait::async_trait;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use std::collections::{BTreeSet, HashMap, HashSet};

/// A dated collection of per-region/per-crop rows that can be handed to the
/// scenario engine as a [`DataFrame`].
#[async_trait]
pub trait RecordSet: Sync {
    type Row: NumericColumns + Send + Sync;

    /// Rows in storage order.
    async fn rows<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<Self::Row>, DbErr>;

    async fn as_data_frame<C: ConnectionTrait>(
        &self,
        db: &C,
        exclude_regions: &HashSet<i32>,
    ) -> Result<DataFrame, ModelRunError> {
        let rows = self.rows(db).await?;
        project(db, rows, exclude_regions).await
    }
}

/// Swaps region/crop foreign keys for external ids and crop codes.
pub async fn project<C, R>(
    db: &C,
    rows: Vec<R>,
    exclude_regions: &HashSet<i32>,
) -> Result<DataFrame, ModelRunError>
where
    C: ConnectionTrait,
    R: NumericColumns,
{
    let rows: Vec<R> = rows
        .into_iter()
        .filter(|r| !exclude_regions.contains(&r.region_id()))
        .collect();

    let region_ids: BTreeSet<i32> = rows.iter().map(|r| r.region_id()).collect();
    let crop_ids: BTreeSet<i32> = rows.iter().map(|r| r.crop_id()).collect();

    let regions: HashMap<i32, String> = region::Entity::find()
        .filter(region::Column::Id.is_in(region_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.id, r.external_id))
        .collect();
    let crops: HashMap<i32, String> = crop::Entity::find()
        .filter(crop::Column::Id.is_in(crop_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.crop_code))
        .collect();

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let region = regions
            .get(&row.region_id())
            .ok_or(ModelRunError::UnresolvedReference {
                entity: "region",
                id: row.region_id(),
            })?;
        let crop = crops
            .get(&row.crop_id())
            .ok_or(ModelRunError::UnresolvedReference {
                entity: "crop",
                id: row.crop_id(),
            })?;
        let mut data_row = DataRow::new(row.year(), region.clone(), crop.clone());
        for (column, value) in row.numeric_columns() {
            data_row.values.insert(column.to_string(), value);
        }
        out.push(data_row);
    }
    Ok(DataFrame::new(out))
}

#[async_trait]
impl RecordSet for calibration_set::Model {
    type Row = calibrated_parameter::Model;

    async fn rows<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<Self::Row>, DbErr> {
        calibrated_parameter::Entity::find()
            .filter(calibrated_parameter::Column::CalibrationSetId.eq(self.id))
            .order_by_asc(calibrated_parameter::Column::Id)
            .all(db)
            .await
    }
}

#[async_trait]
impl RecordSet for input_data_set::Model {
    type Row = input_data_item::Model;

    async fn rows<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<Self::Row>, DbErr> {
        input_data_item::Entity::find()
            .filter(input_data_item::Column::InputDataSetId.eq(self.id))
            .order_by_asc(input_data_item::Column::Id)
            .all(db)
            .await
    }
}

#[async_trait]
impl RecordSet for rainfall_set::Model {
    type Row = rainfall_parameter::Model;

    async fn rows<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<Self::Row>, DbErr> {
        rainfall_parameter::Entity::find()
            .filter(rainfall_parameter::Column::RainfallSetId.eq(self.id))
            .order_by_asc(rainfall_parameter::Column::Id)
            .all(db)
            .await
    }
}

#[async_trait]
impl RecordSet for result_set::Model {
    type Row = result::Model;

    async fn rows<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<Self::Row>, DbErr> {
        result::Entity::find()
            .filter(result::Column::ResultSetId.eq(self.id))
            .order_by_asc(result::Column::Id)
            .all(db)
            .await
    }
}

impl result_set::Model {
    pub async fn rainfall_data_frame<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> Result<DataFrame, ModelRunError> {
        let rows = rainfall_result::Entity::find()
            .filter(rainfall_result::Column::ResultSetId.eq(self.id))
            .order_by_asc(rainfall_result::Column::Id)
            .all(db)
            .await?;
        project(db, rows, &HashSet::new()).await
    }
}
