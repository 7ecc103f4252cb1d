use crate::storage::entity::{
    calibrated_parameter, calibration_set, crop, model_area, rainfall_parameter, rainfall_set,
    region, region_group,
};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};

/// Everything the resolver needs to know about one model area.
#[derive(Debug, Clone)]
pub struct AreaCatalog {
    pub area: model_area::Model,
    pub regions: Vec<region::Model>,
    pub groups: Vec<region_group::Model>,
    pub crops: Vec<crop::Model>,
}

pub struct AreaRepository;

impl AreaRepository {
    pub async fn find<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<model_area::Model>, DbErr> {
        model_area::Entity::find_by_id(id).one(db).await
    }

    pub async fn find_by_name<C: ConnectionTrait>(
        db: &C,
        name: &str,
    ) -> Result<Option<model_area::Model>, DbErr> {
        model_area::Entity::find()
            .filter(model_area::Column::Name.eq(name))
            .one(db)
            .await
    }

    pub async fn catalog<C: ConnectionTrait>(
        db: &C,
        area: model_area::Model,
    ) -> Result<AreaCatalog, DbErr> {
        let regions = region::Entity::find()
            .filter(region::Column::ModelAreaId.eq(area.id))
            .order_by_asc(region::Column::Id)
            .all(db)
            .await?;
        let groups = region_group::Entity::find()
            .filter(region_group::Column::ModelAreaId.eq(area.id))
            .order_by_asc(region_group::Column::Id)
            .all(db)
            .await?;
        let crops = crop::Entity::find()
            .filter(crop::Column::ModelAreaId.eq(area.id))
            .order_by_asc(crop::Column::Id)
            .all(db)
            .await?;
        Ok(AreaCatalog {
            area,
            regions,
            groups,
            crops,
        })
    }

    pub async fn calibration_set<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<calibration_set::Model>, DbErr> {
        calibration_set::Entity::find_by_id(id).one(db).await
    }

    pub async fn rainfall_set<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<rainfall_set::Model>, DbErr> {
        rainfall_set::Entity::find_by_id(id).one(db).await
    }

    pub async fn latest_calibration_set<C: ConnectionTrait>(
        db: &C,
        model_area_id: i32,
    ) -> Result<Option<calibration_set::Model>, DbErr> {
        calibration_set::Entity::find()
            .filter(calibration_set::Column::ModelAreaId.eq(model_area_id))
            .order_by_desc(calibration_set::Column::CreatedAt)
            .order_by_desc(calibration_set::Column::Id)
            .one(db)
            .await
    }

    pub async fn latest_rainfall_set<C: ConnectionTrait>(
        db: &C,
        model_area_id: i32,
    ) -> Result<Option<rainfall_set::Model>, DbErr> {
        rainfall_set::Entity::find()
            .filter(rainfall_set::Column::ModelAreaId.eq(model_area_id))
            .order_by_desc(rainfall_set::Column::CreatedAt)
            .order_by_desc(rainfall_set::Column::Id)
            .one(db)
            .await
    }

    /// Removes a calibration set together with its parameter rows.
    pub async fn delete_calibration_set<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), DbErr> {
        calibrated_parameter::Entity::delete_many()
            .filter(calibrated_parameter::Column::CalibrationSetId.eq(id))
            .exec(db)
            .await?;
        calibration_set::Entity::delete_by_id(id).exec(db).await?;
        Ok(())
    }

    pub async fn calibrated_parameters<C: ConnectionTrait>(
        db: &C,
        calibration_set_id: i32,
    ) -> Result<Vec<calibrated_parameter::Model>, DbErr> {
        calibrated_parameter::Entity::find()
            .filter(calibrated_parameter::Column::CalibrationSetId.eq(calibration_set_id))
            .all(db)
            .await
    }

    pub async fn rainfall_parameters<C: ConnectionTrait>(
        db: &C,
        rainfall_set_id: i32,
    ) -> Result<Vec<rainfall_parameter::Model>, DbErr> {
        rainfall_parameter::Entity::find()
            .filter(rainfall_parameter::Column::RainfallSetId.eq(rainfall_set_id))
            .all(db)
            .await
    }

    pub async fn set_region_support<C: ConnectionTrait>(
        db: &C,
        region_id: i32,
        irrigation: bool,
        rainfall: bool,
    ) -> Result<(), DbErr> {
        region::Entity::update_many()
            .col_expr(region::Column::SupportsIrrigation, Expr::value(irrigation))
            .col_expr(region::Column::SupportsRainfall, Expr::value(rainfall))
            .filter(region::Column::Id.eq(region_id))
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn set_area_support<C: ConnectionTrait>(
        db: &C,
        model_area_id: i32,
        irrigation: bool,
        rainfall: bool,
    ) -> Result<(), DbErr> {
        model_area::Entity::update_many()
            .col_expr(model_area::Column::SupportsIrrigation, Expr::value(irrigation))
            .col_expr(model_area::Column::SupportsRainfall, Expr::value(rainfall))
            .filter(model_area::Column::Id.eq(model_area_id))
            .exec(db)
            .await?;
        Ok(())
    }
}
