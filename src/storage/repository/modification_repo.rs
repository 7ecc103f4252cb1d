use crate::storage::entity::{crop_modification, region_modification};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};

pub struct ModificationRepository;

impl ModificationRepository {
    pub async fn region_modifications<C: ConnectionTrait>(
        db: &C,
        model_run_id: i32,
    ) -> Result<Vec<region_modification::Model>, DbErr> {
        region_modification::Entity::find()
            .filter(region_modification::Column::ModelRunId.eq(model_run_id))
            .order_by_asc(region_modification::Column::Id)
            .all(db)
            .await
    }

    pub async fn crop_modifications<C: ConnectionTrait>(
        db: &C,
        model_run_id: i32,
    ) -> Result<Vec<crop_modification::Model>, DbErr> {
        crop_modification::Entity::find()
            .filter(crop_modification::Column::ModelRunId.eq(model_run_id))
            .order_by_asc(crop_modification::Column::Id)
            .all(db)
            .await
    }
}
