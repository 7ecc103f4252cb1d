use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "model_areas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: i32,
    pub name: String,
    // Area-level switches; the per-region flags are set by the classifier
    pub supports_irrigation: bool,
    pub supports_rainfall: bool,
    pub region_linked_crops: bool,
    pub allow_static_regions: bool,
    pub allow_removed_regions: bool,
    pub feature_package_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
