use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "regions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub model_area_id: i32,
    pub name: String,
    /// Stable identifier the scenario engine knows the region by.
    pub external_id: String,
    #[sea_orm(nullable)]
    pub region_group_id: Option<i32>,
    pub supports_irrigation: bool,
    pub supports_rainfall: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
