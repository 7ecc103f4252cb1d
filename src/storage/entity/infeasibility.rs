use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "infeasibilities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub result_set_id: i32,
    pub model_run_id: i32,
    pub region_id: i32,
    pub year: i32,
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
