use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "result_sets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub model_run_id: i32,
    pub created_at: i64,
    /// False once any result row has a null or negative net revenue.
    pub in_calibration: bool,
    pub engine_version: String,
    pub infeasibilities_text: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
