use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle: pending (!ready) -> ready -> running -> complete.
/// A failed attempt only clears `running`, which leaves the run eligible again.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "model_runs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(nullable)]
    pub description: Option<String>,
    pub organization_id: i32,
    pub user_id: i32,
    pub calibration_set_id: i32,
    #[sea_orm(nullable)]
    pub rainfall_set_id: Option<i32>,
    pub ready: bool,
    pub running: bool,
    pub complete: bool,
    pub is_base: bool,
    #[sea_orm(nullable)]
    pub base_model_run_id: Option<i32>,
    #[sea_orm(nullable)]
    pub status_message: Option<String>,
    pub date_submitted: i64, // unix millis
    #[sea_orm(nullable)]
    pub date_completed: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
