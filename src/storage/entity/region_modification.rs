use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How the solver treats a region for one model run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Deserialize, Serialize)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
pub enum ModeledType {
    #[sea_orm(num_value = 0)]
    Modeled,
    /// Left out of the solve; base-case results are copied in afterwards.
    #[sea_orm(num_value = 1)]
    HoldStatic,
    /// Left out entirely.
    #[sea_orm(num_value = 2)]
    Removed,
}

/// `region_id` and `region_group_id` both unset marks the run's default row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "region_modifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub model_run_id: i32,
    #[sea_orm(nullable)]
    pub region_id: Option<i32>,
    #[sea_orm(nullable)]
    pub region_group_id: Option<i32>,
    pub land_proportion: f64,
    pub water_proportion: f64,
    pub rainfall_proportion: f64,
    pub modeled_type: ModeledType,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
