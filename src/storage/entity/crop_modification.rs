use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `crop_id` unset marks the run's default row. A row naming both a crop
/// and a region is a region-linked override.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "crop_modifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub model_run_id: i32,
    #[sea_orm(nullable)]
    pub crop_id: Option<i32>,
    #[sea_orm(nullable)]
    pub region_id: Option<i32>,
    pub price_proportion: f64,
    pub yield_proportion: f64,
    #[sea_orm(nullable)]
    pub min_land_area_proportion: Option<f64>,
    #[sea_orm(nullable)]
    pub max_land_area_proportion: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
