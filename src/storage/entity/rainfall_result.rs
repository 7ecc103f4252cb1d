use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "rainfall_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub result_set_id: i32,
    pub region_id: i32,
    pub crop_id: i32,
    #[sea_orm(nullable)]
    pub year: Option<i32>,

    #[sea_orm(nullable)]
    pub xland: Option<f64>,
    #[sea_orm(nullable)]
    pub crop_yield: Option<f64>,
    #[sea_orm(nullable)]
    pub price: Option<f64>,
    #[sea_orm(nullable)]
    pub omegatotal: Option<f64>,
    #[sea_orm(nullable)]
    pub gross_revenue: Option<f64>,
    #[sea_orm(nullable)]
    pub net_revenue: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
