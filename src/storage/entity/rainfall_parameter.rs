use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "rainfall_parameters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub rainfall_set_id: i32,
    pub region_id: i32,
    pub crop_id: i32,
    #[sea_orm(nullable)]
    pub year: Option<i32>,

    #[sea_orm(nullable)]
    pub price: Option<Decimal>,
    #[sea_orm(nullable)]
    pub crop_yield: Option<Decimal>,
    #[sea_orm(nullable)]
    pub xland: Option<Decimal>,
    #[sea_orm(nullable)]
    pub omegatotal: Option<Decimal>,
    #[sea_orm(nullable)]
    pub coef_intercept: Option<Decimal>,
    #[sea_orm(nullable)]
    pub twin: Option<Decimal>,
    #[sea_orm(nullable)]
    pub tspr: Option<Decimal>,
    #[sea_orm(nullable)]
    pub tsum: Option<Decimal>,
    #[sea_orm(nullable)]
    pub pewin: Option<Decimal>,
    #[sea_orm(nullable)]
    pub pespr: Option<Decimal>,
    #[sea_orm(nullable)]
    pub pesum: Option<Decimal>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
