use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "calibrated_parameters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub calibration_set_id: i32,
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
    pub xwater: Option<Decimal>,
    #[sea_orm(nullable)]
    pub xwaterha: Option<Decimal>,
    #[sea_orm(nullable)]
    pub omegaland: Option<Decimal>,
    #[sea_orm(nullable)]
    pub omegasupply: Option<Decimal>,
    #[sea_orm(nullable)]
    pub omegalabor: Option<Decimal>,
    #[sea_orm(nullable)]
    pub omegatotal: Option<Decimal>,
    #[sea_orm(nullable)]
    pub sigma: Option<Decimal>,
    #[sea_orm(nullable)]
    pub theta: Option<Decimal>,
    #[sea_orm(nullable)]
    pub delta: Option<Decimal>,
    #[sea_orm(nullable)]
    pub leontief: Option<Decimal>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
