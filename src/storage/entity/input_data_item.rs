use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "input_data_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub input_data_set_id: i32,
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
    pub omegatotal: Option<Decimal>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
