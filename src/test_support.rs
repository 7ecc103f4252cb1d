//! Seeded in-memory database shared by the crate's tests.

use crate::storage::entity::{
    calibrated_parameter, calibration_set, crop, crop_modification, model_area, model_run,
    organization, rainfall_parameter, rainfall_set, region, region_group, region_modification,
    result, result_set, ModeledType,
};
use crate::storage::establish_connection;
use crate::storage::repository::{AreaCatalog, AreaRepository};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};

pub const YEAR: i32 = 2020;
pub const BASE_USER: i32 = 99;

/// Builder for a queued model run.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub user_id: i32,
    pub date_submitted: i64,
    pub ready: bool,
    pub is_base: bool,
    pub with_defaults: bool,
    pub base_model_run_id: Option<i32>,
}

impl RunSpec {
    pub fn new(user_id: i32, date_submitted: i64) -> Self {
        Self {
            user_id,
            date_submitted,
            ready: true,
            is_base: false,
            with_defaults: true,
            base_model_run_id: None,
        }
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn without_defaults(mut self) -> Self {
        self.with_defaults = false;
        self
    }
}

pub struct Fixture {
    pub db: DatabaseConnection,
    pub organization: organization::Model,
    pub area: model_area::Model,
    pub groups: Vec<region_group::Model>,
    pub regions: Vec<region::Model>,
    pub crops: Vec<crop::Model>,
    pub calibration_set: calibration_set::Model,
    pub rainfall_set: rainfall_set::Model,
    /// Already complete; holds no results until `seed_base_results`.
    pub base_run: model_run::Model,
}

fn dec(v: f64) -> Option<Decimal> {
    Decimal::from_f64_retain(v)
}

impl Fixture {
    /// Organization with one area: groups G1 {R01, R02} and G2 {R03}, R04
    /// ungrouped and the only rainfall region, crops ALFAL, CORN and GRAPE,
    /// one calibration year.
    pub async fn seed() -> Self {
        let db = establish_connection("sqlite::memory:").await.unwrap();

        let organization = organization::ActiveModel {
            name: Set("Valley Growers".into()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let area = model_area::ActiveModel {
            organization_id: Set(organization.id),
            name: Set("Central Valley".into()),
            supports_irrigation: Set(true),
            supports_rainfall: Set(true),
            region_linked_crops: Set(true),
            allow_static_regions: Set(true),
            allow_removed_regions: Set(true),
            feature_package_name: Set("FULL_PUBLIC".into()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let mut groups = Vec::new();
        for (i, name) in ["G1", "G2"].iter().enumerate() {
            groups.push(
                region_group::ActiveModel {
                    model_area_id: Set(area.id),
                    name: Set(name.to_string()),
                    internal_id: Set(format!("{}", i + 1)),
                    ..Default::default()
                }
                .insert(&db)
                .await
                .unwrap(),
            );
        }

        let layout = [
            ("R01", Some(groups[0].id), false),
            ("R02", Some(groups[0].id), false),
            ("R03", Some(groups[1].id), false),
            ("R04", None, true),
        ];
        let mut regions = Vec::new();
        for (code, group, rainfall) in layout {
            regions.push(
                region::ActiveModel {
                    model_area_id: Set(area.id),
                    name: Set(format!("Region {}", code)),
                    external_id: Set(code.to_string()),
                    region_group_id: Set(group),
                    supports_irrigation: Set(true),
                    supports_rainfall: Set(rainfall),
                    ..Default::default()
                }
                .insert(&db)
                .await
                .unwrap(),
            );
        }

        let mut crops = Vec::new();
        for code in ["ALFAL", "CORN", "GRAPE"] {
            crops.push(
                crop::ActiveModel {
                    model_area_id: Set(area.id),
                    crop_group_id: Set(None),
                    name: Set(code.to_lowercase()),
                    crop_code: Set(code.to_string()),
                    ..Default::default()
                }
                .insert(&db)
                .await
                .unwrap(),
            );
        }

        let calibration_set = calibration_set::ActiveModel {
            model_area_id: Set(area.id),
            years: Set(YEAR.to_string()),
            created_at: Set(1),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        for (i, r) in regions.iter().enumerate() {
            for (j, c) in crops.iter().enumerate() {
                let xland = 100.0 * (i + 1) as f64 + 10.0 * j as f64;
                calibrated_parameter::ActiveModel {
                    calibration_set_id: Set(calibration_set.id),
                    region_id: Set(r.id),
                    crop_id: Set(c.id),
                    year: Set(Some(YEAR)),
                    price: Set(dec(200.0 + 50.0 * j as f64)),
                    crop_yield: Set(dec(5.0 + j as f64)),
                    xland: Set(dec(xland)),
                    xwater: Set(dec(3.0 * xland)),
                    xwaterha: Set(dec(3.0)),
                    omegaland: Set(None),
                    omegasupply: Set(None),
                    omegalabor: Set(None),
                    omegatotal: Set(dec(300.0)),
                    sigma: Set(dec(0.17)),
                    theta: Set(None),
                    delta: Set(None),
                    leontief: Set(None),
                    ..Default::default()
                }
                .insert(&db)
                .await
                .unwrap();
            }
        }

        let rainfall_set = rainfall_set::ActiveModel {
            model_area_id: Set(area.id),
            years: Set(YEAR.to_string()),
            created_at: Set(1),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        for c in &crops {
            rainfall_parameter::ActiveModel {
                rainfall_set_id: Set(rainfall_set.id),
                region_id: Set(regions[3].id),
                crop_id: Set(c.id),
                year: Set(Some(YEAR)),
                price: Set(dec(180.0)),
                crop_yield: Set(dec(4.0)),
                xland: Set(dec(50.0)),
                omegatotal: Set(dec(200.0)),
                coef_intercept: Set(dec(1.5)),
                twin: Set(None),
                tspr: Set(None),
                tsum: Set(None),
                pewin: Set(None),
                pespr: Set(None),
                pesum: Set(None),
                ..Default::default()
            }
            .insert(&db)
            .await
            .unwrap();
        }

        let mut fx = Self {
            db,
            organization,
            area,
            groups,
            regions,
            crops,
            calibration_set,
            rainfall_set,
            base_run: model_run::Model {
                id: 0,
                name: String::new(),
                description: None,
                organization_id: 0,
                user_id: 0,
                calibration_set_id: 0,
                rainfall_set_id: None,
                ready: false,
                running: false,
                complete: false,
                is_base: false,
                base_model_run_id: None,
                status_message: None,
                date_submitted: 0,
                date_completed: None,
            },
        };
        let mut base = RunSpec::new(BASE_USER, 0);
        base.is_base = true;
        let base = fx.create_run(base).await;
        let mut active: model_run::ActiveModel = base.into();
        active.complete = Set(true);
        fx.base_run = active.update(&fx.db).await.unwrap();
        fx
    }

    pub fn region(&self, code: &str) -> &region::Model {
        self.regions
            .iter()
            .find(|r| r.external_id == code)
            .unwrap()
    }

    pub fn crop(&self, code: &str) -> &crop::Model {
        self.crops.iter().find(|c| c.crop_code == code).unwrap()
    }

    pub fn group(&self, name: &str) -> &region_group::Model {
        self.groups.iter().find(|g| g.name == name).unwrap()
    }

    pub async fn catalog(&self) -> AreaCatalog {
        let area = AreaRepository::find(&self.db, self.area.id)
            .await
            .unwrap()
            .unwrap();
        AreaRepository::catalog(&self.db, area).await.unwrap()
    }

    /// Inserts a run plus, unless told otherwise, neutral default
    /// region and crop modifications.
    pub async fn create_run(&self, spec: RunSpec) -> model_run::Model {
        let run = model_run::ActiveModel {
            name: Set(format!("run for user {} at {}", spec.user_id, spec.date_submitted)),
            description: Set(None),
            organization_id: Set(self.organization.id),
            user_id: Set(spec.user_id),
            calibration_set_id: Set(self.calibration_set.id),
            rainfall_set_id: Set(Some(self.rainfall_set.id)),
            ready: Set(spec.ready),
            running: Set(false),
            complete: Set(false),
            is_base: Set(spec.is_base),
            base_model_run_id: Set(spec.base_model_run_id),
            status_message: Set(None),
            date_submitted: Set(spec.date_submitted),
            date_completed: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap();

        if spec.with_defaults {
            self.add_region_mod(run.id, None, None, 1.0, ModeledType::Modeled)
                .await;
            self.add_crop_mod(run.id, None, None, 1.0, 1.0).await;
        }
        run
    }

    pub async fn add_region_mod(
        &self,
        model_run_id: i32,
        region_id: Option<i32>,
        region_group_id: Option<i32>,
        proportion: f64,
        modeled_type: ModeledType,
    ) -> region_modification::Model {
        region_modification::ActiveModel {
            model_run_id: Set(model_run_id),
            region_id: Set(region_id),
            region_group_id: Set(region_group_id),
            land_proportion: Set(proportion),
            water_proportion: Set(proportion),
            rainfall_proportion: Set(proportion),
            modeled_type: Set(modeled_type),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap()
    }

    pub async fn add_crop_mod(
        &self,
        model_run_id: i32,
        crop_id: Option<i32>,
        region_id: Option<i32>,
        price: f64,
        crop_yield: f64,
    ) -> crop_modification::Model {
        crop_modification::ActiveModel {
            model_run_id: Set(model_run_id),
            crop_id: Set(crop_id),
            region_id: Set(region_id),
            price_proportion: Set(price),
            yield_proportion: Set(crop_yield),
            min_land_area_proportion: Set(None),
            max_land_area_proportion: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap()
    }

    /// Stores one result row per calibration row for the base run, with a
    /// recognisable net revenue of 1234.
    pub async fn seed_base_results(&self) -> result_set::Model {
        let set = result_set::ActiveModel {
            model_run_id: Set(self.base_run.id),
            created_at: Set(1),
            in_calibration: Set(true),
            engine_version: Set("base".into()),
            infeasibilities_text: Set(String::new()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap();
        for r in &self.regions {
            for c in &self.crops {
                result::ActiveModel {
                    result_set_id: Set(set.id),
                    region_id: Set(r.id),
                    crop_id: Set(c.id),
                    year: Set(Some(YEAR)),
                    xland: Set(Some(10.0)),
                    net_revenue: Set(Some(1234.0)),
                    ..Default::default()
                }
                .insert(&self.db)
                .await
                .unwrap();
            }
        }
        set
    }
}
