use crate::config::ClassifierConfig;
use crate::error::ModelRunError;
use crate::storage::repository::AreaRepository;
use log::info;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::ConnectionTrait;
use std::collections::{BTreeMap, HashMap};

/// Which regime a crop's land falls under inside one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Irrigated,
    Rainfall,
    Both,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionClassification {
    pub region_id: i32,
    pub external_id: String,
    pub irrigated_land: f64,
    pub rainfall_land: f64,
    pub supports_irrigation: bool,
    pub supports_rainfall: bool,
    /// Per crop code; crops without land in either regime are left out.
    pub crops: BTreeMap<String, Regime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AreaClassification {
    pub model_area_id: i32,
    pub supports_irrigation: bool,
    pub supports_rainfall: bool,
    pub regions: Vec<RegionClassification>,
}

/// Decides (irrigation, rainfall) support from the two land totals.
/// No land at all keeps the irrigated baseline.
pub fn classify_land(irrigated: f64, rainfall: f64, min_share: f64) -> (bool, bool) {
    let irrigated = irrigated.max(0.0);
    let rainfall = rainfall.max(0.0);
    let total = irrigated + rainfall;
    if total <= 0.0 {
        return (true, false);
    }
    (
        irrigated > 0.0 && irrigated / total >= min_share,
        rainfall > 0.0 && rainfall / total >= min_share,
    )
}

fn regime(irrigated: f64, rainfall: f64, min_share: f64) -> Option<Regime> {
    if irrigated <= 0.0 && rainfall <= 0.0 {
        return None;
    }
    match classify_land(irrigated, rainfall, min_share) {
        (true, true) => Some(Regime::Both),
        (false, true) => Some(Regime::Rainfall),
        _ => Some(Regime::Irrigated),
    }
}

pub struct RainfallClassifier {
    config: ClassifierConfig,
}

impl RainfallClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classifies every region of the area from its latest calibration and
    /// rainfall sets and stores the resulting flags.
    pub async fn classify<C: ConnectionTrait>(
        &self,
        db: &C,
        model_area_id: i32,
    ) -> Result<AreaClassification, ModelRunError> {
        let area = AreaRepository::find(db, model_area_id)
            .await?
            .ok_or(ModelRunError::UnresolvedReference {
                entity: "model area",
                id: model_area_id,
            })?;
        let catalog = AreaRepository::catalog(db, area).await?;

        // (region, crop) -> land
        let mut irrigated: HashMap<(i32, i32), f64> = HashMap::new();
        let mut rainfall: HashMap<(i32, i32), f64> = HashMap::new();
        if let Some(set) = AreaRepository::latest_calibration_set(db, model_area_id).await? {
            for p in AreaRepository::calibrated_parameters(db, set.id).await? {
                *irrigated.entry((p.region_id, p.crop_id)).or_default() += land(p.xland);
            }
        }
        if let Some(set) = AreaRepository::latest_rainfall_set(db, model_area_id).await? {
            for p in AreaRepository::rainfall_parameters(db, set.id).await? {
                *rainfall.entry((p.region_id, p.crop_id)).or_default() += land(p.xland);
            }
        }

        let min_share = self.config.min_share;
        let mut regions = Vec::with_capacity(catalog.regions.len());
        for region in &catalog.regions {
            let mut crops = BTreeMap::new();
            let mut irrigated_total = 0.0;
            let mut rainfall_total = 0.0;
            for crop in &catalog.crops {
                let key = (region.id, crop.id);
                let i = irrigated.get(&key).copied().unwrap_or(0.0);
                let r = rainfall.get(&key).copied().unwrap_or(0.0);
                irrigated_total += i;
                rainfall_total += r;
                if let Some(regime) = regime(i, r, min_share) {
                    crops.insert(crop.crop_code.clone(), regime);
                }
            }
            let (supports_irrigation, supports_rainfall) =
                classify_land(irrigated_total, rainfall_total, min_share);
            AreaRepository::set_region_support(db, region.id, supports_irrigation, supports_rainfall)
                .await?;
            info!(
                "Region {}: irrigated {:.1}, rainfall {:.1} -> irrigation={}, rainfall={}",
                region.external_id,
                irrigated_total,
                rainfall_total,
                supports_irrigation,
                supports_rainfall
            );
            regions.push(RegionClassification {
                region_id: region.id,
                external_id: region.external_id.clone(),
                irrigated_land: irrigated_total,
                rainfall_land: rainfall_total,
                supports_irrigation,
                supports_rainfall,
                crops,
            });
        }

        let supports_irrigation = regions.iter().any(|r| r.supports_irrigation);
        let supports_rainfall = regions.iter().any(|r| r.supports_rainfall);
        AreaRepository::set_area_support(db, model_area_id, supports_irrigation, supports_rainfall)
            .await?;
        info!(
            "Model area {}: irrigation={}, rainfall={} across {} regions",
            model_area_id,
            supports_irrigation,
            supports_rainfall,
            regions.len()
        );

        Ok(AreaClassification {
            model_area_id,
            supports_irrigation,
            supports_rainfall,
            regions,
        })
    }
}

fn land(xland: Option<Decimal>) -> f64 {
    xland.and_then(|d| d.to_f64()).unwrap_or(0.0).max(0.0)
}
