use crate::error::ModelRunError;
use crate::storage::entity::{crop_modification, region_modification, ModeledType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Multipliers keyed by region external id or crop code. Keys that are not
/// listed fall back to `default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentMap {
    pub default: f64,
    pub values: BTreeMap<String, f64>,
}

impl AdjustmentMap {
    pub fn new(default: f64) -> Self {
        Self {
            default,
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(self.default)
    }
}

/// Price or yield multiplier for one crop in one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedOverride {
    pub region: String,
    pub crop: String,
    pub value: f64,
}

/// Land-area bound for a crop, optionally inside a single region. A `None`
/// crop applies to every crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaConstraint {
    pub crop: Option<String>,
    pub region: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AreaConstraint {
    /// A maximum that does not exceed the minimum cannot be satisfied and is dropped.
    pub fn new(crop: Option<String>, region: Option<String>, min: Option<f64>, max: Option<f64>) -> Self {
        let max = match (min, max) {
            (Some(lo), Some(hi)) if hi <= lo => None,
            _ => max,
        };
        Self {
            crop,
            region,
            min,
            max,
        }
    }
}

/// The fully resolved multipliers sent to the scenario engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustments {
    pub land: AdjustmentMap,
    /// Absent when the model area has no irrigation.
    pub water: Option<AdjustmentMap>,
    /// Absent when the model area has no rainfall modelling.
    pub rainfall: Option<AdjustmentMap>,
    pub price: AdjustmentMap,
    #[serde(rename = "yield")]
    pub crop_yield: AdjustmentMap,
    pub linked_price: Vec<LinkedOverride>,
    pub linked_yield: Vec<LinkedOverride>,
    pub area_constraints: Vec<AreaConstraint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub adjustments: Adjustments,
    /// Region ids solved from base-case results instead of the engine.
    pub static_regions: BTreeSet<i32>,
    pub removed_regions: BTreeSet<i32>,
}

impl Resolution {
    /// Regions to leave out of the engine's input frames.
    pub fn excluded_regions(&self) -> HashSet<i32> {
        self.static_regions
            .iter()
            .chain(self.removed_regions.iter())
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionTarget {
    Default,
    Group(i32),
    Region(i32),
}

impl RegionTarget {
    pub fn of(run_id: i32, m: &region_modification::Model) -> Result<Self, ModelRunError> {
        match (m.region_id, m.region_group_id) {
            (None, None) => Ok(RegionTarget::Default),
            (None, Some(group)) => Ok(RegionTarget::Group(group)),
            (Some(region), None) => Ok(RegionTarget::Region(region)),
            (Some(_), Some(_)) => Err(ModelRunError::InvalidModification {
                run_id,
                id: m.id,
                reason: "names both a region and a region group".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CropTarget {
    Default,
    Crop(i32),
    CropInRegion { crop: i32, region: i32 },
}

impl CropTarget {
    pub fn of(run_id: i32, m: &crop_modification::Model) -> Result<Self, ModelRunError> {
        match (m.crop_id, m.region_id) {
            (None, None) => Ok(CropTarget::Default),
            (Some(crop), None) => Ok(CropTarget::Crop(crop)),
            (Some(crop), Some(region)) => Ok(CropTarget::CropInRegion { crop, region }),
            (None, Some(_)) => Err(ModelRunError::InvalidModification {
                run_id,
                id: m.id,
                reason: "names a region without a crop".to_string(),
            }),
        }
    }
}

/// One tier's region settings. Every tier carries all three dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSettings {
    pub land: f64,
    pub water: f64,
    pub rainfall: f64,
    pub modeled_type: ModeledType,
}

impl From<&region_modification::Model> for RegionSettings {
    fn from(m: &region_modification::Model) -> Self {
        Self {
            land: m.land_proportion,
            water: m.water_proportion,
            rainfall: m.rainfall_proportion,
            modeled_type: m.modeled_type,
        }
    }
}
