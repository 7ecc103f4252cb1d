use super::model::{
    AdjustmentMap, Adjustments, AreaConstraint, CropTarget, LinkedOverride, RegionSettings,
    RegionTarget, Resolution,
};
use crate::error::ModelRunError;
use crate::storage::entity::{crop_modification, region_modification, ModeledType};
use crate::storage::repository::AreaCatalog;
use log::warn;
use std::collections::{BTreeSet, HashMap};

/// Turns a run's sparse modification rows into per-region and per-crop
/// multipliers. Precedence is default, then region group, then the
/// individual region (or crop).
pub struct ModificationResolver<'a> {
    catalog: &'a AreaCatalog,
}

impl<'a> ModificationResolver<'a> {
    pub fn new(catalog: &'a AreaCatalog) -> Self {
        Self { catalog }
    }

    pub fn resolve(
        &self,
        run_id: i32,
        region_mods: &[region_modification::Model],
        crop_mods: &[crop_modification::Model],
    ) -> Result<Resolution, ModelRunError> {
        let area = &self.catalog.area;
        let tiers = self.region_tiers(run_id, region_mods)?;

        let mut static_regions = BTreeSet::new();
        let mut removed_regions = BTreeSet::new();
        let mut land = AdjustmentMap::new(tiers.default.land);
        let mut water = area
            .supports_irrigation
            .then(|| AdjustmentMap::new(tiers.default.water));
        let mut rainfall = area
            .supports_rainfall
            .then(|| AdjustmentMap::new(tiers.default.rainfall));

        for region in &self.catalog.regions {
            let group = region
                .region_group_id
                .and_then(|g| tiers.by_group.get(&g));
            let own = tiers.by_region.get(&region.id);
            let settings = own.or(group).copied().unwrap_or(tiers.default);

            match self.effective_type(run_id, region.id, settings.modeled_type) {
                ModeledType::Removed => {
                    removed_regions.insert(region.id);
                    continue;
                }
                ModeledType::HoldStatic => {
                    static_regions.insert(region.id);
                    continue;
                }
                ModeledType::Modeled => {}
            }

            land.values
                .insert(region.external_id.clone(), settings.land);
            if let Some(water) = water.as_mut().filter(|_| region.supports_irrigation) {
                water
                    .values
                    .insert(region.external_id.clone(), settings.water);
            }
            if let Some(rainfall) = rainfall.as_mut().filter(|_| region.supports_rainfall) {
                rainfall
                    .values
                    .insert(region.external_id.clone(), settings.rainfall);
            }
        }

        let excluded: BTreeSet<i32> = static_regions.union(&removed_regions).copied().collect();
        let crops = self.crop_adjustments(run_id, crop_mods, &excluded)?;

        Ok(Resolution {
            adjustments: Adjustments {
                land,
                water,
                rainfall,
                price: crops.price,
                crop_yield: crops.crop_yield,
                linked_price: crops.linked_price,
                linked_yield: crops.linked_yield,
                area_constraints: crops.area_constraints,
            },
            static_regions,
            removed_regions,
        })
    }

    fn region_tiers(
        &self,
        run_id: i32,
        region_mods: &[region_modification::Model],
    ) -> Result<RegionTiers, ModelRunError> {
        let group_ids: BTreeSet<i32> = self.catalog.groups.iter().map(|g| g.id).collect();
        let region_ids: BTreeSet<i32> = self.catalog.regions.iter().map(|r| r.id).collect();

        let mut defaults = Vec::new();
        let mut by_group = HashMap::new();
        let mut by_region = HashMap::new();
        for m in region_mods {
            match RegionTarget::of(run_id, m)? {
                RegionTarget::Default => defaults.push(RegionSettings::from(m)),
                RegionTarget::Group(group) => {
                    if !group_ids.contains(&group) {
                        return Err(ModelRunError::UnresolvedReference {
                            entity: "region group",
                            id: group,
                        });
                    }
                    if by_group.insert(group, RegionSettings::from(m)).is_some() {
                        return Err(duplicate(run_id, m.id, "region group", group));
                    }
                }
                RegionTarget::Region(region) => {
                    if !region_ids.contains(&region) {
                        return Err(ModelRunError::UnresolvedReference {
                            entity: "region",
                            id: region,
                        });
                    }
                    if by_region.insert(region, RegionSettings::from(m)).is_some() {
                        return Err(duplicate(run_id, m.id, "region", region));
                    }
                }
            }
        }

        Ok(RegionTiers {
            default: single_default(run_id, "region", defaults)?,
            by_group,
            by_region,
        })
    }

    fn effective_type(&self, run_id: i32, region_id: i32, requested: ModeledType) -> ModeledType {
        let area = &self.catalog.area;
        match requested {
            ModeledType::HoldStatic if !area.allow_static_regions => {
                warn!(
                    "Run {}: region {} asks to be held static but model area {} does not allow it; modelling it",
                    run_id, region_id, area.id
                );
                ModeledType::Modeled
            }
            ModeledType::Removed if !area.allow_removed_regions => {
                warn!(
                    "Run {}: region {} asks to be removed but model area {} does not allow it; modelling it",
                    run_id, region_id, area.id
                );
                ModeledType::Modeled
            }
            other => other,
        }
    }

    fn crop_adjustments(
        &self,
        run_id: i32,
        crop_mods: &[crop_modification::Model],
        excluded: &BTreeSet<i32>,
    ) -> Result<CropAdjustments, ModelRunError> {
        let area = &self.catalog.area;
        let crop_codes: HashMap<i32, &str> = self
            .catalog
            .crops
            .iter()
            .map(|c| (c.id, c.crop_code.as_str()))
            .collect();
        let region_codes: HashMap<i32, &str> = self
            .catalog
            .regions
            .iter()
            .map(|r| (r.id, r.external_id.as_str()))
            .collect();
        let crop_code = |id: i32| {
            crop_codes
                .get(&id)
                .copied()
                .ok_or(ModelRunError::UnresolvedReference { entity: "crop", id })
        };

        let mut defaults = Vec::new();
        let mut by_crop: HashMap<i32, &crop_modification::Model> = HashMap::new();
        let mut linked: HashMap<(i32, i32), &crop_modification::Model> = HashMap::new();
        let mut constraints = Vec::new();
        for m in crop_mods {
            match CropTarget::of(run_id, m)? {
                CropTarget::Default => {
                    defaults.push(m);
                    constraints.push(constraint(None, None, m));
                }
                CropTarget::Crop(crop) => {
                    let code = crop_code(crop)?;
                    if by_crop.insert(crop, m).is_some() {
                        return Err(duplicate(run_id, m.id, "crop", crop));
                    }
                    constraints.push(constraint(Some(code), None, m));
                }
                CropTarget::CropInRegion { crop, region } => {
                    let code = crop_code(crop)?;
                    let region_code = region_codes.get(&region).copied().ok_or(
                        ModelRunError::UnresolvedReference {
                            entity: "region",
                            id: region,
                        },
                    )?;
                    if !area.region_linked_crops {
                        warn!(
                            "Run {}: ignoring region-linked crop modification {}; model area {} does not support them",
                            run_id, m.id, area.id
                        );
                        continue;
                    }
                    if linked.insert((crop, region), m).is_some() {
                        return Err(duplicate(run_id, m.id, "crop in region", crop));
                    }
                    if !excluded.contains(&region) {
                        constraints.push(constraint(Some(code), Some(region_code), m));
                    }
                }
            }
        }

        let default = single_default(run_id, "crop", defaults)?;
        let mut price = AdjustmentMap::new(default.price_proportion);
        let mut crop_yield = AdjustmentMap::new(default.yield_proportion);
        for crop in &self.catalog.crops {
            let m = by_crop.get(&crop.id).copied().unwrap_or(default);
            price
                .values
                .insert(crop.crop_code.clone(), m.price_proportion);
            crop_yield
                .values
                .insert(crop.crop_code.clone(), m.yield_proportion);
        }

        let mut linked: Vec<_> = linked
            .into_iter()
            .filter(|((_, region), _)| !excluded.contains(region))
            .filter_map(|((crop, region), m)| {
                Some((
                    region_codes.get(&region)?.to_string(),
                    crop_codes.get(&crop)?.to_string(),
                    m,
                ))
            })
            .collect();
        linked.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

        Ok(CropAdjustments {
            price,
            crop_yield,
            linked_price: linked
                .iter()
                .map(|(region, crop, m)| LinkedOverride {
                    region: region.clone(),
                    crop: crop.clone(),
                    value: m.price_proportion,
                })
                .collect(),
            linked_yield: linked
                .iter()
                .map(|(region, crop, m)| LinkedOverride {
                    region: region.clone(),
                    crop: crop.clone(),
                    value: m.yield_proportion,
                })
                .collect(),
            area_constraints: constraints,
        })
    }
}

struct RegionTiers {
    default: RegionSettings,
    by_group: HashMap<i32, RegionSettings>,
    by_region: HashMap<i32, RegionSettings>,
}

struct CropAdjustments {
    price: AdjustmentMap,
    crop_yield: AdjustmentMap,
    linked_price: Vec<LinkedOverride>,
    linked_yield: Vec<LinkedOverride>,
    area_constraints: Vec<AreaConstraint>,
}

fn constraint(
    crop: Option<&str>,
    region: Option<&str>,
    m: &crop_modification::Model,
) -> AreaConstraint {
    AreaConstraint::new(
        crop.map(str::to_string),
        region.map(str::to_string),
        m.min_land_area_proportion,
        m.max_land_area_proportion,
    )
}

fn single_default<T>(run_id: i32, what: &'static str, mut defaults: Vec<T>) -> Result<T, ModelRunError> {
    match defaults.len() {
        0 => Err(ModelRunError::MissingDefault { run_id, what }),
        1 => Ok(defaults.remove(0)),
        count => Err(ModelRunError::DuplicateDefault {
            run_id,
            what,
            count,
        }),
    }
}

fn duplicate(run_id: i32, id: i32, what: &str, target: i32) -> ModelRunError {
    ModelRunError::InvalidModification {
        run_id,
        id,
        reason: format!("second modification for {} {}", what, target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::entity::{crop, model_area, region, region_group};

    fn catalog() -> AreaCatalog {
        let area = model_area::Model {
            id: 1,
            organization_id: 1,
            name: "Test".into(),
            supports_irrigation: true,
            supports_rainfall: true,
            region_linked_crops: true,
            allow_static_regions: true,
            allow_removed_regions: true,
            feature_package_name: "FULL_PUBLIC".into(),
        };
        let region = |id: i32, group: Option<i32>, rain: bool| region::Model {
            id,
            model_area_id: 1,
            name: format!("Region {}", id),
            external_id: format!("R0{}", id),
            region_group_id: group,
            supports_irrigation: id != 3,
            supports_rainfall: rain,
        };
        let crop = |id: i32, code: &str| crop::Model {
            id,
            model_area_id: 1,
            crop_group_id: None,
            name: code.to_lowercase(),
            crop_code: code.into(),
        };
        AreaCatalog {
            area,
            regions: vec![
                region(1, Some(10), false),
                region(2, Some(10), false),
                region(3, Some(20), false),
                region(4, None, true),
            ],
            groups: vec![
                region_group::Model {
                    id: 10,
                    model_area_id: 1,
                    name: "North".into(),
                    internal_id: "1".into(),
                },
                region_group::Model {
                    id: 20,
                    model_area_id: 1,
                    name: "South".into(),
                    internal_id: "2".into(),
                },
            ],
            crops: vec![crop(1, "ALFAL"), crop(2, "CORN"), crop(3, "GRAPE")],
        }
    }

    fn region_mod(id: i32, region: Option<i32>, group: Option<i32>, land: f64) -> region_modification::Model {
        region_modification::Model {
            id,
            model_run_id: 7,
            region_id: region,
            region_group_id: group,
            land_proportion: land,
            water_proportion: land,
            rainfall_proportion: land,
            modeled_type: ModeledType::Modeled,
        }
    }

    fn with_type(mut m: region_modification::Model, t: ModeledType) -> region_modification::Model {
        m.modeled_type = t;
        m
    }

    fn crop_mod(id: i32, crop: Option<i32>, region: Option<i32>, price: f64) -> crop_modification::Model {
        crop_modification::Model {
            id,
            model_run_id: 7,
            crop_id: crop,
            region_id: region,
            price_proportion: price,
            yield_proportion: 1.0,
            min_land_area_proportion: None,
            max_land_area_proportion: None,
        }
    }

    fn default_crops() -> Vec<crop_modification::Model> {
        vec![crop_mod(100, None, None, 1.0)]
    }

    #[test]
    fn individual_beats_group_beats_default() {
        let cat = catalog();
        let mods = vec![
            region_mod(1, None, None, 1.0),
            region_mod(2, None, Some(10), 0.5),
            region_mod(3, Some(1), None, 1.1),
        ];
        let res = ModificationResolver::new(&cat)
            .resolve(7, &mods, &default_crops())
            .unwrap();
        let land = &res.adjustments.land;
        assert_eq!(land.get("R01"), 1.1);
        assert_eq!(land.get("R02"), 0.5);
        assert_eq!(land.get("R03"), 1.0);
        assert_eq!(land.get("R04"), 1.0);
        assert_eq!(land.default, 1.0);
    }

    #[test]
    fn resolving_twice_gives_the_same_answer() {
        let cat = catalog();
        let mods = vec![
            region_mod(1, None, None, 0.8),
            region_mod(2, None, Some(20), 0.6),
        ];
        let crops = vec![crop_mod(100, None, None, 1.0), crop_mod(101, Some(2), None, 1.3)];
        let resolver = ModificationResolver::new(&cat);
        let a = resolver.resolve(7, &mods, &crops).unwrap();
        let b = resolver.resolve(7, &mods, &crops).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn group_row_matches_per_region_rows() {
        let cat = catalog();
        let by_group = vec![region_mod(1, None, None, 1.0), region_mod(2, None, Some(10), 0.7)];
        let by_region = vec![
            region_mod(1, None, None, 1.0),
            region_mod(2, Some(1), None, 0.7),
            region_mod(3, Some(2), None, 0.7),
        ];
        let resolver = ModificationResolver::new(&cat);
        let a = resolver.resolve(7, &by_group, &default_crops()).unwrap();
        let b = resolver.resolve(7, &by_region, &default_crops()).unwrap();
        assert_eq!(a.adjustments, b.adjustments);
    }

    #[test]
    fn individual_row_equal_to_group_changes_nothing() {
        let cat = catalog();
        let group_only = vec![region_mod(1, None, None, 1.0), region_mod(2, None, Some(10), 0.7)];
        let mut restated = group_only.clone();
        restated.push(region_mod(3, Some(2), None, 0.7));
        let resolver = ModificationResolver::new(&cat);
        assert_eq!(
            resolver.resolve(7, &group_only, &default_crops()).unwrap(),
            resolver.resolve(7, &restated, &default_crops()).unwrap()
        );
    }

    #[test]
    fn water_and_rainfall_only_for_supporting_regions() {
        let cat = catalog();
        let res = ModificationResolver::new(&cat)
            .resolve(7, &[region_mod(1, None, None, 0.9)], &default_crops())
            .unwrap();
        let water = res.adjustments.water.unwrap();
        assert!(water.values.contains_key("R01"));
        assert!(!water.values.contains_key("R03"));
        let rainfall = res.adjustments.rainfall.unwrap();
        assert_eq!(rainfall.values.keys().collect::<Vec<_>>(), vec!["R04"]);
    }

    #[test]
    fn area_without_irrigation_has_no_water_map() {
        let mut cat = catalog();
        cat.area.supports_irrigation = false;
        cat.area.supports_rainfall = false;
        let res = ModificationResolver::new(&cat)
            .resolve(7, &[region_mod(1, None, None, 0.9)], &default_crops())
            .unwrap();
        assert!(res.adjustments.water.is_none());
        assert!(res.adjustments.rainfall.is_none());
    }

    #[test]
    fn static_and_removed_regions_are_split_out() {
        let cat = catalog();
        let mods = vec![
            region_mod(1, None, None, 1.0),
            with_type(region_mod(2, None, Some(10), 1.0), ModeledType::HoldStatic),
            with_type(region_mod(3, Some(2), None, 1.0), ModeledType::Removed),
            region_mod(4, Some(4), None, 1.2),
        ];
        let res = ModificationResolver::new(&cat)
            .resolve(7, &mods, &default_crops())
            .unwrap();
        assert_eq!(res.static_regions, BTreeSet::from([1]));
        assert_eq!(res.removed_regions, BTreeSet::from([2]));
        assert!(!res.adjustments.land.values.contains_key("R01"));
        assert!(!res.adjustments.land.values.contains_key("R02"));
        assert_eq!(res.adjustments.land.get("R04"), 1.2);
        assert_eq!(res.excluded_regions().len(), 2);
    }

    #[test]
    fn every_region_removed_leaves_nothing_to_model() {
        let cat = catalog();
        let mods = vec![with_type(region_mod(1, None, None, 1.0), ModeledType::Removed)];
        let res = ModificationResolver::new(&cat)
            .resolve(7, &mods, &default_crops())
            .unwrap();
        assert!(res.adjustments.land.values.is_empty());
        assert_eq!(res.removed_regions.len(), 4);
    }

    #[test]
    fn disallowed_static_request_is_modelled() {
        let mut cat = catalog();
        cat.area.allow_static_regions = false;
        let mods = vec![
            region_mod(1, None, None, 1.0),
            with_type(region_mod(2, Some(3), None, 0.4), ModeledType::HoldStatic),
        ];
        let res = ModificationResolver::new(&cat)
            .resolve(7, &mods, &default_crops())
            .unwrap();
        assert!(res.static_regions.is_empty());
        assert_eq!(res.adjustments.land.get("R03"), 0.4);
    }

    #[test]
    fn missing_or_duplicate_defaults_fail() {
        let cat = catalog();
        let resolver = ModificationResolver::new(&cat);

        let err = resolver
            .resolve(7, &[region_mod(1, Some(1), None, 1.0)], &default_crops())
            .unwrap_err();
        assert!(matches!(err, ModelRunError::MissingDefault { what: "region", .. }));

        let err = resolver
            .resolve(
                7,
                &[region_mod(1, None, None, 1.0), region_mod(2, None, None, 0.5)],
                &default_crops(),
            )
            .unwrap_err();
        assert!(matches!(err, ModelRunError::DuplicateDefault { count: 2, .. }));

        let err = resolver
            .resolve(7, &[region_mod(1, None, None, 1.0)], &[])
            .unwrap_err();
        assert!(matches!(err, ModelRunError::MissingDefault { what: "crop", .. }));
    }

    #[test]
    fn duplicate_individual_rows_fail() {
        let cat = catalog();
        let mods = vec![
            region_mod(1, None, None, 1.0),
            region_mod(2, Some(1), None, 1.1),
            region_mod(3, Some(1), None, 1.2),
        ];
        let err = ModificationResolver::new(&cat)
            .resolve(7, &mods, &default_crops())
            .unwrap_err();
        assert!(matches!(err, ModelRunError::InvalidModification { id: 3, .. }));
    }

    #[test]
    fn unknown_references_fail() {
        let cat = catalog();
        let resolver = ModificationResolver::new(&cat);
        let err = resolver
            .resolve(
                7,
                &[region_mod(1, None, None, 1.0), region_mod(2, None, Some(99), 1.0)],
                &default_crops(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ModelRunError::UnresolvedReference { entity: "region group", id: 99 }
        ));

        let crops = vec![crop_mod(100, None, None, 1.0), crop_mod(101, Some(42), None, 1.0)];
        let err = resolver
            .resolve(7, &[region_mod(1, None, None, 1.0)], &crops)
            .unwrap_err();
        assert!(matches!(err, ModelRunError::UnresolvedReference { entity: "crop", id: 42 }));
    }

    #[test]
    fn crop_overrides_and_linked_rows() {
        let cat = catalog();
        let regions = vec![
            region_mod(1, None, None, 1.0),
            with_type(region_mod(2, Some(2), None, 1.0), ModeledType::Removed),
        ];
        let mut corn = crop_mod(101, Some(2), None, 1.25);
        corn.min_land_area_proportion = Some(0.3);
        corn.max_land_area_proportion = Some(0.2);
        let crops = vec![
            crop_mod(100, None, None, 0.9),
            corn,
            crop_mod(102, Some(3), Some(1), 1.5),
            crop_mod(103, Some(3), Some(2), 2.0),
        ];
        let res = ModificationResolver::new(&cat)
            .resolve(7, &regions, &crops)
            .unwrap();
        let adj = res.adjustments;
        assert_eq!(adj.price.get("ALFAL"), 0.9);
        assert_eq!(adj.price.get("CORN"), 1.25);
        assert_eq!(
            adj.linked_price,
            vec![LinkedOverride {
                region: "R01".into(),
                crop: "GRAPE".into(),
                value: 1.5
            }]
        );
        assert_eq!(adj.linked_yield.len(), 1);

        let corn_bound = adj
            .area_constraints
            .iter()
            .find(|c| c.crop.as_deref() == Some("CORN"))
            .unwrap();
        assert_eq!(corn_bound.min, Some(0.3));
        assert_eq!(corn_bound.max, None);
        assert!(adj
            .area_constraints
            .iter()
            .all(|c| c.region.as_deref() != Some("R02")));
    }

    #[test]
    fn linked_rows_ignored_without_area_support() {
        let mut cat = catalog();
        cat.area.region_linked_crops = false;
        let crops = vec![crop_mod(100, None, None, 1.0), crop_mod(102, Some(3), Some(1), 1.5)];
        let res = ModificationResolver::new(&cat)
            .resolve(7, &[region_mod(1, None, None, 1.0)], &crops)
            .unwrap();
        assert!(res.adjustments.linked_price.is_empty());
        assert_eq!(res.adjustments.area_constraints.len(), 1);
    }

    #[test]
    fn region_without_crop_is_invalid() {
        let cat = catalog();
        let crops = vec![crop_mod(100, None, None, 1.0), crop_mod(104, None, Some(1), 1.5)];
        let err = ModificationResolver::new(&cat)
            .resolve(7, &[region_mod(1, None, None, 1.0)], &crops)
            .unwrap_err();
        assert!(matches!(err, ModelRunError::InvalidModification { id: 104, .. }));
    }
}
