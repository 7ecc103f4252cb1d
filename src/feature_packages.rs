use crate::storage::entity::model_area;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

/// Area preference flags granted by a named plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeaturePackage {
    pub name: &'static str,
    pub region_linked_crops: bool,
    pub allow_static_regions: bool,
    pub allow_removed_regions: bool,
}

pub const DEFAULT: FeaturePackage = FeaturePackage {
    name: "DEFAULT",
    region_linked_crops: false,
    allow_static_regions: false,
    allow_removed_regions: false,
};

pub const FULL_PUBLIC: FeaturePackage = FeaturePackage {
    name: "FULL_PUBLIC",
    allow_static_regions: true,
    allow_removed_regions: true,
    ..DEFAULT
};

pub const DEBUG: FeaturePackage = FeaturePackage {
    name: "DEBUG",
    ..FULL_PUBLIC
};

pub const WSDA: FeaturePackage = FeaturePackage {
    name: "WSDA",
    ..FULL_PUBLIC
};

pub const DAP_DSC: FeaturePackage = FeaturePackage {
    name: "DAP_DSC",
    allow_removed_regions: false,
    ..DEFAULT
};

pub const PACKAGES: [FeaturePackage; 5] = [DEFAULT, FULL_PUBLIC, DEBUG, WSDA, DAP_DSC];

pub fn lookup(name: &str) -> Option<FeaturePackage> {
    PACKAGES
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
        .copied()
}

/// Rewrites the area's flags from its package, switching packages first
/// when `package` is given. Returns None for an unknown area.
pub async fn apply<C: ConnectionTrait>(
    db: &C,
    model_area_id: i32,
    package: Option<FeaturePackage>,
) -> Result<Option<FeaturePackage>, DbErr> {
    let Some(area) = model_area::Entity::find_by_id(model_area_id).one(db).await? else {
        return Ok(None);
    };
    let package = match package {
        Some(p) => p,
        None => lookup(&area.feature_package_name).ok_or_else(|| {
            DbErr::Custom(format!(
                "model area {} names unknown feature package '{}'",
                area.id, area.feature_package_name
            ))
        })?,
    };

    model_area::Entity::update_many()
        .col_expr(model_area::Column::FeaturePackageName, Expr::value(package.name))
        .col_expr(
            model_area::Column::RegionLinkedCrops,
            Expr::value(package.region_linked_crops),
        )
        .col_expr(
            model_area::Column::AllowStaticRegions,
            Expr::value(package.allow_static_regions),
        )
        .col_expr(
            model_area::Column::AllowRemovedRegions,
            Expr::value(package.allow_removed_regions),
        )
        .filter(model_area::Column::Id.eq(area.id))
        .exec(db)
        .await?;
    Ok(Some(package))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repository::AreaRepository;
    use crate::test_support::Fixture;

    #[test]
    fn packages_build_on_each_other() {
        assert!(FULL_PUBLIC.allow_static_regions && FULL_PUBLIC.allow_removed_regions);
        assert!(!FULL_PUBLIC.region_linked_crops);
        assert_eq!(
            (DEBUG.allow_static_regions, DEBUG.allow_removed_regions),
            (true, true)
        );
        assert_eq!(DAP_DSC.allow_removed_regions, false);
        assert_eq!(lookup("wsda"), Some(WSDA));
        assert_eq!(lookup("GOLD"), None);
    }

    #[tokio::test]
    async fn applying_a_package_rewrites_area_flags() {
        let fx = Fixture::seed().await;
        let applied = apply(&fx.db, fx.area.id, Some(DEFAULT)).await.unwrap();
        assert_eq!(applied, Some(DEFAULT));

        let area = AreaRepository::find(&fx.db, fx.area.id).await.unwrap().unwrap();
        assert_eq!(area.feature_package_name, "DEFAULT");
        assert!(!area.region_linked_crops);
        assert!(!area.allow_static_regions);
        assert!(!area.allow_removed_regions);
        // classifier-owned flags are untouched
        assert!(area.supports_irrigation);

        // re-applying the stored package
        assert_eq!(apply(&fx.db, fx.area.id, None).await.unwrap(), Some(DEFAULT));
        assert_eq!(apply(&fx.db, 999, None).await.unwrap(), None);
    }
}
