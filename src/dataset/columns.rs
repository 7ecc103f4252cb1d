use std::collections::BTreeMap;

/// Numeric projection of a stored per-region/per-crop row.
pub trait NumericColumns {
    fn region_id(&self) -> i32;
    fn crop_id(&self) -> i32;
    fn year(&self) -> Option<i32>;
    fn numeric_columns(&self) -> Vec<(&'static str, Option<f64>)>;
}

/// Write side for result rows coming back from the engine.
pub trait WritableColumns {
    /// Returns false when the row type has no such column.
    fn set_column(&mut self, name: &str, value: Option<f64>) -> bool;

    /// Copies every known column. NaN and infinities become null.
    fn set_columns(&mut self, values: &BTreeMap<String, Option<f64>>) -> Vec<String> {
        let mut unknown = Vec::new();
        for (name, value) in values {
            if !self.set_column(name, finite_or_null(*value)) {
                unknown.push(name.clone());
            }
        }
        unknown
    }
}

/// Engine output marks missing values as NaN; they are stored as null.
pub fn finite_or_null(value: Option<f64>) -> Option<f64> {
    match value {
        Some(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

macro_rules! decimal_columns {
    ($module:ident, [$($field:ident),* $(,)?]) => {
        impl $crate::dataset::NumericColumns for $crate::storage::entity::$module::Model {
            fn region_id(&self) -> i32 {
                self.region_id
            }
            fn crop_id(&self) -> i32 {
                self.crop_id
            }
            fn year(&self) -> Option<i32> {
                self.year
            }
            fn numeric_columns(&self) -> Vec<(&'static str, Option<f64>)> {
                use rust_decimal::prelude::ToPrimitive;
                vec![$((stringify!($field), self.$field.and_then(|d| d.to_f64()))),*]
            }
        }
    };
}

macro_rules! float_columns {
    ($module:ident, [$($field:ident),* $(,)?]) => {
        impl $crate::dataset::NumericColumns for $crate::storage::entity::$module::Model {
            fn region_id(&self) -> i32 {
                self.region_id
            }
            fn crop_id(&self) -> i32 {
                self.crop_id
            }
            fn year(&self) -> Option<i32> {
                self.year
            }
            fn numeric_columns(&self) -> Vec<(&'static str, Option<f64>)> {
                vec![$((stringify!($field), self.$field)),*]
            }
        }

        impl $crate::dataset::WritableColumns for $crate::storage::entity::$module::ActiveModel {
            fn set_column(&mut self, name: &str, value: Option<f64>) -> bool {
                $(
                    if name == stringify!($field) {
                        self.$field = sea_orm::ActiveValue::Set(value);
                        return true;
                    }
                )*
                false
            }
        }
    };
}

decimal_columns!(
    calibrated_parameter,
    [
        price, crop_yield, xland, xwater, xwaterha, omegaland, omegasupply, omegalabor,
        omegatotal, sigma, theta, delta, leontief,
    ]
);

decimal_columns!(
    input_data_item,
    [price, crop_yield, xland, xwater, xwaterha, omegatotal]
);

decimal_columns!(
    rainfall_parameter,
    [
        price, crop_yield, xland, omegatotal, coef_intercept, twin, tspr, tsum, pewin, pespr,
        pesum,
    ]
);

float_columns!(
    result,
    [
        xland, xwater, xwaterha, xlandsc, xwatersc, xdiffland, xdifftotalland, xdiffwater, price,
        crop_yield, omegatotal, gross_revenue, net_revenue, net_revenue_red_costs,
        net_revenue_pmp_yield,
    ]
);

float_columns!(
    rainfall_result,
    [xland, crop_yield, price, omegatotal, gross_revenue, net_revenue]
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::entity::{calibrated_parameter, result};
    use rust_decimal::Decimal;
    use sea_orm::ActiveValue;

    #[test]
    fn nan_and_infinite_values_become_null() {
        assert_eq!(finite_or_null(Some(f64::NAN)), None);
        assert_eq!(finite_or_null(Some(f64::INFINITY)), None);
        assert_eq!(finite_or_null(None), None);
        assert_eq!(finite_or_null(Some(-2.5)), Some(-2.5));
    }

    #[test]
    fn result_columns_are_written_by_name() {
        let mut row = result::ActiveModel::default();
        let mut values = BTreeMap::new();
        values.insert("xland".to_string(), Some(10.0));
        values.insert("net_revenue".to_string(), Some(f64::NAN));
        values.insert("not_a_column".to_string(), Some(1.0));

        let unknown = row.set_columns(&values);
        assert_eq!(unknown, vec!["not_a_column".to_string()]);
        assert_eq!(row.xland, ActiveValue::Set(Some(10.0)));
        assert_eq!(row.net_revenue, ActiveValue::Set(None));
    }

    #[test]
    fn decimal_columns_project_to_floats() {
        let row = calibrated_parameter::Model {
            id: 1,
            calibration_set_id: 1,
            region_id: 4,
            crop_id: 7,
            year: Some(2020),
            price: Some(Decimal::new(12525, 2)),
            crop_yield: None,
            xland: Some(Decimal::new(100, 0)),
            xwater: None,
            xwaterha: None,
            omegaland: None,
            omegasupply: None,
            omegalabor: None,
            omegatotal: None,
            sigma: None,
            theta: None,
            delta: None,
            leontief: None,
        };
        let columns: BTreeMap<_, _> = row.numeric_columns().into_iter().collect();
        assert_eq!(columns["price"], Some(125.25));
        assert_eq!(columns["xland"], Some(100.0));
        assert_eq!(columns["crop_yield"], None);
        assert_eq!(row.region_id(), 4);
        assert_eq!(row.crop_id(), 7);
    }
}
