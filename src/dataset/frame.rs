use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One region/crop/year tuple. `region` is the region's external id and
/// `crop` the crop code; every other column lives in `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    #[serde(default)]
    pub year: Option<i32>,
    pub region: String,
    pub crop: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

impl DataRow {
    pub fn new(year: Option<i32>, region: impl Into<String>, crop: impl Into<String>) -> Self {
        Self {
            year,
            region: region.into(),
            crop: crop.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, column: &str, value: f64) -> Self {
        self.values.insert(column.to_string(), Some(value));
        self
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }
}

/// Tabular dataset exchanged with the scenario engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataFrame {
    pub rows: Vec<DataRow>,
}

impl DataFrame {
    pub fn new(rows: Vec<DataRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataRow> {
        self.rows.iter()
    }

    /// Orders rows by (year, region, crop) so two frames line up row by row.
    pub fn sort_canonical(&mut self) {
        self.rows.sort_by(|a, b| {
            (a.year, &a.region, &a.crop).cmp(&(b.year, &b.region, &b.crop))
        });
    }

    pub fn regions(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|r| r.region.as_str()).collect()
    }

    pub fn find(&self, region: &str, crop: &str, year: Option<i32>) -> Option<&DataRow> {
        self.rows
            .iter()
            .find(|r| r.region == region && r.crop == crop && r.year == year)
    }
}

#[cfg(test)]
impl DataFrame {
    /// Compares two frames after canonical sorting, rounding every value to
    /// `digits` decimals. Columns in `ignore` are skipped.
    pub fn approx_eq(&self, other: &DataFrame, digits: i32, ignore: &[&str]) -> Result<(), String> {
        let mut left = self.clone();
        let mut right = other.clone();
        left.sort_canonical();
        right.sort_canonical();
        if left.len() != right.len() {
            return Err(format!("row count {} != {}", left.len(), right.len()));
        }
        let scale = 10f64.powi(digits);
        let round = |v: Option<f64>| v.map(|x| (x * scale).round() / scale);
        for (l, r) in left.rows.iter().zip(right.rows.iter()) {
            if (l.year, &l.region, &l.crop) != (r.year, &r.region, &r.crop) {
                return Err(format!(
                    "row key mismatch: {:?}/{}/{} vs {:?}/{}/{}",
                    l.year, l.region, l.crop, r.year, r.region, r.crop
                ));
            }
            for (column, value) in &l.values {
                if ignore.contains(&column.as_str()) {
                    continue;
                }
                let other_value = r.values.get(column).copied().flatten();
                if round(*value) != round(other_value) {
                    return Err(format!(
                        "{}/{}/{:?} column {}: {:?} != {:?}",
                        l.region, l.crop, l.year, column, value, other_value
                    ));
                }
            }
        }
        Ok(())
    }
}
