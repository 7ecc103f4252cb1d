use super::types::{EngineError, EngineInfeasibility, EngineOutput, EngineRequest, ScenarioEngine};
use crate::dataset::{DataFrame, DataRow};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Deterministic in-process engine: scales the calibrated quantities by the
/// resolved multipliers and prices the result.
#[derive(Default)]
pub struct LinearEngine {
    pub infeasibilities: Vec<EngineInfeasibility>,
    /// Returned instead of solving.
    pub failure: Option<fn() -> EngineError>,
    /// Extra result row naming a crop code the area does not have.
    pub unknown_crop: Option<String>,
    /// Column written as NaN on every result row.
    pub nan_column: Option<String>,
    pub panic: bool,
    pub calls: AtomicUsize,
    pub last_request: Mutex<Option<EngineRequest>>,
}

impl LinearEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failure: fn() -> EngineError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<EngineRequest> {
        self.last_request.lock().unwrap().clone()
    }

    fn solve_row(request: &EngineRequest, row: &DataRow, land: f64, with_water: bool) -> DataRow {
        let adj = &request.adjustments;
        let linked = |list: &[crate::modification::LinkedOverride]| {
            list.iter()
                .find(|o| o.region == row.region && o.crop == row.crop)
                .map(|o| o.value)
                .unwrap_or(1.0)
        };
        let xland = row.get("xland").unwrap_or(0.0) * land;
        let price = row.get("price").unwrap_or(0.0)
            * adj.price.get(&row.crop)
            * linked(&adj.linked_price);
        let crop_yield = row.get("crop_yield").unwrap_or(0.0)
            * adj.crop_yield.get(&row.crop)
            * linked(&adj.linked_yield);
        let omegatotal = row.get("omegatotal").unwrap_or(0.0);
        let gross = price * crop_yield * xland;

        let mut out = DataRow::new(row.year, row.region.clone(), row.crop.clone())
            .with("xland", xland)
            .with("price", price)
            .with("crop_yield", crop_yield)
            .with("omegatotal", omegatotal)
            .with("gross_revenue", gross)
            .with("net_revenue", gross - omegatotal * xland);
        if with_water {
            let water = adj
                .water
                .as_ref()
                .map(|w| w.get(&row.region))
                .unwrap_or(1.0);
            out = out.with("xwater", row.get("xwater").unwrap_or(0.0) * land * water);
        }
        out
    }
}

#[async_trait]
impl ScenarioEngine for LinearEngine {
    async fn version(&self) -> Result<String, EngineError> {
        Ok("linear-1".to_string())
    }

    async fn run(&self, request: EngineRequest) -> Result<EngineOutput, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.panic {
            panic!("engine blew up");
        }
        if let Some(failure) = self.failure {
            return Err(failure());
        }

        let adj = &request.adjustments;
        let mut rows: Vec<DataRow> = request
            .calibration
            .iter()
            .map(|row| Self::solve_row(&request, row, adj.land.get(&row.region), true))
            .collect();
        if let Some(column) = &self.nan_column {
            for row in rows.iter_mut() {
                row.values.insert(column.clone(), Some(f64::NAN));
            }
        }
        if let (Some(code), Some(first)) = (&self.unknown_crop, rows.first().cloned()) {
            rows.push(DataRow::new(first.year, first.region, code.clone()).with("xland", 1.0));
        }

        let rainfall_results = request.rainfall.as_ref().map(|frame| {
            DataFrame::new(
                frame
                    .iter()
                    .map(|row| {
                        let factor = adj
                            .rainfall
                            .as_ref()
                            .map(|r| r.get(&row.region))
                            .unwrap_or(1.0);
                        Self::solve_row(&request, row, factor, false)
                    })
                    .collect(),
            )
        });

        Ok(EngineOutput {
            results: DataFrame::new(rows),
            rainfall_results,
            infeasibilities: self.infeasibilities.clone(),
        })
    }
}
