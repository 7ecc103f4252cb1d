use crate::engine::EngineInfeasibility;
use std::collections::{BTreeMap, HashMap};

/// Counts, across every infeasible (region, year), how often each crop
/// appears among that region/year's results. Most frequent first, ties by
/// crop code.
pub fn crop_frequencies<'a, I>(infeasibilities: &[EngineInfeasibility], rows: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = (&'a str, Option<i32>, &'a str)>,
{
    let mut crops_by_cell: HashMap<(&str, Option<i32>), Vec<&str>> = HashMap::new();
    for (region, year, crop) in rows {
        crops_by_cell.entry((region, year)).or_default().push(crop);
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for inf in infeasibilities {
        if let Some(crops) = crops_by_cell.get(&(inf.region.as_str(), Some(inf.year))) {
            for crop in crops {
                *counts.entry(crop.to_string()).or_default() += 1;
            }
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    // stable sort keeps the BTreeMap's code order among equal counts
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// `"CORN (3), ALFAL (1)"`; empty when nothing was infeasible.
pub fn render_summary(frequencies: &[(String, usize)]) -> String {
    frequencies
        .iter()
        .map(|(crop, n)| format!("{} ({})", crop, n))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inf(region: &str, year: i32) -> EngineInfeasibility {
        EngineInfeasibility {
            region: region.into(),
            year,
            description: "land constraint".into(),
        }
    }

    #[test]
    fn tallies_crops_in_infeasible_cells() {
        let rows = vec![
            ("R01", Some(2020), "CORN"),
            ("R01", Some(2020), "ALFAL"),
            ("R02", Some(2020), "CORN"),
            ("R02", Some(2020), "GRAPE"),
            ("R02", Some(2021), "GRAPE"),
            ("R03", Some(2020), "GRAPE"),
        ];
        let freqs = crop_frequencies(&[inf("R01", 2020), inf("R02", 2020)], rows);
        assert_eq!(
            freqs,
            vec![
                ("CORN".to_string(), 2),
                ("ALFAL".to_string(), 1),
                ("GRAPE".to_string(), 1)
            ]
        );
        assert_eq!(render_summary(&freqs), "CORN (2), ALFAL (1), GRAPE (1)");
    }

    #[test]
    fn no_infeasibilities_renders_empty() {
        let rows = vec![("R01", Some(2020), "CORN")];
        let freqs = crop_frequencies(&[], rows);
        assert!(freqs.is_empty());
        assert_eq!(render_summary(&freqs), "");
    }

    #[test]
    fn infeasible_cell_without_results_contributes_nothing() {
        let rows = vec![("R01", Some(2020), "CORN")];
        let freqs = crop_frequencies(&[inf("R09", 2020)], rows);
        assert!(freqs.is_empty());
    }
}
