//! Seasonal NDVI pattern per species, pooled over every supplied year.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::aggregate::{aggregate_with_keys, AggregatedSeries};
use crate::chart::{rows_from_series, ChartRow};
use crate::error::Result;
use crate::features::Feature;
use crate::inventory::{stratify_by_species, Tree};
use crate::record::{Record, Table};
use crate::taxonomy::normalize_species;
use crate::views::LineSpec;

const SPECIES_COLORS: [(&str, &str); 12] = [
    ("Picea abies (L.) H.Karst.", "#1b5e20"),
    ("Pinus sylvestris L.", "#2e7d32"),
    ("Betula pubescens Ehrh.", "#66bb6a"),
    ("Betula pendula Roth", "#ff9800"),
    ("Populus tremula L.", "#fdd835"),
    ("Salix caprea L.", "#1976d2"),
    ("Alnus incana (L.) Moench", "#1565c0"),
    ("Alnus glutinosa (L.) Gaertn.", "#0d47a1"),
    ("Sorbus aucuparia L.", "#7b1fa2"),
    ("Pinus contorta Douglas ex Loudon", "#6a1b9a"),
    ("Acer platanoides L.", "#c62828"),
    ("Fraxinus excelsior L.", "#b71c1c"),
];

const FALLBACK_COLOR: &str = "#9e9e9e";

/// Per-record NDVI averaged over all plots carrying each species, keyed by
/// species name. A plot counts once per species it carries, in every year.
pub fn species_ndvi_patterns<T: Borrow<Table>>(tables: &[T], trees: &[Tree], species: &[&str]) -> AggregatedSeries {
    let mut pooled: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for table in tables {
        for (name, records) in stratify_by_species(table.borrow().rows(), trees) {
            pooled.entry(name).or_default().extend(records);
        }
    }

    let mut series = AggregatedSeries::empty();
    for &name in species {
        let name = normalize_species(name);
        let Some(group) = pooled.get(&name) else {
            debug!(species = %name, "no plots carry this species");
            continue;
        };
        series.merge(aggregate_with_keys(group, &[Feature::Ndvi], |_| name.clone()));
    }
    series
}

/// Chart rows in the shape stored as `preprocessed_ndvi_patterns.json`.
pub fn ndvi_pattern_rows<T: Borrow<Table>>(tables: &[T], trees: &[Tree], species: &[&str]) -> Vec<ChartRow> {
    rows_from_series(&species_ndvi_patterns(tables, trees, species))
}

pub fn load_ndvi_patterns(json: &str) -> Result<Vec<ChartRow>> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_ndvi_patterns_file(path: impl AsRef<Path>) -> Result<Vec<ChartRow>> {
    let text = std::fs::read_to_string(path)?;
    load_ndvi_patterns(&text)
}

/// Legend entry for a species: the name without its authority.
pub fn species_line(species: &str) -> LineSpec {
    let color = SPECIES_COLORS
        .iter()
        .find(|(s, _)| *s == species)
        .map_or(FALLBACK_COLOR, |&(_, c)| c);
    let name = species.split(" (").next().unwrap_or(species);
    LineSpec { key: species.to_string(), name: name.to_string(), color: color.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Month;
    use crate::record::PlotCode;
    use crate::taxonomy::MAJOR_SPECIES;
    use approx::assert_relative_eq;

    fn year(rows: &[(f64, f64, f64)]) -> Table {
        Table::from_rows(
            rows.iter()
                .map(|&(code, b4, b8)| Record::new().with("plotcode", code).with("5_B4", b4).with("5_B8", b8))
                .collect(),
        )
    }

    #[test]
    fn pools_years_and_counts_each_plot_per_species() {
        let tables = vec![year(&[(1.0, 1000.0, 3000.0), (2.0, 500.0, 500.0)]), year(&[(1.0, 1000.0, 4000.0)])];
        let trees = vec![
            Tree::new(PlotCode(1), "Picea abies (L.) H.Karst."),
            Tree::new(PlotCode(1), "Picea abies (L.) H.Karst."),
            Tree::new(PlotCode(1), "Betula pendula Roth"),
            Tree::new(PlotCode(2), "Betula pendula Roth"),
        ];
        let series = species_ndvi_patterns(&tables, &trees, &MAJOR_SPECIES);
        let jun = Month::new(5).unwrap();

        let picea = series.get(jun, "Picea abies (L.) H.Karst.").unwrap();
        assert_eq!(picea.count, 2);
        assert_relative_eq!(picea.mean, (0.5 + 0.6) / 2.0);

        let betula = series.get(jun, "Betula pendula Roth").unwrap();
        assert_eq!(betula.count, 3);
        assert!(series.get(jun, "Pinus sylvestris L.").is_none());
    }

    #[test]
    fn rows_round_trip_through_json() {
        let tables = vec![year(&[(1.0, 1000.0, 3000.0)])];
        let trees = vec![Tree::new(PlotCode(1), "Pinus sylvestris L.")];
        let rows = ndvi_pattern_rows(&tables, &trees, &["Pinus sylvestris L."]);
        let json = serde_json::to_string(&rows).unwrap();
        let back = load_ndvi_patterns(&json).unwrap();
        assert_eq!(back, rows);
        assert_relative_eq!(back[5].get("Pinus sylvestris L.").unwrap(), 0.5);
        assert_eq!(back[5].get("Pinus sylvestris L._count"), Some(1.0));
    }

    #[test]
    fn legend_names_drop_the_authority() {
        let line = species_line("Alnus incana (L.) Moench");
        assert_eq!(line.name, "Alnus incana");
        assert_eq!(line.color, "#1565c0");
        assert_eq!(species_line("Tilia spp.").color, FALLBACK_COLOR);
    }
}
