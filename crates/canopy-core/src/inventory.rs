//! Typed forest-inventory entities and record stratification.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::index::{group_by, plot_key};
use crate::record::{columns, PlotCode, Record, Table, Value};
use crate::taxonomy::{classify, dominant_type, normalize_species, TreeType};

/// A forest-inventory survey location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plot {
    pub code: PlotCode,
    pub country: Option<String>,
    pub survey_date_1: Option<String>,
    pub survey_date_2: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Plot {
    pub fn from_record(r: &Record) -> Option<Self> {
        let code = r.plot_code()?;
        let date = |col: &str| match r.get(col) {
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Null => None,
        };
        Some(Self {
            code,
            country: r.text(columns::COUNTRY).map(str::to_string),
            survey_date_1: date(columns::SURVEY_DATE_1),
            survey_date_2: date(columns::SURVEY_DATE_2),
            latitude: r.number(columns::LATITUDE),
            longitude: r.number(columns::LONGITUDE),
        })
    }
}

/// One inventoried tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tree {
    pub plot: PlotCode,
    /// Taxon name with whitespace normalised.
    pub species: String,
    pub tree_type: TreeType,
}

impl Tree {
    pub fn new(plot: PlotCode, species: &str) -> Self {
        Self { plot, species: normalize_species(species), tree_type: classify(species) }
    }

    /// `None` unless the record has both a valid plot code and a taxon name.
    pub fn from_record(r: &Record) -> Option<Self> {
        let plot = r.plot_code()?;
        let species = r.text(columns::TAXON_NAME)?;
        Some(Self::new(plot, species))
    }
}

fn convert<T>(table: &Table, what: &str, f: impl Fn(&Record) -> Option<T>) -> Vec<T> {
    let mut out = Vec::with_capacity(table.len());
    let mut rejected = 0usize;
    for r in table {
        match f(r) {
            Some(v) => out.push(v),
            None => rejected += 1,
        }
    }
    if rejected > 0 {
        warn!(rejected, total = table.len(), "{what} rows without a usable plot code were dropped");
    }
    out
}

pub fn plots_from_table(table: &Table) -> Vec<Plot> {
    convert(table, "plot", Plot::from_record)
}

pub fn trees_from_table(table: &Table) -> Vec<Tree> {
    convert(table, "tree", Tree::from_record)
}

// ── Stratification ────────────────────────────────────────────────────────────

/// Group feature records by the dominant tree type of their plot.
///
/// Records whose plot has no inventoried trees are left out.
pub fn stratify_by_tree_type<'a>(records: &'a [Record], trees: &[Tree]) -> BTreeMap<TreeType, Vec<&'a Record>> {
    let trees_by_plot = group_by(trees, |t| Some(t.plot));
    let mut out: BTreeMap<TreeType, Vec<&'a Record>> = BTreeMap::new();
    for r in records {
        let Some(code) = plot_key(r) else { continue };
        if let Some(t) = dominant_type(trees_by_plot.get(&code)) {
            out.entry(t).or_default().push(r);
        }
    }
    out
}

/// Group feature records by every species present on their plot.
///
/// A plot with several species contributes its record to each of them.
pub fn stratify_by_species<'a>(records: &'a [Record], trees: &[Tree]) -> BTreeMap<String, Vec<&'a Record>> {
    let trees_by_plot = group_by(trees, |t| Some(t.plot));
    let mut out: BTreeMap<String, Vec<&'a Record>> = BTreeMap::new();
    for r in records {
        let Some(code) = plot_key(r) else { continue };
        let mut species: Vec<&str> = trees_by_plot.get(&code).iter().map(|t| t.species.as_str()).collect();
        species.sort_unstable();
        species.dedup();
        for s in species {
            out.entry(s.to_string()).or_default().push(r);
        }
    }
    out
}
