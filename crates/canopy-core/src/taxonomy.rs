//! Species → tree-type classification and plot composition.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::{Once, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CanopyError;
use crate::index::group_by;
use crate::inventory::Tree;
use crate::record::PlotCode;
use crate::stats::{round1, summarize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeType {
    Evergreen,
    Deciduous,
    Unknown,
}

impl TreeType {
    pub const ALL: [TreeType; 3] = [TreeType::Evergreen, TreeType::Deciduous, TreeType::Unknown];

    pub fn as_str(self) -> &'static str {
        match self {
            TreeType::Evergreen => "evergreen",
            TreeType::Deciduous => "deciduous",
            TreeType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TreeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TreeType {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TreeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CanopyError::InvalidParameter { name: "tree type", value: s.to_string() })
    }
}

// ── Classification table ──────────────────────────────────────────────────────

const SPECIES_TABLE: &[(&str, TreeType)] = &[
    // Broadleaves
    ("Acer platanoides L.", TreeType::Deciduous),
    ("Acer pseudoplatanus L.", TreeType::Deciduous),
    ("Alnus glutinosa (L.) Gaertn.", TreeType::Deciduous),
    ("Alnus incana (L.) Moench", TreeType::Deciduous),
    ("Alnus spp.", TreeType::Deciduous),
    ("Betula pendula Roth", TreeType::Deciduous),
    ("Betula pubescens Ehrh.", TreeType::Deciduous),
    ("Betula spp.", TreeType::Deciduous),
    ("Carpinus betulus L.", TreeType::Deciduous),
    ("Fagus sylvatica L.", TreeType::Deciduous),
    ("Fraxinus excelsior L.", TreeType::Deciduous),
    ("Other broadleaved", TreeType::Deciduous),
    ("Populus tremula L.", TreeType::Deciduous),
    ("Prunus avium L.", TreeType::Deciduous),
    ("Quercus spp.", TreeType::Deciduous),
    ("Salix caprea L.", TreeType::Deciduous),
    ("Salix spp.", TreeType::Deciduous),
    ("Sorbus aucuparia L.", TreeType::Deciduous),
    ("Sorbus intermedia (Ehrh.) Pers.", TreeType::Deciduous),
    ("Sorbus spp.", TreeType::Deciduous),
    ("Tilia spp.", TreeType::Deciduous),
    ("Ulmus spp.", TreeType::Deciduous),
    // Conifers. Larch sheds its needles.
    ("Juniperus spp.", TreeType::Evergreen),
    (LARIX, TreeType::Deciduous),
    ("Other conifers", TreeType::Evergreen),
    ("Picea abies (L.) H.Karst.", TreeType::Evergreen),
    ("Picea spp.", TreeType::Evergreen),
    ("Pinus contorta Douglas ex Loudon", TreeType::Evergreen),
    ("Pinus mugo Turra", TreeType::Evergreen),
    ("Pinus sylvestris L.", TreeType::Evergreen),
];

/// Listed as deciduous, but grouped with the evergreen conifers in places.
const LARIX: &str = "Larix spp.";

/// The species charted in the seasonal NDVI pattern view, most common first.
pub const MAJOR_SPECIES: [&str; 12] = [
    "Picea abies (L.) H.Karst.",
    "Pinus sylvestris L.",
    "Betula pubescens Ehrh.",
    "Betula pendula Roth",
    "Populus tremula L.",
    "Salix caprea L.",
    "Alnus incana (L.) Moench",
    "Alnus glutinosa (L.) Gaertn.",
    "Sorbus aucuparia L.",
    "Pinus contorta Douglas ex Loudon",
    "Acer platanoides L.",
    "Fraxinus excelsior L.",
];

static LARIX_WARNING: Once = Once::new();

fn table() -> &'static HashMap<String, TreeType> {
    static TABLE: OnceLock<HashMap<String, TreeType>> = OnceLock::new();
    TABLE.get_or_init(|| {
        SPECIES_TABLE
            .iter()
            .map(|&(name, t)| (normalize_species(name), t))
            .collect()
    })
}

/// Collapse runs of whitespace (including stray newlines) to single spaces.
pub fn normalize_species(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_ambiguous(species: &str) -> bool {
    normalize_species(species) == LARIX
}

/// Tree type of `species`; anything not in the table is `Unknown`.
pub fn classify(species: &str) -> TreeType {
    let key = normalize_species(species);
    if key == LARIX {
        LARIX_WARNING.call_once(|| {
            warn!(species = LARIX, "classification is ambiguous; treating as deciduous");
        });
    }
    table().get(&key).copied().unwrap_or(TreeType::Unknown)
}

// ── Composition ───────────────────────────────────────────────────────────────

/// Tree-type make-up of a set of trees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    pub total: usize,
    pub counts: BTreeMap<TreeType, usize>,
    /// Share of `total`, in percent, rounded to one decimal.
    pub percentages: BTreeMap<TreeType, f64>,
}

/// Spread of one tree type's share across plots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TypeVariability {
    pub mean_pct: f64,
    pub std_pct: f64,
    pub plots: usize,
}

fn count_types<T: Borrow<Tree>>(trees: &[T]) -> BTreeMap<TreeType, usize> {
    let mut counts = BTreeMap::new();
    for t in trees {
        *counts.entry(t.borrow().tree_type).or_insert(0) += 1;
    }
    counts
}

/// Composition of `trees`, or `None` when there are no trees.
pub fn composition<T: Borrow<Tree>>(trees: &[T]) -> Option<Composition> {
    let total = trees.len();
    if total == 0 {
        return None;
    }
    let counts = count_types(trees);
    let percentages = counts
        .iter()
        .map(|(&t, &n)| (t, round1(n as f64 / total as f64 * 100.0)))
        .collect();
    Some(Composition { total, counts, percentages })
}

pub fn composition_for_plot(trees: &[Tree], plot: PlotCode) -> Option<Composition> {
    let on_plot: Vec<&Tree> = trees.iter().filter(|t| t.plot == plot).collect();
    composition(&on_plot)
}

/// Mean and spread of each type's per-plot percentage.
///
/// Every plot with at least one tree contributes one sample per type; a plot
/// without a given type contributes 0%. Types that never occur are left out.
pub fn composition_variability(trees: &[Tree]) -> BTreeMap<TreeType, TypeVariability> {
    let by_plot = group_by(trees, |t| Some(t.plot));
    let shares: Vec<BTreeMap<TreeType, f64>> = by_plot
        .groups
        .values()
        .map(|plot_trees| {
            let n = plot_trees.len() as f64;
            count_types(plot_trees)
                .into_iter()
                .map(|(t, c)| (t, c as f64 / n * 100.0))
                .collect()
        })
        .collect();

    let mut out = BTreeMap::new();
    for t in TreeType::ALL {
        if !shares.iter().any(|s| s.contains_key(&t)) {
            continue;
        }
        let values = shares.iter().map(|s| Some(s.get(&t).copied().unwrap_or(0.0)));
        if let Some(summary) = summarize(values) {
            out.insert(
                t,
                TypeVariability { mean_pct: summary.mean, std_pct: summary.std_dev, plots: summary.count },
            );
        }
    }
    out
}

/// The most frequent type among `trees`; ties resolve to `Unknown`.
pub fn dominant_type<T: Borrow<Tree>>(trees: &[T]) -> Option<TreeType> {
    let counts = count_types(trees);
    let max = *counts.values().max()?;
    let mut leaders = counts.iter().filter(|&(_, &n)| n == max).map(|(&t, _)| t);
    match (leaders.next(), leaders.next()) {
        (Some(t), None) => Some(t),
        _ => Some(TreeType::Unknown),
    }
}

// ── Species breakdown ─────────────────────────────────────────────────────────

/// Trees of one species on a plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesShare {
    pub species: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesComposition {
    pub plot: PlotCode,
    pub total: usize,
    /// Most numerous first; equal counts in name order.
    pub species: Vec<SpeciesShare>,
}

/// Per-species tree counts on `plot`, or `None` when the plot has no trees.
pub fn species_composition(trees: &[Tree], plot: PlotCode) -> Option<SpeciesComposition> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for t in trees.iter().filter(|t| t.plot == plot) {
        *counts.entry(t.species.as_str()).or_insert(0) += 1;
    }
    let total: usize = counts.values().sum();
    if total == 0 {
        return None;
    }
    let mut species: Vec<SpeciesShare> = counts
        .into_iter()
        .map(|(name, count)| SpeciesShare {
            species: name.to_string(),
            count,
            percentage: round1(count as f64 / total as f64 * 100.0),
        })
        .collect();
    // Stable sort keeps the BTreeMap's name order among equal counts.
    species.sort_by(|a, b| b.count.cmp(&a.count));
    Some(SpeciesComposition { plot, total, species })
}

/// Plots carrying at least one tree of type `t`, ascending.
pub fn plots_with_type(trees: &[Tree], t: TreeType) -> Vec<PlotCode> {
    let mut plots: Vec<PlotCode> = trees.iter().filter(|tree| tree.tree_type == t).map(|tree| tree.plot).collect();
    plots.sort_unstable();
    plots.dedup();
    plots
}
