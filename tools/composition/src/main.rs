//! Tree-type composition of the inventory: one plot, all trees, the spread
//! of each type's share across plots, one plot's species, or the plots
//! holding a given tree type.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::{collections::BTreeMap, fs, path::PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use canopy_core::load::read_csv_path;
use canopy_core::taxonomy::{
    composition, composition_for_plot, composition_variability, is_ambiguous, plots_with_type, species_composition,
    TypeVariability,
};
use canopy_core::{trees_from_table, Composition, DatasetConfig, PlotCode, SpeciesComposition, Tree, TreeType};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "composition", about = "Evergreen/deciduous composition of inventoried trees")]
struct Args {
    /// Directory holding the tree file.
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Dataset config JSON; defaults to the standard file layout.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Composition of this plot only.
    #[arg(short, long, conflicts_with = "variability")]
    plot: Option<String>,

    /// Report mean and spread of per-plot shares instead.
    #[arg(long)]
    variability: bool,

    /// With --plot: count trees per species instead of per type.
    #[arg(long, requires = "plot")]
    species: bool,

    /// List the plots holding at least one tree of this type.
    #[arg(long, conflicts_with_all = ["plot", "variability"])]
    tree_type: Option<String>,

    /// Output JSON file; stdout when absent.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

// ── Output types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(untagged)]
enum Report {
    Composition {
        plot: Option<PlotCode>,
        composition: Option<Composition>,
        unclassified_species: Vec<String>,
        ambiguous_species: Vec<String>,
    },
    Variability {
        variability: BTreeMap<TreeType, TypeVariability>,
    },
    Species {
        species_composition: Option<SpeciesComposition>,
    },
    PlotsWithType {
        tree_type: TreeType,
        plots: Vec<PlotCode>,
    },
}

/// What to report, resolved from the CLI flags.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Query {
    Composition(Option<PlotCode>),
    Variability,
    Species(PlotCode),
    PlotsWithType(TreeType),
}

impl Args {
    fn query(&self) -> Result<Query> {
        if let Some(t) = &self.tree_type {
            return Ok(Query::PlotsWithType(t.parse()?));
        }
        if self.variability {
            return Ok(Query::Variability);
        }
        let plot = self.plot.as_deref().map(str::parse::<PlotCode>).transpose()?;
        Ok(match plot {
            Some(p) if self.species => Query::Species(p),
            _ => Query::Composition(plot),
        })
    }
}

fn distinct_species<'a>(trees: impl Iterator<Item = &'a Tree>, keep: impl Fn(&Tree) -> bool) -> Vec<String> {
    let mut out: Vec<String> = trees.filter(|t| keep(t)).map(|t| t.species.clone()).collect();
    out.sort();
    out.dedup();
    out
}

fn report(trees: &[Tree], query: Query) -> Report {
    let plot = match query {
        Query::Composition(plot) => plot,
        Query::Variability => return Report::Variability { variability: composition_variability(trees) },
        Query::Species(p) => return Report::Species { species_composition: species_composition(trees, p) },
        Query::PlotsWithType(t) => return Report::PlotsWithType { tree_type: t, plots: plots_with_type(trees, t) },
    };
    let selected: Vec<&Tree> = trees.iter().filter(|t| plot.map_or(true, |p| t.plot == p)).collect();
    let composition = match plot {
        Some(p) => composition_for_plot(trees, p),
        None => composition(&selected),
    };
    Report::Composition {
        plot,
        composition,
        unclassified_species: distinct_species(selected.iter().copied(), |t| t.tree_type == TreeType::Unknown),
        ambiguous_species: distinct_species(selected.iter().copied(), |t| is_ambiguous(&t.species)),
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => DatasetConfig::from_json_file(path).with_context(|| format!("reading config {}", path.display()))?,
        None => DatasetConfig::default(),
    };
    let query = args.query()?;

    let path = config.trees_path(&args.data_dir);
    let table = read_csv_path(&path).with_context(|| format!("reading {}", path.display()))?;
    let trees = trees_from_table(&table);
    if trees.is_empty() {
        bail!("no usable tree records in {}", path.display());
    }
    info!(trees = trees.len(), "loaded trees");

    let report = report(&trees, query);
    match &report {
        Report::Composition { composition: None, plot: Some(p), .. } => warn!(plot = %p, "no trees recorded for plot"),
        Report::Species { species_composition: None } => warn!(?query, "no trees recorded for plot"),
        Report::PlotsWithType { tree_type, plots } => info!(%tree_type, plots = plots.len(), "plots matched"),
        _ => {}
    }

    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "wrote composition");
        }
        None => println!("{json}"),
    }
    Ok(())
}
