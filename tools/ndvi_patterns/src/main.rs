//! Precompute the per-species seasonal NDVI chart (`preprocessed_ndvi_patterns.json`).
//!
//! Every configured year's mean feature table is read in parallel, then all
//! years are pooled and NDVI is averaged per record for each species.

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use canopy_core::load::{read_csv_path, read_keyed_csv_path};
use canopy_core::patterns::ndvi_pattern_rows;
use canopy_core::taxonomy::MAJOR_SPECIES;
use canopy_core::{trees_from_table, DatasetConfig, Statistic, Table};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ndvi_patterns", about = "Precompute seasonal NDVI patterns per tree species")]
struct Args {
    /// Directory holding the feature and tree files.
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Dataset config JSON; defaults to the standard file layout.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Species to chart (repeatable); defaults to the twelve major species.
    #[arg(long = "species")]
    species: Vec<String>,

    /// Output JSON file; defaults to the configured patterns file in the data dir.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunSummary {
    years: Vec<u16>,
    species: usize,
    peak_monthly_count: Vec<(String, usize)>,
}

// ── Loading ───────────────────────────────────────────────────────────────────

fn load_years(config: &DatasetConfig, args: &Args) -> Result<Vec<(u16, Table)>> {
    let loaded: Vec<Result<Option<(u16, Table)>>> = config
        .years
        .par_iter()
        .map(|&year| {
            let path = config.features_path(&args.data_dir, year, Statistic::Mean);
            if !path.exists() {
                warn!(path = %path.display(), "no mean table for year, skipping");
                return Ok(None);
            }
            let table = read_keyed_csv_path(&path).with_context(|| format!("reading {}", path.display()))?;
            info!(year, rows = table.len(), "loaded features");
            Ok(Some((year, table)))
        })
        .collect();

    let mut tables = Vec::with_capacity(loaded.len());
    for r in loaded {
        if let Some(t) = r? {
            tables.push(t);
        }
    }
    tables.sort_by_key(|(y, _)| *y);
    Ok(tables)
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

    let years = load_years(&config, &args)?;
    if years.is_empty() {
        anyhow::bail!("no feature tables found in {}", args.data_dir.display());
    }

    let trees_path = config.trees_path(&args.data_dir);
    let trees = trees_from_table(&read_csv_path(&trees_path).with_context(|| format!("reading {}", trees_path.display()))?);
    info!(trees = trees.len(), "loaded trees");

    let species: Vec<&str> = if args.species.is_empty() {
        MAJOR_SPECIES.to_vec()
    } else {
        args.species.iter().map(String::as_str).collect()
    };

    let tables: Vec<&Table> = years.iter().map(|(_, t)| t).collect();
    let rows = ndvi_pattern_rows(&tables, &trees, &species);

    let summary = RunSummary {
        years: years.iter().map(|(y, _)| *y).collect(),
        species: species.len(),
        peak_monthly_count: species
            .iter()
            .map(|s| {
                let n = rows.iter().filter_map(|r| r.get(&format!("{s}_count"))).fold(0.0_f64, f64::max);
                (s.to_string(), n as usize)
            })
            .collect(),
    };
    info!(summary = %serde_json::to_string(&summary)?, "patterns computed");

    let out = args.output.clone().unwrap_or_else(|| config.ndvi_patterns_path(&args.data_dir));
    fs::write(&out, serde_json::to_string_pretty(&rows)?).with_context(|| format!("writing {}", out.display()))?;
    info!(path = %out.display(), "wrote patterns");
    Ok(())
}
