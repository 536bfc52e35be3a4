//! Aggregate the per-year feature tables into one chart view and write its
//! rows, lines and title as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use canopy_core::load::{read_csv_path, read_keyed_csv_path};
use canopy_core::{
    plots_from_table, trees_from_table, DatasetConfig, FeatureStore, PlotCode, Statistic, Stratify, ViewKind,
    ViewParams, YearSelection,
};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "series", about = "Aggregate monthly Sentinel features into chart-ready rows")]
struct Args {
    /// Directory holding the feature, tree and plot files.
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Dataset config JSON; defaults to the standard file layout.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// A year, or "all" for every configured year.
    #[arg(short, long, default_value = "all")]
    year: String,

    /// backscatter, optical, ndvi, swir, radar or environmental.
    #[arg(short, long, default_value = "backscatter")]
    view: String,

    /// mean or stdDev.
    #[arg(short, long, default_value = "mean")]
    statistic: String,

    /// Restrict to one plot code.
    #[arg(short, long)]
    plot: Option<String>,

    /// none or tree-type.
    #[arg(long, default_value = "none")]
    stratify: String,

    /// Output JSON file; stdout when absent.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    fn params(&self) -> Result<ViewParams> {
        Ok(ViewParams {
            year: self.year.parse::<YearSelection>()?,
            view: self.view.parse::<ViewKind>()?,
            statistic: self.statistic.parse::<Statistic>()?,
            plot: self.plot.as_deref().map(str::parse::<PlotCode>).transpose()?,
            stratify: self.stratify.parse::<Stratify>()?,
        })
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

fn load_store(config: &DatasetConfig, data_dir: &Path, params: &ViewParams) -> Result<FeatureStore> {
    let mut store = FeatureStore::new();

    let years = match params.year {
        YearSelection::All => config.years.clone(),
        YearSelection::Year(y) => vec![y],
    };
    for year in years {
        let path = config.features_path(data_dir, year, params.statistic);
        if !path.exists() {
            // A single requested year must exist; build_view reports it.
            warn!(path = %path.display(), "feature table missing, skipping year");
            continue;
        }
        let table = read_keyed_csv_path(&path).with_context(|| format!("reading {}", path.display()))?;
        info!(year, rows = table.len(), "loaded features");
        store.insert_features(year, params.statistic, table);
    }

    if params.stratify == Stratify::TreeType {
        let path = config.trees_path(data_dir);
        let table = read_csv_path(&path).with_context(|| format!("reading {}", path.display()))?;
        store.set_trees(trees_from_table(&table));
        info!(trees = store.trees().len(), "loaded trees");
    }

    let plots_path = config.plots_path(data_dir);
    if params.plot.is_some() && plots_path.exists() {
        let table = read_csv_path(&plots_path).with_context(|| format!("reading {}", plots_path.display()))?;
        store.set_plots(plots_from_table(&table));
    }

    Ok(store)
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let params = args.params()?;
    let config = match &args.config {
        Some(path) => DatasetConfig::from_json_file(path).with_context(|| format!("reading config {}", path.display()))?,
        None => DatasetConfig::default(),
    };

    let store = load_store(&config, &args.data_dir, &params)?;
    if let Some(code) = params.plot {
        match store.plot(code) {
            Some(p) => info!(plot = %code, country = ?p.country, "single-plot view"),
            None if !store.plots().is_empty() => warn!(plot = %code, "plot not in the plot table"),
            None => {}
        }
    }

    let output = store.build_view(&params)?;
    info!(title = %output.title, lines = output.lines.len(), "view built");

    let json = serde_json::to_string_pretty(&output)?;
    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "wrote view");
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parameters_map_to_view_params() {
        let args = Args::parse_from([
            "series", "--year", "2019", "--view", "ndvi", "--plot", "1014301", "--stratify", "tree-type",
        ]);
        let p = args.params().unwrap();
        assert_eq!(p.year, YearSelection::Year(2019));
        assert_eq!(p.view, ViewKind::Ndvi);
        assert_eq!(p.plot, Some(PlotCode(1014301)));
        assert_eq!(p.stratify, Stratify::TreeType);
    }

    #[test]
    fn bad_view_is_rejected() {
        let args = Args::parse_from(["series", "--view", "thermal"]);
        assert!(args.params().is_err());
    }
}
