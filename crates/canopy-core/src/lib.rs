//! Monthly aggregation of Sentinel-1/Sentinel-2 plot features and
//! forest-inventory tree records.
//!
//! Tables enter through [`load`]; plot codes are normalised to [`PlotCode`]
//! wherever rows are keyed. Everything downstream of loading is pure: indexing,
//! feature extraction, aggregation, derived indices and tree-type
//! classification all take borrowed tables and return fresh structures.

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod error;
pub mod features;
pub mod index;
pub mod indices;
pub mod inventory;
pub mod load;
pub mod patterns;
pub mod record;
pub mod stats;
pub mod taxonomy;
pub mod views;

pub use aggregate::{aggregate, aggregate_with_keys, AggregatedSeries, MonthEntry, OutputKey};
pub use chart::ChartRow;
pub use config::DatasetConfig;
pub use error::{CanopyError, Result};
pub use features::{Feature, Metric, Month, MonthlyFeatureSet, SiteVariable};
pub use index::{group_by, index_unique, plot_key, Grouped, Unique};
pub use indices::{ndvi, normalized_difference, NdviMethod};
pub use inventory::{plots_from_table, trees_from_table, Plot, Tree};
pub use patterns::{load_ndvi_patterns, species_ndvi_patterns};
pub use record::{PlotCode, Record, Table, Value};
pub use stats::Summary;
pub use taxonomy::{
    classify, composition, plots_with_type, species_composition, Composition, SpeciesComposition, TreeType,
};
pub use views::{FeatureStore, LineSpec, Statistic, Stratify, ViewKind, ViewOutput, ViewParams, YearSelection};
