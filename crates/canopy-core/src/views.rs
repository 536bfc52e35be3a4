//! Chart views over the loaded feature tables.
//!
//! A view is a choice of year(s), chart family, statistic table, optional
//! single plot and optional tree-type stratification. [`FeatureStore::build_view`]
//! turns that choice into an aggregated series, its flattened chart rows and
//! the list of lines to draw.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::aggregate::{aggregate_with_keys, AggregatedSeries, OutputKey};
use crate::chart::{rows_from_series, ChartRow};
use crate::error::{CanopyError, Result};
use crate::features::{Feature, Metric, SiteVariable};
use crate::index::{index_unique, plot_key};
use crate::indices::{apply_ndvi_of_means, NdviMethod};
use crate::inventory::{stratify_by_tree_type, Plot, Tree};
use crate::record::{PlotCode, Record, Table};
use crate::taxonomy::TreeType;

/// First year of the survey; hue offsets for multi-year charts count from it.
pub const BASE_YEAR: i32 = 2017;

// ── Parameters ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "YearRepr")]
pub enum YearSelection {
    #[default]
    All,
    Year(u16),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YearRepr {
    Number(u16),
    Text(String),
}

impl TryFrom<YearRepr> for YearSelection {
    type Error = CanopyError;

    fn try_from(r: YearRepr) -> Result<Self> {
        match r {
            YearRepr::Number(y) => Ok(YearSelection::Year(y)),
            YearRepr::Text(s) => s.parse(),
        }
    }
}

impl FromStr for YearSelection {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(YearSelection::All);
        }
        s.parse::<u16>()
            .map(YearSelection::Year)
            .map_err(|_| CanopyError::InvalidYear(s.to_string()))
    }
}

impl Serialize for YearSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            YearSelection::All => serializer.serialize_str("all"),
            YearSelection::Year(y) => serializer.serialize_u16(*y),
        }
    }
}

impl fmt::Display for YearSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearSelection::All => f.write_str("All Years"),
            YearSelection::Year(y) => write!(f, "{y}"),
        }
    }
}

/// Which feature table a view reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Statistic {
    #[default]
    Mean,
    StdDev,
}

impl Statistic {
    pub fn label(self) -> &'static str {
        match self {
            Statistic::Mean => "Mean",
            Statistic::StdDev => "Standard Deviation",
        }
    }
}

impl FromStr for Statistic {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Statistic::Mean),
            "std" | "stdd" | "stddev" => Ok(Statistic::StdDev),
            _ => Err(CanopyError::InvalidParameter { name: "statistic", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stratify {
    #[default]
    None,
    TreeType,
}

impl FromStr for Stratify {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "none" => Ok(Stratify::None),
            "treetype" => Ok(Stratify::TreeType),
            _ => Err(CanopyError::InvalidParameter { name: "stratification", value: s.to_string() }),
        }
    }
}

// ── View kinds ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    #[default]
    Backscatter,
    Optical,
    Ndvi,
    Swir,
    Radar,
    Environmental,
}

/// How one feature is drawn: legend stem, fixed color for single-year
/// charts, and HSL lightness for generated colors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub feature: Feature,
    pub short: &'static str,
    pub color: &'static str,
    pub lightness: u8,
}

const fn style(feature: Feature, short: &'static str, color: &'static str, lightness: u8) -> LineStyle {
    LineStyle { feature, short, color, lightness }
}

const VH_ASC: LineStyle = style(Feature::Metric(Metric::VHAsc), "VH Asc", "#8884d8", 50);
const VV_ASC: LineStyle = style(Feature::Metric(Metric::VVAsc), "VV Asc", "#82ca9d", 70);
const BACKSCATTER_FULL: [LineStyle; 4] = [
    VH_ASC,
    VV_ASC,
    style(Feature::Metric(Metric::VHDes), "VH Des", "#ffc658", 40),
    style(Feature::Metric(Metric::VVDes), "VV Des", "#ff7300", 60),
];
const BACKSCATTER_ASC: [LineStyle; 2] = [VH_ASC, VV_ASC];

const RED: LineStyle = style(Feature::Metric(Metric::B4), "Red", "#e74c3c", 60);
const NIR: LineStyle = style(Feature::Metric(Metric::B8), "NIR", "#8884d8", 70);
const OPTICAL_FULL: [LineStyle; 5] = [
    style(Feature::Metric(Metric::B2), "Blue", "#3498db", 40),
    style(Feature::Metric(Metric::B3), "Green", "#2ecc71", 50),
    RED,
    style(Feature::Metric(Metric::B5), "Red Edge", "#d32f2f", 55),
    NIR,
];
const OPTICAL_RED_NIR: [LineStyle; 2] = [RED, NIR];

const NDVI: [LineStyle; 1] = [style(Feature::Ndvi, "NDVI", "#2ecc71", 50)];

const SWIR: [LineStyle; 2] = [
    style(Feature::Metric(Metric::B11), "SWIR", "#7b1fa2", 40),
    style(Feature::Metric(Metric::B12), "SWIR2", "#6a1b9a", 60),
];

const RADAR: [LineStyle; 3] = [
    style(Feature::Metric(Metric::VHAsc), "VH Asc", "#2196f3", 40),
    style(Feature::Metric(Metric::VVAsc), "VV Asc", "#4caf50", 55),
    style(Feature::VhVvRatio, "VH/VV", "#ff9800", 70),
];

const ENVIRONMENTAL: [LineStyle; 2] = [
    style(Feature::Site(SiteVariable::Wai), "WAI", "#0288d1", 45),
    style(Feature::Site(SiteVariable::Sgdd), "SGDD", "#ffa000", 60),
];

impl ViewKind {
    pub const ALL: [ViewKind; 6] = [
        ViewKind::Backscatter,
        ViewKind::Optical,
        ViewKind::Ndvi,
        ViewKind::Swir,
        ViewKind::Radar,
        ViewKind::Environmental,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::Backscatter => "backscatter",
            ViewKind::Optical => "optical",
            ViewKind::Ndvi => "ndvi",
            ViewKind::Swir => "swir",
            ViewKind::Radar => "radar",
            ViewKind::Environmental => "environmental",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ViewKind::Backscatter => "Sentinel-1 Backscatter",
            ViewKind::Optical => "Sentinel-2 Optical",
            ViewKind::Ndvi => "Vegetation Index",
            ViewKind::Swir => "SWIR Parameters",
            ViewKind::Radar => "Radar Parameters",
            ViewKind::Environmental => "Environmental Parameters",
        }
    }

    /// Fixed y-axis range for mean charts; `None` scales to the data.
    pub fn y_domain(self) -> Option<[f64; 2]> {
        match self {
            ViewKind::Backscatter => Some([-20.0, -5.0]),
            ViewKind::Optical => Some([0.0, 5000.0]),
            ViewKind::Ndvi => Some([-1.0, 1.0]),
            ViewKind::Swir => Some([0.0, 3000.0]),
            ViewKind::Radar => Some([-25.0, 0.0]),
            ViewKind::Environmental => None,
        }
    }

    /// Lines drawn by this view. Multi-year and stratified charts keep to the
    /// ascending backscatter pair; stratified optical charts keep to red/NIR.
    pub fn styles(self, multi_year: bool, stratified: bool) -> &'static [LineStyle] {
        match self {
            ViewKind::Backscatter if multi_year || stratified => &BACKSCATTER_ASC,
            ViewKind::Backscatter => &BACKSCATTER_FULL,
            ViewKind::Optical if stratified => &OPTICAL_RED_NIR,
            ViewKind::Optical => &OPTICAL_FULL,
            ViewKind::Ndvi => &NDVI,
            ViewKind::Swir => &SWIR,
            ViewKind::Radar => &RADAR,
            ViewKind::Environmental => &ENVIRONMENTAL,
        }
    }

    pub fn features(self, multi_year: bool, stratified: bool) -> Vec<Feature> {
        self.styles(multi_year, stratified).iter().map(|s| s.feature).collect()
    }
}

impl FromStr for ViewKind {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self> {
        ViewKind::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CanopyError::UnknownView(s.to_string()))
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewParams {
    pub year: YearSelection,
    pub view: ViewKind,
    pub statistic: Statistic,
    pub plot: Option<PlotCode>,
    pub stratify: Stratify,
}

impl ViewParams {
    /// The NDVI method for this selection: ratio of averaged bands for the
    /// plain and single-plot charts, mean of per-plot ratios when stratified.
    pub fn ndvi_method(&self) -> NdviMethod {
        match self.stratify {
            Stratify::None => NdviMethod::RatioOfMeans,
            Stratify::TreeType => NdviMethod::MeanOfRatios,
        }
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSpec {
    pub key: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewOutput {
    pub title: String,
    /// `None` means the axis scales to the data.
    pub y_domain: Option<[f64; 2]>,
    pub lines: Vec<LineSpec>,
    #[serde(skip)]
    pub series: AggregatedSeries,
    pub rows: Vec<ChartRow>,
}

fn group_hue(t: TreeType) -> u16 {
    match t {
        TreeType::Evergreen => 120,
        _ => 30,
    }
}

fn title_case(t: TreeType) -> &'static str {
    match t {
        TreeType::Evergreen => "Evergreen",
        TreeType::Deciduous => "Deciduous",
        TreeType::Unknown => "Unknown",
    }
}

fn line_spec(style: &LineStyle, group: Option<TreeType>, year: Option<u16>) -> LineSpec {
    let mut key = OutputKey::new(style.feature).year(year);
    if let Some(g) = group {
        key = key.group(g.as_str());
    }

    let color = match (group, year) {
        (None, None) => style.color.to_string(),
        (None, Some(y)) => format!("hsl({}, 70%, {}%)", (i32::from(y) - BASE_YEAR) * 30, style.lightness),
        (Some(g), None) => format!("hsl({}, 70%, {}%)", group_hue(g), style.lightness),
        (Some(g), Some(y)) => {
            let saturation = (40 + (i32::from(y) - BASE_YEAR) * 10).clamp(20, 100);
            format!("hsl({}, {saturation}%, {}%)", group_hue(g), style.lightness)
        }
    };

    let name = match (group, year) {
        (None, None) => style.feature.label().to_string(),
        _ => {
            let mut parts: Vec<String> = Vec::with_capacity(3);
            if let Some(g) = group {
                parts.push(title_case(g).to_string());
            }
            parts.push(style.short.to_string());
            if let Some(y) = year {
                parts.push(y.to_string());
            }
            parts.join(" ")
        }
    };

    LineSpec { key: key.to_string(), name, color }
}

/// Aggregate one group under `template`'s group and year, computing NDVI
/// the way `method` says.
pub fn aggregate_group<R: Borrow<Record>>(
    group: &[R],
    features: &[Feature],
    template: &OutputKey,
    method: NdviMethod,
) -> AggregatedSeries {
    let key = |f: Feature| template.with_feature(f).to_string();
    match method {
        NdviMethod::MeanOfRatios => aggregate_with_keys(group, features, key),
        NdviMethod::RatioOfMeans => {
            let mut inputs: Vec<Feature> = features.iter().copied().filter(|&f| f != Feature::Ndvi).collect();
            let wants_ndvi = inputs.len() != features.len();
            if wants_ndvi {
                for band in [Feature::Metric(Metric::NIR), Feature::Metric(Metric::RED)] {
                    if !inputs.contains(&band) {
                        inputs.push(band);
                    }
                }
            }
            let mut series = aggregate_with_keys(group, &inputs, key);
            if wants_ndvi {
                apply_ndvi_of_means(&mut series, template);
            }
            series
        }
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct YearTables {
    mean: Option<Table>,
    std_dev: Option<Table>,
}

impl YearTables {
    fn get(&self, statistic: Statistic) -> Option<&Table> {
        match statistic {
            Statistic::Mean => self.mean.as_ref(),
            Statistic::StdDev => self.std_dev.as_ref(),
        }
    }
}

/// Everything a view can be built from, passed explicitly.
#[derive(Debug, Clone, Default)]
pub struct FeatureStore {
    years: BTreeMap<u16, YearTables>,
    trees: Vec<Tree>,
    plots: Vec<Plot>,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any table already loaded for this year and statistic.
    pub fn insert_features(&mut self, year: u16, statistic: Statistic, table: Table) {
        let slot = self.years.entry(year).or_default();
        match statistic {
            Statistic::Mean => slot.mean = Some(table),
            Statistic::StdDev => slot.std_dev = Some(table),
        }
    }

    pub fn set_trees(&mut self, trees: Vec<Tree>) {
        self.trees = trees;
    }

    pub fn set_plots(&mut self, plots: Vec<Plot>) {
        self.plots = plots;
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn plots(&self) -> &[Plot] {
        &self.plots
    }

    pub fn plot(&self, code: PlotCode) -> Option<&Plot> {
        self.plots.iter().find(|p| p.code == code)
    }

    /// Years with at least one loaded table, ascending.
    pub fn years(&self) -> Vec<u16> {
        self.years.keys().copied().collect()
    }

    pub fn table(&self, year: u16, statistic: Statistic) -> Option<&Table> {
        self.years.get(&year).and_then(|t| t.get(statistic))
    }

    fn selected_tables(&self, params: &ViewParams) -> Result<Vec<(u16, &Table)>> {
        match params.year {
            YearSelection::All => Ok(self
                .years
                .iter()
                .filter_map(|(&y, t)| t.get(params.statistic).map(|t| (y, t)))
                .collect()),
            YearSelection::Year(y) => {
                let table = self.table(y, params.statistic).ok_or(CanopyError::YearNotLoaded(y))?;
                Ok(vec![(y, table)])
            }
        }
    }

    pub fn build_view(&self, params: &ViewParams) -> Result<ViewOutput> {
        let tables = self.selected_tables(params)?;
        let multi_year = params.year == YearSelection::All;
        let stratified = params.stratify == Stratify::TreeType;
        let styles = params.view.styles(multi_year, stratified);
        let features: Vec<Feature> = styles.iter().map(|s| s.feature).collect();
        let method = params.ndvi_method();

        let mut series = AggregatedSeries::empty();
        let mut lines = Vec::new();

        for (year, table) in tables {
            let rows: &[Record] = match params.plot {
                Some(code) => index_unique(table.rows(), plot_key)
                    .get(&code)
                    .map(std::slice::from_ref)
                    .unwrap_or(&[]),
                None => table.rows(),
            };
            let key_year = multi_year.then_some(year);

            if stratified {
                let strata = stratify_by_tree_type(rows, &self.trees);
                for group in [TreeType::Evergreen, TreeType::Deciduous] {
                    let members = strata.get(&group).map(Vec::as_slice).unwrap_or(&[]);
                    let template = OutputKey::new(Feature::Ndvi).group(group.as_str()).year(key_year);
                    series.merge(aggregate_group(members, &features, &template, method));
                    lines.extend(styles.iter().map(|s| line_spec(s, Some(group), key_year)));
                }
                debug!(year, groups = strata.len(), "stratified view aggregated");
            } else {
                let template = OutputKey::new(Feature::Ndvi).year(key_year);
                series.merge(aggregate_group(rows, &features, &template, method));
                lines.extend(styles.iter().map(|s| line_spec(s, None, key_year)));
                debug!(year, rows = rows.len(), "view aggregated");
            }
        }

        let mut title = format!("{} {} {}", params.year, params.statistic.label(), params.view.title());
        if stratified {
            title.push_str(" by Tree Type");
        }
        if let Some(code) = params.plot {
            title.push_str(&format!(" for Plot {code}"));
        }

        let y_domain = match params.statistic {
            Statistic::Mean => params.view.y_domain(),
            Statistic::StdDev => None,
        };

        debug!(view = %params.view, lines = lines.len(), keys = series.keys().len(), "view built");
        Ok(ViewOutput { title, y_domain, lines, rows: rows_from_series(&series), series })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Month;
    use approx::assert_relative_eq;

    fn jan() -> Month {
        Month::new(0).unwrap()
    }

    fn row(code: f64, b4: f64, b8: f64) -> Record {
        Record::new()
            .with("plotcode", code)
            .with("0_B4", b4)
            .with("0_B8", b8)
            .with("0_VHAsc", -14.0)
            .with("0_VVAsc", -8.0)
    }

    fn store() -> FeatureStore {
        let mut s = FeatureStore::new();
        s.insert_features(2017, Statistic::Mean, Table::from_rows(vec![row(1.0, 1000.0, 3000.0), row(2.0, 500.0, 1500.0)]));
        s.insert_features(2018, Statistic::Mean, Table::from_rows(vec![row(1.0, 1000.0, 4000.0)]));
        s.set_trees(vec![Tree::new(PlotCode(1), "Picea spp."), Tree::new(PlotCode(2), "Betula spp.")]);
        s
    }

    #[test]
    fn parse_parameters() {
        assert_eq!("all".parse::<YearSelection>().unwrap(), YearSelection::All);
        assert_eq!("2019".parse::<YearSelection>().unwrap(), YearSelection::Year(2019));
        assert!(matches!("20x9".parse::<YearSelection>(), Err(CanopyError::InvalidYear(_))));
        assert_eq!("NDVI".parse::<ViewKind>().unwrap(), ViewKind::Ndvi);
        assert!(matches!("thermal".parse::<ViewKind>(), Err(CanopyError::UnknownView(_))));
        assert_eq!("stdD".parse::<Statistic>().unwrap(), Statistic::StdDev);
        assert_eq!("tree-type".parse::<Stratify>().unwrap(), Stratify::TreeType);
        assert_eq!("Environmental".parse::<ViewKind>().unwrap(), ViewKind::Environmental);
        assert!(ViewKind::ALL.iter().all(|v| v.as_str().parse::<ViewKind>().unwrap() == *v));
    }

    #[test]
    fn params_from_json() {
        let p: ViewParams =
            serde_json::from_str(r#"{"year": 2018, "view": "optical", "plot": 1014301, "stratify": "treeType"}"#).unwrap();
        assert_eq!(p.year, YearSelection::Year(2018));
        assert_eq!(p.statistic, Statistic::Mean);
        assert_eq!(p.plot, Some(PlotCode(1014301)));
        let p: ViewParams = serde_json::from_str(r#"{"year": "all"}"#).unwrap();
        assert_eq!(p.year, YearSelection::All);
        assert_eq!(p.view, ViewKind::Backscatter);
    }

    #[test]
    fn plot_code_given_as_string() {
        let p: ViewParams = serde_json::from_str(r#"{"year": 2017, "plot": "1014301"}"#).unwrap();
        assert_eq!(p.plot, Some(PlotCode(1014301)));
        assert!(serde_json::from_str::<ViewParams>(r#"{"plot": "north"}"#).is_err());
    }

    #[test]
    fn all_years_suffixes_keys_and_colors() {
        let out = store().build_view(&ViewParams { view: ViewKind::Backscatter, ..Default::default() }).unwrap();
        let keys: Vec<_> = out.lines.iter().map(|l| l.key.as_str()).collect();
        assert_eq!(keys, vec!["VHAsc_2017", "VVAsc_2017", "VHAsc_2018", "VVAsc_2018"]);
        assert_eq!(out.lines[2].color, "hsl(30, 70%, 50%)");
        assert_eq!(out.lines[2].name, "VH Asc 2018");
        assert_eq!(out.title, "All Years Mean Sentinel-1 Backscatter");
        assert_eq!(out.y_domain, Some([-20.0, -5.0]));
        assert_eq!(out.series.get(jan(), "VHAsc_2017").map(|s| s.count), Some(2));
    }

    #[test]
    fn single_year_ndvi_is_ratio_of_means() {
        let params = ViewParams { year: YearSelection::Year(2017), view: ViewKind::Ndvi, ..Default::default() };
        let out = store().build_view(&params).unwrap();
        // (2250 - 750) / (2250 + 750)
        assert_relative_eq!(out.series.derived(jan(), "NDVI").unwrap(), 0.5);
        assert_relative_eq!(out.rows[0].get("NDVI").unwrap(), 0.5);
        assert_eq!(out.lines[0].key, "NDVI");
        assert_eq!(out.lines[0].color, "#2ecc71");
    }

    #[test]
    fn missing_year_is_an_error() {
        let params = ViewParams { year: YearSelection::Year(2021), ..Default::default() };
        assert!(matches!(store().build_view(&params), Err(CanopyError::YearNotLoaded(2021))));
        let params = ViewParams { year: YearSelection::Year(2017), statistic: Statistic::StdDev, ..Default::default() };
        assert!(matches!(store().build_view(&params), Err(CanopyError::YearNotLoaded(2017))));
    }

    #[test]
    fn single_plot_and_missing_plot() {
        let mut params = ViewParams { year: YearSelection::Year(2017), view: ViewKind::Optical, ..Default::default() };
        params.plot = Some(PlotCode(2));
        let out = store().build_view(&params).unwrap();
        assert_relative_eq!(out.series.get(jan(), "B4").unwrap().mean, 500.0);
        assert_eq!(out.series.get(jan(), "B4").unwrap().count, 1);
        assert!(out.title.ends_with("for Plot 2"));

        params.plot = Some(PlotCode(99));
        let out = store().build_view(&params).unwrap();
        assert!(out.series.is_empty());
        assert_eq!(out.rows.len(), 12);
    }

    #[test]
    fn stratified_ndvi_is_mean_of_ratios_per_type() {
        let params = ViewParams {
            year: YearSelection::Year(2017),
            view: ViewKind::Ndvi,
            stratify: Stratify::TreeType,
            ..Default::default()
        };
        let out = store().build_view(&params).unwrap();
        let ever = out.series.get(jan(), "evergreen_NDVI").unwrap();
        assert_relative_eq!(ever.mean, 0.5);
        assert_eq!(ever.count, 1);
        assert!(out.series.get(jan(), "deciduous_NDVI").is_some());
        assert!(out.series.keys().iter().all(|k| !k.starts_with("unknown")));
        assert_eq!(out.lines[0].name, "Evergreen NDVI");
        assert_eq!(out.lines[0].color, "hsl(120, 70%, 50%)");
        assert!(out.title.ends_with("Vegetation Index by Tree Type"));
    }

    #[test]
    fn std_dev_views_scale_to_data() {
        let mut s = store();
        s.insert_features(2017, Statistic::StdDev, Table::from_rows(vec![row(1.0, 10.0, 20.0)]));
        let params = ViewParams { year: YearSelection::All, statistic: Statistic::StdDev, ..Default::default() };
        let out = s.build_view(&params).unwrap();
        assert_eq!(out.y_domain, None);
        assert!(out.lines.iter().all(|l| l.key.ends_with("_2017")));
        assert_eq!(s.years(), vec![2017, 2018]);
    }

    #[test]
    fn radar_view_charts_the_backscatter_ratio() {
        let params = ViewParams { year: YearSelection::Year(2017), view: ViewKind::Radar, ..Default::default() };
        let out = store().build_view(&params).unwrap();
        assert_relative_eq!(out.series.get(jan(), "VHVVRatio").unwrap().mean, -6.0);
    }

    #[test]
    fn optical_view_includes_red_edge() {
        let mut s = FeatureStore::new();
        s.insert_features(2017, Statistic::Mean, Table::from_rows(vec![row(1.0, 1000.0, 3000.0).with("0_B5", 1200.0)]));
        let params = ViewParams { year: YearSelection::Year(2017), view: ViewKind::Optical, ..Default::default() };
        let out = s.build_view(&params).unwrap();
        let b5 = out.lines.iter().find(|l| l.key == "B5").unwrap();
        assert_eq!(b5.name, "Red Edge");
        assert_eq!(b5.color, "#d32f2f");
        assert_relative_eq!(out.series.get(jan(), "B5").unwrap().mean, 1200.0);
    }

    #[test]
    fn environmental_view_repeats_site_values_each_month() {
        let mut s = FeatureStore::new();
        let rows = vec![
            row(1.0, 1000.0, 3000.0).with("wai", 0.4).with("sgdd", 1800.0),
            row(2.0, 1000.0, 3000.0).with("wai", 0.6).with("sgdd", 2200.0),
        ];
        s.insert_features(2017, Statistic::Mean, Table::from_rows(rows));
        let params = ViewParams { year: YearSelection::Year(2017), view: ViewKind::Environmental, ..Default::default() };
        let out = s.build_view(&params).unwrap();

        let keys: Vec<_> = out.lines.iter().map(|l| l.key.as_str()).collect();
        assert_eq!(keys, vec!["wai", "sgdd"]);
        assert_eq!(out.lines[0].name, "Water Availability Index");
        assert_eq!(out.y_domain, None);
        assert!(out.title.ends_with("Environmental Parameters"));
        for m in Month::all() {
            assert_relative_eq!(out.series.get(m, "wai").unwrap().mean, 0.5);
            assert_relative_eq!(out.series.get(m, "sgdd").unwrap().mean, 2000.0);
        }
    }
}
