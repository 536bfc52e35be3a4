//! Monthly feature extraction from `"{month}_{metric}"` columns.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CanopyError;
use crate::indices;
use crate::record::{columns, Record};

pub const MONTHS_PER_YEAR: usize = 12;

const MONTH_LABELS: [&str; MONTHS_PER_YEAR] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// ── Month ─────────────────────────────────────────────────────────────────────

/// Zero-based month index, always in `0..12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Month(u8);

impl Month {
    pub fn new(index: usize) -> Option<Self> {
        (index < MONTHS_PER_YEAR).then_some(Month(index as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn label(self) -> &'static str {
        MONTH_LABELS[self.index()]
    }

    /// January through December.
    pub fn all() -> impl Iterator<Item = Month> {
        (0..MONTHS_PER_YEAR as u8).map(Month)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Metric ────────────────────────────────────────────────────────────────────

/// A per-month column family in the `features_{year}_*.csv` tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    VHAsc,
    VVAsc,
    VHDes,
    VVDes,
    B2,
    B3,
    B4,
    B5,
    B8,
    B11,
    B12,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::VHAsc,
        Metric::VVAsc,
        Metric::VHDes,
        Metric::VVDes,
        Metric::B2,
        Metric::B3,
        Metric::B4,
        Metric::B5,
        Metric::B8,
        Metric::B11,
        Metric::B12,
    ];

    pub const NIR: Metric = Metric::B8;
    pub const RED: Metric = Metric::B4;

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::VHAsc => "VHAsc",
            Metric::VVAsc => "VVAsc",
            Metric::VHDes => "VHDes",
            Metric::VVDes => "VVDes",
            Metric::B2 => "B2",
            Metric::B3 => "B3",
            Metric::B4 => "B4",
            Metric::B5 => "B5",
            Metric::B8 => "B8",
            Metric::B11 => "B11",
            Metric::B12 => "B12",
        }
    }

    /// Human label used for chart legends.
    pub fn label(self) -> &'static str {
        match self {
            Metric::VHAsc => "VH Ascending",
            Metric::VVAsc => "VV Ascending",
            Metric::VHDes => "VH Descending",
            Metric::VVDes => "VV Descending",
            Metric::B2 => "Blue (B2)",
            Metric::B3 => "Green (B3)",
            Metric::B4 => "Red (B4)",
            Metric::B5 => "Red Edge (B5)",
            Metric::B8 => "NIR (B8)",
            Metric::B11 => "SWIR (B11)",
            Metric::B12 => "SWIR2 (B12)",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CanopyError::UnknownMetric(s.to_string()))
    }
}

/// Column holding `metric` for `month`, e.g. `"3_B8"`.
pub fn column_name(month: Month, metric: Metric) -> String {
    format!("{}_{}", month.index(), metric.as_str())
}

// ── Site variables ────────────────────────────────────────────────────────────

/// A per-plot column with one value for the whole year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SiteVariable {
    /// Water availability index.
    Wai,
    /// Sum of growing degree days.
    Sgdd,
}

impl SiteVariable {
    pub fn column(self) -> &'static str {
        match self {
            SiteVariable::Wai => columns::WAI,
            SiteVariable::Sgdd => columns::SGDD,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SiteVariable::Wai => "Water Availability Index",
            SiteVariable::Sgdd => "Growing Degree Days",
        }
    }
}

// ── Feature ───────────────────────────────────────────────────────────────────

/// A quantity read from, or computed on, one record for one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Feature {
    Metric(Metric),
    /// NDVI of this record's own B8/B4 values.
    Ndvi,
    /// VH − VV ascending, dB.
    VhVvRatio,
    /// Same value in every month.
    Site(SiteVariable),
}

impl Feature {
    pub fn name(self) -> &'static str {
        match self {
            Feature::Metric(m) => m.as_str(),
            Feature::Ndvi => "NDVI",
            Feature::VhVvRatio => "VHVVRatio",
            Feature::Site(v) => v.column(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Feature::Metric(m) => m.label(),
            Feature::Ndvi => "NDVI",
            Feature::VhVvRatio => "VH/VV Ratio",
            Feature::Site(v) => v.label(),
        }
    }

    pub fn metrics(metrics: &[Metric]) -> Vec<Feature> {
        metrics.iter().copied().map(Feature::Metric).collect()
    }
}

impl From<Metric> for Feature {
    fn from(m: Metric) -> Self {
        Feature::Metric(m)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Extraction ────────────────────────────────────────────────────────────────

/// Value of `metric` for `month`; `None` when the column is absent or not numeric.
pub fn extract_metric(record: &Record, month: Month, metric: Metric) -> Option<f64> {
    record.number(&column_name(month, metric))
}

pub fn extract(record: &Record, month: Month, feature: Feature) -> Option<f64> {
    match feature {
        Feature::Metric(m) => extract_metric(record, month, m),
        Feature::Ndvi => indices::ndvi(
            extract_metric(record, month, Metric::NIR),
            extract_metric(record, month, Metric::RED),
        ),
        Feature::VhVvRatio => indices::backscatter_ratio_db(
            extract_metric(record, month, Metric::VHAsc),
            extract_metric(record, month, Metric::VVAsc),
        ),
        Feature::Site(v) => record.number(v.column()),
    }
}

pub fn extract_month(record: &Record, month: Month, features: &[Feature]) -> BTreeMap<Feature, Option<f64>> {
    features.iter().map(|&f| (f, extract(record, month, f))).collect()
}

/// Twelve month slots of feature values for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyFeatureSet {
    months: Vec<BTreeMap<Feature, Option<f64>>>,
}

impl MonthlyFeatureSet {
    pub fn get(&self, month: Month, feature: Feature) -> Option<f64> {
        self.months.get(month.index())?.get(&feature).copied().flatten()
    }

    /// January first; always twelve slots.
    pub fn months(&self) -> &[BTreeMap<Feature, Option<f64>>] {
        &self.months
    }
}

pub fn monthly_features(record: &Record, features: &[Feature]) -> MonthlyFeatureSet {
    MonthlyFeatureSet {
        months: Month::all().map(|m| extract_month(record, m, features)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plot() -> Record {
        Record::new()
            .with("plotcode", 1.0)
            .with("0_VHAsc", -14.2)
            .with("0_B4", 1000.0)
            .with("0_B8", 3000.0)
            .with("0_VVAsc", -8.2)
            .with("5_B4", "n/a")
            .with("wai", 0.42)
    }

    #[test]
    fn month_bounds() {
        assert!(Month::new(0).is_some());
        assert!(Month::new(11).is_some());
        assert!(Month::new(12).is_none());
        assert_eq!(Month::all().count(), 12);
        assert_eq!(Month::new(11).map(Month::label), Some("Dec"));
    }

    #[test]
    fn column_naming_convention() {
        let m = Month::new(3).unwrap();
        assert_eq!(column_name(m, Metric::B8), "3_B8");
        assert_eq!(column_name(m, Metric::VHAsc), "3_VHAsc");
    }

    #[test]
    fn missing_or_non_numeric_columns_yield_none() {
        let r = plot();
        assert_eq!(extract_metric(&r, Month::new(1).unwrap(), Metric::B4), None);
        assert_eq!(extract_metric(&r, Month::new(5).unwrap(), Metric::B4), None);
        assert_eq!(extract_metric(&r, Month::new(0).unwrap(), Metric::B12), None);
    }

    #[test]
    fn derived_features_per_record() {
        let r = plot();
        let jan = Month::new(0).unwrap();
        assert_relative_eq!(extract(&r, jan, Feature::Ndvi).unwrap(), 0.5);
        assert_relative_eq!(extract(&r, jan, Feature::VhVvRatio).unwrap(), -6.0, epsilon = 1e-9);
        assert_eq!(extract(&r, Month::new(1).unwrap(), Feature::Ndvi), None);
    }

    #[test]
    fn site_variables_repeat_every_month() {
        let r = plot();
        let wai = Feature::Site(SiteVariable::Wai);
        for m in Month::all() {
            assert_eq!(extract(&r, m, wai), Some(0.42));
        }
        assert_eq!(extract(&r, Month::new(4).unwrap(), Feature::Site(SiteVariable::Sgdd)), None);
        assert_eq!(wai.name(), "wai");
        assert_eq!(Feature::Site(SiteVariable::Sgdd).label(), "Growing Degree Days");
    }

    #[test]
    fn monthly_set_has_twelve_slots() {
        let features = [Feature::Metric(Metric::VHAsc), Feature::Ndvi];
        let set = monthly_features(&plot(), &features);
        assert_eq!(set.months().len(), 12);
        assert_eq!(set.get(Month::new(0).unwrap(), Feature::Metric(Metric::VHAsc)), Some(-14.2));
        assert_eq!(set.get(Month::new(7).unwrap(), Feature::Ndvi), None);
        assert!(set.months().iter().all(|slot| slot.len() == 2));
    }

    #[test]
    fn metric_names_parse() {
        assert_eq!("b8".parse::<Metric>().unwrap(), Metric::B8);
        assert_eq!("VHAsc".parse::<Metric>().unwrap(), Metric::VHAsc);
        assert!("B99".parse::<Metric>().is_err());
    }
}
