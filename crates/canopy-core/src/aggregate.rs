//! Per-month, per-feature group statistics.
//!
//! For every month and feature the aggregator collects the values that are
//! actually present on the group's records and summarises exactly that set.
//! Months are independent: nothing is carried forward or backward, and a
//! feature with no values in a month is simply absent from that month.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::features::{self, Feature, Month, MONTHS_PER_YEAR};
use crate::record::Record;
use crate::stats::{summarize, Summary};

// ── Output keys ───────────────────────────────────────────────────────────────

/// Name of one charted series: `[{group}_]{feature}[_{year}]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputKey {
    pub group: Option<String>,
    pub feature: Feature,
    pub year: Option<u16>,
}

impl OutputKey {
    pub fn new(feature: Feature) -> Self {
        Self { group: None, feature, year: None }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn year(mut self, year: Option<u16>) -> Self {
        self.year = year;
        self
    }

    pub fn with_feature(&self, feature: Feature) -> Self {
        Self { feature, ..self.clone() }
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(g) = &self.group {
            write!(f, "{g}_")?;
        }
        write!(f, "{}", self.feature)?;
        if let Some(y) = self.year {
            write!(f, "_{y}")?;
        }
        Ok(())
    }
}

// ── Series ────────────────────────────────────────────────────────────────────

/// One month of chart-ready statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthEntry {
    pub month: Month,
    /// Output key → statistics over the values present this month.
    pub stats: BTreeMap<String, Summary>,
    /// Output key → index computed from other keys' means (no spread).
    pub derived: BTreeMap<String, f64>,
}

impl MonthEntry {
    fn empty(month: Month) -> Self {
        Self { month, stats: BTreeMap::new(), derived: BTreeMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty() && self.derived.is_empty()
    }
}

/// Exactly twelve month entries, January first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregatedSeries {
    entries: Vec<MonthEntry>,
}

impl Default for AggregatedSeries {
    fn default() -> Self {
        Self::empty()
    }
}

impl AggregatedSeries {
    pub fn empty() -> Self {
        Self { entries: Month::all().map(MonthEntry::empty).collect() }
    }

    pub fn entries(&self) -> &[MonthEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [MonthEntry] {
        &mut self.entries
    }

    pub fn entry(&self, month: Month) -> &MonthEntry {
        &self.entries[month.index()]
    }

    pub fn get(&self, month: Month, key: &str) -> Option<&Summary> {
        self.entry(month).stats.get(key)
    }

    pub fn derived(&self, month: Month, key: &str) -> Option<f64> {
        self.entry(month).derived.get(key).copied()
    }

    /// Every key present in any month, sorted.
    pub fn keys(&self) -> BTreeSet<&str> {
        self.entries
            .iter()
            .flat_map(|e| e.stats.keys().chain(e.derived.keys()))
            .map(String::as_str)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(MonthEntry::is_empty)
    }

    /// Fold another series' keys into this one, month by month.
    /// Keys already present are overwritten by `other`.
    pub fn merge(&mut self, other: AggregatedSeries) {
        for (mine, theirs) in self.entries.iter_mut().zip(other.entries) {
            mine.stats.extend(theirs.stats);
            mine.derived.extend(theirs.derived);
        }
    }
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Aggregate `group`, naming each output by its feature.
pub fn aggregate<R: Borrow<Record>>(group: &[R], features: &[Feature]) -> AggregatedSeries {
    aggregate_with_keys(group, features, |f| f.name().to_string())
}

/// Aggregate `group`, naming each output with `key`.
pub fn aggregate_with_keys<R, F>(group: &[R], features: &[Feature], key: F) -> AggregatedSeries
where
    R: Borrow<Record>,
    F: Fn(Feature) -> String,
{
    let mut series = AggregatedSeries::empty();
    debug_assert_eq!(series.entries.len(), MONTHS_PER_YEAR);

    for entry in series.entries.iter_mut() {
        let month = entry.month;
        for &feature in features {
            let values = group.iter().map(|r| features::extract(r.borrow(), month, feature));
            if let Some(summary) = summarize(values) {
                entry.stats.insert(key(feature), summary);
            }
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Metric;
    use approx::assert_relative_eq;

    fn plot(code: f64, jan_vh: Option<f64>) -> Record {
        let mut r = Record::new().with("plotcode", code);
        if let Some(v) = jan_vh {
            r.insert("0_VHAsc", v);
        }
        r
    }

    #[test]
    fn mean_std_count_over_present_values() {
        let group = vec![plot(1.0, Some(-5.0)), plot(2.0, Some(-7.0)), plot(3.0, None)];
        let series = aggregate(&group, &[Feature::Metric(Metric::VHAsc)]);
        let jan = series.get(Month::new(0).unwrap(), "VHAsc").unwrap();
        assert_relative_eq!(jan.mean, -6.0);
        assert_relative_eq!(jan.std_dev, 1.0);
        assert_eq!(jan.count, 2);
    }

    #[test]
    fn months_without_values_are_absent() {
        let group = vec![plot(1.0, Some(-5.0))];
        let series = aggregate(&group, &[Feature::Metric(Metric::VHAsc)]);
        assert_eq!(series.entries().len(), 12);
        for m in Month::all().skip(1) {
            assert!(series.get(m, "VHAsc").is_none(), "{m} should be empty");
        }
    }

    #[test]
    fn empty_group_yields_twelve_empty_months() {
        let group: Vec<Record> = Vec::new();
        let series = aggregate(&group, &Feature::metrics(&Metric::ALL));
        assert_eq!(series.entries().len(), 12);
        assert!(series.is_empty());
    }

    #[test]
    fn aggregation_is_idempotent() {
        let group = vec![plot(1.0, Some(-5.5)), plot(2.0, Some(-9.25)), plot(3.0, Some(-4.0))];
        let features = [Feature::Metric(Metric::VHAsc), Feature::Ndvi];
        let first = aggregate(&group, &features);
        let second = aggregate(&group, &features);
        assert_eq!(first, second);
    }

    #[test]
    fn borrowed_groups_from_an_index() {
        let rows = vec![plot(1.0, Some(-5.0)), plot(1.0, Some(-7.0))];
        let g = crate::index::group_by(&rows, crate::index::plot_key);
        let members = g.get(&crate::record::PlotCode(1));
        let series = aggregate(members, &[Feature::Metric(Metric::VHAsc)]);
        assert_eq!(series.get(Month::new(0).unwrap(), "VHAsc").map(|s| s.count), Some(2));
    }

    #[test]
    fn keys_and_merge() {
        let a = vec![plot(1.0, Some(-5.0))];
        let b = vec![plot(2.0, Some(-8.0))];
        let vh = Feature::Metric(Metric::VHAsc);
        let mut series = aggregate_with_keys(&a, &[vh], |f| OutputKey::new(f).year(Some(2017)).to_string());
        series.merge(aggregate_with_keys(&b, &[vh], |f| OutputKey::new(f).year(Some(2018)).to_string()));
        let keys: Vec<_> = series.keys().into_iter().collect();
        assert_eq!(keys, vec!["VHAsc_2017", "VHAsc_2018"]);
        assert_relative_eq!(series.get(Month::new(0).unwrap(), "VHAsc_2018").unwrap().mean, -8.0);
    }

    #[test]
    fn output_key_formatting() {
        let k = OutputKey::new(Feature::Ndvi).group("evergreen").year(Some(2019));
        assert_eq!(k.to_string(), "evergreen_NDVI_2019");
        assert_eq!(OutputKey::new(Feature::Metric(Metric::B4)).to_string(), "B4");
    }
}
