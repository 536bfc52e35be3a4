//! Ratio indices derived from pairs of band values.

use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregatedSeries, OutputKey};
use crate::features::{Feature, Metric};

/// How NDVI is combined with averaging over a group of plots.
///
/// The two are different statistics; each call site picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NdviMethod {
    /// Average B8 and B4 over the group, then take the ratio.
    RatioOfMeans,
    /// Take the ratio per record, then average (gives spread and count).
    MeanOfRatios,
}

/// `(a - b) / (a + b)`, or `None` when an operand is missing or the sum is zero.
pub fn normalized_difference(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    let (a, b) = (a?, b?);
    let sum = a + b;
    if sum == 0.0 {
        return None;
    }
    let v = (a - b) / sum;
    v.is_finite().then_some(v)
}

pub fn ndvi(nir: Option<f64>, red: Option<f64>) -> Option<f64> {
    normalized_difference(nir, red)
}

/// VH minus VV backscatter. Both are in dB, so the difference is the log ratio.
pub fn backscatter_ratio_db(vh: Option<f64>, vv: Option<f64>) -> Option<f64> {
    let v = vh? - vv?;
    v.is_finite().then_some(v)
}

/// Add NDVI computed from the averaged B8 and B4 of each month.
///
/// `template` names the group/year the band means were stored under; the
/// index is written under the same prefix and suffix with feature `NDVI`.
/// Months where either mean is absent get no value.
pub fn apply_ndvi_of_means(series: &mut AggregatedSeries, template: &OutputKey) {
    let nir_key = template.with_feature(Feature::Metric(Metric::NIR)).to_string();
    let red_key = template.with_feature(Feature::Metric(Metric::RED)).to_string();
    let ndvi_key = template.with_feature(Feature::Ndvi).to_string();

    for entry in series.entries_mut() {
        let nir = entry.stats.get(&nir_key).map(|s| s.mean);
        let red = entry.stats.get(&red_key).map(|s| s.mean);
        if let Some(v) = ndvi(nir, red) {
            entry.derived.insert(ndvi_key.clone(), v);
        }
    }
}
