//! Flat, chart-ready rows: one object per month with numeric fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregatedSeries;

pub const STD_DEV_SUFFIX: &str = "_stdDev";
pub const COUNT_SUFFIX: &str = "_count";

/// `{"month": "Jan", "<key>": mean, "<key>_stdDev": sd, "<key>_count": n, ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRow")]
pub struct ChartRow {
    pub month: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl ChartRow {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
}

// Rows written by other tools may carry strings or nulls; only numbers are kept.
#[derive(Deserialize)]
struct RawRow {
    month: String,
    #[serde(flatten)]
    values: BTreeMap<String, serde_json::Value>,
}

impl From<RawRow> for ChartRow {
    fn from(raw: RawRow) -> Self {
        let values = raw
            .values
            .into_iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k, n)))
            .collect();
        Self { month: raw.month, values }
    }
}

pub fn rows_from_series(series: &AggregatedSeries) -> Vec<ChartRow> {
    series
        .entries()
        .iter()
        .map(|entry| {
            let mut values = BTreeMap::new();
            for (key, s) in &entry.stats {
                values.insert(key.clone(), s.mean);
                values.insert(format!("{key}{STD_DEV_SUFFIX}"), s.std_dev);
                values.insert(format!("{key}{COUNT_SUFFIX}"), s.count as f64);
            }
            for (key, &v) in &entry.derived {
                values.insert(key.clone(), v);
            }
            ChartRow { month: entry.month.label().to_string(), values }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::features::{Feature, Metric};
    use crate::record::Record;
    use approx::assert_relative_eq;

    #[test]
    fn rows_flatten_summaries() {
        let group = vec![
            Record::new().with("plotcode", 1.0).with("0_VHAsc", -5.0),
            Record::new().with("plotcode", 2.0).with("0_VHAsc", -7.0),
        ];
        let rows = rows_from_series(&aggregate(&group, &[Feature::Metric(Metric::VHAsc)]));
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].month, "Jan");
        assert_relative_eq!(rows[0].get("VHAsc").unwrap(), -6.0);
        assert_relative_eq!(rows[0].get("VHAsc_stdDev").unwrap(), 1.0);
        assert_eq!(rows[0].get("VHAsc_count"), Some(2.0));
        assert!(rows[1].values.is_empty());
    }

    #[test]
    fn json_shape() {
        let mut values = BTreeMap::new();
        values.insert("NDVI".to_string(), 0.5);
        let row = ChartRow { month: "Jun".into(), values };
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"month":"Jun","NDVI":0.5}"#);
    }

    #[test]
    fn non_numeric_fields_are_dropped_on_read() {
        let row: ChartRow =
            serde_json::from_str(r#"{"month": "Feb", "Picea abies": 0.41, "note": "x", "Pinus": null}"#).unwrap();
        assert_eq!(row.month, "Feb");
        assert_eq!(row.values.len(), 1);
        assert_eq!(row.get("Picea abies"), Some(0.41));
    }
}
