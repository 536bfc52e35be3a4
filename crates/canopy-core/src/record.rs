use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::{CanopyError, Result};

// ── Column names ──────────────────────────────────────────────────────────────

pub mod columns {
    pub const PLOTCODE: &str = "plotcode";
    pub const COUNTRY: &str = "country";
    pub const SURVEY_DATE_1: &str = "surveydate1";
    pub const SURVEY_DATE_2: &str = "surveydate2";
    pub const LATITUDE: &str = "latitude_generalised";
    pub const LONGITUDE: &str = "longitude_generalised";
    pub const TAXON_NAME: &str = "taxonname";
    pub const WAI: &str = "wai";
    pub const SGDD: &str = "sgdd";
}

// ── Values ────────────────────────────────────────────────────────────────────

/// One cell of a source table.
///
/// Numbers are always finite: anything that would be NaN or infinite is
/// stored as `Null` so it can never leak into a mean.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

static NULL: Value = Value::Null;

impl Value {
    pub fn number(v: f64) -> Self {
        if v.is_finite() {
            Value::Number(v)
        } else {
            Value::Null
        }
    }

    /// Type a raw CSV cell: empty → null, finite number → number, else text.
    pub fn parse_cell(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return Value::Null;
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Value::Number(v),
            Ok(_) => Value::Null,
            Err(_) => Value::Text(s.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Number(n) => n.as_f64().map(Value::number).unwrap_or_default(),
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Text(other.to_string()),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::number(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

// ── Plot codes ────────────────────────────────────────────────────────────────

/// Canonical plot identifier.
///
/// Source tables disagree on whether `plotcode` is a number or a string, so
/// every key is converted to this integer form before it is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PlotCode(pub i64);

impl PlotCode {
    pub fn from_f64(v: f64) -> Option<Self> {
        if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
            Some(PlotCode(v as i64))
        } else {
            None
        }
    }

    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => Self::from_f64(*n),
            Value::Text(s) => s.parse().ok(),
            Value::Null => None,
        }
    }
}

impl FromStr for PlotCode {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim();
        if let Ok(v) = t.parse::<i64>() {
            return Ok(PlotCode(v));
        }
        t.parse::<f64>()
            .ok()
            .and_then(Self::from_f64)
            .ok_or_else(|| CanopyError::InvalidPlotCode(s.to_string()))
    }
}

/// Accepts an integer, an integral float (JS numbers) or a numeric string.
impl<'de> Deserialize<'de> for PlotCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Float(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(v) => Ok(PlotCode(v)),
            Raw::Float(v) => {
                PlotCode::from_f64(v).ok_or_else(|| de::Error::custom(format!("invalid plot code: {v}")))
            }
            Raw::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

impl fmt::Display for PlotCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Records and tables ────────────────────────────────────────────────────────

/// One row of a source table, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    cells: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.cells.insert(column.into(), value.into());
    }

    /// Builder form of [`Record::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// The cell under `column`, or `Null` when the column is absent.
    pub fn get(&self, column: &str) -> &Value {
        self.cells.get(column).unwrap_or(&NULL)
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).as_f64()
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).as_str()
    }

    pub fn plot_code(&self) -> Option<PlotCode> {
        PlotCode::from_value(self.get(columns::PLOTCODE))
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// An ordered sequence of records plus the header order they were read with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    /// Build a table whose header is the union of the rows' columns, sorted.
    pub fn from_rows(rows: Vec<Record>) -> Self {
        let mut columns: Vec<String> = rows
            .iter()
            .flat_map(|r| r.cells.keys().cloned())
            .collect();
        columns.sort();
        columns.dedup();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Fail with [`CanopyError::MissingColumn`] unless `column` is in the header.
    pub fn require_column(&self, table: &str, column: &str) -> Result<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(CanopyError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
        }
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
