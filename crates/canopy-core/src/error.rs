use thiserror::Error;

/// Errors raised at the loading and selection boundary.
///
/// Aggregation itself never fails: missing columns, missing keys, empty
/// groups and undefined ratios all surface as absent values instead.
#[derive(Error, Debug)]
pub enum CanopyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Table '{table}' has no '{column}' column")]
    MissingColumn { table: String, column: String },

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Unknown view: {0}")]
    UnknownView(String),

    #[error("Invalid year selection: {0}")]
    InvalidYear(String),

    #[error("No data loaded for year {0}")]
    YearNotLoaded(u16),

    #[error("Invalid plot code: {0}")]
    InvalidPlotCode(String),

    #[error("Invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, CanopyError>;
