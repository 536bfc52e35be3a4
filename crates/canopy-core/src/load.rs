//! The table-loading boundary: CSV and JSON text → [`Table`].
//!
//! Cells are trimmed and typed by [`Value::parse_cell`]: empty is null, a
//! finite number is numeric, anything else is text. Plot codes stay as read;
//! they are converted to [`crate::PlotCode`] by whoever keys on them.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::debug;

use crate::error::Result;
use crate::record::{columns, Record, Table, Value};

pub fn read_csv<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row: Record = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), record.get(i).map(Value::parse_cell).unwrap_or_default()))
            .collect();
        rows.push(row);
    }

    debug!(rows = rows.len(), columns = headers.len(), "csv table loaded");
    Ok(Table::new(headers, rows))
}

pub fn read_csv_str(text: &str) -> Result<Table> {
    read_csv(text.as_bytes())
}

pub fn read_csv_path(path: impl AsRef<Path>) -> Result<Table> {
    let file = File::open(path.as_ref())?;
    read_csv(file)
}

/// Parse a JSON array of flat objects into a table.
pub fn read_json_rows(text: &str) -> Result<Table> {
    let raw: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(text)?;
    let rows = raw
        .into_iter()
        .map(|obj| obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
        .collect();
    Ok(Table::from_rows(rows))
}

/// Read a table that must carry a `plotcode` column.
pub fn read_keyed_csv(text: &str, name: &str) -> Result<Table> {
    let table = read_csv_str(text)?;
    table.require_column(name, columns::PLOTCODE)?;
    Ok(table)
}

pub fn read_keyed_csv_path(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let table = read_csv_path(path)?;
    table.require_column(&path.display().to_string(), columns::PLOTCODE)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CanopyError;
    use crate::index::{index_unique, plot_key};
    use crate::record::PlotCode;

    const FEATURES: &str = "\
plotcode,0_VHAsc,0_B4,0_B8,wai
1014301,-14.5,1000,3000,0.4

 1014302 , -12.0 ,, 2500,
";

    #[test]
    fn csv_typing_and_blank_lines() {
        let t = read_csv_str(FEATURES).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.columns()[0], "plotcode");
        let second = &t.rows()[1];
        assert_eq!(second.number("0_VHAsc"), Some(-12.0));
        assert!(second.get("0_B4").is_null());
        assert!(second.get("wai").is_null());
        assert_eq!(second.plot_code(), Some(PlotCode(1014302)));
    }

    #[test]
    fn short_rows_fill_with_null() {
        let t = read_csv_str("plotcode,a,b\n7,1\n").unwrap();
        assert_eq!(t.rows()[0].number("a"), Some(1.0));
        assert!(t.rows()[0].get("b").is_null());
    }

    #[test]
    fn json_rows_join_with_csv_rows() {
        let csv = read_csv_str("plotcode,x\n1014301,1\n").unwrap();
        let json = read_json_rows(r#"[{"plotcode": "1014301", "taxonname": "Picea spp."}]"#).unwrap();
        let idx = index_unique(csv.rows(), plot_key);
        let code = json.rows()[0].plot_code().unwrap();
        assert!(idx.get(&code).is_some());
    }

    #[test]
    fn keyed_tables_require_plotcode() {
        assert!(read_keyed_csv("plotcode,x\n1,2\n", "features").is_ok());
        let err = read_keyed_csv("plot,x\n1,2\n", "features").unwrap_err();
        assert!(matches!(err, CanopyError::MissingColumn { .. }));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(read_json_rows("{not json"), Err(CanopyError::Json(_))));
    }
}
