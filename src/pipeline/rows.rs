//! Input rows from CSV or JSON.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::{info, warn};

use super::error::RowSourceError;
use crate::domain::{GenerationRow, PersonaRef, parse_bool_like};

/// A row and its position in the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRow {
    pub index: usize,
    pub row: GenerationRow,
}

/// Loads rows; `.json` files are read as a list, anything else as CSV with headers.
///
/// Rows missing `persona`/`brand`/`product`/`stage_index`, or holding
/// non-integer indices, are skipped with a warning.
pub fn load_rows(path: &Path) -> Result<Vec<IndexedRow>, RowSourceError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let raw = if is_json {
        read_json_rows(path)?
    } else {
        read_csv_rows(path)?
    };

    let total = raw.len();
    let rows: Vec<IndexedRow> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, fields)| match parse_row(&fields) {
            Ok(row) => Some(IndexedRow { index, row }),
            Err(reason) => {
                warn!(row = index, reason = %reason, "skipping input row");
                None
            }
        })
        .collect();

    info!(path = %path.display(), total, usable = rows.len(), "loaded input rows");
    Ok(rows)
}

fn read_csv_rows(path: &Path) -> Result<Vec<Map<String, Value>>, RowSourceError> {
    let csv_err = |source| RowSourceError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let fields = headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        rows.push(fields);
    }
    Ok(rows)
}

fn read_json_rows(path: &Path) -> Result<Vec<Map<String, Value>>, RowSourceError> {
    let bytes = std::fs::read(path).map_err(|source| RowSourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let data: Value = serde_json::from_slice(&bytes).map_err(|source| RowSourceError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Array(items) = data else {
        return Err(RowSourceError::NotAList {
            path: path.to_path_buf(),
        });
    };

    // Non-object elements become empty rows and are skipped during parsing.
    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => map,
            _ => Map::new(),
        })
        .collect())
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match fields.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn int_field(fields: &Map<String, Value>, key: &str) -> Result<Option<i64>, String> {
    match text_field(fields, key) {
        None => Ok(None),
        Some(text) => text
            .parse()
            .map(Some)
            .map_err(|_| format!("{key} is not an integer: {text:?}")),
    }
}

/// Builds a row from loosely typed fields.
pub fn parse_row(fields: &Map<String, Value>) -> Result<GenerationRow, String> {
    let required = |key: &str| text_field(fields, key).ok_or_else(|| format!("missing {key}"));

    let persona = PersonaRef::parse(&required("persona")?);
    let brand = required("brand")?;
    let product = required("product")?;
    let stage_index = int_field(fields, "stage_index")?.ok_or("missing stage_index")?;
    let style_index = int_field(fields, "style_index")?.unwrap_or(0);
    let is_event = match fields.get("is_event") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => parse_bool_like(s),
        _ => false,
    };

    Ok(GenerationRow {
        persona,
        brand,
        product,
        stage_index,
        style_index,
        is_event,
    })
}
