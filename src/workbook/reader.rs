//! Workbook loading on top of calamine.
//!
//! Every sheet is materialized once at load time, so a `Workbook` is plain
//! immutable data that can be shared across extraction tasks.

use crate::common::errors::{BusinessError, BusinessResult};
use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::io::Cursor;

/// One decoded worksheet
#[derive(Debug, Clone)]
pub struct Sheet {
    range: Range<Data>,
}

impl Sheet {
    pub fn new(range: Range<Data>) -> Self {
        Self { range }
    }

    /// Scalar at a zero-based position; empty cells and cells outside the used range are absent
    pub fn cell(&self, row: u32, col: u32) -> Option<Value> {
        self.range.get_value((row, col)).and_then(cell_value)
    }
}

/// In-memory, read-only workbook identified by the name of the file it came from
#[derive(Debug, Clone)]
pub struct Workbook {
    source: String,
    sheets: HashMap<String, Sheet>,
    sheet_order: Vec<String>,
}

impl Workbook {
    /// Decode a workbook container (xlsb, xlsx, xls or ods, auto-detected)
    pub fn from_bytes(source: &str, bytes: Vec<u8>) -> BusinessResult<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| {
            BusinessError::UnreadableWorkbook {
                file: source.to_string(),
                message: e.to_string(),
            }
        })?;

        let sheets = keep_readable_sheets(
            source,
            workbook.sheet_names().into_iter().map(|name| {
                let range = workbook.worksheet_range(&name);
                (name, range)
            }),
        );
        tracing::debug!(source, sheets = sheets.len(), "workbook decoded");

        Ok(Self::from_sheets(source, sheets))
    }

    /// Build a workbook from already decoded ranges
    pub fn from_sheets(source: &str, sheets: Vec<(String, Range<Data>)>) -> Self {
        let sheet_order = sheets.iter().map(|(name, _)| name.clone()).collect();
        let sheets = sheets
            .into_iter()
            .map(|(name, range)| (name, Sheet::new(range)))
            .collect();

        Self {
            source: source.to_string(),
            sheets,
            sheet_order,
        }
    }

    /// File name the workbook was read from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_order
    }
}

/// Drop the sheets the codec could not parse, logging each one.
///
/// A dropped sheet then reads as missing, like in a workbook without it.
fn keep_readable_sheets<E: std::fmt::Display>(
    source: &str,
    sheets: impl IntoIterator<Item = (String, Result<Range<Data>, E>)>,
) -> Vec<(String, Range<Data>)> {
    sheets
        .into_iter()
        .filter_map(|(name, range)| match range {
            Ok(range) => Some((name, range)),
            Err(e) => {
                tracing::warn!(source, sheet = %name, error = %e, "skipping unreadable sheet");
                None
            }
        })
        .collect()
}

/// Convert a codec cell into the JSON scalar stored in records.
///
/// Integral floats become integers so that `1000.0` and `1000` compare equal
/// in joins and serialize identically.
pub fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            Some(Value::String(s.clone()))
        }
        Data::Int(i) => Some(Value::from(*i)),
        Data::Float(f) => Some(float_value(*f)),
        Data::Bool(b) => Some(Value::Bool(*b)),
        Data::DateTime(dt) => Some(float_value(dt.as_f64())),
        Data::Error(e) => Some(Value::String(e.to_string())),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_value(f: f64) -> Value {
    // i64::MAX is not exactly representable; stay strictly below 2^63
    if f.fract() == 0.0 && f.abs() < 9.223_372_036_854_775e18 {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

/// Blank means absent, JSON null or the empty string
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
