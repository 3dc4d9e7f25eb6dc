//! Walks a compiled `SheetLayout` over a workbook and emits one record per unit.

use super::layouts::{DetailRule, EmptyPolicy, Naming, SheetLayout, UnitScan};
use super::models::Record;
use crate::workbook::{Sheet, Workbook, is_blank};
use serde_json::Value;

/// Position of one unit inside its sheet
#[derive(Debug, Clone, Copy)]
struct Unit {
    /// One-based index of the unit within its scan
    id2: u32,
    /// Row the unit was discovered on
    row: u32,
}

/// Run one layout against a workbook. Missing sheets contribute nothing.
pub fn extract(workbook: &Workbook, layout: &SheetLayout) -> Vec<Record> {
    let mut records = Vec::new();

    for sheet_name in &layout.sheets {
        let Some(sheet) = workbook.sheet(sheet_name) else {
            tracing::debug!(
                source = workbook.source(),
                sheet = %sheet_name,
                table = %layout.table,
                "sheet absent, skipping"
            );
            continue;
        };

        match layout.units {
            UnitScan::HeaderColumns {
                row,
                first_col,
                last_col,
            } => {
                for col in first_col..=last_col {
                    let header = sheet.cell(row, col);
                    if is_blank(header.as_ref()) {
                        continue;
                    }
                    let unit = Unit {
                        id2: col - first_col + 1,
                        row,
                    };
                    let mut record = seed_header_unit(workbook.source(), unit.id2, header);
                    apply_details(sheet, layout, unit, &mut record);
                    records.push(record);
                }
            }
            UnitScan::HeaderCell { row, col } => {
                let header = sheet.cell(row, col);
                if is_blank(header.as_ref()) {
                    continue;
                }
                let mut record = Record::new();
                record.insert("produit".to_string(), header.unwrap_or(Value::Null));
                apply_details(sheet, layout, Unit { id2: 1, row }, &mut record);
                records.push(record);
            }
            UnitScan::Rows {
                first_row,
                last_row,
                stop_col,
            } => {
                for row in first_row..=last_row {
                    if is_zero(sheet.cell(row, stop_col).as_ref()) {
                        break;
                    }
                    let mut record = Record::new();
                    for (name, col) in &layout.seeds {
                        match sheet.cell(row, *col) {
                            Some(value) => record.insert(name.clone(), value),
                            None => record.insert("null".to_string(), Value::Null),
                        };
                    }
                    let unit = Unit {
                        id2: row - first_row + 1,
                        row,
                    };
                    apply_details(sheet, layout, unit, &mut record);
                    records.push(record);
                }
            }
        }
    }

    tracing::debug!(
        source = workbook.source(),
        table = %layout.table,
        records = records.len(),
        "extraction finished"
    );
    records
}

/// `id`, `id2`, `clef`, `produit`, in that order
fn seed_header_unit(source: &str, id2: u32, header: Option<Value>) -> Record {
    let mut record = Record::new();
    record.insert("id".to_string(), Value::from(source));
    record.insert("id2".to_string(), Value::from(id2));
    record.insert("clef".to_string(), Value::from(composite_key(source, id2)));
    record.insert("produit".to_string(), header.unwrap_or(Value::Null));
    record
}

/// Synthetic join key shared by every layout that scans the same header columns
pub fn composite_key(source: &str, id2: u32) -> String {
    format!("{source}&_{id2}")
}

fn is_zero(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Number(n)) if n.as_f64() == Some(0.0))
}

fn apply_details(sheet: &Sheet, layout: &SheetLayout, unit: Unit, record: &mut Record) {
    for rule in &layout.details {
        match *rule {
            DetailRule::Block {
                label_col,
                first_row,
                last_row,
                value,
                naming,
                empty,
            } => {
                let value_col = value.resolve(unit.id2);
                for row in first_row..=last_row {
                    let label = sheet.cell(row, label_col);
                    let value = sheet.cell(row, value_col);
                    push_pair(record, naming, empty, label, value);
                }
            }
            DetailRule::Sweep {
                label_row,
                first_col,
                last_col,
            } => {
                for col in first_col..=last_col {
                    let label = sheet.cell(label_row, col);
                    let value = sheet.cell(unit.row, col);
                    push_pair(record, Naming::Label, EmptyPolicy::Keep, label, value);
                }
            }
        }
    }
}

fn push_pair(
    record: &mut Record,
    naming: Naming,
    empty: EmptyPolicy,
    label: Option<Value>,
    value: Option<Value>,
) {
    let skip = match empty {
        EmptyPolicy::Keep => false,
        EmptyPolicy::SkipBlankLabel => is_blank(label.as_ref()),
        EmptyPolicy::SkipBlankValue => is_blank(value.as_ref()),
    };
    if skip {
        return;
    }
    record.insert(
        naming.field_name(label.as_ref()),
        value.unwrap_or(Value::Null),
    );
}
