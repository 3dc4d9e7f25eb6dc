use crate::common::errors::BusinessResult;
use crate::extraction::models::{OperationRecord, Table};
use crate::not_found;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Identification fields shown in operation listings
pub const NAME_FIELD: &str = "Nom de l'opération";
pub const NUMBER_FIELD: &str = "Numéro";
pub const COMPANY_FIELD: &str = "Stat Société";

/// The whole application database, persisted as one JSON document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DatabaseDocument {
    #[serde(default)]
    pub operations: Vec<OperationRecord>,
}

/// Set one field on the row of `table` identified by `id2`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FieldEdit {
    pub table: Table,
    #[schema(value_type = Object)]
    pub id2: Value,
    pub key: String,
    #[schema(value_type = Object)]
    pub value: Value,
}

/// Set one field on every row, of every table, that already carries it
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GlobalFieldEdit {
    pub key: String,
    #[schema(value_type = Object)]
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldEditResult {
    pub success: bool,
    /// Previous value; `""` when the row lacked the field, null when the row was created
    #[schema(value_type = Object)]
    pub old_value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GlobalFieldEditResult {
    pub success: bool,
    pub rows_updated: usize,
}

/// One line of the operations listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OperationSummary {
    pub index: usize,
    #[schema(value_type = Object)]
    pub id: Option<Value>,
    pub name: String,
    pub number: String,
    pub company: String,
}

fn display_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `1`, `1.0` and `"1"` all designate the same row
#[allow(clippy::float_cmp)]
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

impl DatabaseDocument {
    /// Append an operation and return its index
    pub fn push(&mut self, operation: OperationRecord) -> usize {
        self.operations.push(operation);
        self.operations.len() - 1
    }

    fn operation_mut(&mut self, index: usize) -> BusinessResult<&mut OperationRecord> {
        self.operations
            .get_mut(index)
            .ok_or_else(|| not_found!("Operation", index))
    }

    /// Remove the operation at `index`, keeping the relative order of the rest
    pub fn remove(&mut self, index: usize) -> BusinessResult<OperationRecord> {
        if index >= self.operations.len() {
            return Err(not_found!("Operation", index));
        }
        Ok(self.operations.remove(index))
    }

    /// Index of the first operation consolidated from workbook `source_id`
    pub fn position_of_source(&self, source_id: &Value) -> Option<usize> {
        self.operations
            .iter()
            .position(|op| op.source_id() == Some(source_id))
    }

    /// Remove every operation consolidated from workbook `source_id`
    pub fn remove_source(&mut self, source_id: &Value) -> usize {
        let before = self.operations.len();
        self.operations
            .retain(|op| op.source_id() != Some(source_id));
        before - self.operations.len()
    }

    /// Apply a single-row edit. When no row of the table has a matching `id2`
    /// a new `{id2, key}` row is appended.
    pub fn set_field(&mut self, index: usize, edit: &FieldEdit) -> BusinessResult<Value> {
        let rows = self.operation_mut(index)?.table_mut(edit.table);

        if let Some(row) = rows.iter_mut().find(|row| {
            row.get("id2")
                .is_some_and(|id2| loosely_equal(id2, &edit.id2))
        }) {
            let old = row
                .insert(edit.key.clone(), edit.value.clone())
                .unwrap_or_else(|| Value::String(String::new()));
            return Ok(old);
        }

        let mut row = serde_json::Map::new();
        row.insert("id2".to_string(), edit.id2.clone());
        row.insert(edit.key.clone(), edit.value.clone());
        rows.push(row);
        Ok(Value::Null)
    }

    /// Overwrite `key` wherever it already exists in the operation, returning the number of rows touched
    pub fn set_field_everywhere(
        &mut self,
        index: usize,
        key: &str,
        value: &Value,
    ) -> BusinessResult<usize> {
        let operation = self.operation_mut(index)?;
        let mut updated = 0;
        for table in Table::ALL {
            for row in operation.table_mut(table) {
                if let Some(slot) = row.get_mut(key) {
                    *slot = value.clone();
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    /// Operation listing, optionally filtered by a case-insensitive name fragment
    pub fn summaries(&self, search: Option<&str>) -> Vec<OperationSummary> {
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        self.operations
            .iter()
            .enumerate()
            .map(|(index, op)| OperationSummary {
                index,
                id: op.source_id().cloned(),
                name: display_text(op.identification_field(NAME_FIELD)),
                number: display_text(op.identification_field(NUMBER_FIELD)),
                company: display_text(op.identification_field(COMPANY_FIELD)),
            })
            .filter(|summary| {
                needle
                    .as_ref()
                    .is_none_or(|n| summary.name.to_lowercase().contains(n))
            })
            .collect()
    }
}
