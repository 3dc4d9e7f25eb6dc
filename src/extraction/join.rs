use super::models::Record;
use std::collections::HashMap;

/// Lookup form of a join key; `None` when the field is missing or null
fn key_of(record: &Record, key: &str) -> Option<String> {
    record
        .get(key)
        .filter(|value| !value.is_null())
        .map(ToString::to_string)
}

/// Inner join of `left` against `right` on `key`.
///
/// Order follows `left`. Matched records are the left fields overlaid with the
/// right fields (right wins on collisions). A later right record with the same
/// key replaces an earlier one.
pub fn join(left: &[Record], right: &[Record], key: &str) -> Vec<Record> {
    let lookup: HashMap<String, &Record> = right
        .iter()
        .filter_map(|record| key_of(record, key).map(|k| (k, record)))
        .collect();

    left.iter()
        .filter_map(|record| {
            let matched = lookup.get(&key_of(record, key)?)?;
            let mut merged = record.clone();
            for (field, value) in *matched {
                merged.insert(field.clone(), value.clone());
            }
            Some(merged)
        })
        .collect()
}
