//! Collapsing near-duplicate records that share a composite key.
//!
//! Key parts keep their JSON type, so the number `123` and the string `"123"`
//! are different keys. Callers that want those merged must normalize the
//! field upstream. Records without a key are always kept on their own.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use nycdata_model::Row;
use serde::Serialize;
use serde_json::Value;

use crate::fields;

/// One typed component of a [`DedupKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Bool(bool),
    Number(String),
    Text(String),
    Json(String),
}

impl KeyPart {
    /// `None` for JSON null.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(flag) => Some(Self::Bool(*flag)),
            Value::Number(number) => Some(Self::Number(number.to_string())),
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Array(_) | Value::Object(_) => Some(Self::Json(value.to_string())),
        }
    }
}

/// Ordered tuple of key fields with structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(Vec<KeyPart>);

impl DedupKey {
    #[must_use]
    pub const fn from_parts(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    /// Builds a key from the named fields of a row.
    ///
    /// Any missing or null component means the row has no key.
    #[must_use]
    pub fn from_fields(row: &Row, key_fields: &[&str]) -> Option<Self> {
        if key_fields.is_empty() {
            return None;
        }
        key_fields
            .iter()
            .map(|name| row.get(*name).and_then(KeyPart::from_value))
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }

    #[must_use]
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }
}

/// Output of a deduplication pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome<T> {
    pub deduplicated: Vec<T>,
    pub original_count: usize,
    pub duplicates_removed: usize,
}

impl<T> DedupOutcome<T> {
    #[must_use]
    pub const fn stats(&self) -> DedupStats {
        DedupStats {
            original_count: self.original_count,
            duplicates_removed: self.duplicates_removed,
        }
    }
}

/// Counts reported in envelope metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupStats {
    pub original_count: usize,
    pub duplicates_removed: usize,
}

/// Keeps the first record for each key and folds later ones into it.
///
/// Output order follows the first occurrence of each key.
pub fn deduplicate<T, K, M>(records: Vec<T>, key_fn: K, mut merge_fn: M) -> DedupOutcome<T>
where
    K: Fn(&T) -> Option<DedupKey>,
    M: FnMut(&mut T, T),
{
    let original_count = records.len();
    let mut positions: HashMap<DedupKey, usize> = HashMap::with_capacity(original_count);
    let mut deduplicated: Vec<T> = Vec::with_capacity(original_count);

    for record in records {
        let Some(key) = key_fn(&record) else {
            // No key field: keep the record.
            deduplicated.push(record);
            continue;
        };
        match positions.entry(key) {
            Entry::Occupied(slot) => merge_fn(&mut deduplicated[*slot.get()], record),
            Entry::Vacant(slot) => {
                slot.insert(deduplicated.len());
                deduplicated.push(record);
            }
        }
    }

    DedupOutcome {
        duplicates_removed: original_count - deduplicated.len(),
        original_count,
        deduplicated,
    }
}

/// Deduplicates rows on `key_fields`, keeping the first copy unchanged.
#[must_use]
pub fn deduplicate_rows(rows: Vec<Row>, key_fields: &[&str]) -> DedupOutcome<Row> {
    deduplicate(rows, |row| DedupKey::from_fields(row, key_fields), |_, _| {})
}

/// Rollup variant: rows sharing a composite key have their counts summed.
///
/// Unparseable counts contribute zero. The merged count is written back as a
/// JSON integer.
#[must_use]
pub fn deduplicate_aggregated(rows: Vec<Row>, key_fields: &[&str], count_field: &str) -> DedupOutcome<Row> {
    let normalized = rows
        .into_iter()
        .map(|mut row| {
            let count = fields::u64_field(&row, count_field).unwrap_or(0);
            row.insert(count_field.to_string(), Value::from(count));
            row
        })
        .collect();
    deduplicate(
        normalized,
        |row| DedupKey::from_fields(row, key_fields),
        |existing, incoming| {
            let total = fields::u64_field(existing, count_field)
                .unwrap_or(0)
                .saturating_add(fields::u64_field(&incoming, count_field).unwrap_or(0));
            existing.insert(count_field.to_string(), Value::from(total));
        },
    )
}

/// Accumulates the distinct values of `field` into an array at `list_field`.
///
/// The existing row's own value seeds the list the first time. Values already
/// present are not repeated.
pub fn merge_into_list(existing: &mut Row, incoming: &Row, field: &str, list_field: &str) {
    seed_list(existing, field, list_field);
    let Some(value) = incoming.get(field).filter(|value| !value.is_null()) else {
        return;
    };
    if let Some(Value::Array(items)) = existing.get_mut(list_field)
        && !items.contains(value)
    {
        items.push(value.clone());
    }
}

/// Ensures `list_field` holds an array seeded with the row's own `field`.
pub fn seed_list(row: &mut Row, field: &str, list_field: &str) {
    if matches!(row.get(list_field), Some(Value::Array(_))) {
        return;
    }
    let seed = row
        .get(field)
        .filter(|value| !value.is_null())
        .cloned()
        .into_iter()
        .collect();
    row.insert(list_field.to_string(), Value::Array(seed));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn closure_rows() -> Vec<Row> {
        vec![
            row(json!({"segment": 1, "start": "2025-01-01", "end": "2025-01-10", "purpose": "Paving"})),
            row(json!({"segment": 1, "start": "2025-01-01", "end": "2025-01-10", "purpose": "Utility Work"})),
        ]
    }

    fn dedupe_closures(rows: Vec<Row>) -> DedupOutcome<Row> {
        let seeded = rows
            .into_iter()
            .map(|mut row| {
                seed_list(&mut row, "purpose", "purposes");
                row
            })
            .collect();
        deduplicate(
            seeded,
            |row| DedupKey::from_fields(row, &["segment", "start", "end"]),
            |existing, incoming| merge_into_list(existing, &incoming, "purpose", "purposes"),
        )
    }

    #[test]
    fn closures_merge_purposes() {
        let outcome = dedupe_closures(closure_rows());
        assert_eq!(outcome.deduplicated.len(), 1);
        assert_eq!(outcome.original_count, 2);
        assert_eq!(outcome.duplicates_removed, 1);
        assert_eq!(
            outcome.deduplicated[0]["purposes"],
            json!(["Paving", "Utility Work"])
        );
    }

    #[test]
    fn repeated_purposes_are_not_duplicated() {
        let mut rows = closure_rows();
        rows.push(rows[0].clone());
        let outcome = dedupe_closures(rows);
        assert_eq!(outcome.deduplicated[0]["purposes"], json!(["Paving", "Utility Work"]));
    }

    #[test]
    fn deduplication_is_idempotent() {
        let first = dedupe_closures(closure_rows());
        let second = dedupe_closures(first.deduplicated.clone());
        assert_eq!(second.deduplicated, first.deduplicated);
        assert_eq!(second.duplicates_removed, 0);
    }

    #[test]
    fn number_and_string_keys_are_distinct() {
        let rows = vec![
            row(json!({"unique_key": 123, "status": "Open"})),
            row(json!({"unique_key": "123", "status": "Open"})),
        ];
        let outcome = deduplicate_rows(rows, &["unique_key"]);
        assert_eq!(outcome.deduplicated.len(), 2);
        assert_eq!(outcome.duplicates_removed, 0);
    }

    #[test]
    fn rows_without_keys_are_all_kept() {
        let rows = vec![
            row(json!({"status": "Open"})),
            row(json!({"status": "Closed"})),
            row(json!({"unique_key": null, "status": "Pending"})),
        ];
        let outcome = deduplicate_rows(rows, &["unique_key"]);
        assert_eq!(outcome.deduplicated.len(), 3);
        assert_eq!(outcome.duplicates_removed, 0);
    }

    #[test]
    fn partial_composite_keys_do_not_merge() {
        let rows = vec![
            row(json!({"segment": 1, "start": "2025-01-01"})),
            row(json!({"segment": 1, "start": "2025-01-01"})),
        ];
        let outcome = deduplicate_rows(rows, &["segment", "start", "end"]);
        assert_eq!(outcome.duplicates_removed, 0);
    }

    #[test]
    fn aggregated_counts_are_additive() {
        let rows = vec![
            row(json!({"period": "2025-01-01", "topic": "Noise", "count": "4"})),
            row(json!({"period": "2025-01-01", "topic": "Noise", "count": 5})),
        ];
        let outcome = deduplicate_aggregated(rows, &["period", "topic"], "count");
        assert_eq!(outcome.deduplicated.len(), 1);
        assert_eq!(outcome.deduplicated[0]["count"], json!(9));
    }

    #[test]
    fn aggregated_merge_is_order_independent() {
        let counts = [3_u64, 7, 11];
        let orders = [[0, 1, 2], [2, 0, 1], [1, 2, 0], [2, 1, 0]];
        for order in orders {
            let rows = order
                .iter()
                .map(|&index| row(json!({"period": "2025-02-01", "topic": "Heat", "count": counts[index]})))
                .collect();
            let outcome = deduplicate_aggregated(rows, &["period", "topic"], "count");
            assert_eq!(outcome.deduplicated.len(), 1);
            assert_eq!(outcome.deduplicated[0]["count"], json!(21));
            assert_eq!(outcome.duplicates_removed, 2);
        }
    }

    #[test]
    fn aggregated_keeps_distinct_topics_apart() {
        let rows = vec![
            row(json!({"period": "2025-01-01", "topic": "Noise", "count": 1})),
            row(json!({"period": "2025-01-01", "topic": "Heat", "count": 2})),
            row(json!({"period": "2025-01-02", "topic": "Noise", "count": 3})),
        ];
        let outcome = deduplicate_aggregated(rows, &["period", "topic"], "count");
        assert_eq!(outcome.deduplicated.len(), 3);
    }
}
