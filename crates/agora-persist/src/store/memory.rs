use async_trait::async_trait;
use chrono::DateTime;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::TableStore;
use crate::error::{PersistError, Result};
use crate::query::SortDirection;
use crate::translate::{Embed, Predicate, TableQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Insert,
    Select,
    Update,
    Delete,
    Count,
}

/// A request as the store received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedQuery {
    pub table: String,
    pub operation: StoreOperation,
    pub query: TableQuery,
}

#[derive(Default)]
struct Tables {
    rows: HashMap<String, Vec<Value>>,
    unique_keys: HashMap<String, Vec<Vec<String>>>,
    log: Vec<RecordedQuery>,
}

/// In-process table store evaluating the same [`TableQuery`] as the HTTP
/// store. Rows are JSON objects; a non-null `id` column is always unique.
///
/// Every request is recorded and can be inspected with
/// [`recorded_queries`](Self::recorded_queries).
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a composite unique constraint on `table`.
    pub fn with_unique_key(self, table: &str, columns: &[&str]) -> Self {
        self.lock()
            .unique_keys
            .entry(table.to_string())
            .or_default()
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Insert a row without recording it, e.g. reference data like profiles.
    pub fn seed(&self, table: &str, row: Value) {
        self.lock().rows.entry(table.to_string()).or_default().push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().rows.get(table).cloned().unwrap_or_default()
    }

    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.lock().log.clone()
    }

    pub fn clear_recorded(&self) {
        self.lock().log.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock cannot leave rows half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Tables {
    fn record(&mut self, table: &str, operation: StoreOperation, query: TableQuery) {
        self.log.push(RecordedQuery {
            table: table.to_string(),
            operation,
            query,
        });
    }

    fn table(&self, table: &str) -> &[Value] {
        self.rows.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn check_unique(&self, table: &str, candidate: &Value, skip: Option<usize>) -> Result<()> {
        let mut keys: Vec<Vec<String>> = vec![vec!["id".to_string()]];
        if let Some(extra) = self.unique_keys.get(table) {
            keys.extend(extra.iter().cloned());
        }

        for columns in &keys {
            let Some(key) = key_of(candidate, columns) else {
                continue;
            };
            let clash = self
                .table(table)
                .iter()
                .enumerate()
                .filter(|(idx, _)| Some(*idx) != skip)
                .any(|(_, row)| key_of(row, columns).as_ref() == Some(&key));
            if clash {
                return Err(PersistError::Api {
                    status: 409,
                    code: Some("23505".to_string()),
                    message: format!(
                        "duplicate key value violates unique constraint on {} ({})",
                        table,
                        columns.join(", ")
                    ),
                    details: Some(format!("Key ({})=({}) already exists.", columns.join(", "), key.join(", "))),
                });
            }
        }
        Ok(())
    }

    fn matching(&self, table: &str, query: &TableQuery) -> Vec<Value> {
        self.table(table)
            .iter()
            .filter(|row| row_matches(row, &query.predicates, &query.any_of))
            .cloned()
            .collect()
    }

    fn resolve_embeds(&self, row: &mut Value, embeds: &[Embed]) {
        let resolved: Vec<(&'static str, Value)> = embeds
            .iter()
            .map(|embed| (embed.alias(), self.embed_value(row, embed)))
            .collect();

        if let Value::Object(object) = row {
            for (alias, value) in resolved {
                object.insert(alias.to_string(), value);
            }
        }
    }

    fn embed_value(&self, row: &Value, embed: &Embed) -> Value {
        match embed {
            Embed::HasMany {
                table, foreign_key, ..
            } => {
                let Some(id) = row.get("id").and_then(value_text) else {
                    return Value::Array(Vec::new());
                };
                let related = self
                    .table(table)
                    .iter()
                    .filter(|other| other.get(*foreign_key).and_then(value_text).as_deref() == Some(id.as_str()))
                    .cloned()
                    .collect();
                Value::Array(related)
            }
            Embed::BelongsTo {
                table, local_key, ..
            } => {
                let Some(target) = row.get(*local_key).and_then(value_text) else {
                    return Value::Null;
                };
                self.table(table)
                    .iter()
                    .find(|other| other.get("id").and_then(value_text).as_deref() == Some(target.as_str()))
                    .cloned()
                    .unwrap_or(Value::Null)
            }
        }
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let mut tables = self.lock();
        tables.record(table, StoreOperation::Insert, TableQuery::new());

        if !row.is_object() {
            return Err(PersistError::Validation(format!(
                "rows inserted into {} must be JSON objects",
                table
            )));
        }
        tables.check_unique(table, &row, None)?;
        tables.rows.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn select(&self, table: &str, query: &TableQuery) -> Result<Vec<Value>> {
        let mut tables = self.lock();
        tables.record(table, StoreOperation::Select, query.clone());

        let mut rows = tables.matching(table, query);
        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.field), b.get(&order.field));
                match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        if let Some(range) = query.range {
            rows = rows
                .into_iter()
                .skip(usize::try_from(range.start).unwrap_or(usize::MAX))
                .take(usize::try_from(range.len()).unwrap_or(usize::MAX))
                .collect();
        }
        for row in &mut rows {
            tables.resolve_embeds(row, &query.embeds);
        }
        Ok(rows)
    }

    async fn update(&self, table: &str, predicates: &[Predicate], row: Value) -> Result<Vec<Value>> {
        let mut tables = self.lock();
        tables.record(
            table,
            StoreOperation::Update,
            TableQuery::new().matching(predicates.iter().cloned()),
        );

        let Value::Object(columns) = row else {
            return Err(PersistError::Validation(format!(
                "rows written to {} must be JSON objects",
                table
            )));
        };

        let targets: Vec<usize> = tables
            .table(table)
            .iter()
            .enumerate()
            .filter(|(_, existing)| row_matches(existing, predicates, &[]))
            .map(|(idx, _)| idx)
            .collect();

        let mut updated = Vec::with_capacity(targets.len());
        for idx in targets {
            let mut candidate = tables.table(table)[idx].clone();
            merge(&mut candidate, &columns);
            tables.check_unique(table, &candidate, Some(idx))?;
            if let Some(rows) = tables.rows.get_mut(table) {
                rows[idx] = candidate.clone();
            }
            updated.push(candidate);
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, predicates: &[Predicate]) -> Result<()> {
        let mut tables = self.lock();
        tables.record(
            table,
            StoreOperation::Delete,
            TableQuery::new().matching(predicates.iter().cloned()),
        );

        if let Some(rows) = tables.rows.get_mut(table) {
            rows.retain(|row| !row_matches(row, predicates, &[]));
        }
        Ok(())
    }

    async fn count(&self, table: &str, query: &TableQuery) -> Result<u64> {
        let mut tables = self.lock();
        tables.record(table, StoreOperation::Count, query.clone());
        Ok(tables.matching(table, query).len() as u64)
    }
}

fn merge(target: &mut Value, columns: &Map<String, Value>) {
    if let Value::Object(object) = target {
        for (key, value) in columns {
            object.insert(key.clone(), value.clone());
        }
    }
}

fn key_of(row: &Value, columns: &[String]) -> Option<Vec<String>> {
    columns
        .iter()
        .map(|column| row.get(column).and_then(value_text))
        .collect()
}

/// Textual form of a column as Postgres would compare it; null has none.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn predicate_matches(row: &Value, predicate: &Predicate) -> bool {
    let Some(text) = row.get(predicate.field()).and_then(value_text) else {
        return false;
    };
    match predicate {
        Predicate::Eq { value, .. } => &text == value,
        Predicate::ILike { pattern, .. } => like_match(&text, pattern),
    }
}

fn row_matches(row: &Value, all_of: &[Predicate], any_of: &[Predicate]) -> bool {
    all_of.iter().all(|p| predicate_matches(row, p))
        && (any_of.is_empty() || any_of.iter().any(|p| predicate_matches(row, p)))
}

/// Case-insensitive match where `*` stands for any run of characters.
fn like_match(text: &str, pattern: &str) -> bool {
    let text = text.to_lowercase();
    let pattern = pattern.to_lowercase();
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return text == pattern;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// Orders like Postgres for the column types used here; nulls sort last.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{Order, RowRange};
    use serde_json::json;

    #[test]
    fn test_like_match() {
        assert!(like_match("Discussion about Monas History", "*monas*"));
        assert!(like_match("monas", "monas*"));
        assert!(like_match("abc", "*"));
        assert!(!like_match("Discussion", "*monas*"));
        assert!(!like_match("xmonas", "monas*"));
        assert!(like_match("a-b-c", "a*b*c"));
    }

    #[test]
    fn test_timestamps_compare_chronologically() {
        let earlier = json!("2024-01-01T10:00:00.5Z");
        let later = json!("2024-01-01T10:00:00.123456Z");
        assert_eq!(compare_values(Some(&later), Some(&earlier)), Ordering::Less);
    }

    #[tokio::test]
    async fn test_select_filters_orders_and_windows() {
        let store = MemoryStore::new();
        for (id, score) in [("a", 3), ("b", 1), ("c", 2), ("d", 4)] {
            store.insert("items", json!({ "id": id, "score": score, "kind": "x" })).await.unwrap();
        }
        store.insert("items", json!({ "id": "e", "score": 9, "kind": "y" })).await.unwrap();

        let query = TableQuery::new()
            .with_predicate(Predicate::eq("kind", "x"))
            .ordered_by(Order::asc("score"))
            .windowed(RowRange::new(1, 3));
        let rows = store.select("items", &query).await.unwrap();

        let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(store.count("items", &query.for_count()).await.unwrap(), 4);
    }

    #[test]
    fn test_seeded_rows_are_not_recorded() {
        let store = MemoryStore::new();
        store.seed("profiles", json!({ "id": "p1", "full_name": "Ayu" }));

        let rows = tokio_test::block_on(store.select("profiles", &TableQuery::new()));
        let rows = tokio_test::assert_ok!(rows);

        assert_eq!(rows.len(), 1);
        assert_eq!(store.recorded_queries().len(), 1);
        assert_eq!(store.recorded_queries()[0].operation, StoreOperation::Select);
    }

    #[tokio::test]
    async fn test_unique_keys_are_enforced() {
        let store = MemoryStore::new().with_unique_key("members", &["group_id", "user_id"]);
        store.insert("members", json!({ "group_id": "g", "user_id": "u" })).await.unwrap();

        let err = store
            .insert("members", json!({ "group_id": "g", "user_id": "u" }))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::Api { status: 409, .. }));

        store.insert("members", json!({ "group_id": "g", "user_id": "v" })).await.unwrap();
        assert_eq!(store.rows("members").len(), 2);
    }

    #[tokio::test]
    async fn test_embeds_are_resolved() {
        let store = MemoryStore::new();
        store.seed("owners", json!({ "id": "o1", "name": "Ana" }));
        store.seed("pets", json!({ "id": "p1", "owner_id": "o1" }));
        store.seed("pets", json!({ "id": "p2", "owner_id": "o1" }));

        let owners = store
            .select(
                "owners",
                &TableQuery::new().embedding(&[Embed::HasMany {
                    alias: "pets",
                    table: "pets",
                    foreign_key: "owner_id",
                }]),
            )
            .await
            .unwrap();
        assert_eq!(owners[0]["pets"].as_array().map(Vec::len), Some(2));

        let pets = store
            .select(
                "pets",
                &TableQuery::new().embedding(&[Embed::BelongsTo {
                    alias: "owner",
                    table: "owners",
                    local_key: "owner_id",
                }]),
            )
            .await
            .unwrap();
        assert_eq!(pets[0]["owner"]["name"], "Ana");
    }

    #[tokio::test]
    async fn test_update_merges_columns() {
        let store = MemoryStore::new();
        store.insert("items", json!({ "id": "a", "name": "old", "extra": 1 })).await.unwrap();

        let updated = store
            .update("items", &[Predicate::eq("id", "a")], json!({ "id": "a", "name": "new" }))
            .await
            .unwrap();

        assert_eq!(updated, vec![json!({ "id": "a", "name": "new", "extra": 1 })]);
        assert!(store
            .update("items", &[Predicate::eq("id", "missing")], json!({ "name": "x" }))
            .await
            .unwrap()
            .is_empty());
    }
}
