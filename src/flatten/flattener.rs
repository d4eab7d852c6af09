use crate::flatten::types::{Cell, FlatRow, ROW_ID_COLUMN};
use serde_json::{Map, Value};
use tracing::debug;

/// Flatten a JSON document into one row per top-level item.
///
/// Arrays are split into their elements; any other value is a single item.
/// Falsy documents (`null`, `false`, `0`, `""`) produce no rows.
pub fn flatten(value: &Value) -> Vec<FlatRow> {
    if is_falsy(value) {
        return Vec::new();
    }

    let items: &[Value] = match value {
        Value::Array(items) => items,
        other => std::slice::from_ref(other),
    };

    let rows: Vec<FlatRow> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let mut row = FlatRow::seeded(idx as u64 + 1);
            walk(item, "", &mut row);
            row
        })
        .collect();

    debug!(rows = rows.len(), "flattened document");
    rows
}

/// Recursively write every scalar under `prefix` into `row`
fn walk(value: &Value, prefix: &str, row: &mut FlatRow) {
    match value {
        Value::Null => put(row, prefix, Cell::Null),
        Value::Bool(b) => put(row, prefix, Cell::Bool(*b)),
        Value::Number(n) => put(row, prefix, Cell::Number(n.clone())),
        Value::String(s) => put(row, prefix, Cell::String(s.clone())),
        Value::Array(items) => walk_array(items, prefix, row),
        Value::Object(obj) => walk_object(obj, prefix, row),
    }
}

fn walk_array(items: &[Value], prefix: &str, row: &mut FlatRow) {
    if items.is_empty() {
        put(row, prefix, Cell::EmptyArray);
        return;
    }

    for (idx, item) in items.iter().enumerate() {
        walk(item, &index_path(prefix, idx), row);
    }
}

fn walk_object(obj: &Map<String, Value>, prefix: &str, row: &mut FlatRow) {
    if obj.is_empty() {
        put(row, prefix, Cell::EmptyObject);
        return;
    }

    for (key, child) in obj.iter() {
        walk(child, &key_path(prefix, key), row);
    }
}

/// Leaf write. Nothing lands at the empty path, and the identity column is
/// never replaced by a document key of the same name.
fn put(row: &mut FlatRow, path: &str, cell: Cell) {
    if path.is_empty() {
        return;
    }
    if path == ROW_ID_COLUMN {
        debug!(row_id = row.row_id(), "ignoring document key that shadows the row id");
        return;
    }
    row.insert(path.to_string(), cell);
}

/// `a` + `b` -> `a.b`
pub fn key_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// `a` + 2 -> `a[2]`
pub fn index_path(prefix: &str, idx: usize) -> String {
    format!("{}[{}]", prefix, idx)
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
