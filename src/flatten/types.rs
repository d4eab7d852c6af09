use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use indexmap::IndexMap;
use serde_json::{Number, Value};

/// Name of the synthetic identity column carried by every row
pub const ROW_ID_COLUMN: &str = "_row_id";

/// A scalar position in a flattened row
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// An empty array found at this path
    EmptyArray,
    /// An empty object found at this path
    EmptyObject,
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Convert back into a plain JSON value; markers become `[]` and `{}`
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Number(n) => Value::Number(n.clone()),
            Cell::String(s) => Value::String(s.clone()),
            Cell::EmptyArray => Value::Array(Vec::new()),
            Cell::EmptyObject => Value::Object(serde_json::Map::new()),
        }
    }
}

impl From<u64> for Cell {
    fn from(n: u64) -> Self {
        Cell::Number(n.into())
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::String(s.to_string())
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_unit(),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Number(n) => n.serialize(serializer),
            Cell::String(s) => serializer.serialize_str(s),
            Cell::EmptyArray => serializer.serialize_seq(Some(0))?.end(),
            Cell::EmptyObject => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

/// One flattened top-level item: column path -> cell, in first-write order
#[derive(Debug, Clone)]
pub struct FlatRow {
    cells: IndexMap<String, Cell>,
}

impl FlatRow {
    /// Start a row holding only its identity column
    pub(crate) fn seeded(row_id: u64) -> Self {
        let mut cells = IndexMap::new();
        cells.insert(ROW_ID_COLUMN.to_string(), Cell::from(row_id));
        FlatRow { cells }
    }

    /// Write a cell. An existing path keeps its position and takes the new value.
    pub(crate) fn insert(&mut self, path: String, cell: Cell) {
        self.cells.insert(path, cell);
    }

    pub fn row_id(&self) -> u64 {
        match self.get(ROW_ID_COLUMN) {
            Some(Cell::Number(n)) => n.as_u64().unwrap_or_default(),
            _ => 0,
        }
    }

    pub fn get(&self, path: &str) -> Option<&Cell> {
        self.cells.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.cells.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.cells.iter().map(|(path, cell)| (path.as_str(), cell))
    }

    /// Render the row as a JSON object with the same key order
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(path, cell)| (path.to_string(), cell.to_json()))
                .collect(),
        )
    }
}

// Column order is part of a row's identity
impl PartialEq for FlatRow {
    fn eq(&self, other: &Self) -> bool {
        self.cells.iter().eq(other.cells.iter())
    }
}

impl Serialize for FlatRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}
