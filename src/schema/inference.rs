//! Column schema inference over flattened rows
//!
//! A single fold over every `(path, cell)` pair. The first occurrence of a
//! path creates its descriptor; later occurrences refine the type with
//! [`merge`]. The result is sorted by column name.

use crate::flatten::{Cell, FlatRow};
use crate::schema::collation::compare_names;
use crate::schema::detect::detect_type;
use crate::schema::types::{ColumnDescriptor, Schema, TypeTag};
use std::collections::HashMap;
use tracing::debug;

/// Combine the type already recorded for a column with a newly observed one.
///
/// - `null` carries no information and is replaced by any concrete type
/// - two different concrete types fall back to `string`
/// - otherwise the recorded type stands
pub fn merge(existing: TypeTag, incoming: TypeTag) -> TypeTag {
    if existing == TypeTag::Null && incoming != TypeTag::Null {
        incoming
    } else if existing != TypeTag::Mixed && existing != incoming && incoming != TypeTag::Null {
        TypeTag::String
    } else {
        existing
    }
}

impl ColumnDescriptor {
    fn first_seen(name: &str, cell: &Cell) -> Self {
        ColumnDescriptor {
            name: name.to_string(),
            type_tag: detect_type(cell),
            sample: cell.clone(),
        }
    }

    /// Fold one more observation into this descriptor. The sample only moves
    /// when a null column is promoted.
    fn absorb(self, cell: &Cell) -> Self {
        let incoming = detect_type(cell);
        let type_tag = merge(self.type_tag, incoming);
        let promoted = self.type_tag == TypeTag::Null && incoming != TypeTag::Null;

        ColumnDescriptor {
            name: self.name,
            type_tag,
            sample: if promoted { cell.clone() } else { self.sample },
        }
    }
}

/// Infer one descriptor per distinct column path across all rows
pub fn infer_schema(rows: &[FlatRow]) -> Schema {
    let descriptors = rows
        .iter()
        .flat_map(|row| row.iter())
        .fold(HashMap::<&str, ColumnDescriptor>::new(), |mut acc, (path, cell)| {
            let next = match acc.remove(path) {
                Some(existing) => existing.absorb(cell),
                None => ColumnDescriptor::first_seen(path, cell),
            };
            acc.insert(path, next);
            acc
        });

    let mut columns: Vec<ColumnDescriptor> = descriptors.into_values().collect();
    columns.sort_by(|a, b| compare_names(&a.name, &b.name));

    debug!(rows = rows.len(), columns = columns.len(), "inferred schema");
    Schema::from_sorted(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn schema_of(doc: Value) -> Schema {
        infer_schema(&flatten(&doc))
    }

    #[test]
    fn test_merge_rules() {
        use TypeTag::*;
        assert_eq!(merge(Null, Number), Number);
        assert_eq!(merge(Null, Null), Null);
        assert_eq!(merge(Number, Null), Number);
        assert_eq!(merge(Number, Number), Number);
        assert_eq!(merge(Number, String), String);
        assert_eq!(merge(Date, String), String);
        assert_eq!(merge(Boolean, Array), String);
        assert_eq!(merge(String, Number), String);
        assert_eq!(merge(Mixed, Number), Mixed);
    }

    #[test]
    fn test_null_promotes_to_number() {
        let schema = schema_of(json!([{"x": null}, {"x": 5}]));
        let x = schema.column("x").unwrap();
        assert_eq!(x.type_tag, TypeTag::Number);
        assert_eq!(x.sample, Cell::from(5u64));
    }

    #[test]
    fn test_conflict_downgrades_to_string_keeping_sample() {
        let schema = schema_of(json!([{"x": 5}, {"x": "a"}]));
        let x = schema.column("x").unwrap();
        assert_eq!(x.type_tag, TypeTag::String);
        assert_eq!(x.sample, Cell::from(5u64));
    }

    #[test]
    fn test_null_after_concrete_is_ignored() {
        let schema = schema_of(json!([{"x": true}, {"x": null}]));
        assert_eq!(schema.column("x").unwrap().type_tag, TypeTag::Boolean);
    }

    #[test]
    fn test_all_null_column_stays_null() {
        let schema = schema_of(json!([{"x": null}, {"x": null}]));
        assert_eq!(schema.column("x").unwrap().type_tag, TypeTag::Null);
    }

    #[test]
    fn test_marker_and_date_types() {
        let schema = schema_of(json!({
            "tags": [],
            "meta": {},
            "created": "2024-03-01T12:00:00Z"
        }));
        assert_eq!(schema.column("tags").unwrap().type_tag, TypeTag::Array);
        assert_eq!(schema.column("meta").unwrap().type_tag, TypeTag::Object);
        assert_eq!(schema.column("created").unwrap().type_tag, TypeTag::Date);
        assert_eq!(schema.column("_row_id").unwrap().type_tag, TypeTag::Number);
    }

    #[test]
    fn test_columns_sorted_regardless_of_input_order() {
        let schema = schema_of(json!([{"zeta": 1, "Alpha": 2}, {"beta": 3, "a.b": 4}]));
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, vec!["_row_id", "a.b", "Alpha", "beta", "zeta"]);
    }

    #[test]
    fn test_never_produces_mixed() {
        let schema = schema_of(json!([{"v": 1}, {"v": "s"}, {"v": true}, {"v": []}, {"v": {}}]));
        assert_eq!(schema.column("v").unwrap().type_tag, TypeTag::String);
    }

    #[test]
    fn test_empty_rows_give_empty_schema() {
        assert!(infer_schema(&[]).is_empty());
    }

    #[test]
    fn test_schema_serializes_with_type_names() {
        let schema = schema_of(json!({"n": null}));
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            json,
            json!([
                {"name": "_row_id", "type": "number", "sample": 1},
                {"name": "n", "type": "null", "sample": null}
            ])
        );
    }

    fn arb_doc() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i16>().prop_map(|n| json!(n)),
            "[a-c]{0,3}".prop_map(Value::String),
        ];
        let row = prop::collection::btree_map("[a-d]{1,2}", leaf, 0..5)
            .prop_map(|m| Value::Object(m.into_iter().collect()));
        prop::collection::vec(row, 1..10).prop_map(Value::Array)
    }

    proptest! {
        #[test]
        fn inference_is_deterministic(doc in arb_doc()) {
            let first = serde_json::to_string(&schema_of(doc.clone())).unwrap();
            let second = serde_json::to_string(&schema_of(doc)).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn every_row_key_has_exactly_one_column(doc in arb_doc()) {
            let rows = flatten(&doc);
            let schema = infer_schema(&rows);
            let mut names: Vec<&str> = schema.names().collect();
            let total = names.len();
            names.dedup();
            prop_assert_eq!(names.len(), total);
            for row in &rows {
                for path in row.paths() {
                    prop_assert!(schema.column(path).is_some());
                }
            }
        }

        #[test]
        fn columns_are_sorted(doc in arb_doc()) {
            let schema = schema_of(doc);
            let names: Vec<&str> = schema.names().collect();
            for pair in names.windows(2) {
                prop_assert!(compare_names(pair[0], pair[1]).is_lt());
            }
        }
    }
}
