//! DataFusion-backed engine
//!
//! Flattened rows are encoded into a single Arrow `RecordBatch` and
//! registered as an in-memory table. Column types are chosen here from
//! the cells, independently of the inferred schema.

use crate::config::EngineConfig;
use crate::engine::decode::batches_to_rows;
use crate::engine::{Engine, Launcher, ResultRow};
use crate::error::EngineError;
use crate::flatten::{Cell, FlatRow, ROW_ID_COLUMN};
use arrow::array::{ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::datasource::MemTable;
use datafusion::prelude::{SessionConfig, SessionContext};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

static TABLE_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Engine-side column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Boolean,
    Int64,
    Float64,
    Utf8,
}

impl ColumnKind {
    fn of(cell: &Cell) -> Option<ColumnKind> {
        match cell {
            Cell::Null => None,
            Cell::Bool(_) => Some(ColumnKind::Boolean),
            Cell::Number(n) if n.is_i64() => Some(ColumnKind::Int64),
            Cell::Number(_) => Some(ColumnKind::Float64),
            Cell::String(_) | Cell::EmptyArray | Cell::EmptyObject => Some(ColumnKind::Utf8),
        }
    }

    fn widen(self, other: ColumnKind) -> ColumnKind {
        use ColumnKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Int64, Float64) | (Float64, Int64) => Float64,
            _ => Utf8,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            ColumnKind::Boolean => DataType::Boolean,
            ColumnKind::Int64 => DataType::Int64,
            ColumnKind::Float64 => DataType::Float64,
            ColumnKind::Utf8 => DataType::Utf8,
        }
    }
}

/// Column names in first-seen order across all rows
fn column_order(rows: &[FlatRow]) -> Vec<&str> {
    let mut seen = HashSet::new();
    rows.iter()
        .flat_map(|row| row.paths())
        .filter(|path| seen.insert(*path))
        .collect()
}

fn column_kind(rows: &[FlatRow], name: &str) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for cell in rows.iter().filter_map(|row| row.get(name)) {
        if let Some(seen) = ColumnKind::of(cell) {
            let next = kind.map_or(seen, |k| k.widen(seen));
            if next == ColumnKind::Utf8 {
                return next;
            }
            kind = Some(next);
        }
    }
    // All-null columns still need a concrete type
    kind.unwrap_or(ColumnKind::Utf8)
}

fn cell_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Null => None,
        Cell::Bool(b) => Some(b.to_string()),
        Cell::Number(n) => Some(n.to_string()),
        Cell::String(s) => Some(s.clone()),
        Cell::EmptyArray => Some("[]".to_string()),
        Cell::EmptyObject => Some("{}".to_string()),
    }
}

fn build_column(rows: &[FlatRow], name: &str, kind: ColumnKind) -> ArrayRef {
    let cells = rows.iter().map(|row| row.get(name));
    match kind {
        ColumnKind::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(rows.len());
            for cell in cells {
                match cell {
                    Some(Cell::Bool(b)) => builder.append_value(*b),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Int64 => {
            let mut builder = Int64Builder::with_capacity(rows.len());
            for cell in cells {
                match cell {
                    Some(Cell::Number(n)) => builder.append_option(n.as_i64()),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Float64 => {
            let mut builder = Float64Builder::with_capacity(rows.len());
            for cell in cells {
                match cell {
                    Some(Cell::Number(n)) => builder.append_option(n.as_f64()),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Utf8 => {
            let mut builder = StringBuilder::new();
            for cell in cells {
                builder.append_option(cell.and_then(cell_text));
            }
            Arc::new(builder.finish())
        }
    }
}

/// Encode flattened rows as one batch. Missing keys become NULL.
pub fn encode_rows(rows: &[FlatRow]) -> Result<RecordBatch, ArrowError> {
    if rows.is_empty() {
        let schema = Schema::new(vec![Field::new(ROW_ID_COLUMN, DataType::Int64, true)]);
        return Ok(RecordBatch::new_empty(Arc::new(schema)));
    }

    let names = column_order(rows);
    let mut fields = Vec::with_capacity(names.len());
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let kind = column_kind(rows, name);
        fields.push(Field::new(name, kind.data_type(), true));
        columns.push(build_column(rows, name, kind));
    }

    let schema: SchemaRef = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, columns)
}

/// In-memory tables inside a DataFusion session
pub struct MemTableEngine {
    ctx: SessionContext,
}

impl MemTableEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let session = SessionConfig::new()
            .with_target_partitions(config.target_partitions)
            .with_batch_size(config.batch_size)
            .with_information_schema(config.information_schema);

        Ok(MemTableEngine {
            ctx: SessionContext::new_with_config(session),
        })
    }
}

fn materialize_error(table: &str, message: impl ToString) -> EngineError {
    EngineError::Materialize {
        table: table.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl Engine for MemTableEngine {
    async fn materialize(&self, rows: &[FlatRow], table: &str) -> Result<(), EngineError> {
        if !TABLE_NAME_REGEX.is_match(table) {
            return Err(materialize_error(table, "table name must be a plain identifier"));
        }

        let batch = encode_rows(rows).map_err(|e| materialize_error(table, e))?;
        let provider = MemTable::try_new(batch.schema(), vec![vec![batch]])
            .map_err(|e| materialize_error(table, e))?;

        self.ctx
            .deregister_table(table)
            .map_err(|e| materialize_error(table, e))?;
        self.ctx
            .register_table(table, Arc::new(provider))
            .map_err(|e| materialize_error(table, e))?;

        info!(table, rows = rows.len(), "replaced table");
        Ok(())
    }

    async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>, EngineError> {
        let outcome: datafusion::error::Result<Vec<RecordBatch>> = async {
            let frame = self.ctx.sql(sql).await?;
            frame.collect().await
        }
        .await;

        let batches = outcome.map_err(|e| {
            warn!(error = %e, "query failed");
            EngineError::Execution(e.to_string())
        })?;

        batches_to_rows(&batches).map_err(|e| EngineError::Execution(e.to_string()))
    }
}

/// Starts a [`MemTableEngine`] from an [`EngineConfig`]
#[derive(Debug, Clone, Default)]
pub struct DataFusionLauncher {
    config: EngineConfig,
}

impl DataFusionLauncher {
    pub fn new(config: EngineConfig) -> Self {
        DataFusionLauncher { config }
    }
}

#[async_trait]
impl Launcher for DataFusionLauncher {
    type Engine = MemTableEngine;

    async fn launch(&self) -> Result<MemTableEngine, EngineError> {
        let engine = MemTableEngine::new(&self.config)?;
        info!(
            target_partitions = self.config.target_partitions,
            batch_size = self.config.batch_size,
            "started DataFusion session"
        );
        Ok(engine)
    }

    fn init_timeout(&self) -> Option<Duration> {
        self.config.init_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::flatten::flatten;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn engine() -> MemTableEngine {
        MemTableEngine::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_encode_chooses_column_types() {
        let rows = flatten(&json!([
            {"i": 1, "f": 1.5, "b": true, "s": "x", "mix": 1, "nums": 1, "n": null},
            {"i": 2, "f": 2, "b": null, "s": "y", "mix": "a", "nums": 2.5, "n": null, "extra": []}
        ]));
        let batch = encode_rows(&rows).unwrap();
        let schema = batch.schema();
        let type_of = |name: &str| schema.field_with_name(name).unwrap().data_type().clone();

        assert_eq!(type_of("_row_id"), DataType::Int64);
        assert_eq!(type_of("i"), DataType::Int64);
        assert_eq!(type_of("f"), DataType::Float64);
        assert_eq!(type_of("b"), DataType::Boolean);
        assert_eq!(type_of("s"), DataType::Utf8);
        assert_eq!(type_of("mix"), DataType::Utf8);
        assert_eq!(type_of("nums"), DataType::Float64);
        assert_eq!(type_of("n"), DataType::Utf8);
        assert_eq!(type_of("extra"), DataType::Utf8);
        assert_eq!(batch.num_rows(), 2);
    }

    #[test]
    fn test_encode_keeps_first_seen_column_order() {
        let rows = flatten(&json!([{"b": 1, "a": 2}, {"c": 3, "a": 4}]));
        let batch = encode_rows(&rows).unwrap();
        let names: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["_row_id", "b", "a", "c"]);
    }

    #[test]
    fn test_encode_empty_rows() {
        let batch = encode_rows(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.schema().field(0).name(), ROW_ID_COLUMN);
    }

    #[tokio::test]
    async fn test_materialize_and_query() {
        let engine = engine();
        let rows = flatten(&json!([
            {"user": {"name": "Alice", "age": 30}, "tags": ["a", "b"]},
            {"user": {"name": "Bob", "age": 25}, "tags": []}
        ]));
        engine.materialize(&rows, "t").await.unwrap();

        let result = engine
            .execute(r#"SELECT "user.name", "user.age" FROM t WHERE "user.age" > 26"#)
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(
            serde_json::Value::Object(result[0].clone()),
            json!({"user.name": "Alice", "user.age": 30})
        );

        let markers = engine
            .execute(r#"SELECT "tags" FROM t ORDER BY _row_id"#)
            .await
            .unwrap();
        assert_eq!(markers[0]["tags"], json!(null));
        assert_eq!(markers[1]["tags"], json!("[]"));
    }

    #[tokio::test]
    async fn test_materialize_replaces_existing_table() {
        let engine = engine();
        engine
            .materialize(&flatten(&json!([{"a": 1}, {"a": 2}])), "t")
            .await
            .unwrap();
        engine
            .materialize(&flatten(&json!([{"b": "x"}])), "t")
            .await
            .unwrap();

        let rows = engine.execute("SELECT * FROM t").await.unwrap();
        assert_eq!(rows.len(), 1);
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["_row_id", "b"]);
    }

    #[tokio::test]
    async fn test_rejects_odd_table_names() {
        let err = engine().materialize(&[], "drop table").await.unwrap_err();
        assert!(matches!(err, EngineError::Materialize { .. }));
    }

    #[tokio::test]
    async fn test_syntax_error_is_normalized() {
        let engine = engine();
        engine.materialize(&flatten(&json!({"a": 1})), "t").await.unwrap();

        let err = engine.execute("SELEC * FROM t").await.unwrap_err();
        let normalized = QueryError::from(err);
        assert!(matches!(normalized, QueryError::Syntax(_)));
        assert!(normalized.to_string().starts_with("SQL Syntax Error: "));
    }

    #[tokio::test]
    async fn test_unknown_column_passes_through() {
        let engine = engine();
        engine.materialize(&flatten(&json!({"a": 1})), "t").await.unwrap();

        let err = engine.execute("SELECT nope FROM t").await.unwrap_err();
        assert!(matches!(QueryError::from(err), QueryError::Execution(_)));
    }

    #[tokio::test]
    async fn test_zero_batch_size_fails_launch() {
        let launcher = DataFusionLauncher::new(EngineConfig {
            batch_size: 0,
            ..EngineConfig::default()
        });
        assert!(matches!(launcher.launch().await, Err(EngineError::Startup(_))));
    }

    #[test]
    fn test_client_takes_startup_timeout_from_config() {
        let launcher = DataFusionLauncher::new(EngineConfig {
            init_timeout: Some(Duration::from_millis(250)),
            ..EngineConfig::default()
        });
        let client = crate::engine::EngineClient::new(launcher);
        assert_eq!(client.init_timeout(), Some(Duration::from_millis(250)));

        let client = crate::engine::EngineClient::new(DataFusionLauncher::default());
        assert_eq!(client.init_timeout(), Some(Duration::from_secs(30)));
    }
}
