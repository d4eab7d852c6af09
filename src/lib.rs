//! # jsonsql - query arbitrary JSON with SQL
//!
//! Projects nested, heterogeneous JSON into a flat relational table, infers
//! a typed column schema and serves SQL queries and column-aware completion
//! against it.
//!
//! ## Modules
//!
//! - **flatten**: turn JSON into flat rows keyed by `a.b[2].c` column paths
//! - **schema**: infer one typed column descriptor per path
//! - **engine**: the SQL engine seam and its DataFusion implementation
//! - **pipeline**: load documents, publish schemas, run queries
//! - **completion**: suggestions built from the schema
//!
//! ## Quick Start
//!
//! ### Flattening and schema inference
//!
//! ```rust
//! use jsonsql::{flatten, infer_schema, TypeTag};
//! use serde_json::json;
//!
//! let data = json!([
//!     {"id": 1, "user": {"name": "Alice"}, "tags": ["a", "b"]},
//!     {"id": null, "user": {"name": "Bob"}, "tags": []}
//! ]);
//!
//! let rows = flatten(&data);
//! assert_eq!(rows.len(), 2);
//!
//! let schema = infer_schema(&rows);
//! assert_eq!(schema.column("id").unwrap().type_tag, TypeTag::Number);
//! assert!(schema.column("user.name").is_some());
//! assert!(schema.column("tags[1]").is_some());
//! ```
//!
//! ### Querying
//!
//! ```rust
//! use jsonsql::{DataFusionLauncher, EngineClient, PipelineConfig, ProjectionPipeline};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let client = Arc::new(EngineClient::new(DataFusionLauncher::default()));
//! let mut pipeline = ProjectionPipeline::new(client, PipelineConfig::default());
//!
//! pipeline.load(&json!([{"n": 1}, {"n": 2}])).await?;
//! let rows = pipeline.run_query("SELECT SUM(n) AS total FROM t").await?;
//! assert_eq!(rows[0]["total"], json!(3));
//! # Ok(())
//! # }
//! ```

use serde_json::Value;

pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod flatten;
pub mod input;
pub mod pipeline;
pub mod schema;

// Re-export commonly used types for convenience
pub use completion::{CompletionItem, CompletionKind, SchemaUpdate, SQL_KEYWORDS};
pub use config::{EngineConfig, PipelineConfig};
pub use engine::{DataFusionLauncher, Engine, EngineClient, Launcher, Readiness, ResultRow};
pub use error::{EngineError, InputError, ProjectionError, QueryError};
pub use flatten::{flatten, Cell, FlatRow, ROW_ID_COLUMN};
pub use pipeline::{LoadOutcome, ProjectionPipeline};
pub use schema::{infer_schema, ColumnDescriptor, Schema, TypeTag};

/// Flatten a document and infer its schema in one step
pub fn project(value: &Value) -> (Vec<FlatRow>, Schema) {
    let rows = flatten(value);
    let schema = infer_schema(&rows);
    (rows, schema)
}
