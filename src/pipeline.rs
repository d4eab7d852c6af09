//! Projection pipeline: JSON in, queryable table and schema out
//!
//! A load flattens the document, infers the schema, replaces the table in the
//! engine, publishes the schema to subscribers and runs a preview query.

use crate::completion::SchemaUpdate;
use crate::config::PipelineConfig;
use crate::engine::{EngineClient, Launcher, Readiness, ResultRow};
use crate::error::{ProjectionError, QueryError};
use crate::flatten::flatten;
use crate::input::parse_document;
use crate::schema::{infer_schema, Schema};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Result of a successful load
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub schema: Arc<Schema>,
    /// Number of rows materialized
    pub row_count: usize,
    /// Outcome of the preview query against the fresh table
    pub preview: Result<Vec<ResultRow>, QueryError>,
}

/// Drives loads and queries against one table of a shared engine.
///
/// Loads take `&mut self`, so loads through one pipeline never overlap.
/// Several pipelines loading the same table name must be serialized by
/// the caller.
pub struct ProjectionPipeline<L: Launcher> {
    client: Arc<EngineClient<L>>,
    config: PipelineConfig,
    updates: watch::Sender<SchemaUpdate>,
}

impl<L: Launcher> ProjectionPipeline<L> {
    pub fn new(client: Arc<EngineClient<L>>, config: PipelineConfig) -> Self {
        let initial = SchemaUpdate::new(&config.table_name, Arc::new(Schema::default()));
        let (updates, _) = watch::channel(initial);
        ProjectionPipeline {
            client,
            config,
            updates,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<EngineClient<L>> {
        &self.client
    }

    /// Schema of the most recent successful load
    pub fn schema(&self) -> Arc<Schema> {
        self.updates.borrow().schema.clone()
    }

    /// Receive the schema on every change; receivers cannot write back
    pub fn subscribe(&self) -> watch::Receiver<SchemaUpdate> {
        self.updates.subscribe()
    }

    pub fn readiness(&self) -> Readiness {
        self.client.readiness()
    }

    /// Start the engine if it is not running yet
    pub async fn ensure_ready(&self) -> Readiness {
        // The outcome is memoized by the client and read back below
        let _ = self.client.ensure_ready().await;
        self.client.readiness()
    }

    /// Allow another engine launch after a failed startup. Every pipeline
    /// sharing the client sees the fresh start.
    pub fn reset_engine(&self) {
        self.client.reset();
    }

    /// Parse JSON text and load it. A parse failure leaves the current
    /// table and schema untouched.
    pub async fn load_text(&mut self, text: &str) -> Result<LoadOutcome, ProjectionError> {
        let value = parse_document(text).map_err(|err| {
            debug!(error = %err, "rejected JSON input");
            err
        })?;
        self.load(&value).await
    }

    /// Project a document into the table, replacing its previous contents
    pub async fn load(&mut self, value: &Value) -> Result<LoadOutcome, ProjectionError> {
        let rows = flatten(value);
        let schema = Arc::new(infer_schema(&rows));
        let table = self.config.table_name.as_str();

        self.client.materialize(&rows, table).await?;
        info!(table, rows = rows.len(), columns = schema.len(), "loaded document");

        self.updates
            .send_replace(SchemaUpdate::new(table, schema.clone()));

        let preview = self.run_query(&self.config.preview_query()).await;
        Ok(LoadOutcome {
            schema,
            row_count: rows.len(),
            preview,
        })
    }

    /// Run SQL verbatim against the engine
    pub async fn run_query(&self, sql: &str) -> Result<Vec<ResultRow>, QueryError> {
        match self.client.execute(sql).await {
            Ok(rows) => {
                debug!(rows = rows.len(), "query finished");
                Ok(rows)
            }
            Err(err) => {
                let err = QueryError::from(err);
                warn!(error = %err, "query rejected");
                Err(err)
            }
        }
    }
}
