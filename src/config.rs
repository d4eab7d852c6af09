use crate::error::EngineError;
use std::time::Duration;

/// Configuration for a projection pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Name of the table every load replaces
    pub table_name: String,

    /// Row limit of the preview query run after each load
    pub preview_limit: usize,
}

impl PipelineConfig {
    /// `SELECT * FROM <table> LIMIT <preview_limit>`
    pub fn preview_query(&self) -> String {
        format!("SELECT * FROM {} LIMIT {}", self.table_name, self.preview_limit)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            table_name: String::from("t"),
            preview_limit: 100,
        }
    }
}

/// Configuration for the embedded DataFusion engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub target_partitions: usize,
    pub batch_size: usize,

    /// Expose `information_schema` tables to queries
    pub information_schema: bool,

    /// How long engine startup may take before it counts as failed
    pub init_timeout: Option<Duration>,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.target_partitions == 0 {
            return Err(EngineError::Startup(
                "target_partitions must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(EngineError::Startup("batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            target_partitions: 1,
            batch_size: 8192,
            information_schema: true,
            init_timeout: Some(Duration::from_secs(30)),
        }
    }
}
