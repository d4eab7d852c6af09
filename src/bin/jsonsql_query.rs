//! jsonsql-query: Load JSON into a table and query it with SQL
//!
//! Usage:
//!   # Load a file and show the preview (SELECT * FROM t LIMIT 100)
//!   jsonsql-query data.json
//!
//!   # Run queries against the loaded table
//!   jsonsql-query data.json -q 'SELECT "user.name", COUNT(*) FROM t GROUP BY 1'
//!
//!   # NDJSON from stdin, JSON output, custom table name
//!   cat events.jsonl | jsonsql-query --ndjson --table events --format json -q 'SELECT * FROM events'
//!
//!   # Print completion items for the loaded schema
//!   jsonsql-query data.json --completions

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use jsonsql::input::read_source;
use jsonsql::{
    DataFusionLauncher, EngineClient, EngineConfig, PipelineConfig, ProjectionPipeline, QueryError,
    ResultRow,
};
use serde_json::Value;
use std::fs::File;
use std::io::{stdin, BufReader, Read};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "jsonsql-query")]
#[command(about = "Query arbitrary JSON with SQL", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Process newline-delimited JSON (one top-level item per line)
    #[arg(long)]
    ndjson: bool,

    /// SQL to run after loading; repeat for several queries
    #[arg(long, short = 'q')]
    query: Vec<String>,

    /// Name of the table the input is loaded into
    #[arg(long, env = "JSONSQL_TABLE", default_value = "t")]
    table: String,

    /// Row limit of the preview query
    #[arg(long, env = "JSONSQL_PREVIEW_LIMIT", default_value_t = 100)]
    limit: usize,

    /// Output format for result rows
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Print completion items for the loaded schema
    #[arg(long)]
    completions: bool,

    /// Seconds the engine may take to start
    #[arg(long, env = "JSONSQL_INIT_TIMEOUT", default_value_t = 30)]
    timeout_secs: u64,

    /// Engine partitions used for query execution
    #[arg(long, default_value_t = 1)]
    target_partitions: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let reader: Box<dyn Read> = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(
            File::open(file_path).with_context(|| format!("Failed to open {}", file_path))?,
        ))
    } else {
        Box::new(BufReader::new(stdin()))
    };
    let document = read_source(reader, args.ndjson)?;

    // Build config
    let engine_config = EngineConfig {
        target_partitions: args.target_partitions,
        init_timeout: Some(Duration::from_secs(args.timeout_secs)),
        ..EngineConfig::default()
    };
    let pipeline_config = PipelineConfig {
        table_name: args.table.clone(),
        preview_limit: args.limit,
    };

    let client = EngineClient::new(DataFusionLauncher::new(engine_config));
    let mut pipeline = ProjectionPipeline::new(Arc::new(client), pipeline_config);

    let outcome = pipeline
        .load(&document)
        .await
        .context("Failed to load input")?;
    eprintln!(
        "Loaded {} rows, {} columns into \"{}\"",
        outcome.row_count,
        outcome.schema.len(),
        args.table
    );

    if args.completions {
        let update = pipeline.subscribe().borrow().clone();
        println!("{}", serde_json::to_string_pretty(&update.items())?);
        return Ok(());
    }

    if args.query.is_empty() {
        print_result(&outcome.preview, args.format)?;
        return Ok(());
    }

    for sql in &args.query {
        let result = pipeline.run_query(sql).await;
        print_result(&result, args.format)?;
    }

    Ok(())
}

fn print_result(result: &Result<Vec<ResultRow>, QueryError>, format: OutputFormat) -> Result<()> {
    match result {
        Ok(rows) => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
            OutputFormat::Table => print!("{}", render_table(rows)),
        },
        Err(err) => eprintln!("error: {}", err),
    }
    Ok(())
}

/// Render rows as an aligned text grid; columns follow the first row
fn render_table(rows: &[ResultRow]) -> String {
    let Some(first) = rows.first() else {
        return String::from("(0 rows)\n");
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|h| row.get(*h).map_or_else(|| String::from("NULL"), display_value))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            cells
                .iter()
                .map(|row| row[idx].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let mut out = String::new();
    out.push_str(&line(headers.clone()));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &cells {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out.push_str(&format!("({} rows)\n", rows.len()));
    out
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::from("NULL"),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
