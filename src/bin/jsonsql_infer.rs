//! jsonsql-infer: Flatten JSON and print the inferred column schema
//!
//! Usage:
//!   # Read from file, print the schema
//!   jsonsql-infer data.json
//!
//!   # Read from stdin
//!   echo '{"id": 1, "user": {"email": "alice@example.com"}}' | jsonsql-infer
//!
//!   # Print the flattened rows as NDJSON instead
//!   jsonsql-infer --ndjson events.jsonl --rows

use anyhow::Result;
use clap::Parser;
use jsonsql::input::read_source;
use jsonsql::project;
use std::fs::File;
use std::io::{stdin, BufReader, Read};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jsonsql-infer")]
#[command(about = "Infer a column schema from arbitrary JSON", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Process newline-delimited JSON (one top-level item per line)
    #[arg(long)]
    ndjson: bool,

    /// Print the flattened rows as NDJSON instead of the schema
    #[arg(long)]
    rows: bool,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let reader: Box<dyn Read> = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(File::open(file_path)?))
    } else {
        Box::new(BufReader::new(stdin()))
    };

    let document = read_source(reader, args.ndjson)?;
    let (rows, schema) = project(&document);
    info!(rows = rows.len(), columns = schema.len(), "projected input");

    if args.rows {
        for row in &rows {
            println!("{}", serde_json::to_string(row)?);
        }
        return Ok(());
    }

    if rows.is_empty() {
        eprintln!("Warning: input produced no rows");
    }

    let output = if args.compact {
        serde_json::to_string(&schema)?
    } else {
        serde_json::to_string_pretty(&schema)?
    };

    println!("{}", output);

    Ok(())
}
