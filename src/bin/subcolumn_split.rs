//! subcolumn-split: Extract projected sub-fields from fully stored records
//!
//! Usage:
//!   # Project two leaves and one map key from an NDJSON file
//!   subcolumn-split --schema schema.json --projection "a.b, a.c#{k1}" rows.jsonl
//!
//!   # Read from stdin, emit positional arrays instead of keyed objects
//!   cat rows.jsonl | subcolumn-split --schema schema.json --projection "events.ts" --array-output
//!
//!   # Show the split plan without reading any rows
//!   subcolumn-split --schema schema.json --projection "a.b" --explain

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{stdin, stdout, BufRead, BufReader, BufWriter};
use subcolumn::{split_json, Projection, Schema, SplitConfig, Splitter};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "subcolumn-split")]
#[command(about = "Extract projected sub-fields from nested records", long_about = None)]
struct Args {
    /// Input NDJSON file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Physical schema as a JSON array of column descriptors
    #[arg(long, short = 's')]
    schema: String,

    /// Comma-separated projection, e.g. "a.b, a.c#{k1|k2}"
    #[arg(long, short = 'p')]
    projection: String,

    /// Emit rows as positional arrays instead of objects keyed by path
    #[arg(long)]
    array_output: bool,

    /// Log and skip rows that fail to parse or split
    #[arg(long)]
    skip_malformed: bool,

    /// Pretty-print output rows
    #[arg(long)]
    pretty: bool,

    /// Print the split plan and exit
    #[arg(long)]
    explain: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let schema_file = File::open(&args.schema)
        .with_context(|| format!("Failed to open schema file: {}", args.schema))?;
    let physical: Schema = serde_json::from_reader(BufReader::new(schema_file))
        .context("Failed to parse schema")?;
    let projection = Projection::parse(&args.projection)?;
    let mut splitter = Splitter::build(&physical, &projection)?;

    if args.explain {
        print!("{}", splitter.plan().explain());
        return Ok(());
    }

    let config = SplitConfig {
        keyed_output: !args.array_output,
        skip_malformed: args.skip_malformed,
        pretty: args.pretty,
    };

    let reader: Box<dyn BufRead> = if let Some(file_path) = &args.input {
        let file = File::open(file_path)
            .with_context(|| format!("Failed to open input file: {}", file_path))?;
        Box::new(BufReader::new(file))
    } else {
        Box::new(BufReader::new(stdin()))
    };
    let writer = BufWriter::new(stdout().lock());

    let rows = split_json(reader, writer, &physical, &mut splitter, &config)?;
    info!(rows, "done");

    Ok(())
}
