//! # Subcolumn - Projection Splitting for Nested Records
//!
//! Some storage serializers can only hand back a stored column in its
//! entirety. When a query needs just a few leaves of a nested record, or a
//! few keys of a map, the reader deserializes the whole column and then
//! splits out the requested parts. This crate builds that split once per
//! query and runs it once per row.
//!
//! ## Modules
//!
//! - **schema**: physical column tree and path cursor
//! - **projection**: requested paths and map key sets
//! - **split**: plan builder, split-node tree and per-row executor
//! - **value**: record, map and sequence containers
//! - **json**: JSON decoding of source rows and encoding of target rows
//!
//! ## Quick Start
//!
//! ```rust
//! use subcolumn::{Projection, Schema, Splitter};
//! use subcolumn::value::Value;
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let physical: Schema = serde_json::from_value(json!([
//!     {"name": "a", "type": "record", "fields": [
//!         {"name": "b", "type": "int"},
//!         {"name": "c", "type": "map", "fields": [{"name": "", "type": "int"}]}
//!     ]}
//! ]))?;
//! let projection = Projection::parse("a.b, a.c#{k1}")?;
//! let mut splitter = Splitter::build(&physical, &projection)?;
//!
//! let source = subcolumn::json::decode_record(
//!     &json!({"a": {"b": 5, "c": {"k1": 7, "k2": 9}}}),
//!     &physical,
//! )?;
//! let row = splitter.execute(&source)?;
//!
//! assert_eq!(row.get(0)?, &Value::Int(5));
//! assert_eq!(
//!     subcolumn::json::encode_value(row.get(1)?),
//!     json!({"k1": 7})
//! );
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::{debug, warn};

pub mod error;
pub mod json;
pub mod projection;
pub mod schema;
pub mod split;
pub mod value;

// Re-export commonly used types for convenience
pub use error::Error;
pub use projection::{KeySet, ProjectedColumn, Projection};
pub use schema::{ColumnSchema, ColumnType, Schema};
pub use split::{RowWriter, SplitConfig, SplitPlan, Splitter};
pub use value::{Record, Value};

/// Main entry point: split a stream of NDJSON source records
///
/// Each line is decoded against `physical`, split, and written as one JSON
/// row. Returns the number of rows written.
pub fn split_json<R: BufRead, W: Write>(
    reader: R,
    writer: W,
    physical: &Schema,
    splitter: &mut Splitter,
    config: &SplitConfig,
) -> Result<usize> {
    let mut out = RowWriter::new(writer, splitter.plan().labels().to_vec(), config);
    let mut written = 0;

    // raw lines: invalid UTF-8 is a malformed row, not a read failure
    for (number, line) in reader.split(b'\n').enumerate() {
        let line = line.context("Failed to read line")?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match split_line(line, physical, splitter) {
            Ok(row) => {
                out.write_row(row)?;
                written += 1;
            }
            Err(err) if config.skip_malformed => {
                warn!(line = number + 1, error = %format!("{:#}", err), "skipping malformed row");
            }
            Err(err) => return Err(err.context(format!("Failed to split line {}", number + 1))),
        }
    }

    out.flush()?;
    debug!(rows = written, "split stream finished");
    Ok(written)
}

fn split_line<'a>(mut line: Vec<u8>, physical: &Schema, splitter: &'a mut Splitter) -> Result<&'a Record> {
    let json: serde_json::Value =
        simd_json::serde::from_slice(&mut line).context("Failed to parse JSON")?;
    let source = json::decode_record(&json, physical)?;
    Ok(splitter.execute(&source)?)
}
