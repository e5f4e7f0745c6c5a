//! Projection splitting
//!
//! A [`SplitPlan`] is built once per query from the physical schema and the
//! projection, then applied to every fully deserialized source record to
//! extract exactly the requested leaves and map keys into a reused target
//! record.
//!
//! ```rust
//! use subcolumn::projection::Projection;
//! use subcolumn::schema::{ColumnSchema, ColumnType, Schema};
//! use subcolumn::split::Splitter;
//! use subcolumn::value::{Record, Value};
//!
//! # fn main() -> subcolumn::error::Result<()> {
//! let physical = Schema::new(vec![ColumnSchema::record("a", vec![
//!     ColumnSchema::new("b", ColumnType::Int),
//!     ColumnSchema::new("c", ColumnType::String),
//! ])]);
//! let mut splitter = Splitter::build(&physical, &Projection::from_paths(["a.c"]))?;
//!
//! let source = Record::new(vec![Value::Record(Record::new(vec![
//!     Value::Int(1),
//!     Value::String("kept".to_string()),
//! ]))]);
//! let row = splitter.execute(&source)?;
//! assert_eq!(row.get(0)?, &Value::String("kept".to_string()));
//! # Ok(())
//! # }
//! ```

pub mod executor;
pub mod node;
pub mod plan;
pub mod types;
pub mod writer;

pub use executor::Splitter;
pub use node::{Branch, MapSplit, NodeId, SplitNode, Terminal};
pub use plan::SplitPlan;
pub use types::SplitConfig;
pub use writer::RowWriter;
