//! Physical schemas and field paths
//!
//! Schema text parsing lives with the storage layer; this module only models
//! the resolved column tree and the path cursor used to walk it.

pub mod column;
pub mod path;

pub use column::{ColumnSchema, ColumnType, Schema};
pub use path::PathCursor;
