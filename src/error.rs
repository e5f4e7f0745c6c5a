use crate::schema::ColumnType;
use crate::value::ContainerError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while building or running a split plan
#[derive(Debug, Error)]
pub enum Error {
    /// A path segment's declared type conflicts with the physical schema.
    /// Aborts plan construction; no partial plan is returned.
    #[error("{path} is not of proper type: declared {declared}, physical {actual}")]
    SchemaMismatch {
        path: String,
        declared: ColumnType,
        actual: ColumnType,
    },

    /// A composite physical column carries no nested schema
    #[error("column {column} has no nested schema")]
    MissingNestedSchema { column: String },

    /// A MAP column's nested schema must hold exactly one value column
    #[error("map column {column} must have exactly one value column, found {found}")]
    MapValueSchema { column: String, found: usize },

    /// Planner bug. Never expected on well-formed input.
    #[error("internal logical error: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("failed to decode column {column}: {reason}")]
    Decode { column: String, reason: String },

    #[error("invalid projection: {0}")]
    Projection(String),
}
