//! Column descriptors for physical and projected schemas

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Bool,
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes,
    Record,
    Map,
    Collection,
    /// Wildcard marker: the whole column is wanted. Only produced while
    /// resolving a path, never stored in a physical schema.
    Any,
}

impl ColumnType {
    /// Whether a path segment declared as `self` may address a physical
    /// column of type `physical`. Descending with `.` works for records and
    /// for the element records of a collection.
    pub fn admits(self, physical: ColumnType) -> bool {
        match self {
            ColumnType::Any => true,
            ColumnType::Record => {
                matches!(physical, ColumnType::Record | ColumnType::Collection)
            }
            declared => declared == physical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::Int => "int",
            ColumnType::Long => "long",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::String => "string",
            ColumnType::Bytes => "bytes",
            ColumnType::Record => "record",
            ColumnType::Map => "map",
            ColumnType::Collection => "collection",
            ColumnType::Any => "any",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named column: type, storage index at its level, and the nested schema
/// of composite types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,

    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Position within the enclosing schema, assigned when the schema is built
    #[serde(skip)]
    pub index: usize,

    /// Fields of a record, the element fields of a collection, or the single
    /// value column of a map
    #[serde(default, rename = "fields", skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

impl ColumnSchema {
    /// A primitive column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        ColumnSchema {
            name: name.into(),
            column_type,
            index: 0,
            schema: None,
        }
    }

    pub fn record(name: impl Into<String>, fields: Vec<ColumnSchema>) -> Self {
        Self::composite(name, ColumnType::Record, fields)
    }

    /// A collection whose elements are records of `fields`
    pub fn collection(name: impl Into<String>, fields: Vec<ColumnSchema>) -> Self {
        Self::composite(name, ColumnType::Collection, fields)
    }

    /// A string-keyed map of `value`
    pub fn map(name: impl Into<String>, value: ColumnSchema) -> Self {
        Self::composite(name, ColumnType::Map, vec![value])
    }

    fn composite(name: impl Into<String>, column_type: ColumnType, fields: Vec<ColumnSchema>) -> Self {
        ColumnSchema {
            name: name.into(),
            column_type,
            index: 0,
            schema: Some(Schema::new(fields)),
        }
    }
}

/// Ordered sequence of columns
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ColumnSchema>", into = "Vec<ColumnSchema>")]
pub struct Schema {
    columns: Vec<ColumnSchema>,
}

impl Schema {
    /// Build a schema, numbering columns by position
    pub fn new(mut columns: Vec<ColumnSchema>) -> Self {
        for (index, column) in columns.iter_mut().enumerate() {
            column.index = index;
        }
        Schema { columns }
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Look up a column by exact name
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl From<Vec<ColumnSchema>> for Schema {
    fn from(columns: Vec<ColumnSchema>) -> Self {
        Schema::new(columns)
    }
}

impl From<Schema> for Vec<ColumnSchema> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_indices_follow_position() {
        let schema = Schema::new(vec![
            ColumnSchema::new("a", ColumnType::Int),
            ColumnSchema::record("b", vec![
                ColumnSchema::new("x", ColumnType::Long),
                ColumnSchema::new("y", ColumnType::String),
            ]),
        ]);

        assert_eq!(schema.column("a").unwrap().index, 0);
        let b = schema.column("b").unwrap();
        assert_eq!(b.index, 1);
        assert_eq!(b.schema.as_ref().unwrap().column("y").unwrap().index, 1);
        assert!(schema.column("c").is_none());
    }

    #[test]
    fn test_deserialize_schema() {
        let schema: Schema = serde_json::from_value(json!([
            {"name": "id", "type": "long"},
            {"name": "tags", "type": "map", "fields": [{"name": "", "type": "string"}]},
            {"name": "events", "type": "collection", "fields": [
                {"name": "ts", "type": "long"},
                {"name": "kind", "type": "string"}
            ]}
        ]))
        .unwrap();

        assert_eq!(schema.len(), 3);
        let events = schema.column("events").unwrap();
        assert_eq!(events.index, 2);
        assert_eq!(events.column_type, ColumnType::Collection);
        assert_eq!(events.schema.as_ref().unwrap().column("kind").unwrap().index, 1);
    }

    #[test]
    fn test_declared_type_admits() {
        assert!(ColumnType::Record.admits(ColumnType::Collection));
        assert!(ColumnType::Any.admits(ColumnType::Int));
        assert!(!ColumnType::Record.admits(ColumnType::Map));
        assert!(!ColumnType::Map.admits(ColumnType::Record));
    }
}
