//! Concrete record, map and sequence containers
//!
//! Source records arrive fully deserialized as [`Record`]s; the splitter only
//! needs positional access on records, key lookup on maps and iteration over
//! sequences, plus in-place mutation of the reused target record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// String-keyed map container
pub type MapValue = BTreeMap<String, Value>;

/// Failures raised by container accessors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContainerError {
    #[error("field index {index} out of range for record of width {width}")]
    IndexOutOfRange { index: usize, width: usize },

    #[error("expected {expected}, found {found}")]
    UnexpectedKind {
        expected: &'static str,
        found: &'static str,
    },
}

/// A single datum: a primitive or one of the three container kinds
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Record(Record),
    Map(MapValue),
    Collection(Vec<Record>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Record(_) => "record",
            Value::Map(_) => "map",
            Value::Collection(_) => "collection",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// View as a record; `Ok(None)` for null
    pub fn as_record(&self) -> Result<Option<&Record>, ContainerError> {
        match self {
            Value::Record(record) => Ok(Some(record)),
            Value::Null => Ok(None),
            other => Err(unexpected("record", other)),
        }
    }

    /// View as a map; `Ok(None)` for null
    pub fn as_map(&self) -> Result<Option<&MapValue>, ContainerError> {
        match self {
            Value::Map(map) => Ok(Some(map)),
            Value::Null => Ok(None),
            other => Err(unexpected("map", other)),
        }
    }

    /// View as a sequence of element records; null reads as empty
    pub fn as_collection(&self) -> Result<&[Record], ContainerError> {
        match self {
            Value::Collection(elements) => Ok(elements.as_slice()),
            Value::Null => Ok(<&[Record]>::default()),
            other => Err(unexpected("collection", other)),
        }
    }
}

fn unexpected(expected: &'static str, found: &Value) -> ContainerError {
    ContainerError::UnexpectedKind {
        expected,
        found: found.kind(),
    }
}

/// Fixed-width tuple of values addressed by position
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record(Vec<Value>);

impl Record {
    pub fn new(fields: Vec<Value>) -> Self {
        Record(fields)
    }

    /// A record of `width` null fields
    pub fn with_width(width: usize) -> Self {
        Record(vec![Value::Null; width])
    }

    /// The single-field scratch record used for sequence output
    pub fn singleton(value: Value) -> Self {
        Record(vec![value])
    }

    pub fn width(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> &[Value] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Result<&Value, ContainerError> {
        self.0.get(index).ok_or(ContainerError::IndexOutOfRange {
            index,
            width: self.0.len(),
        })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Value, ContainerError> {
        let width = self.0.len();
        self.0
            .get_mut(index)
            .ok_or(ContainerError::IndexOutOfRange { index, width })
    }

    pub fn set(&mut self, index: usize, value: Value) -> Result<(), ContainerError> {
        *self.get_mut(index)? = value;
        Ok(())
    }

    /// Append an element to the sequence held in slot `index`
    pub fn append(&mut self, index: usize, element: Record) -> Result<(), ContainerError> {
        match self.get_mut(index)? {
            Value::Collection(elements) => {
                elements.push(element);
                Ok(())
            }
            other => Err(unexpected("collection", other)),
        }
    }

    /// Mutable access to the map held in slot `index`
    pub fn map_mut(&mut self, index: usize) -> Result<&mut MapValue, ContainerError> {
        match self.get_mut(index)? {
            Value::Map(map) => Ok(map),
            other => Err(unexpected("map", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_access() {
        let mut record = Record::with_width(2);
        record.set(1, Value::Int(4)).unwrap();

        assert_eq!(record.get(0).unwrap(), &Value::Null);
        assert_eq!(record.get(1).unwrap(), &Value::Int(4));
        assert_eq!(
            record.get(2),
            Err(ContainerError::IndexOutOfRange { index: 2, width: 2 })
        );
    }

    #[test]
    fn test_append_requires_collection_slot() {
        let mut record = Record::with_width(1);
        assert!(record.append(0, Record::singleton(Value::Int(1))).is_err());

        record.set(0, Value::Collection(Vec::new())).unwrap();
        record.append(0, Record::singleton(Value::Int(1))).unwrap();
        assert_eq!(record.get(0).unwrap().as_collection().unwrap().len(), 1);
    }

    #[test]
    fn test_null_views() {
        assert_eq!(Value::Null.as_record().unwrap(), None);
        assert_eq!(Value::Null.as_map().unwrap(), None);
        assert!(Value::Null.as_collection().unwrap().is_empty());
        assert!(Value::Int(1).as_map().is_err());
    }
}
