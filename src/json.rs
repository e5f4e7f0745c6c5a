//! JSON decoding of source records and encoding of target rows
//!
//! Decoding is driven by the physical schema: objects are matched to columns
//! by name, arrays by position. Encoding needs no schema.

use crate::error::{Error, Result};
use crate::schema::{ColumnSchema, ColumnType, Schema};
use crate::value::{MapValue, Record, Value};
use serde_json::{Map, Number, Value as Json};

/// Decode a JSON object or array into a record of `schema`
pub fn decode_record(json: &Json, schema: &Schema) -> Result<Record> {
    let mut record = Record::with_width(schema.len());
    match json {
        Json::Object(obj) => {
            for column in schema.columns() {
                if let Some(value) = obj.get(&column.name) {
                    record.set(column.index, decode_value(value, column)?)?;
                }
            }
        }
        Json::Array(items) => {
            if items.len() > schema.len() {
                return Err(Error::Decode {
                    column: "<record>".to_string(),
                    reason: format!("{} fields for a schema of {}", items.len(), schema.len()),
                });
            }
            for (column, item) in schema.columns().iter().zip(items) {
                record.set(column.index, decode_value(item, column)?)?;
            }
        }
        other => return Err(decode_error("<record>", "object or array", other)),
    }
    Ok(record)
}

/// Decode one JSON value as `column`. JSON null is always accepted.
pub fn decode_value(json: &Json, column: &ColumnSchema) -> Result<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }

    let name = column.name.as_str();
    let value = match column.column_type {
        ColumnType::Bool => Value::Bool(json.as_bool().ok_or_else(|| decode_error(name, "bool", json))?),
        ColumnType::Int => {
            let n = json.as_i64().ok_or_else(|| decode_error(name, "int", json))?;
            Value::Int(i32::try_from(n).map_err(|_| decode_error(name, "32-bit int", json))?)
        }
        ColumnType::Long => Value::Long(json.as_i64().ok_or_else(|| decode_error(name, "long", json))?),
        ColumnType::Float => {
            Value::Float(json.as_f64().ok_or_else(|| decode_error(name, "float", json))? as f32)
        }
        ColumnType::Double => Value::Double(json.as_f64().ok_or_else(|| decode_error(name, "double", json))?),
        ColumnType::String => Value::String(
            json.as_str()
                .ok_or_else(|| decode_error(name, "string", json))?
                .to_string(),
        ),
        ColumnType::Bytes => Value::Bytes(decode_bytes(json).ok_or_else(|| decode_error(name, "bytes", json))?),
        ColumnType::Record => Value::Record(decode_record(json, nested(column)?)?),
        ColumnType::Collection => {
            let items = json.as_array().ok_or_else(|| decode_error(name, "array", json))?;
            let schema = nested(column)?;
            let elements = items
                .iter()
                .map(|item| decode_record(item, schema))
                .collect::<Result<Vec<_>>>()?;
            Value::Collection(elements)
        }
        ColumnType::Map => {
            let obj = json.as_object().ok_or_else(|| decode_error(name, "object", json))?;
            let schema = nested(column)?;
            let [value_column] = schema.columns() else {
                return Err(Error::MapValueSchema {
                    column: column.name.clone(),
                    found: schema.len(),
                });
            };
            let mut map = MapValue::new();
            for (key, item) in obj {
                map.insert(key.clone(), decode_value(item, value_column)?);
            }
            Value::Map(map)
        }
        ColumnType::Any => {
            return Err(Error::Decode {
                column: column.name.clone(),
                reason: "wildcard type in a physical schema".to_string(),
            })
        }
    };
    Ok(value)
}

fn nested(column: &ColumnSchema) -> Result<&Schema> {
    column.schema.as_ref().ok_or_else(|| Error::MissingNestedSchema {
        column: column.name.clone(),
    })
}

/// Bytes come as a UTF-8 string or an array of octets
fn decode_bytes(json: &Json) -> Option<Vec<u8>> {
    match json {
        Json::String(s) => Some(s.as_bytes().to_vec()),
        Json::Array(items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect(),
        _ => None,
    }
}

fn decode_error(column: &str, expected: &str, found: &Json) -> Error {
    Error::Decode {
        column: column.to_string(),
        reason: format!("expected {}, found {}", expected, found),
    }
}

/// Encode a value as JSON. Records become arrays.
pub fn encode_value(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::from(*n),
        Value::Long(n) => Json::from(*n),
        Value::Float(f) => Number::from_f64(f64::from(*f)).map_or(Json::Null, Json::Number),
        Value::Double(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
        Value::Record(record) => encode_record(record),
        Value::Map(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect(),
        ),
        Value::Collection(elements) => Json::Array(elements.iter().map(encode_record).collect()),
    }
}

pub fn encode_record(record: &Record) -> Json {
    Json::Array(record.fields().iter().map(encode_value).collect())
}

/// Encode a target row as an object keyed by projection label. Unnamed
/// slots are left out.
pub fn encode_keyed(record: &Record, labels: &[String]) -> Json {
    let mut obj = Map::new();
    for (label, value) in labels.iter().zip(record.fields()) {
        if !label.is_empty() {
            obj.insert(label.clone(), encode_value(value));
        }
    }
    Json::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        serde_json::from_value(json!([
            {"name": "id", "type": "int"},
            {"name": "attrs", "type": "map", "fields": [{"name": "", "type": "string"}]},
            {"name": "events", "type": "collection", "fields": [
                {"name": "ts", "type": "long"},
                {"name": "ok", "type": "bool"}
            ]}
        ]))
        .unwrap()
    }

    #[test]
    fn test_decode_object_record() {
        let record = decode_record(
            &json!({
                "id": 7,
                "attrs": {"color": "red"},
                "events": [{"ts": 1, "ok": true}, [2, false]]
            }),
            &schema(),
        )
        .unwrap();

        assert_eq!(record.get(0).unwrap(), &Value::Int(7));
        let attrs = record.get(1).unwrap().as_map().unwrap().unwrap();
        assert_eq!(attrs.get("color"), Some(&Value::String("red".to_string())));
        let events = record.get(2).unwrap().as_collection().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].get(1).unwrap(), &Value::Bool(false));
    }

    #[test]
    fn test_missing_columns_decode_as_null() {
        let record = decode_record(&json!({"id": 1}), &schema()).unwrap();
        assert!(record.get(1).unwrap().is_null());
        assert!(record.get(2).unwrap().is_null());
    }

    #[test]
    fn test_decode_type_errors() {
        assert!(decode_record(&json!({"id": "x"}), &schema()).is_err());
        assert!(decode_record(&json!({"id": 5_000_000_000i64}), &schema()).is_err());
        assert!(decode_record(&json!([1, {}, [], 4]), &schema()).is_err());
        assert!(decode_record(&json!(3), &schema()).is_err());
    }

    #[test]
    fn test_encode_keyed_row() {
        let row = Record::new(vec![
            Value::Int(5),
            Value::Null,
            Value::Collection(vec![Record::singleton(Value::Long(1))]),
        ]);
        let labels = vec!["a.b".to_string(), String::new(), "c.x".to_string()];

        assert_eq!(encode_keyed(&row, &labels), json!({"a.b": 5, "c.x": [[1]]}));
        assert_eq!(encode_record(&row), json!([5, null, [[1]]]));
    }

    #[test]
    fn test_encode_non_finite_float() {
        assert_eq!(encode_value(&Value::Double(f64::NAN)), Json::Null);
        assert_eq!(encode_value(&Value::Bytes(vec![1, 2])), json!([1, 2]));
    }
}
