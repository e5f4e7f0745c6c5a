//! Per-row execution of a split plan
//!
//! Every row rebinds the plan's root to the freshly deserialized source
//! record, resets the map and sequence slots of the reused target record,
//! then runs the branch nodes in discovery order. Bindings borrow from the
//! source and live only for one `execute` call.

use crate::error::Result;
use crate::projection::{KeySet, Projection};
use crate::schema::Schema;
use crate::split::node::{Branch, MapSplit, NodeId, SplitNode};
use crate::split::plan::{SplitPlan, ROOT};
use crate::value::{ContainerError, MapValue, Record, Value};
use tracing::trace;

/// What a node currently represents in the source record
#[derive(Debug, Default)]
enum Binding<'s> {
    #[default]
    Unbound,
    Root(&'s Record),
    One(Option<&'s Value>),
    /// One entry per element of an enclosing collection
    Many(Vec<Option<&'s Value>>),
}

enum Rows<'s> {
    One(Option<&'s Record>),
    Many(Vec<Option<&'s Record>>),
}

impl<'s> Binding<'s> {
    fn into_rows(self) -> Result<Rows<'s>, ContainerError> {
        match self {
            Binding::Unbound => Ok(Rows::One(None)),
            Binding::Root(record) => Ok(Rows::One(Some(record))),
            Binding::One(value) => Ok(Rows::One(record_of(value)?)),
            Binding::Many(values) => values
                .into_iter()
                .map(record_of)
                .collect::<Result<Vec<_>, _>>()
                .map(Rows::Many),
        }
    }

    /// Element records of the bound collection(s), in source order
    fn into_elements(self) -> Result<Vec<&'s Record>, ContainerError> {
        let mut elements = Vec::new();
        match self {
            Binding::Unbound | Binding::One(None) => {}
            Binding::Root(_) => {
                return Err(ContainerError::UnexpectedKind {
                    expected: "collection",
                    found: "record",
                })
            }
            Binding::One(Some(value)) => elements.extend(value.as_collection()?),
            Binding::Many(values) => {
                for value in values.into_iter().flatten() {
                    elements.extend(value.as_collection()?);
                }
            }
        }
        Ok(elements)
    }
}

fn record_of(value: Option<&Value>) -> Result<Option<&Record>, ContainerError> {
    value.map_or(Ok(None), Value::as_record)
}

fn map_of(value: Option<&Value>) -> Result<Option<&MapValue>, ContainerError> {
    value.map_or(Ok(None), Value::as_map)
}

fn field(row: Option<&Record>, index: usize) -> Result<Option<&Value>, ContainerError> {
    row.map(|r| r.get(index)).transpose()
}

fn filter_keys(source: &MapValue, keys: &KeySet, dest: &mut MapValue) {
    for key in keys {
        if let Some(value) = source.get(key) {
            dest.insert(key.clone(), value.clone());
        }
    }
}

impl SplitPlan {
    /// Split `source` into `target`.
    ///
    /// `target` must be at least `target_width()` wide. Slots of skipped
    /// projection columns are never written, so whatever the caller left
    /// there survives.
    pub fn execute(&self, source: &Record, target: &mut Record) -> Result<()> {
        let mut bindings: Vec<Binding<'_>> = Vec::with_capacity(self.nodes.len());
        bindings.resize_with(self.nodes.len(), Binding::default);
        bindings[ROOT.0] = Binding::Root(source);

        self.clear_maps(target)?;
        self.create_maps(target)?;
        self.reset_sequences(target)?;

        for &id in &self.exec {
            let binding = std::mem::take(&mut bindings[id.0]);
            match &self.nodes[id.0] {
                SplitNode::Record(branch) => {
                    self.split_record(branch, binding.into_rows()?, &mut bindings, target)?
                }
                SplitNode::Collection(branch) => {
                    self.split_collection(branch, binding.into_elements()?, &mut bindings, target)?
                }
                SplitNode::Map(map) => split_map(map, binding, target)?,
                SplitNode::Terminal(_) => {}
            }
        }

        trace!(nodes = self.exec.len(), "split row");
        Ok(())
    }

    fn split_record<'s>(
        &self,
        branch: &Branch,
        rows: Rows<'s>,
        bindings: &mut [Binding<'s>],
        target: &mut Record,
    ) -> Result<()> {
        match rows {
            Rows::One(row) => {
                for &child in &branch.children {
                    let node = &self.nodes[child.0];
                    let value = field(row, node.field_index())?;
                    match node {
                        SplitNode::Terminal(t) => {
                            target.set(t.target, value.cloned().unwrap_or_default())?
                        }
                        _ => bindings[child.0] = Binding::One(value),
                    }
                }
            }
            Rows::Many(rows) => {
                for &child in &branch.children {
                    let index = self.nodes[child.0].field_index();
                    let values = rows
                        .iter()
                        .map(|&row| field(row, index))
                        .collect::<Result<Vec<_>, _>>()?;
                    self.fan_out(child, values, bindings, target)?;
                }
            }
        }
        Ok(())
    }

    fn split_collection<'s>(
        &self,
        branch: &Branch,
        elements: Vec<&'s Record>,
        bindings: &mut [Binding<'s>],
        target: &mut Record,
    ) -> Result<()> {
        for &child in &branch.children {
            let index = self.nodes[child.0].field_index();
            let values = elements
                .iter()
                .map(|element| element.get(index).map(Some))
                .collect::<Result<Vec<_>, _>>()?;
            self.fan_out(child, values, bindings, target)?;
        }
        Ok(())
    }

    /// Hand per-element values to `child`: terminals append one scratch
    /// record per element, branches hold the values for their own turn.
    fn fan_out<'s>(
        &self,
        child: NodeId,
        values: Vec<Option<&'s Value>>,
        bindings: &mut [Binding<'s>],
        target: &mut Record,
    ) -> Result<()> {
        match &self.nodes[child.0] {
            SplitNode::Terminal(t) => {
                for value in values {
                    target.append(t.target, Record::singleton(value.cloned().unwrap_or_default()))?;
                }
            }
            _ => bindings[child.0] = Binding::Many(values),
        }
        Ok(())
    }

    fn single_maps(&self) -> impl Iterator<Item = &MapSplit> {
        self.map_nodes.iter().filter_map(|id| match &self.nodes[id.0] {
            SplitNode::Map(map) if !map.repeated => Some(map),
            _ => None,
        })
    }

    /// Empty the destination maps left over from the previous row
    fn clear_maps(&self, target: &mut Record) -> Result<()> {
        for map in self.single_maps() {
            if let Value::Map(dest) = target.get_mut(map.target)? {
                dest.clear();
            }
        }
        Ok(())
    }

    /// Give every map slot that does not hold a map a fresh empty one
    fn create_maps(&self, target: &mut Record) -> Result<()> {
        for map in self.single_maps() {
            let slot = target.get_mut(map.target)?;
            if !matches!(slot, Value::Map(_)) {
                *slot = Value::Map(MapValue::new());
            }
        }
        Ok(())
    }

    /// Sequences accumulate by appending, so start each row empty
    fn reset_sequences(&self, target: &mut Record) -> Result<()> {
        for &slot in &self.sequence_slots {
            match target.get_mut(slot)? {
                Value::Collection(elements) => elements.clear(),
                other => *other = Value::Collection(Vec::new()),
            }
        }
        Ok(())
    }
}

fn split_map(map: &MapSplit, binding: Binding<'_>, target: &mut Record) -> Result<()> {
    match binding {
        Binding::Many(values) => {
            for value in values {
                let filtered = match map_of(value)? {
                    Some(source) => {
                        let mut dest = MapValue::new();
                        filter_keys(source, &map.keys, &mut dest);
                        Value::Map(dest)
                    }
                    None => Value::Null,
                };
                target.append(map.target, Record::singleton(filtered))?;
            }
        }
        Binding::Root(_) => {
            return Err(ContainerError::UnexpectedKind {
                expected: "map",
                found: "record",
            }
            .into())
        }
        Binding::One(value) => {
            if let Some(source) = map_of(value)? {
                filter_keys(source, &map.keys, target.map_mut(map.target)?);
            }
        }
        Binding::Unbound => {}
    }
    Ok(())
}

/// A split plan together with the target record it reuses across rows
#[derive(Debug, Clone)]
pub struct Splitter {
    plan: SplitPlan,
    target: Record,
}

impl Splitter {
    pub fn new(plan: SplitPlan) -> Self {
        let target = plan.new_target();
        Splitter { plan, target }
    }

    /// Build the plan for `projection` over `physical`
    pub fn build(physical: &Schema, projection: &Projection) -> Result<Self> {
        Ok(Self::new(SplitPlan::build(physical, projection)?))
    }

    pub fn plan(&self) -> &SplitPlan {
        &self.plan
    }

    /// Split one source record. The returned record is overwritten by the
    /// next call.
    pub fn execute(&mut self, source: &Record) -> Result<&Record> {
        self.plan.execute(source, &mut self.target)?;
        Ok(&self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectedColumn;
    use crate::schema::{ColumnSchema, ColumnType};
    use crate::Error;

    fn map(entries: &[(&str, i32)]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), Value::Int(*v)))
                .collect(),
        )
    }

    fn ints(values: &[i32]) -> Value {
        Value::Collection(
            values
                .iter()
                .map(|v| Record::singleton(Value::Int(*v)))
                .collect(),
        )
    }

    fn record_map_schema() -> Schema {
        Schema::new(vec![ColumnSchema::record("a", vec![
            ColumnSchema::new("b", ColumnType::Int),
            ColumnSchema::map("c", ColumnSchema::new("", ColumnType::Int)),
        ])])
    }

    fn record_map_row(b: i32, c: &[(&str, i32)]) -> Record {
        Record::new(vec![Value::Record(Record::new(vec![Value::Int(b), map(c)]))])
    }

    #[test]
    fn test_record_and_map_split() {
        let projection = Projection::new(vec![
            ProjectedColumn::new("a.b"),
            ProjectedColumn::new("a.c").with_keys(["k1"]),
        ]);
        let mut splitter = Splitter::build(&record_map_schema(), &projection).unwrap();

        let row = splitter.execute(&record_map_row(5, &[("k1", 7), ("k2", 9)])).unwrap();

        assert_eq!(row.get(0).unwrap(), &Value::Int(5));
        assert_eq!(row.get(1).unwrap(), &map(&[("k1", 7)]));
    }

    #[test]
    fn test_maps_do_not_leak_between_rows() {
        let projection = Projection::new(vec![ProjectedColumn::new("a.c").with_keys(["k1", "k2"])]);
        let mut splitter = Splitter::build(&record_map_schema(), &projection).unwrap();

        splitter.execute(&record_map_row(1, &[("k1", 1), ("k2", 2)])).unwrap();
        let row = splitter.execute(&record_map_row(2, &[("k2", 20), ("k3", 30)])).unwrap();

        assert_eq!(row.get(0).unwrap(), &map(&[("k2", 20)]));
    }

    #[test]
    fn test_requested_key_absent_from_source() {
        let projection = Projection::new(vec![ProjectedColumn::new("a.c").with_keys(["zz"])]);
        let mut splitter = Splitter::build(&record_map_schema(), &projection).unwrap();

        let row = splitter.execute(&record_map_row(1, &[("k1", 1)])).unwrap();
        assert_eq!(row.get(0).unwrap(), &Value::Map(MapValue::new()));
    }

    #[test]
    fn test_null_map_leaves_empty_destination() {
        let projection = Projection::new(vec![ProjectedColumn::new("a.c").with_keys(["k1"])]);
        let mut splitter = Splitter::build(&record_map_schema(), &projection).unwrap();

        let source = Record::new(vec![Value::Record(Record::new(vec![Value::Int(1), Value::Null]))]);
        let row = splitter.execute(&source).unwrap();
        assert_eq!(row.get(0).unwrap(), &Value::Map(MapValue::new()));
    }

    #[test]
    fn test_collection_split_preserves_order() {
        let physical = Schema::new(vec![ColumnSchema::collection("a", vec![
            ColumnSchema::new("x", ColumnType::Int),
        ])]);
        let mut splitter = Splitter::build(&physical, &Projection::from_paths(["a.x"])).unwrap();

        let source = Record::new(vec![ints(&[1, 2, 3])]);
        let row = splitter.execute(&source).unwrap();
        assert_eq!(row.get(0).unwrap(), &ints(&[1, 2, 3]));

        // sequences are reset, not appended to, on the next row
        let row = splitter.execute(&Record::new(vec![ints(&[4])])).unwrap();
        assert_eq!(row.get(0).unwrap(), &ints(&[4]));
    }

    #[test]
    fn test_nested_record_below_collection() {
        let physical = Schema::new(vec![ColumnSchema::collection("events", vec![
            ColumnSchema::new("ts", ColumnType::Int),
            ColumnSchema::record("meta", vec![ColumnSchema::new("n", ColumnType::Int)]),
        ])]);
        let mut splitter =
            Splitter::build(&physical, &Projection::from_paths(["events.meta.n"])).unwrap();

        let event = |ts: i32, meta: Value| Record::new(vec![Value::Int(ts), meta]);
        let source = Record::new(vec![Value::Collection(vec![
            event(1, Value::Record(Record::singleton(Value::Int(10)))),
            event(2, Value::Null),
            event(3, Value::Record(Record::singleton(Value::Int(30)))),
        ])]);

        let row = splitter.execute(&source).unwrap();
        assert_eq!(
            row.get(0).unwrap(),
            &Value::Collection(vec![
                Record::singleton(Value::Int(10)),
                Record::singleton(Value::Null),
                Record::singleton(Value::Int(30)),
            ])
        );
    }

    #[test]
    fn test_map_below_collection() {
        let physical = Schema::new(vec![ColumnSchema::collection("items", vec![
            ColumnSchema::map("attrs", ColumnSchema::new("", ColumnType::Int)),
        ])]);
        let projection = Projection::new(vec![ProjectedColumn::new("items.attrs").with_keys(["w"])]);
        let mut splitter = Splitter::build(&physical, &projection).unwrap();

        let source = Record::new(vec![Value::Collection(vec![
            Record::singleton(map(&[("w", 1), ("h", 2)])),
            Record::singleton(map(&[("h", 3)])),
        ])]);
        let row = splitter.execute(&source).unwrap();

        assert_eq!(
            row.get(0).unwrap(),
            &Value::Collection(vec![
                Record::singleton(map(&[("w", 1)])),
                Record::singleton(Value::Map(MapValue::new())),
            ])
        );
    }

    #[test]
    fn test_skipped_slot_is_never_written() {
        let projection = Projection::from_paths(["a.zz", "a.b"]);
        let plan = SplitPlan::build(&record_map_schema(), &projection).unwrap();

        let mut target = plan.new_target();
        target.set(0, Value::String("caller".to_string())).unwrap();
        plan.execute(&record_map_row(3, &[]), &mut target).unwrap();

        assert_eq!(target.get(0).unwrap(), &Value::String("caller".to_string()));
        assert_eq!(target.get(1).unwrap(), &Value::Int(3));
    }

    #[test]
    fn test_execute_is_idempotent() {
        let projection = Projection::parse("a.b, a.c#{k1|k2}").unwrap();
        let mut splitter = Splitter::build(&record_map_schema(), &projection).unwrap();
        let source = record_map_row(8, &[("k1", 1), ("k3", 3)]);

        let first = splitter.execute(&source).unwrap().clone();
        let second = splitter.execute(&source).unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_container_errors_propagate() {
        let mut splitter =
            Splitter::build(&record_map_schema(), &Projection::from_paths(["a.b"])).unwrap();

        let err = splitter.execute(&Record::new(vec![Value::Int(1)])).unwrap_err();
        assert!(matches!(
            err,
            Error::Container(ContainerError::UnexpectedKind { expected: "record", found: "int" })
        ));

        let err = splitter.execute(&Record::new(vec![])).unwrap_err();
        assert!(matches!(err, Error::Container(ContainerError::IndexOutOfRange { .. })));
    }
}
