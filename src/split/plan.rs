//! Split plans: matching a projection against the physical schema
//!
//! The plan is built once per query. Each projected path is resolved level
//! by level against the physical schema, producing a chain of branch nodes
//! that ends in a terminal write. Nodes are recorded in discovery order so
//! the executor can run them front to back without walking the tree, and
//! MAP nodes are listed again for per-row map lifecycle handling.

use crate::error::{Error, Result};
use crate::projection::{KeySet, Projection};
use crate::schema::{ColumnSchema, ColumnType, PathCursor, Schema};
use crate::split::node::{Branch, MapSplit, NodeId, SplitNode, Terminal};
use crate::value::Record;
use std::fmt;
use tracing::{debug, error};

pub(crate) const ROOT: NodeId = NodeId(0);

/// Immutable split tree plus its precomputed execution lists
#[derive(Debug, Clone)]
pub struct SplitPlan {
    pub(crate) nodes: Vec<SplitNode>,
    /// Branch nodes in discovery order; parents always precede children
    pub(crate) exec: Vec<NodeId>,
    pub(crate) map_nodes: Vec<NodeId>,
    /// Target slots that receive sequence output
    pub(crate) sequence_slots: Vec<usize>,
    labels: Vec<String>,
}

impl SplitPlan {
    /// Match `projection` against `physical` and build the split tree.
    ///
    /// Projected columns without a name, or whose path leaves the physical
    /// schema, are skipped. A declared type that contradicts the physical
    /// schema, or two columns with the same label, abort the whole build.
    pub fn build(physical: &Schema, projection: &Projection) -> Result<Self> {
        projection.check_labels()?;
        let mut builder = PlanBuilder::new();

        for (target, column) in projection.columns().iter().enumerate() {
            let Some(name) = column.name.as_deref().filter(|n| !n.is_empty()) else {
                continue;
            };

            let mut cursor = PathCursor::new(name);
            let Some(physical_column) = cursor.advance().and_then(|s| physical.column(s)) else {
                debug!(path = name, "skipping projected column missing from physical schema");
                continue;
            };

            builder.resolve(ROOT, physical_column, &mut cursor, column.keys.clone(), target, false)?;
        }

        let plan = builder.finish(projection);
        debug!(
            nodes = plan.node_count(),
            terminals = plan.terminal_count(),
            maps = plan.map_nodes.len(),
            "built split plan"
        );
        Ok(plan)
    }

    pub fn node(&self, id: NodeId) -> Option<&SplitNode> {
        self.nodes.get(id.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes that write a target slot
    pub fn terminal_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.target().is_some()).count()
    }

    pub fn exec_order(&self) -> &[NodeId] {
        &self.exec
    }

    pub fn map_nodes(&self) -> &[NodeId] {
        &self.map_nodes
    }

    pub fn sequence_slots(&self) -> &[usize] {
        &self.sequence_slots
    }

    /// Width of the target record: one slot per projected column
    pub fn target_width(&self) -> usize {
        self.labels.len()
    }

    /// Projection labels, indexed by target slot
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// A fresh target record sized for this plan
    pub fn new_target(&self) -> Record {
        Record::with_width(self.target_width())
    }

    /// Indented rendering of the split tree
    pub fn explain(&self) -> String {
        self.to_string()
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let Some(node) = self.node(id) else {
            return Ok(());
        };
        let indent = "  ".repeat(depth);
        match node {
            SplitNode::Record(_) | SplitNode::Collection(_) if id == ROOT => {
                writeln!(f, "{}{}", indent, node.kind())?
            }
            SplitNode::Record(b) | SplitNode::Collection(b) => {
                writeln!(f, "{}{} [{}]", indent, node.kind(), b.field_index)?
            }
            SplitNode::Map(m) => {
                let keys: Vec<&str> = m.keys.iter().map(String::as_str).collect();
                writeln!(
                    f,
                    "{}map [{}] keys={{{}}} -> #{} ({})",
                    indent,
                    m.field_index,
                    keys.join("|"),
                    m.target,
                    self.labels[m.target]
                )?
            }
            SplitNode::Terminal(t) => writeln!(
                f,
                "{}none [{}] -> #{} ({})",
                indent, t.field_index, t.target, self.labels[t.target]
            )?,
        }
        for &child in node.children() {
            self.render(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for SplitPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, ROOT, 0)
    }
}

/// Accumulates nodes for a single `SplitPlan::build` call
struct PlanBuilder {
    nodes: Vec<SplitNode>,
    exec: Vec<NodeId>,
    map_nodes: Vec<NodeId>,
    sequence_slots: Vec<usize>,
}

impl PlanBuilder {
    fn new() -> Self {
        let mut builder = PlanBuilder {
            nodes: Vec::new(),
            exec: Vec::new(),
            map_nodes: Vec::new(),
            sequence_slots: Vec::new(),
        };
        let root = builder.push(SplitNode::Record(Branch::new(0)));
        builder.exec.push(root);
        builder
    }

    fn push(&mut self, node: SplitNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        match &mut self.nodes[parent.0] {
            SplitNode::Record(branch) | SplitNode::Collection(branch) => {
                branch.children.push(child);
                Ok(())
            }
            other => Err(Error::InvariantViolation(format!(
                "cannot attach a child to a {} node",
                other.kind()
            ))),
        }
    }

    /// Resolve the rest of `cursor` beneath `column`, which matched the
    /// segment just consumed, and attach the result to `parent`.
    ///
    /// Returns whether anything was attached.
    fn resolve(
        &mut self,
        parent: NodeId,
        column: &ColumnSchema,
        cursor: &mut PathCursor<'_>,
        mut keys: Option<KeySet>,
        target: usize,
        repeated: bool,
    ) -> Result<bool> {
        let declared = cursor.declared(keys.is_some());
        if declared == ColumnType::Any {
            self.terminal(parent, column, keys.as_ref(), target, repeated)?;
            return Ok(true);
        }

        if !declared.admits(column.column_type) {
            return Err(Error::SchemaMismatch {
                path: cursor.path().to_string(),
                declared,
                actual: column.column_type,
            });
        }

        let nested = column.schema.as_ref().ok_or_else(|| Error::MissingNestedSchema {
            column: column.name.clone(),
        })?;

        let node = match column.column_type {
            ColumnType::Map => {
                let requested = keys.take().unwrap_or_default();
                check_map_value(column, nested)?;

                let node = self.push(SplitNode::Map(MapSplit {
                    field_index: column.index,
                    keys: requested,
                    target,
                    repeated,
                }));
                self.exec.push(node);
                self.map_nodes.push(node);
                if repeated {
                    self.sequence_slots.push(target);
                }
                node
            }
            ColumnType::Record | ColumnType::Collection => {
                let segment = cursor.advance().ok_or_else(|| {
                    Error::InvariantViolation(format!("path {} ended inside a branch", cursor.path()))
                })?;
                let Some(child) = nested.column(segment) else {
                    debug!(path = cursor.path(), segment, "skipping path segment missing from physical schema");
                    return Ok(false);
                };

                let branch = Branch::new(column.index);
                let (node, repeated) = if column.column_type == ColumnType::Collection {
                    (self.push(SplitNode::Collection(branch)), true)
                } else {
                    (self.push(SplitNode::Record(branch)), repeated)
                };
                self.exec.push(node);

                if !self.resolve(node, child, cursor, keys, target, repeated)? {
                    // nothing beneath: this node is the most recent one pushed
                    self.exec.pop();
                    self.nodes.pop();
                    return Ok(false);
                }
                node
            }
            other => {
                return Err(Error::InvariantViolation(format!(
                    "{} admitted as a container type",
                    other
                )))
            }
        };

        self.attach(parent, node)?;
        Ok(true)
    }

    /// Whole-value write of `column` into `target`. Key sets belong to the
    /// MAP node that recognized them, so one reaching a terminal was carried
    /// past its map.
    fn terminal(
        &mut self,
        parent: NodeId,
        column: &ColumnSchema,
        keys: Option<&KeySet>,
        target: usize,
        repeated: bool,
    ) -> Result<()> {
        if keys.is_some_and(|keys| !keys.is_empty()) {
            error!(column = %column.name, "terminal inherited a key set");
            return Err(Error::InvariantViolation(format!(
                "empty key map expected below {}",
                column.name
            )));
        }

        let node = self.push(SplitNode::Terminal(Terminal {
            field_index: column.index,
            target,
        }));
        if repeated {
            self.sequence_slots.push(target);
        }
        self.attach(parent, node)
    }

    fn finish(self, projection: &Projection) -> SplitPlan {
        SplitPlan {
            nodes: self.nodes,
            exec: self.exec,
            map_nodes: self.map_nodes,
            sequence_slots: self.sequence_slots,
            labels: projection.columns().iter().map(|c| c.label()).collect(),
        }
    }
}

/// A map's value is its nested schema's single column, taken whole
fn check_map_value(column: &ColumnSchema, nested: &Schema) -> Result<()> {
    if nested.len() != 1 {
        return Err(Error::MapValueSchema {
            column: column.name.clone(),
            found: nested.len(),
        });
    }
    Ok(())
}
