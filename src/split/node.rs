//! Nodes of the split tree
//!
//! Each branch node stands for one container level of the source record and
//! fans its children's values out of that container. Terminal nodes write
//! into the target record at a fixed slot.

use crate::projection::KeySet;

/// Index of a node in the plan's node arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// A RECORD or COLLECTION level
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// Index of this container within its parent
    pub field_index: usize,
    pub children: Vec<NodeId>,
}

impl Branch {
    pub(crate) fn new(field_index: usize) -> Self {
        Branch {
            field_index,
            children: Vec::new(),
        }
    }
}

/// A key-filtered MAP level. The map value is always taken whole.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSplit {
    pub field_index: usize,
    /// Fixed when the map is recognized during planning
    pub keys: KeySet,
    /// Target slot receiving the filtered map
    pub target: usize,
    /// Below a COLLECTION: the slot is a sequence of filtered maps
    pub repeated: bool,
}

/// Writes one source field into the target record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminal {
    pub field_index: usize,
    pub target: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SplitNode {
    Record(Branch),
    Collection(Branch),
    Map(MapSplit),
    Terminal(Terminal),
}

impl SplitNode {
    pub fn field_index(&self) -> usize {
        match self {
            SplitNode::Record(b) | SplitNode::Collection(b) => b.field_index,
            SplitNode::Map(m) => m.field_index,
            SplitNode::Terminal(t) => t.field_index,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match self {
            SplitNode::Record(b) | SplitNode::Collection(b) => &b.children,
            SplitNode::Map(_) | SplitNode::Terminal(_) => &[],
        }
    }

    /// Target slot written by this node, if it writes one directly
    pub fn target(&self) -> Option<usize> {
        match self {
            SplitNode::Map(m) => Some(m.target),
            SplitNode::Terminal(t) => Some(t.target),
            SplitNode::Record(_) | SplitNode::Collection(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SplitNode::Record(_) => "record",
            SplitNode::Collection(_) => "collection",
            SplitNode::Map(_) => "map",
            SplitNode::Terminal(_) => "none",
        }
    }
}
