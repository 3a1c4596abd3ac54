//! Arena-backed tree of named nodes, each optionally holding an ordered list of records.
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`]. Children keep their
//! first-insertion order for serialization and are also indexed by name, so each name appears
//! at most once under a parent.

use crate::record::Record;
use std::collections::HashMap;
use thiserror::Error;

/// Key under which a node's records are serialized; not usable as a segment name.
pub const LOGS_KEY: &str = "logs";

/// Handle to a node inside a [`PathTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Reasons a path cannot address a node.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// Paths need at least one segment.
    #[error("path must contain at least one segment")]
    Empty,
    /// Segment collides with the reserved records key.
    #[error("path segment '{0}' is reserved")]
    Reserved(String),
}

#[derive(Debug, Default)]
struct Node {
    name: String,
    children: Vec<NodeId>,
    index: HashMap<String, NodeId>,
    records: Option<Vec<Record>>,
}

/// In-memory log tree rooted at an unnamed node.
#[derive(Debug)]
pub struct PathTree {
    nodes: Vec<Node>,
    record_count: usize,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    /// Create a tree holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            record_count: 0,
        }
    }

    /// Handle of the root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Check that `name` may be used as a path segment.
    pub fn validate_segment(name: &str) -> Result<(), PathError> {
        if name == LOGS_KEY {
            return Err(PathError::Reserved(name.to_string()));
        }
        Ok(())
    }

    /// Return the child of `node` named `name`, creating an empty one if absent.
    pub fn ensure_child(&mut self, node: NodeId, name: &str) -> NodeId {
        if let Some(existing) = self.child(node, name) {
            return existing;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            ..Node::default()
        });
        let parent = &mut self.nodes[node.0];
        parent.children.push(id);
        parent.index.insert(name.to_string(), id);
        id
    }

    /// Look up an existing child without creating it.
    pub fn child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[node.0].index.get(name).copied()
    }

    /// Walk `path` from the root, creating missing nodes along the way.
    pub fn resolve_path<S: AsRef<str>>(&mut self, path: &[S]) -> Result<NodeId, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        for segment in path {
            Self::validate_segment(segment.as_ref())?;
        }

        let mut cursor = self.root();
        for segment in path {
            cursor = self.ensure_child(cursor, segment.as_ref());
        }
        Ok(cursor)
    }

    /// Find the node at `path` without creating anything.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root(), |cursor, segment| self.child(cursor, segment.as_ref()))
    }

    /// Append `record` to the records of `node`, preserving insertion order.
    pub fn append_record(&mut self, node: NodeId, record: Record) {
        self.nodes[node.0]
            .records
            .get_or_insert_with(Vec::new)
            .push(record);
        self.record_count += 1;
    }

    /// Records stored directly on `node`.
    pub fn records(&self, node: NodeId) -> &[Record] {
        self.nodes[node.0].records.as_deref().unwrap_or(&[])
    }

    /// Whether `node` has ever had a record appended.
    pub fn has_records(&self, node: NodeId) -> bool {
        self.nodes[node.0].records.is_some()
    }

    /// Children of `node` in first-insertion order.
    pub fn children(&self, node: NodeId) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.nodes[node.0]
            .children
            .iter()
            .map(|id| (self.nodes[id.0].name.as_str(), *id))
    }

    /// Append every record of `newer` after the records already here, node by node.
    ///
    /// Nodes missing from `self` are created in `newer`'s child order, so merging a tree
    /// detached from `self` back into it restores the original order.
    pub fn merge(&mut self, mut newer: PathTree) {
        let mut pending = vec![(newer.root(), self.root())];
        while let Some((from, to)) = pending.pop() {
            if let Some(records) = newer.nodes[from.0].records.take() {
                for record in records {
                    self.append_record(to, record);
                }
            }
            let children = std::mem::take(&mut newer.nodes[from.0].children);
            let targets: Vec<(NodeId, NodeId)> = children
                .into_iter()
                .map(|child| {
                    let name = std::mem::take(&mut newer.nodes[child.0].name);
                    (child, self.ensure_child(to, &name))
                })
                .collect();
            // Reversed so the stack visits children in insertion order.
            pending.extend(targets.into_iter().rev());
        }
    }

    /// Total records held anywhere in the tree.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree has neither children nor records.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.record_count == 0
    }
}
