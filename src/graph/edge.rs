//! Edge and hyperedge value objects
//!
//! - `Edge` is a directed, labeled relation between two nodes. Direction is
//!   part of its identity.
//! - `HyperEdge` is an unordered, labeled relation over any number of nodes.
//!   It lives only in the in-memory mirror.

use super::node::Node;
use super::types::EdgeType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A directed edge identified by (start, end, relationship type)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    start: Node,
    end: Node,
    relationship_type: EdgeType,
}

impl Edge {
    /// Create a new directed edge
    pub fn new(
        start: impl Into<Node>,
        end: impl Into<Node>,
        relationship_type: impl Into<EdgeType>,
    ) -> Self {
        Edge {
            start: start.into(),
            end: end.into(),
            relationship_type: relationship_type.into(),
        }
    }

    pub fn start(&self) -> &Node {
        &self.start
    }

    pub fn end(&self) -> &Node {
        &self.end
    }

    pub fn relationship_type(&self) -> &EdgeType {
        &self.relationship_type
    }

    /// Check if this edge goes FROM a specific node
    pub fn starts_from(&self, node: &Node) -> bool {
        &self.start == node
    }

    /// Check if this edge goes TO a specific node
    pub fn ends_at(&self, node: &Node) -> bool {
        &self.end == node
    }

    /// Check if either endpoint is the given node
    pub fn touches(&self, node: &Node) -> bool {
        self.starts_from(node) || self.ends_at(node)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}) --[{}]--> ({})",
            self.start.name(),
            self.relationship_type,
            self.end.name()
        )
    }
}

/// An n-ary relation over a set of nodes
///
/// The member set is ordered internally so that two hyperedges built from the
/// same names in a different order compare and hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HyperEdge {
    nodes: BTreeSet<Node>,
    relationship_type: EdgeType,
}

impl HyperEdge {
    pub fn new<I, N>(nodes: I, relationship_type: impl Into<EdgeType>) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        HyperEdge {
            nodes: nodes.into_iter().map(Into::into).collect(),
            relationship_type: relationship_type.into(),
        }
    }

    pub fn nodes(&self) -> &BTreeSet<Node> {
        &self.nodes
    }

    pub fn relationship_type(&self) -> &EdgeType {
        &self.relationship_type
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.nodes.contains(node)
    }

    /// Number of member nodes
    pub fn arity(&self) -> usize {
        self.nodes.len()
    }
}

impl fmt::Display for HyperEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", node)?;
        }
        write!(f, ")->[{}]", self.relationship_type)
    }
}
