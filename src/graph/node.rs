//! Node value object
//!
//! A node is identified by its name and nothing else. Two nodes with the same
//! name are the same node, which lets them live in hash sets and serve as the
//! endpoints of edges and hyperedges.

use super::property::{PropertyMap, PropertyValue};
use super::types::Label;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named graph vertex
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Node {
    name: String,
}

impl Node {
    /// Create a node from its name
    pub fn new(name: impl Into<String>) -> Self {
        Node { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Labels used when this node is written to a backend
    pub fn labels(&self) -> Vec<Label> {
        vec![Label::default()]
    }

    /// Properties used when this node is written to a backend
    pub fn properties(&self) -> PropertyMap {
        let mut properties = PropertyMap::new();
        properties.insert("name".to_string(), PropertyValue::from(self.name.as_str()));
        properties
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.name)
    }
}

impl From<&str> for Node {
    fn from(name: &str) -> Self {
        Node::new(name)
    }
}

impl From<String> for Node {
    fn from(name: String) -> Self {
        Node::new(name)
    }
}
