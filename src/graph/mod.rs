//! Graph data model and the in-memory mirror
//!
//! - `Node`, `Edge`, `HyperEdge`: immutable value objects with set semantics
//! - `PropertyValue` / `PropertyMap`: values handed to backends, plus the
//!   literal notation used by the interchange files
//! - `GraphStorage`: mirror that forwards mutations to a `Database`

pub mod edge;
pub mod node;
pub mod property;
pub mod storage;
pub mod types;

// Re-export main types
pub use edge::{Edge, HyperEdge};
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use storage::{ExportSummary, GraphError, GraphResult, GraphStorage};
pub use types::{EdgeType, Label, DEFAULT_NODE_LABEL, DEFAULT_RELATIONSHIP};
