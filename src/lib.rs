//! Hograph: higher-order graph editing over pluggable graph databases
//!
//! Nodes and directed edges are written through to a backend database;
//! hyperedges (relations over any number of nodes) are layered on top in
//! memory. `GraphStorage` keeps the in-memory mirror and is the single entry
//! point for callers.
//!
//! # Backends
//!
//! - Neo4j: labeled property graph, reached over its HTTP transactional API
//! - Kuzu: embedded table-oriented engine, behind the `kuzu` feature
//!
//! Backends differ in what they keep; see `database::Capabilities`.
//!
//! # Bulk interchange
//!
//! Both backends import and export node and edge CSV files. Neo4j uses
//! `labels,properties` with literal mappings; Kuzu uses pipe-delimited
//! `name` and `start_name|end_name` tables.
//!
//! ## Example Usage
//!
//! ```no_run
//! use hograph::config::{connect, DatabaseConfig};
//! use hograph::GraphStorage;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let db = connect(&DatabaseConfig::from_env()?)?;
//! let mut graph = GraphStorage::new(db.clone());
//!
//! graph.add_edge("Alice", "Bob", "KNOWS").await?;
//! graph.add_hyper_edge(["Alice", "Bob", "Carol"], "TEAM");
//! println!("{}", graph);
//!
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod graph;

// Re-export main types for convenience
pub use config::{connect, ConfigError, DatabaseConfig, KuzuConfig, Neo4jConfig};
pub use database::{
    Backend, Capabilities, Database, DatabaseError, DatabaseResult, EdgeRecord, NodeRecord,
    Session, Statement,
};
pub use graph::{
    Edge, EdgeType, ExportSummary, GraphError, GraphResult, GraphStorage, HyperEdge, Label, Node,
    PropertyMap, PropertyValue,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.1.0");
    }
}
