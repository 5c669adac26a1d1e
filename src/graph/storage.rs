//! In-memory mirror of the backend graph
//!
//! `GraphStorage` keeps the nodes, edges and hyperedges the user has worked
//! with and forwards every node and edge mutation to the configured
//! `Database`. The backend is always written first; the mirror only changes
//! when the backend call succeeded. Hyperedges have no backend representation
//! and only ever live here.

use super::edge::{Edge, HyperEdge};
use super::node::Node;
use crate::database::{finish_session, Database, DatabaseError};
use indexmap::IndexSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// File names written by `export_graph`
pub const NODES_FILE: &str = "nodes.csv";
pub const EDGES_FILE: &str = "edges.csv";

/// Errors that can occur during graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Row counts written by `export_graph`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Mirror of the backend graph plus the hyperedges layered on top of it
pub struct GraphStorage {
    nodes: IndexSet<Node>,
    edges: IndexSet<Edge>,
    hyper_edges: IndexSet<HyperEdge>,
    db: Arc<dyn Database>,
}

impl GraphStorage {
    /// Create an empty mirror over a backend
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            nodes: IndexSet::new(),
            edges: IndexSet::new(),
            hyper_edges: IndexSet::new(),
            db,
        }
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    pub fn nodes(&self) -> &IndexSet<Node> {
        &self.nodes
    }

    pub fn edges(&self) -> &IndexSet<Edge> {
        &self.edges
    }

    pub fn hyper_edges(&self) -> &IndexSet<HyperEdge> {
        &self.hyper_edges
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains(&Node::new(name))
    }

    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.edges.contains(edge)
    }

    pub fn contains_hyper_edge(&self, hyper_edge: &HyperEdge) -> bool {
        self.hyper_edges.contains(hyper_edge)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn hyper_edge_count(&self) -> usize {
        self.hyper_edges.len()
    }

    /// Add a node to the backend, then to the mirror
    pub async fn add_node(&mut self, name: &str) -> GraphResult<()> {
        let node = Node::new(name);
        let mut session = self.db.session().await?;
        let outcome = self
            .db
            .add_node(session.as_mut(), &node.labels(), &node.properties())
            .await;
        finish_session(session, outcome).await?;

        self.nodes.insert(node);
        Ok(())
    }

    /// Delete a node from the backend, then drop it and its edges from the mirror
    pub async fn delete_node(&mut self, name: &str) -> GraphResult<()> {
        let node = Node::new(name);
        let mut session = self.db.session().await?;
        let outcome = self
            .db
            .delete_node(session.as_mut(), &node.labels(), &node.properties())
            .await;
        finish_session(session, outcome).await?;

        self.nodes.shift_remove(&node);
        self.edges.retain(|edge| !edge.touches(&node));
        Ok(())
    }

    /// Add a directed edge; both endpoints are created if missing
    pub async fn add_edge(&mut self, start: &str, end: &str, label: &str) -> GraphResult<()> {
        let edge = Edge::new(start, end, label);
        let mut session = self.db.session().await?;
        let outcome = self
            .db
            .add_edge(
                session.as_mut(),
                &edge.start().labels(),
                &edge.start().properties(),
                &edge.end().labels(),
                &edge.end().properties(),
                edge.relationship_type(),
            )
            .await;
        finish_session(session, outcome).await?;

        self.nodes.insert(edge.start().clone());
        self.nodes.insert(edge.end().clone());
        self.edges.insert(edge);
        Ok(())
    }

    /// Delete a directed edge; deleting an absent edge is not an error
    ///
    /// A backend without relationship types keeps one relationship per
    /// endpoint pair, so every mirrored type between the pair goes with it.
    pub async fn delete_edge(&mut self, start: &str, end: &str, label: &str) -> GraphResult<()> {
        let edge = Edge::new(start, end, label);
        let mut session = self.db.session().await?;
        let outcome = self
            .db
            .delete_edge(
                session.as_mut(),
                &edge.start().labels(),
                &edge.start().properties(),
                &edge.end().labels(),
                &edge.end().properties(),
                edge.relationship_type(),
            )
            .await;
        finish_session(session, outcome).await?;

        if self.db.capabilities().relationship_types {
            self.edges.shift_remove(&edge);
        } else {
            self.edges
                .retain(|e| !(e.start() == edge.start() && e.end() == edge.end()));
        }
        Ok(())
    }

    /// Add a hyperedge to the mirror. Returns false if it was already present.
    pub fn add_hyper_edge<I, S>(&mut self, names: I, label: &str) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<Node>,
    {
        self.hyper_edges.insert(HyperEdge::new(names, label))
    }

    /// Remove a hyperedge from the mirror. Returns false if it was not present.
    pub fn delete_hyper_edge<I, S>(&mut self, names: I, label: &str) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<Node>,
    {
        self.hyper_edges.shift_remove(&HyperEdge::new(names, label))
    }

    /// Load nodes through the backend and mirror every named record
    ///
    /// With `clear`, the mirrored node set is emptied first. Returns the
    /// number of nodes mirrored.
    pub async fn import_nodes_from_csv(&mut self, path: &Path, clear: bool) -> GraphResult<usize> {
        let mut session = self.db.session().await?;
        let outcome = self.db.import_nodes_from_csv(session.as_mut(), path).await;
        let records = finish_session(session, outcome).await?;

        if clear {
            self.nodes.clear();
        }
        let mut mirrored = 0;
        for record in &records {
            match record.name() {
                Some(name) => {
                    self.nodes.insert(Node::new(name));
                    mirrored += 1;
                }
                None => warn!("Node record without a name was loaded but not mirrored"),
            }
        }
        info!("Imported {} nodes from {}", mirrored, path.display());
        Ok(mirrored)
    }

    /// Load edges through the backend and mirror them with their endpoints
    ///
    /// Records without a relationship type are mirrored as `CONNECTED`.
    pub async fn import_edges_from_csv(&mut self, path: &Path, clear: bool) -> GraphResult<usize> {
        let mut session = self.db.session().await?;
        let outcome = self.db.import_edges_from_csv(session.as_mut(), path).await;
        let records = finish_session(session, outcome).await?;

        if clear {
            self.edges.clear();
        }
        for record in &records {
            let relationship_type = record.relationship_type.clone().unwrap_or_default();
            let edge = Edge::new(
                record.start_name.as_str(),
                record.end_name.as_str(),
                relationship_type,
            );
            self.nodes.insert(edge.start().clone());
            self.nodes.insert(edge.end().clone());
            self.edges.insert(edge);
        }
        info!("Imported {} edges from {}", records.len(), path.display());
        Ok(records.len())
    }

    pub async fn export_nodes_to_csv(&self, path: &Path) -> GraphResult<usize> {
        let mut session = self.db.session().await?;
        let outcome = self.db.export_nodes_to_csv(session.as_mut(), path).await;
        Ok(finish_session(session, outcome).await?)
    }

    pub async fn export_edges_to_csv(&self, path: &Path) -> GraphResult<usize> {
        let mut session = self.db.session().await?;
        let outcome = self.db.export_edges_to_csv(session.as_mut(), path).await;
        Ok(finish_session(session, outcome).await?)
    }

    /// Write `nodes.csv` and `edges.csv` into `dir`, creating it if needed
    pub async fn export_graph(&self, dir: &Path) -> GraphResult<ExportSummary> {
        std::fs::create_dir_all(dir)?;
        let nodes = self.export_nodes_to_csv(&dir.join(NODES_FILE)).await?;
        let edges = self.export_edges_to_csv(&dir.join(EDGES_FILE)).await?;
        info!("Exported graph to {}", dir.display());
        Ok(ExportSummary { nodes, edges })
    }

    /// Remove all backend data, then empty the mirror including hyperedges
    pub async fn clear_graph(&mut self) -> GraphResult<()> {
        let mut session = self.db.session().await?;
        let outcome = self.db.clear_data(session.as_mut()).await;
        finish_session(session, outcome).await?;

        self.nodes.clear();
        self.edges.clear();
        self.hyper_edges.clear();
        info!("Graph cleared");
        Ok(())
    }
}

fn write_set<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    write!(f, "{}: {{", title)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "}}")
}

impl fmt::Display for GraphStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_set(f, "Nodes", self.nodes.iter())?;
        writeln!(f)?;
        write_set(f, "Edges", self.edges.iter())?;
        writeln!(f)?;
        write_set(f, "HyperEdges", self.hyper_edges.iter())
    }
}

impl fmt::Debug for GraphStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStorage")
            .field("backend", &self.db.backend())
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("hyper_edges", &self.hyper_edges.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Neo4jConfig;
    use crate::database::Neo4jDatabase;

    fn storage() -> GraphStorage {
        let db = Neo4jDatabase::new(Neo4jConfig::default()).unwrap();
        GraphStorage::new(Arc::new(db))
    }

    #[test]
    fn test_empty_display() {
        assert_eq!(
            storage().to_string(),
            "Nodes: {}\nEdges: {}\nHyperEdges: {}"
        );
    }

    #[test]
    fn test_hyper_edges_stay_in_memory() {
        let mut graph = storage();
        assert!(graph.add_hyper_edge(["a", "b", "c"], "TEAM"));
        assert!(!graph.add_hyper_edge(["c", "b", "a"], "TEAM"));
        assert_eq!(graph.hyper_edge_count(), 1);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(
            graph.to_string(),
            "Nodes: {}\nEdges: {}\nHyperEdges: {('a', 'b', 'c')->[TEAM]}"
        );

        assert!(!graph.delete_hyper_edge(["a", "b"], "TEAM"));
        assert!(graph.delete_hyper_edge(["b", "a", "c"], "TEAM"));
        assert_eq!(graph.hyper_edge_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_backend_leaves_mirror_untouched() {
        let mut graph = storage();
        graph.database().close().await.unwrap();

        let err = graph.add_node("Alice").await.unwrap_err();
        assert!(matches!(err, GraphError::Database(DatabaseError::Closed)));
        assert!(!graph.contains_node("Alice"));

        assert!(graph.add_edge("Alice", "Bob", "KNOWS").await.is_err());
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 0);
    }
}
