//! Database adapter layer
//!
//! `Database` is the backend-agnostic contract the mirror talks to. Each
//! implementation turns graph mutations into parameterized statements for its
//! engine and runs them through a `Session` it hands out:
//!
//! - `Neo4jDatabase`: labeled property graph, Cypher over the Neo4j HTTP
//!   transactional endpoint
//! - `KuzuDatabase`: embedded table-oriented engine (feature `kuzu`)
//!
//! A session is scoped to one adapter call: acquire it, pass it to exactly one
//! operation, then `commit` or `rollback` it. `finish_session` does the last step
//! for both outcomes.

pub mod interchange;
#[cfg(feature = "kuzu")]
pub mod kuzu;
pub mod neo4j;

pub use interchange::{EdgeRecord, NodeRecord};
#[cfg(feature = "kuzu")]
pub use self::kuzu::KuzuDatabase;
pub use neo4j::Neo4jDatabase;

use crate::graph::{EdgeType, Label, PropertyMap, PropertyValue};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Errors raised by database adapters
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected a statement
    #[error("Query error [{code}]: {message}")]
    Query { code: String, message: String },

    /// The backend answered with something we cannot interpret
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A required property was not supplied
    #[error("Missing required property '{0}'")]
    MissingProperty(String),

    /// A label, relationship type or property key cannot be used as an identifier
    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// Malformed bulk interchange file
    #[error("Interchange error in {file}: {message}")]
    Interchange { file: String, message: String },

    /// The value cannot be bound as a parameter by this backend
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader/writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The adapter was closed
    #[error("Database connection is closed")]
    Closed,

    /// The configured backend is not compiled into this build
    #[error("Unsupported backend: {0}")]
    Unsupported(String),

    /// Embedded engine error
    #[error("Kuzu error: {0}")]
    Kuzu(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// One row returned by a statement
pub type Row = Vec<PropertyValue>;

/// Query text plus the parameters bound to it
///
/// User-supplied values only ever travel in `parameters`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub parameters: PropertyMap,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: PropertyMap::new(),
        }
    }

    pub fn with_parameters(text: impl Into<String>, parameters: PropertyMap) -> Self {
        Self {
            text: text.into(),
            parameters,
        }
    }

    /// Bind a parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text.trim())
    }
}

/// Which backend an adapter talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend {
    Neo4j,
    Kuzu,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Neo4j => write!(f, "Neo4j"),
            Backend::Kuzu => write!(f, "Kuzu"),
        }
    }
}

/// What a backend keeps of the data it is given
///
/// Both backends implement the whole `Database` contract, but they do not
/// store the same things. Callers that care check these flags instead of the
/// backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Node labels are stored and exported
    pub node_labels: bool,
    /// Node properties other than `name` are stored and exported
    pub node_properties: bool,
    /// Relationship types survive a round-trip
    pub relationship_types: bool,
    /// Relationship properties survive a round-trip
    pub relationship_properties: bool,
    /// Deleting a node also deletes its relationships; otherwise it fails while any remain
    pub detach_delete: bool,
    /// Bulk import uses the engine's own copy facility instead of per-row replay
    pub bulk_copy: bool,
}

/// A scoped unit of work against a backend
#[async_trait]
pub trait Session: Send {
    /// Execute one statement and collect its rows
    async fn run(&mut self, statement: &Statement) -> DatabaseResult<Vec<Row>>;

    /// Make the session's work durable and release it
    async fn commit(self: Box<Self>) -> DatabaseResult<()>;

    /// Discard the session's work where the backend allows it, and release it
    async fn rollback(self: Box<Self>) -> DatabaseResult<()>;
}

/// Backend-agnostic graph mutation and bulk interchange contract
#[async_trait]
pub trait Database: Send + Sync {
    fn backend(&self) -> Backend;

    fn capabilities(&self) -> Capabilities;

    /// Acquire a session for one operation
    async fn session<'a>(&'a self) -> DatabaseResult<Box<dyn Session + 'a>>;

    /// Create a node unless an identical one exists
    async fn add_node(
        &self,
        session: &mut dyn Session,
        labels: &[Label],
        properties: &PropertyMap,
    ) -> DatabaseResult<()>;

    /// Delete matching nodes
    async fn delete_node(
        &self,
        session: &mut dyn Session,
        labels: &[Label],
        properties: &PropertyMap,
    ) -> DatabaseResult<()>;

    /// Merge both endpoints, then merge the relationship between them
    async fn add_edge(
        &self,
        session: &mut dyn Session,
        start_labels: &[Label],
        start_properties: &PropertyMap,
        end_labels: &[Label],
        end_properties: &PropertyMap,
        relationship_type: &EdgeType,
    ) -> DatabaseResult<()>;

    /// Delete the relationship between two matched nodes; absent relationships are not an error
    async fn delete_edge(
        &self,
        session: &mut dyn Session,
        start_labels: &[Label],
        start_properties: &PropertyMap,
        end_labels: &[Label],
        end_properties: &PropertyMap,
        relationship_type: &EdgeType,
    ) -> DatabaseResult<()>;

    /// Remove every node and relationship
    async fn clear_data(&self, session: &mut dyn Session) -> DatabaseResult<()>;

    /// Write all nodes to `path`, returning the number of data rows
    async fn export_nodes_to_csv(&self, session: &mut dyn Session, path: &Path) -> DatabaseResult<usize>;

    /// Write all relationships to `path`, returning the number of data rows
    async fn export_edges_to_csv(&self, session: &mut dyn Session, path: &Path) -> DatabaseResult<usize>;

    /// Load nodes from `path` and report what was loaded
    async fn import_nodes_from_csv(
        &self,
        session: &mut dyn Session,
        path: &Path,
    ) -> DatabaseResult<Vec<NodeRecord>>;

    /// Load relationships from `path` and report what was loaded
    async fn import_edges_from_csv(
        &self,
        session: &mut dyn Session,
        path: &Path,
    ) -> DatabaseResult<Vec<EdgeRecord>>;

    /// Release backend resources; later sessions fail with `DatabaseError::Closed`
    async fn close(&self) -> DatabaseResult<()>;
}

/// Commit on success, roll back on failure, and hand back the outcome
pub async fn finish_session<T>(
    session: Box<dyn Session + '_>,
    outcome: DatabaseResult<T>,
) -> DatabaseResult<T> {
    match outcome {
        Ok(value) => {
            session.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = session.rollback().await {
                warn!("Rollback after failed operation also failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Session double that records statements and replays canned rows

    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    pub struct RecordingSession {
        pub statements: Vec<Statement>,
        pub responses: VecDeque<Vec<Row>>,
    }

    impl RecordingSession {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the rows returned by the next `run`
        pub fn respond(&mut self, rows: Vec<Row>) {
            self.responses.push_back(rows);
        }

        pub fn texts(&self) -> Vec<String> {
            self.statements.iter().map(|s| s.to_string()).collect()
        }
    }

    #[async_trait]
    impl Session for RecordingSession {
        async fn run(&mut self, statement: &Statement) -> DatabaseResult<Vec<Row>> {
            self.statements.push(statement.clone());
            Ok(self.responses.pop_front().unwrap_or_default())
        }

        async fn commit(self: Box<Self>) -> DatabaseResult<()> {
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> DatabaseResult<()> {
            Ok(())
        }
    }
}
