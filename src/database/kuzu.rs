//! Kuzu adapter: embedded, table-oriented engine
//!
//! The schema is fixed: one `Node` table keyed by `name` and one `Edge` table
//! between nodes. Labels, extra properties and relationship types are accepted
//! for interface compatibility but not stored.

use ::kuzu::{Connection, LogicalType, SystemConfig, Value};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::config::KuzuConfig;
use crate::database::interchange::{self, EdgeRecord, Layout, NodeRecord};
use crate::database::{
    Backend, Capabilities, Database, DatabaseError, DatabaseResult, Row, Session, Statement,
};
use crate::graph::{EdgeType, Label, PropertyMap, PropertyValue};

const NODE_TABLE: &str = "Node";
const EDGE_TABLE: &str = "Edge";

const SCHEMA: [&str; 2] = [
    "CREATE NODE TABLE IF NOT EXISTS Node(name STRING, PRIMARY KEY (name))",
    "CREATE REL TABLE IF NOT EXISTS Edge(FROM Node TO Node)",
];

impl From<::kuzu::Error> for DatabaseError {
    fn from(err: ::kuzu::Error) -> Self {
        DatabaseError::Kuzu(err.to_string())
    }
}

/// Embedded Kuzu database opened at a directory path
pub struct KuzuDatabase {
    db: ::kuzu::Database,
    path: PathBuf,
    closed: AtomicBool,
}

impl KuzuDatabase {
    pub fn open(config: &KuzuConfig) -> DatabaseResult<Self> {
        let db = ::kuzu::Database::new(&config.path, SystemConfig::default())?;
        info!("Opened Kuzu database at {}", config.path.display());
        Ok(Self {
            db,
            path: config.path.clone(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A Kuzu connection; every statement auto-commits
struct KuzuSession<'a> {
    conn: Connection<'a>,
}

#[async_trait]
impl Session for KuzuSession<'_> {
    async fn run(&mut self, statement: &Statement) -> DatabaseResult<Vec<Row>> {
        debug!("Kuzu: {}", statement);
        let result = if statement.parameters.is_empty() {
            self.conn.query(&statement.text)?
        } else {
            let params = statement
                .parameters
                .iter()
                .map(|(key, value)| Ok((key.as_str(), to_kuzu(value)?)))
                .collect::<DatabaseResult<Vec<_>>>()?;
            let mut prepared = self.conn.prepare(&statement.text)?;
            self.conn.execute(&mut prepared, params)?
        };
        Ok(result
            .map(|row| row.into_iter().map(from_kuzu).collect())
            .collect())
    }

    async fn commit(self: Box<Self>) -> DatabaseResult<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DatabaseResult<()> {
        Ok(())
    }
}

#[async_trait]
impl Database for KuzuDatabase {
    fn backend(&self) -> Backend {
        Backend::Kuzu
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            node_labels: false,
            node_properties: false,
            relationship_types: false,
            relationship_properties: false,
            detach_delete: false,
            bulk_copy: true,
        }
    }

    async fn session<'a>(&'a self) -> DatabaseResult<Box<dyn Session + 'a>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DatabaseError::Closed);
        }
        let mut session = KuzuSession {
            conn: Connection::new(&self.db)?,
        };
        for ddl in SCHEMA {
            session.run(&Statement::new(ddl)).await?;
        }
        Ok(Box::new(session))
    }

    async fn add_node(
        &self,
        session: &mut dyn Session,
        _labels: &[Label],
        properties: &PropertyMap,
    ) -> DatabaseResult<()> {
        let name = required_name(properties)?;
        session
            .run(&Statement::new("MERGE (n:Node {name: $name})").param("name", name))
            .await?;
        Ok(())
    }

    async fn delete_node(
        &self,
        session: &mut dyn Session,
        _labels: &[Label],
        properties: &PropertyMap,
    ) -> DatabaseResult<()> {
        let name = required_name(properties)?;
        session
            .run(&Statement::new("MATCH (n:Node {name: $name}) DELETE n").param("name", name))
            .await?;
        Ok(())
    }

    async fn add_edge(
        &self,
        session: &mut dyn Session,
        _start_labels: &[Label],
        start_properties: &PropertyMap,
        _end_labels: &[Label],
        end_properties: &PropertyMap,
        _relationship_type: &EdgeType,
    ) -> DatabaseResult<()> {
        let start = required_name(start_properties)?;
        let end = required_name(end_properties)?;
        session
            .run(&Statement::new("MERGE (n:Node {name: $name})").param("name", start))
            .await?;
        session
            .run(&Statement::new("MERGE (n:Node {name: $name})").param("name", end))
            .await?;
        session
            .run(
                &Statement::new(
                    "MATCH (a:Node {name: $start}), (b:Node {name: $end}) MERGE (a)-[:Edge]->(b)",
                )
                .param("start", start)
                .param("end", end),
            )
            .await?;
        Ok(())
    }

    async fn delete_edge(
        &self,
        session: &mut dyn Session,
        _start_labels: &[Label],
        start_properties: &PropertyMap,
        _end_labels: &[Label],
        end_properties: &PropertyMap,
        _relationship_type: &EdgeType,
    ) -> DatabaseResult<()> {
        let start = required_name(start_properties)?;
        let end = required_name(end_properties)?;
        session
            .run(
                &Statement::new(
                    "MATCH (a:Node {name: $start})-[r:Edge]->(b:Node {name: $end}) DELETE r",
                )
                .param("start", start)
                .param("end", end),
            )
            .await?;
        Ok(())
    }

    async fn clear_data(&self, session: &mut dyn Session) -> DatabaseResult<()> {
        // Relationship table first; the node table cannot be dropped while referenced
        session.run(&Statement::new("DROP TABLE IF EXISTS Edge")).await?;
        session.run(&Statement::new("DROP TABLE IF EXISTS Node")).await?;
        Ok(())
    }

    async fn export_nodes_to_csv(&self, session: &mut dyn Session, path: &Path) -> DatabaseResult<usize> {
        let rows = session
            .run(&Statement::new("MATCH (n:Node) RETURN n.name"))
            .await?;
        let records = rows
            .into_iter()
            .map(|row| Ok(NodeRecord::named(string_cell(&row, 0)?)))
            .collect::<DatabaseResult<Vec<_>>>()?;
        let written = interchange::write_nodes(path, Layout::Table, &records)?;
        info!("Exported {} nodes to {}", written, path.display());
        Ok(written)
    }

    async fn export_edges_to_csv(&self, session: &mut dyn Session, path: &Path) -> DatabaseResult<usize> {
        let rows = session
            .run(&Statement::new(
                "MATCH (a:Node)-[:Edge]->(b:Node) RETURN a.name, b.name",
            ))
            .await?;
        let records = rows
            .into_iter()
            .map(|row| Ok(EdgeRecord::new(string_cell(&row, 0)?, string_cell(&row, 1)?, None)))
            .collect::<DatabaseResult<Vec<_>>>()?;
        let written = interchange::write_edges(path, Layout::Table, &records)?;
        info!("Exported {} edges to {}", written, path.display());
        Ok(written)
    }

    async fn import_nodes_from_csv(
        &self,
        session: &mut dyn Session,
        path: &Path,
    ) -> DatabaseResult<Vec<NodeRecord>> {
        let records = interchange::read_nodes(path, Layout::Table)?;
        session.run(&copy_from(NODE_TABLE, path)).await?;
        info!("Copied {} nodes from {}", records.len(), path.display());
        Ok(records)
    }

    async fn import_edges_from_csv(
        &self,
        session: &mut dyn Session,
        path: &Path,
    ) -> DatabaseResult<Vec<EdgeRecord>> {
        let records = interchange::read_edges(path, Layout::Table)?;
        session.run(&copy_from(EDGE_TABLE, path)).await?;
        info!("Copied {} edges from {}", records.len(), path.display());
        Ok(records)
    }

    async fn close(&self) -> DatabaseResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Kuzu database at {} closed", self.path.display());
        }
        Ok(())
    }
}

fn required_name(properties: &PropertyMap) -> DatabaseResult<&str> {
    properties
        .get("name")
        .and_then(PropertyValue::as_string)
        .ok_or_else(|| DatabaseError::MissingProperty("name".to_string()))
}

fn string_cell(row: &Row, index: usize) -> DatabaseResult<String> {
    match row.get(index) {
        Some(PropertyValue::String(s)) => Ok(s.clone()),
        other => Err(DatabaseError::Protocol(format!(
            "expected a name in column {}, found {}",
            index,
            other.map(PropertyValue::type_name).unwrap_or("nothing")
        ))),
    }
}

/// `COPY` cannot take its path as a parameter, so it is embedded as a quoted literal
fn copy_from(table: &str, path: &Path) -> Statement {
    let escaped = path
        .display()
        .to_string()
        .replace('\\', "\\\\")
        .replace('\'', "\\'");
    Statement::new(format!(
        "COPY {} FROM '{}' (header=true, delim='|')",
        table, escaped
    ))
}

fn to_kuzu(value: &PropertyValue) -> DatabaseResult<Value> {
    Ok(match value {
        PropertyValue::String(s) => Value::String(s.clone()),
        PropertyValue::Integer(i) => Value::Int64(*i),
        PropertyValue::Float(f) => Value::Double(*f),
        PropertyValue::Boolean(b) => Value::Bool(*b),
        PropertyValue::Null => Value::Null(LogicalType::String),
        other => return Err(DatabaseError::UnsupportedValue(other.type_name().to_string())),
    })
}

fn from_kuzu(value: Value) -> PropertyValue {
    match value {
        Value::Null(_) => PropertyValue::Null,
        Value::Bool(b) => PropertyValue::Boolean(b),
        Value::Int64(i) => PropertyValue::Integer(i),
        Value::Int32(i) => PropertyValue::Integer(i.into()),
        Value::Int16(i) => PropertyValue::Integer(i.into()),
        Value::Int8(i) => PropertyValue::Integer(i.into()),
        Value::UInt32(i) => PropertyValue::Integer(i.into()),
        Value::UInt16(i) => PropertyValue::Integer(i.into()),
        Value::UInt8(i) => PropertyValue::Integer(i.into()),
        Value::Double(f) => PropertyValue::Float(f),
        Value::Float(f) => PropertyValue::Float(f.into()),
        Value::String(s) => PropertyValue::String(s),
        Value::List(_, items) | Value::Array(_, items) => {
            PropertyValue::List(items.into_iter().map(from_kuzu).collect())
        }
        other => PropertyValue::String(other.to_string()),
    }
}
