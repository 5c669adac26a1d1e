//! Neo4j adapter: labeled property graph over the HTTP transactional endpoint
//!
//! Each session is one explicit transaction:
//!
//! ```text
//! POST   {uri}/db/{database}/tx            begin, answers with the commit URL
//! POST   {uri}/db/{database}/tx/{id}       run statements
//! POST   {uri}/db/{database}/tx/{id}/commit
//! DELETE {uri}/db/{database}/tx/{id}       rollback
//! ```
//!
//! Values are always sent as statement parameters. Labels, relationship types
//! and property keys cannot be parameterized in Cypher, so they are quoted with
//! backticks instead.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::config::Neo4jConfig;
use crate::database::interchange::{self, EdgeRecord, Layout, NodeRecord};
use crate::database::{
    Backend, Capabilities, Database, DatabaseError, DatabaseResult, Row, Session, Statement,
};
use crate::graph::{EdgeType, Label, PropertyMap, PropertyValue};

const CLEAR_DATA: &str = "MATCH (n) DETACH DELETE n";

const EXPORT_NODES: &str = "MATCH (n) RETURN labels(n) AS labels, properties(n) AS properties";

const EXPORT_EDGES: &str = "MATCH (a)-[r]->(b) \
     RETURN a.name AS start_name, b.name AS end_name, type(r) AS type, properties(r) AS properties";

/// Network adapter for a Neo4j server
pub struct Neo4jDatabase {
    client: Client,
    config: Neo4jConfig,
    closed: AtomicBool,
}

impl Neo4jDatabase {
    /// Create an adapter. No request is made until the first session.
    pub fn new(config: Neo4jConfig) -> DatabaseResult<Self> {
        let client = Client::builder().build()?;
        info!("Neo4j adapter for {} (database '{}')", config.uri, config.database);
        Ok(Self {
            client,
            config,
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &Neo4jConfig {
        &self.config
    }

    fn transaction_url(&self) -> String {
        format!(
            "{}/db/{}/tx",
            self.config.uri.trim_end_matches('/'),
            self.config.database
        )
    }

    async fn post(&self, url: &str, body: serde_json::Value) -> DatabaseResult<serde_json::Value> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn delete(&self, url: &str) -> DatabaseResult<serde_json::Value> {
        let response = self
            .client
            .delete(url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// One explicit Neo4j transaction
struct Neo4jSession<'a> {
    db: &'a Neo4jDatabase,
    commit_url: String,
}

impl Neo4jSession<'_> {
    fn transaction_url(&self) -> &str {
        self.commit_url.trim_end_matches("/commit")
    }
}

#[async_trait]
impl Session for Neo4jSession<'_> {
    async fn run(&mut self, statement: &Statement) -> DatabaseResult<Vec<Row>> {
        debug!("Cypher: {}", statement);
        let body = encode_statements(std::slice::from_ref(statement));
        let response = self.db.post(self.transaction_url(), body).await?;
        decode_rows(&response)
    }

    async fn commit(self: Box<Self>) -> DatabaseResult<()> {
        let response = self.db.post(&self.commit_url, encode_statements(&[])).await?;
        check_errors(&response)
    }

    async fn rollback(self: Box<Self>) -> DatabaseResult<()> {
        let response = self.db.delete(self.transaction_url()).await?;
        check_errors(&response)
    }
}

#[async_trait]
impl Database for Neo4jDatabase {
    fn backend(&self) -> Backend {
        Backend::Neo4j
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            node_labels: true,
            node_properties: true,
            relationship_types: true,
            relationship_properties: true,
            detach_delete: true,
            bulk_copy: false,
        }
    }

    async fn session<'a>(&'a self) -> DatabaseResult<Box<dyn Session + 'a>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DatabaseError::Closed);
        }
        let response = self.post(&self.transaction_url(), encode_statements(&[])).await?;
        check_errors(&response)?;
        let commit_url = response
            .get("commit")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DatabaseError::Protocol("transaction response has no commit URL".into()))?
            .to_string();
        Ok(Box::new(Neo4jSession {
            db: self,
            commit_url,
        }))
    }

    async fn add_node(
        &self,
        session: &mut dyn Session,
        labels: &[Label],
        properties: &PropertyMap,
    ) -> DatabaseResult<()> {
        session.run(&merge_node(labels, properties)?).await?;
        Ok(())
    }

    async fn delete_node(
        &self,
        session: &mut dyn Session,
        labels: &[Label],
        properties: &PropertyMap,
    ) -> DatabaseResult<()> {
        session.run(&detach_delete_node(labels, properties)?).await?;
        Ok(())
    }

    async fn add_edge(
        &self,
        session: &mut dyn Session,
        start_labels: &[Label],
        start_properties: &PropertyMap,
        end_labels: &[Label],
        end_properties: &PropertyMap,
        relationship_type: &EdgeType,
    ) -> DatabaseResult<()> {
        let statement = merge_edge(
            start_labels,
            start_properties,
            end_labels,
            end_properties,
            relationship_type,
        )?;
        session.run(&statement).await?;
        Ok(())
    }

    async fn delete_edge(
        &self,
        session: &mut dyn Session,
        start_labels: &[Label],
        start_properties: &PropertyMap,
        end_labels: &[Label],
        end_properties: &PropertyMap,
        relationship_type: &EdgeType,
    ) -> DatabaseResult<()> {
        let statement = delete_edge(
            start_labels,
            start_properties,
            end_labels,
            end_properties,
            relationship_type,
        )?;
        session.run(&statement).await?;
        Ok(())
    }

    async fn clear_data(&self, session: &mut dyn Session) -> DatabaseResult<()> {
        session.run(&Statement::new(CLEAR_DATA)).await?;
        Ok(())
    }

    async fn export_nodes_to_csv(&self, session: &mut dyn Session, path: &Path) -> DatabaseResult<usize> {
        let rows = session.run(&Statement::new(EXPORT_NODES)).await?;
        let records = rows
            .into_iter()
            .map(node_record_from_row)
            .collect::<DatabaseResult<Vec<_>>>()?;
        let written = interchange::write_nodes(path, Layout::Labeled, &records)?;
        info!("Exported {} nodes to {}", written, path.display());
        Ok(written)
    }

    async fn export_edges_to_csv(&self, session: &mut dyn Session, path: &Path) -> DatabaseResult<usize> {
        let rows = session.run(&Statement::new(EXPORT_EDGES)).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match edge_record_from_row(row)? {
                Some(record) => records.push(record),
                None => warn!("Skipping relationship with an unnamed endpoint"),
            }
        }
        let written = interchange::write_edges(path, Layout::Labeled, &records)?;
        info!("Exported {} edges to {}", written, path.display());
        Ok(written)
    }

    async fn import_nodes_from_csv(
        &self,
        session: &mut dyn Session,
        path: &Path,
    ) -> DatabaseResult<Vec<NodeRecord>> {
        let records = interchange::read_nodes(path, Layout::Labeled)?;
        for record in &records {
            self.add_node(session, &record.labels, &record.properties).await?;
        }
        info!("Imported {} nodes from {}", records.len(), path.display());
        Ok(records)
    }

    async fn import_edges_from_csv(
        &self,
        session: &mut dyn Session,
        path: &Path,
    ) -> DatabaseResult<Vec<EdgeRecord>> {
        let records = interchange::read_edges(path, Layout::Labeled)?;
        for record in &records {
            session.run(&merge_imported_edge(record, path)?).await?;
        }
        info!("Imported {} edges from {}", records.len(), path.display());
        Ok(records)
    }

    async fn close(&self) -> DatabaseResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Neo4j adapter closed");
        }
        Ok(())
    }
}

/// Quote a label, relationship type or property key for Cypher
pub fn quote_identifier(name: &str) -> DatabaseResult<String> {
    if name.is_empty() || name.chars().any(char::is_control) {
        return Err(DatabaseError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// `:`A`:`B`` or empty
fn label_suffix(labels: &[Label]) -> DatabaseResult<String> {
    let mut out = String::new();
    for label in labels {
        out.push(':');
        out.push_str(&quote_identifier(label.as_str())?);
    }
    Ok(out)
}

/// ` {`key`: $prefix_0, ...}` or empty; values go to `params`
fn property_pattern(
    properties: &PropertyMap,
    prefix: &str,
    params: &mut PropertyMap,
) -> DatabaseResult<String> {
    if properties.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(properties.len());
    for (i, (key, value)) in properties.iter().enumerate() {
        let param = format!("{}_{}", prefix, i);
        parts.push(format!("{}: ${}", quote_identifier(key)?, param));
        params.insert(param, value.clone());
    }
    Ok(format!(" {{{}}}", parts.join(", ")))
}

fn node_pattern(
    var: &str,
    labels: &[Label],
    properties: &PropertyMap,
    params: &mut PropertyMap,
) -> DatabaseResult<String> {
    Ok(format!(
        "({}{}{})",
        var,
        label_suffix(labels)?,
        property_pattern(properties, var, params)?
    ))
}

fn merge_node(labels: &[Label], properties: &PropertyMap) -> DatabaseResult<Statement> {
    let mut params = PropertyMap::new();
    let pattern = node_pattern("n", labels, properties, &mut params)?;
    Ok(Statement::with_parameters(format!("MERGE {}", pattern), params))
}

fn detach_delete_node(labels: &[Label], properties: &PropertyMap) -> DatabaseResult<Statement> {
    let mut params = PropertyMap::new();
    let pattern = node_pattern("n", labels, properties, &mut params)?;
    Ok(Statement::with_parameters(
        format!("MATCH {} DETACH DELETE n", pattern),
        params,
    ))
}

fn merge_edge(
    start_labels: &[Label],
    start_properties: &PropertyMap,
    end_labels: &[Label],
    end_properties: &PropertyMap,
    relationship_type: &EdgeType,
) -> DatabaseResult<Statement> {
    let mut params = PropertyMap::new();
    let start = node_pattern("a", start_labels, start_properties, &mut params)?;
    let end = node_pattern("b", end_labels, end_properties, &mut params)?;
    let rel = quote_identifier(relationship_type.as_str())?;
    Ok(Statement::with_parameters(
        format!("MERGE {}\nMERGE {}\nMERGE (a)-[r:{}]->(b)", start, end, rel),
        params,
    ))
}

fn delete_edge(
    start_labels: &[Label],
    start_properties: &PropertyMap,
    end_labels: &[Label],
    end_properties: &PropertyMap,
    relationship_type: &EdgeType,
) -> DatabaseResult<Statement> {
    let mut params = PropertyMap::new();
    let start = node_pattern("a", start_labels, start_properties, &mut params)?;
    let end = node_pattern("b", end_labels, end_properties, &mut params)?;
    let rel = quote_identifier(relationship_type.as_str())?;
    Ok(Statement::with_parameters(
        format!("MATCH {}-[r:{}]->{}\nDELETE r", start, rel, end),
        params,
    ))
}

/// Relationship from an interchange row
///
/// Endpoints are merged by name alone so nodes loaded with other labels are
/// reused; a missing endpoint is created with the default label.
fn merge_imported_edge(record: &EdgeRecord, path: &Path) -> DatabaseResult<Statement> {
    let relationship_type = record.relationship_type.as_ref().ok_or_else(|| {
        DatabaseError::Interchange {
            file: path.display().to_string(),
            message: format!(
                "relationship {} -> {} has no type",
                record.start_name, record.end_name
            ),
        }
    })?;
    let mut params = PropertyMap::new();
    params.insert("start_name".to_string(), record.start_name.as_str().into());
    params.insert("end_name".to_string(), record.end_name.as_str().into());
    let props = property_pattern(&record.properties, "r", &mut params)?;
    let label = label_suffix(&[Label::default()])?;
    Ok(Statement::with_parameters(
        format!(
            "MERGE (a {{`name`: $start_name}}) ON CREATE SET a{label}\n\
             MERGE (b {{`name`: $end_name}}) ON CREATE SET b{label}\n\
             MERGE (a)-[r:{}{}]->(b)",
            quote_identifier(relationship_type.as_str())?,
            props
        ),
        params,
    ))
}

fn node_record_from_row(row: Row) -> DatabaseResult<NodeRecord> {
    let mut cells = row.into_iter();
    let labels = match cells.next() {
        Some(PropertyValue::List(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                PropertyValue::String(s) => Some(Label::new(s)),
                _ => None,
            })
            .collect(),
        other => return Err(unexpected_cell("labels", other)),
    };
    let properties = match cells.next() {
        Some(PropertyValue::Map(map)) => map,
        Some(PropertyValue::Null) => PropertyMap::new(),
        other => return Err(unexpected_cell("properties", other)),
    };
    Ok(NodeRecord::new(labels, properties))
}

fn edge_record_from_row(row: Row) -> DatabaseResult<Option<EdgeRecord>> {
    let mut cells = row.into_iter();
    let start = cells.next();
    let end = cells.next();
    let relationship_type = match cells.next() {
        Some(PropertyValue::String(t)) => EdgeType::new(t),
        other => return Err(unexpected_cell("type", other)),
    };
    let properties = match cells.next() {
        Some(PropertyValue::Map(map)) => map,
        Some(PropertyValue::Null) | None => PropertyMap::new(),
        other => return Err(unexpected_cell("properties", other)),
    };
    match (start, end) {
        (Some(PropertyValue::String(start)), Some(PropertyValue::String(end))) => {
            let mut record = EdgeRecord::new(start, end, Some(relationship_type));
            record.properties = properties;
            Ok(Some(record))
        }
        _ => Ok(None),
    }
}

fn unexpected_cell(column: &str, value: Option<PropertyValue>) -> DatabaseError {
    DatabaseError::Protocol(format!(
        "unexpected value in column '{}': {}",
        column,
        value.map(|v| v.to_literal()).unwrap_or_else(|| "missing".into())
    ))
}

/// Request body for the transactional endpoint
pub fn encode_statements(statements: &[Statement]) -> serde_json::Value {
    let statements: Vec<serde_json::Value> = statements
        .iter()
        .map(|s| {
            let parameters: serde_json::Map<String, serde_json::Value> = s
                .parameters
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect();
            json!({ "statement": s.text, "parameters": parameters })
        })
        .collect();
    json!({ "statements": statements })
}

fn check_errors(response: &serde_json::Value) -> DatabaseResult<()> {
    let first = response
        .get("errors")
        .and_then(|e| e.as_array())
        .and_then(|errors| errors.first());
    match first {
        Some(error) => Err(DatabaseError::Query {
            code: error
                .get("code")
                .and_then(|c| c.as_str())
                .unwrap_or("Unknown")
                .to_string(),
            message: error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error")
                .to_string(),
        }),
        None => Ok(()),
    }
}

/// Rows of the first result in a transactional endpoint response
pub fn decode_rows(response: &serde_json::Value) -> DatabaseResult<Vec<Row>> {
    check_errors(response)?;
    let results = response
        .get("results")
        .and_then(|r| r.as_array())
        .ok_or_else(|| DatabaseError::Protocol("response has no results".into()))?;
    let Some(result) = results.first() else {
        return Ok(Vec::new());
    };
    let data = result
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| DatabaseError::Protocol("result has no data".into()))?;

    data.iter()
        .map(|entry| {
            entry
                .get("row")
                .and_then(|r| r.as_array())
                .map(|cells| cells.iter().map(PropertyValue::from_json).collect())
                .ok_or_else(|| DatabaseError::Protocol("data entry has no row".into()))
        })
        .collect()
}
