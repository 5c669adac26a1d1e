//! In-memory `Database` double for driving `GraphStorage` end to end
//!
//! Merge semantics keyed by node name, detach delete, and bulk files in the
//! labeled layout. `set_failing(true)` makes every operation fail so the
//! rollback path can be observed.

#![allow(dead_code)]

use async_trait::async_trait;
use hograph::database::interchange::{self, Layout};
use hograph::database::{
    Backend, Capabilities, Database, DatabaseError, DatabaseResult, EdgeRecord, NodeRecord, Row,
    Session, Statement,
};
use hograph::{EdgeType, Label, PropertyMap, PropertyValue};
use indexmap::IndexMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    nodes: IndexMap<String, NodeRecord>,
    edges: Vec<EdgeRecord>,
}

#[derive(Default)]
pub struct MemoryDatabase {
    state: Mutex<State>,
    failing: AtomicBool,
    untyped: AtomicBool,
    closed: AtomicBool,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl MemoryDatabase {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Drop relationship types: one relationship per endpoint pair
    pub fn set_untyped(&self, untyped: bool) {
        self.untyped.store(untyped, Ordering::SeqCst);
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn node_names(&self) -> Vec<String> {
        self.state.lock().unwrap().nodes.keys().cloned().collect()
    }

    pub fn edge_count(&self) -> usize {
        self.state.lock().unwrap().edges.len()
    }

    fn check(&self) -> DatabaseResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DatabaseError::Query {
                code: "Test.Failure".to_string(),
                message: "backend rejected the statement".to_string(),
            });
        }
        Ok(())
    }

    fn merge_node(state: &mut State, name: &str, labels: &[Label], properties: &PropertyMap) {
        state
            .nodes
            .entry(name.to_string())
            .or_insert_with(|| NodeRecord::new(labels.to_vec(), properties.clone()));
    }

    fn merge_edge(&self, state: &mut State, record: EdgeRecord) {
        let untyped = self.untyped.load(Ordering::SeqCst);
        let exists = state.edges.iter().any(|e| {
            e.start_name == record.start_name
                && e.end_name == record.end_name
                && (untyped || e.relationship_type == record.relationship_type)
        });
        if !exists {
            state.edges.push(record);
        }
    }
}

fn name_of(properties: &PropertyMap) -> DatabaseResult<&str> {
    properties
        .get("name")
        .and_then(PropertyValue::as_string)
        .ok_or_else(|| DatabaseError::MissingProperty("name".to_string()))
}

fn named(name: &str) -> PropertyMap {
    let mut properties = PropertyMap::new();
    properties.insert("name".to_string(), name.into());
    properties
}

struct MemorySession<'a> {
    db: &'a MemoryDatabase,
}

#[async_trait]
impl Session for MemorySession<'_> {
    async fn run(&mut self, _statement: &Statement) -> DatabaseResult<Vec<Row>> {
        Ok(Vec::new())
    }

    async fn commit(self: Box<Self>) -> DatabaseResult<()> {
        self.db.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DatabaseResult<()> {
        self.db.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    fn backend(&self) -> Backend {
        Backend::Neo4j
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            node_labels: true,
            node_properties: true,
            relationship_types: !self.untyped.load(Ordering::SeqCst),
            relationship_properties: true,
            detach_delete: true,
            bulk_copy: false,
        }
    }

    async fn session<'a>(&'a self) -> DatabaseResult<Box<dyn Session + 'a>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DatabaseError::Closed);
        }
        Ok(Box::new(MemorySession { db: self }))
    }

    async fn add_node(
        &self,
        _session: &mut dyn Session,
        labels: &[Label],
        properties: &PropertyMap,
    ) -> DatabaseResult<()> {
        self.check()?;
        let name = name_of(properties)?;
        Self::merge_node(&mut self.state.lock().unwrap(), name, labels, properties);
        Ok(())
    }

    async fn delete_node(
        &self,
        _session: &mut dyn Session,
        _labels: &[Label],
        properties: &PropertyMap,
    ) -> DatabaseResult<()> {
        self.check()?;
        let name = name_of(properties)?;
        let mut state = self.state.lock().unwrap();
        state.nodes.shift_remove(name);
        state
            .edges
            .retain(|e| e.start_name != name && e.end_name != name);
        Ok(())
    }

    async fn add_edge(
        &self,
        _session: &mut dyn Session,
        start_labels: &[Label],
        start_properties: &PropertyMap,
        end_labels: &[Label],
        end_properties: &PropertyMap,
        relationship_type: &EdgeType,
    ) -> DatabaseResult<()> {
        self.check()?;
        let start = name_of(start_properties)?;
        let end = name_of(end_properties)?;
        let mut state = self.state.lock().unwrap();
        Self::merge_node(&mut state, start, start_labels, start_properties);
        Self::merge_node(&mut state, end, end_labels, end_properties);
        self.merge_edge(
            &mut state,
            EdgeRecord::new(start, end, Some(relationship_type.clone())),
        );
        Ok(())
    }

    async fn delete_edge(
        &self,
        _session: &mut dyn Session,
        _start_labels: &[Label],
        start_properties: &PropertyMap,
        _end_labels: &[Label],
        end_properties: &PropertyMap,
        relationship_type: &EdgeType,
    ) -> DatabaseResult<()> {
        self.check()?;
        let start = name_of(start_properties)?;
        let end = name_of(end_properties)?;
        let untyped = self.untyped.load(Ordering::SeqCst);
        self.state.lock().unwrap().edges.retain(|e| {
            !(e.start_name == start
                && e.end_name == end
                && (untyped || e.relationship_type.as_ref() == Some(relationship_type)))
        });
        Ok(())
    }

    async fn clear_data(&self, _session: &mut dyn Session) -> DatabaseResult<()> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.nodes.clear();
        state.edges.clear();
        Ok(())
    }

    async fn export_nodes_to_csv(&self, _session: &mut dyn Session, path: &Path) -> DatabaseResult<usize> {
        self.check()?;
        let records: Vec<NodeRecord> = self.state.lock().unwrap().nodes.values().cloned().collect();
        interchange::write_nodes(path, Layout::Labeled, &records)
    }

    async fn export_edges_to_csv(&self, _session: &mut dyn Session, path: &Path) -> DatabaseResult<usize> {
        self.check()?;
        let records = self.state.lock().unwrap().edges.clone();
        interchange::write_edges(path, Layout::Labeled, &records)
    }

    async fn import_nodes_from_csv(
        &self,
        _session: &mut dyn Session,
        path: &Path,
    ) -> DatabaseResult<Vec<NodeRecord>> {
        self.check()?;
        let records = interchange::read_nodes(path, Layout::Labeled)?;
        let mut state = self.state.lock().unwrap();
        for record in &records {
            if let Some(name) = record.name() {
                Self::merge_node(&mut state, name, &record.labels, &record.properties);
            }
        }
        Ok(records)
    }

    async fn import_edges_from_csv(
        &self,
        _session: &mut dyn Session,
        path: &Path,
    ) -> DatabaseResult<Vec<EdgeRecord>> {
        self.check()?;
        let records = interchange::read_edges(path, Layout::Labeled)?;
        let mut state = self.state.lock().unwrap();
        for record in &records {
            for name in [&record.start_name, &record.end_name] {
                Self::merge_node(&mut state, name, &[Label::default()], &named(name));
            }
            self.merge_edge(&mut state, record.clone());
        }
        Ok(records)
    }

    async fn close(&self) -> DatabaseResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
