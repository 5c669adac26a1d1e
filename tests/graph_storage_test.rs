mod common;

use common::MemoryDatabase;
use hograph::{DatabaseError, Edge, GraphError, GraphStorage, HyperEdge, Node};
use std::sync::Arc;
use tempfile::TempDir;

fn storage() -> (Arc<MemoryDatabase>, GraphStorage) {
    let db = MemoryDatabase::new();
    let graph = GraphStorage::new(db.clone());
    (db, graph)
}

#[tokio::test]
async fn test_add_then_delete_node_restores_set() {
    let (db, mut graph) = storage();
    graph.add_node("Existing").await.unwrap();
    let before = graph.nodes().clone();

    graph.add_node("Temp").await.unwrap();
    assert!(graph.contains_node("Temp"));
    graph.delete_node("Temp").await.unwrap();

    assert_eq!(graph.nodes(), &before);
    assert_eq!(db.node_names(), vec!["Existing"]);
}

#[tokio::test]
async fn test_duplicate_edge_is_single_member() {
    let (db, mut graph) = storage();
    graph.add_edge("A", "B", "R").await.unwrap();
    graph.add_edge("A", "B", "R").await.unwrap();

    assert_eq!(graph.edge_count(), 1);
    assert_eq!(db.edge_count(), 1);
    assert!(graph.contains_edge(&Edge::new("A", "B", "R")));
    // Endpoints are mirrored with the edge
    assert_eq!(graph.node_count(), 2);
}

#[tokio::test]
async fn test_delete_absent_edge_is_noop() {
    let (_db, mut graph) = storage();
    graph.add_edge("A", "B", "R").await.unwrap();

    graph.delete_edge("B", "A", "R").await.unwrap();
    graph.delete_edge("A", "B", "OTHER").await.unwrap();
    assert_eq!(graph.edge_count(), 1);

    graph.delete_edge("A", "B", "R").await.unwrap();
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.node_count(), 2);
}

#[tokio::test]
async fn test_delete_node_drops_incident_edges() {
    let (db, mut graph) = storage();
    graph.add_edge("A", "B", "R").await.unwrap();
    graph.add_edge("B", "C", "R").await.unwrap();
    graph.add_edge("C", "D", "R").await.unwrap();

    graph.delete_node("B").await.unwrap();

    assert_eq!(graph.edge_count(), 1);
    assert!(graph.contains_edge(&Edge::new("C", "D", "R")));
    assert!(!graph.contains_node("B"));
    assert_eq!(db.edge_count(), 1);
}

#[tokio::test]
async fn test_hyper_edges_ignore_member_order() {
    let (db, mut graph) = storage();
    assert!(graph.add_hyper_edge(["a", "b"], "R"));
    assert!(!graph.add_hyper_edge(["b", "a"], "R"));
    assert!(graph.contains_hyper_edge(&HyperEdge::new(["b", "a"], "R")));
    assert_eq!(graph.hyper_edge_count(), 1);

    // Hyperedges never reach the backend
    assert_eq!(db.commits(), 0);
    assert!(db.node_names().is_empty());
}

#[tokio::test]
async fn test_alice_knows_bob_display() {
    let (_db, mut graph) = storage();
    graph.add_node("Alice").await.unwrap();
    graph.add_node("Bob").await.unwrap();
    graph.add_edge("Alice", "Bob", "KNOWS").await.unwrap();

    assert_eq!(
        graph.to_string(),
        "Nodes: {'Alice', 'Bob'}\nEdges: {(Alice) --[KNOWS]--> (Bob)}\nHyperEdges: {}"
    );
}

#[tokio::test]
async fn test_export_import_round_trip() {
    let dir = TempDir::new().unwrap();
    let (_db, mut graph) = storage();
    graph.add_edge("A", "B", "R").await.unwrap();

    let summary = graph.export_graph(dir.path()).await.unwrap();
    assert_eq!(summary.nodes, 2);
    assert_eq!(summary.edges, 1);

    let (fresh_db, mut fresh) = storage();
    let nodes = fresh
        .import_nodes_from_csv(&dir.path().join("nodes.csv"), false)
        .await
        .unwrap();
    let edges = fresh
        .import_edges_from_csv(&dir.path().join("edges.csv"), false)
        .await
        .unwrap();

    assert_eq!((nodes, edges), (2, 1));
    assert!(fresh.contains_node("A"));
    assert!(fresh.contains_node("B"));
    assert!(fresh.contains_edge(&Edge::new("A", "B", "R")));
    assert_eq!(fresh_db.edge_count(), 1);
}

#[tokio::test]
async fn test_edges_only_import_mirrors_endpoints() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edges.csv");
    std::fs::write(&path, "start_name,end_name,type,properties\nA,B,R,{}\n").unwrap();

    let (db, mut graph) = storage();
    let edges = graph.import_edges_from_csv(&path, false).await.unwrap();

    assert_eq!(edges, 1);
    assert!(graph.contains_node("A"));
    assert!(graph.contains_node("B"));
    assert!(graph.contains_edge(&Edge::new("A", "B", "R")));
    assert_eq!(db.node_names(), vec!["A", "B"]);
    assert_eq!(db.edge_count(), 1);
}

#[tokio::test]
async fn test_untyped_backend_delete_drops_every_type_between_pair() {
    let (db, mut graph) = storage();
    db.set_untyped(true);
    graph.add_edge("A", "B", "KNOWS").await.unwrap();
    graph.add_edge("A", "B", "LIKES").await.unwrap();
    graph.add_edge("B", "A", "KNOWS").await.unwrap();
    assert_eq!(db.edge_count(), 2);

    graph.delete_edge("A", "B", "KNOWS").await.unwrap();

    assert!(!graph.contains_edge(&Edge::new("A", "B", "LIKES")));
    assert!(graph.contains_edge(&Edge::new("B", "A", "KNOWS")));
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(db.edge_count(), 1);
}

#[tokio::test]
async fn test_clear_then_export_is_header_only() {
    let dir = TempDir::new().unwrap();
    let (_db, mut graph) = storage();
    graph.add_edge("A", "B", "R").await.unwrap();
    graph.add_hyper_edge(["A", "B", "C"], "TEAM");

    graph.clear_graph().await.unwrap();
    assert_eq!(graph.node_count(), 0);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.hyper_edge_count(), 0);

    graph.export_graph(dir.path()).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(dir.path().join("nodes.csv")).unwrap(),
        "labels,properties\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("edges.csv")).unwrap(),
        "start_name,end_name,type,properties\n"
    );
}

#[tokio::test]
async fn test_export_creates_missing_directory() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("nested").join("out");
    let (_db, mut graph) = storage();
    graph.add_node("A").await.unwrap();

    graph.export_graph(&target).await.unwrap();
    assert!(target.join("nodes.csv").exists());
    assert!(target.join("edges.csv").exists());
}

#[tokio::test]
async fn test_backend_failure_leaves_mirror_untouched() {
    let (db, mut graph) = storage();
    graph.add_node("Kept").await.unwrap();
    assert_eq!(db.commits(), 1);

    db.set_failing(true);
    let err = graph.add_node("Lost").await.unwrap_err();
    assert!(matches!(err, GraphError::Database(DatabaseError::Query { .. })));
    assert!(graph.delete_node("Kept").await.is_err());
    assert!(graph.add_edge("Kept", "Other", "R").await.is_err());

    assert_eq!(graph.nodes().iter().collect::<Vec<_>>(), vec![&Node::new("Kept")]);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(db.rollbacks(), 3);
    assert_eq!(db.commits(), 1);
}

#[tokio::test]
async fn test_import_clear_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nodes.csv");
    std::fs::write(
        &path,
        "labels,properties\n['Node'],{'name': 'A'}\n\"['Node', 'Person']\",\"{'name': 'B', 'age': 7}\"\n",
    )
    .unwrap();

    let (_db, mut graph) = storage();
    graph.add_node("Old").await.unwrap();
    graph.import_nodes_from_csv(&path, false).await.unwrap();
    assert_eq!(graph.node_count(), 3);

    graph.import_nodes_from_csv(&path, true).await.unwrap();
    assert_eq!(graph.node_count(), 2);
    assert!(!graph.contains_node("Old"));
}

#[tokio::test]
async fn test_unnamed_node_records_are_not_mirrored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nodes.csv");
    std::fs::write(
        &path,
        "labels,properties\n['Node'],{'name': 'A'}\n['Thing'],{'age': 3}\n",
    )
    .unwrap();

    let (_db, mut graph) = storage();
    let mirrored = graph.import_nodes_from_csv(&path, false).await.unwrap();
    assert_eq!(mirrored, 1);
    assert_eq!(graph.node_count(), 1);
}

#[tokio::test]
async fn test_malformed_import_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edges.csv");
    std::fs::write(&path, "from,to\nA,B\n").unwrap();

    let (db, mut graph) = storage();
    let err = graph.import_edges_from_csv(&path, true).await.unwrap_err();
    assert!(matches!(
        err,
        GraphError::Database(DatabaseError::Interchange { .. })
    ));
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(db.rollbacks(), 1);
}

#[tokio::test]
async fn test_deeply_nested_cell_fails_only_that_import() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nodes.csv");
    let cell = format!("{{'name': 'A', 'deep': {}}}", "[".repeat(100_000));
    std::fs::write(&path, format!("labels,properties\n['Node'],\"{}\"\n", cell)).unwrap();

    let (db, mut graph) = storage();
    let err = graph.import_nodes_from_csv(&path, false).await.unwrap_err();
    assert!(matches!(
        err,
        GraphError::Database(DatabaseError::Interchange { .. })
    ));
    assert!(err.to_string().contains("nesting too deep"));
    assert_eq!(graph.node_count(), 0);
    assert!(db.node_names().is_empty());

    graph.add_node("B").await.unwrap();
    assert!(graph.contains_node("B"));
}

#[tokio::test]
async fn test_closed_backend_refuses_work() {
    let (db, mut graph) = storage();
    graph.database().close().await.unwrap();

    let err = graph.add_node("A").await.unwrap_err();
    assert!(matches!(err, GraphError::Database(DatabaseError::Closed)));
    assert_eq!(db.commits() + db.rollbacks(), 0);
}
