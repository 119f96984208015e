//! End-to-end editing session scenarios across the store, autosave, and
//! persistence layers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stackdraft_core::autosave::{AutosaveConfig, AutosaveCoordinator};
use stackdraft_core::persistence::{
    load_into_store, FsPersistence, MetadataPatch, PersistenceClient, PersistenceError,
    StoredDiagram,
};
use stackdraft_core::store::{EditorStore, NodeDataPatch, SaveStatus};
use stackdraft_core::{GraphDoc, Node, NodeData, Position, Viewport};

fn node(id: &str, label: &str) -> Node {
    Node {
        id: id.to_string(),
        type_id: "worker".to_string(),
        position: Position::default(),
        data: NodeData {
            label: label.to_string(),
            ..Default::default()
        },
        selected: false,
    }
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[test]
fn add_then_connect_round_trips_through_history() {
    let mut store = EditorStore::new();
    store.load_diagram(
        "diagram-1",
        "Round Trip",
        "",
        vec![node("node-1", "API")],
        vec![],
        Viewport::default(),
    );

    store.add_node(node("node-2", "DB"));
    store.connect("node-1", "node-2", None, None);
    assert_eq!(store.undo_len(), 2);
    assert_eq!(store.nodes().len(), 2);
    assert_eq!(store.edges().len(), 1);

    assert!(store.undo());
    assert!(store.undo());
    assert_eq!(store.nodes().len(), 1);
    assert_eq!(store.edges().len(), 0);
    assert_eq!(store.nodes()[0].id, "node-1");

    assert!(store.redo());
    assert!(store.redo());
    assert_eq!(store.nodes().len(), 2);
    assert_eq!(store.edges().len(), 1);
}

struct FlakyClient {
    fail: AtomicBool,
    saves: Mutex<Vec<String>>,
}

#[async_trait]
impl PersistenceClient for FlakyClient {
    async fn save_graph(
        &self,
        _diagram_id: &str,
        graph_json: &str,
    ) -> Result<(), PersistenceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PersistenceError::Backend("503 service unavailable".to_string()));
        }
        self.saves.lock().unwrap().push(graph_json.to_string());
        Ok(())
    }

    async fn update_metadata(
        &self,
        _diagram_id: &str,
        _patch: &MetadataPatch,
    ) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn load_diagram(&self, diagram_id: &str) -> Result<StoredDiagram, PersistenceError> {
        Err(PersistenceError::NotFound(diagram_id.to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn failed_autosave_keeps_dirty_then_retry_succeeds() {
    let store = EditorStore::shared();
    store.lock().unwrap().load_diagram(
        "diagram-1",
        "Flaky",
        "",
        vec![node("node-1", "API")],
        vec![],
        Viewport::default(),
    );
    let client = Arc::new(FlakyClient {
        fail: AtomicBool::new(true),
        saves: Mutex::new(Vec::new()),
    });
    let _coordinator =
        AutosaveCoordinator::spawn(store.clone(), client.clone(), AutosaveConfig::default());
    settle().await;

    store.lock().unwrap().update_node_data(
        "node-1",
        NodeDataPatch {
            label: Some("API v2".to_string()),
            ..Default::default()
        },
    );
    settle().await;
    tokio::time::advance(Duration::from_millis(600)).await;
    settle().await;

    {
        let s = store.lock().unwrap();
        assert!(s.is_dirty(), "failed save leaves the graph dirty");
        assert!(matches!(s.save_status(), SaveStatus::Error(_)));
        assert!(s.needs_unload_warning());
    }

    // The backend recovers; the next edit's debounce cycle retries.
    client.fail.store(false, Ordering::SeqCst);
    store.lock().unwrap().update_node_data(
        "node-1",
        NodeDataPatch {
            label: Some("API v3".to_string()),
            ..Default::default()
        },
    );
    settle().await;
    tokio::time::advance(Duration::from_millis(600)).await;
    settle().await;

    let s = store.lock().unwrap();
    assert!(!s.is_dirty());
    assert!(!s.needs_unload_warning());
    assert_eq!(client.saves.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn session_persists_to_disk_and_reloads() {
    let tmp = tempfile::tempdir().unwrap();
    let fs = Arc::new(FsPersistence::with_dir(tmp.path()));

    // Seed a diagram file the way a previous session would have left it.
    let doc = GraphDoc {
        nodes: vec![node("node-1", "API")],
        edges: vec![],
        viewport: Viewport {
            x: 10.0,
            y: 20.0,
            zoom: 1.5,
        },
    };
    fs.save_graph("diagram-1", &doc.to_json().unwrap())
        .await
        .unwrap();
    fs.update_metadata(
        "diagram-1",
        &MetadataPatch {
            title: Some("Persisted".to_string()),
            description: None,
        },
    )
    .await
    .unwrap();

    let store = EditorStore::shared();
    load_into_store(&store, fs.as_ref(), "diagram-1")
        .await
        .unwrap();
    {
        let s = store.lock().unwrap();
        assert_eq!(s.title(), "Persisted");
        assert_eq!(s.nodes().len(), 1);
        assert_eq!(s.viewport().zoom, 1.5);
        assert!(!s.is_dirty());
    }

    // Edit, let autosave flush, and read the file back cold.
    let _coordinator =
        AutosaveCoordinator::spawn(store.clone(), fs.clone(), AutosaveConfig::default());
    settle().await;
    store.lock().unwrap().add_node(node("node-2", "DB"));
    settle().await;
    tokio::time::advance(Duration::from_millis(600)).await;
    settle().await;
    assert!(!store.lock().unwrap().is_dirty());

    let reloaded = EditorStore::shared();
    load_into_store(&reloaded, fs.as_ref(), "diagram-1")
        .await
        .unwrap();
    assert_eq!(reloaded.lock().unwrap().nodes().len(), 2);
}
