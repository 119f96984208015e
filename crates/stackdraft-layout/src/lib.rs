pub mod apply;
pub mod engine;
pub mod request;

use stackdraft_core::catalog::Catalog;
use stackdraft_core::store::SharedStore;

pub use engine::{LayoutEngine, LayoutError, LayoutRequest, LayoutResponse};

/// What happened to the graph. Callers run their fit-view presentation
/// action only on `Applied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutOutcome {
    /// Positions were applied as one undoable step.
    Applied,
    /// Nothing to lay out, or the session moved on while the engine was
    /// computing; the graph is untouched.
    Skipped,
}

/// Run one auto-layout pass over the current graph.
///
/// The store lock is released while the engine computes; a session
/// generation token guards against applying a stale response after the
/// diagram was reloaded mid-flight. On success the whole re-layout is a
/// single history entry. On failure the graph is left untouched.
pub async fn auto_layout<E>(
    store: &SharedStore,
    catalog: &dyn Catalog,
    engine: &E,
) -> Result<LayoutOutcome, LayoutError>
where
    E: LayoutEngine + ?Sized,
{
    let (nodes, edges, generation) = {
        let s = store.lock().unwrap();
        if s.nodes().is_empty() {
            return Ok(LayoutOutcome::Skipped);
        }
        (s.nodes().to_vec(), s.edges().to_vec(), s.generation())
    };

    let request = request::build_request(&nodes, &edges, catalog);
    let response = match engine.layout(&request).await {
        Ok(response) => response,
        Err(e) => {
            log::warn!("auto layout failed, graph left unchanged: {}", e);
            return Err(e);
        }
    };

    let mut s = store.lock().unwrap();
    if s.generation() != generation {
        log::debug!("discarding stale layout response");
        return Ok(LayoutOutcome::Skipped);
    }

    let updated = apply::apply_positions(s.nodes(), &response);
    s.push_history();
    s.replace_nodes(updated);
    Ok(LayoutOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stackdraft_core::catalog::TypeRegistry;
    use stackdraft_core::store::EditorStore;
    use stackdraft_core::{Node, NodeData, Position, Viewport};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEngine {
        positions: HashMap<String, Position>,
        calls: AtomicUsize,
    }

    impl FixedEngine {
        fn new(positions: HashMap<String, Position>) -> Self {
            FixedEngine {
                positions,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LayoutEngine for FixedEngine {
        async fn layout(&self, _request: &LayoutRequest) -> Result<LayoutResponse, LayoutError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LayoutResponse {
                positions: self.positions.clone(),
            })
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl LayoutEngine for FailingEngine {
        async fn layout(&self, _request: &LayoutRequest) -> Result<LayoutResponse, LayoutError> {
            Err(LayoutError::Engine("solver crashed".to_string()))
        }
    }

    fn node(id: &str, x: f64, y: f64) -> Node {
        Node {
            id: id.to_string(),
            type_id: "worker".to_string(),
            position: Position { x, y },
            data: NodeData::default(),
            selected: false,
        }
    }

    fn loaded_store() -> SharedStore {
        let store = EditorStore::shared();
        store.lock().unwrap().load_diagram(
            "diagram-1",
            "Test",
            "",
            vec![node("node-1", 1.0, 1.0), node("node-2", 2.0, 2.0)],
            vec![],
            Viewport::default(),
        );
        store
    }

    #[tokio::test]
    async fn partial_result_preserves_unmatched_positions_in_one_step() {
        let store = loaded_store();
        let mut positions = HashMap::new();
        positions.insert("node-1".to_string(), Position { x: 300.0, y: 0.0 });
        let engine = FixedEngine::new(positions);
        let catalog = TypeRegistry::new();

        let outcome = auto_layout(&store, &catalog, &engine).await.unwrap();
        assert_eq!(outcome, LayoutOutcome::Applied);

        let s = store.lock().unwrap();
        assert_eq!(s.nodes()[0].position, Position { x: 300.0, y: 0.0 });
        assert_eq!(s.nodes()[1].position, Position { x: 2.0, y: 2.0 });
        assert_eq!(s.undo_len(), 1, "one undoable step for the whole re-layout");
    }

    #[tokio::test]
    async fn failure_leaves_graph_untouched() {
        let store = loaded_store();
        let catalog = TypeRegistry::new();

        let result = auto_layout(&store, &catalog, &FailingEngine).await;
        assert!(result.is_err());

        let s = store.lock().unwrap();
        assert_eq!(s.nodes()[0].position, Position { x: 1.0, y: 1.0 });
        assert_eq!(s.undo_len(), 0);
        assert!(!s.is_dirty());
    }

    #[tokio::test]
    async fn undo_reverts_the_whole_layout_pass() {
        let store = loaded_store();
        let mut positions = HashMap::new();
        positions.insert("node-1".to_string(), Position { x: 300.0, y: 0.0 });
        positions.insert("node-2".to_string(), Position { x: 300.0, y: 160.0 });
        let engine = FixedEngine::new(positions);
        let catalog = TypeRegistry::new();

        auto_layout(&store, &catalog, &engine).await.unwrap();

        let mut s = store.lock().unwrap();
        assert!(s.undo());
        assert_eq!(s.nodes()[0].position, Position { x: 1.0, y: 1.0 });
        assert_eq!(s.nodes()[1].position, Position { x: 2.0, y: 2.0 });
    }

    #[tokio::test]
    async fn empty_graph_skips_the_engine() {
        let store = EditorStore::shared();
        let catalog = TypeRegistry::new();
        let engine = FixedEngine::new(HashMap::new());

        let outcome = auto_layout(&store, &catalog, &engine).await.unwrap();
        assert_eq!(outcome, LayoutOutcome::Skipped);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_response_is_discarded_after_reload() {
        // An engine that reloads the diagram mid-computation, as if the
        // user switched diagrams while layout was in flight.
        struct ReloadingEngine {
            store: SharedStore,
        }

        #[async_trait]
        impl LayoutEngine for ReloadingEngine {
            async fn layout(&self, _request: &LayoutRequest) -> Result<LayoutResponse, LayoutError> {
                self.store.lock().unwrap().load_diagram(
                    "diagram-2",
                    "Other",
                    "",
                    vec![node("node-9", 7.0, 7.0)],
                    vec![],
                    Viewport::default(),
                );
                let mut positions = HashMap::new();
                positions.insert("node-9".to_string(), Position { x: 999.0, y: 999.0 });
                Ok(LayoutResponse { positions })
            }
        }

        let store = loaded_store();
        let catalog = TypeRegistry::new();
        let engine = ReloadingEngine {
            store: store.clone(),
        };

        let outcome = auto_layout(&store, &catalog, &engine).await.unwrap();
        assert_eq!(outcome, LayoutOutcome::Skipped);

        let s = store.lock().unwrap();
        assert_eq!(s.nodes()[0].position, Position { x: 7.0, y: 7.0 });
        assert_eq!(s.undo_len(), 0);
    }
}
