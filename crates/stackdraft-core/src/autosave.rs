//! Debounced autosave driven by the store's change stream.
//!
//! Graph content and metadata save on independent debounce windows so a
//! title keystroke never forces a full graph re-serialize and a node
//! drag never re-sends the title. Only the last quiescent state is
//! persisted; bursts of edits inside a window coalesce into one call.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::persistence::{MetadataPatch, PersistenceClient};
use crate::store::{ChangeSeq, SharedStore};

#[derive(Debug, Clone, Copy)]
pub struct AutosaveConfig {
    /// Quiescence window for graph-content saves.
    pub graph_debounce: Duration,
    /// Longer, independent window for title/description patches.
    pub metadata_debounce: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        AutosaveConfig {
            graph_debounce: Duration::from_millis(500),
            metadata_debounce: Duration::from_millis(1000),
        }
    }
}

/// Owns the background debounce task. Dropping (or `shutdown`) aborts
/// it, cancelling any armed timer so a torn-down session never writes.
pub struct AutosaveCoordinator {
    task: JoinHandle<()>,
}

impl AutosaveCoordinator {
    pub fn spawn(
        store: SharedStore,
        client: Arc<dyn PersistenceClient>,
        config: AutosaveConfig,
    ) -> Self {
        // Baseline revision is captured under the store lock so no
        // mutation can slip between subscription and the first poll.
        let (rx, seen) = {
            let s = store.lock().unwrap();
            let rx = s.subscribe();
            let seen = *rx.borrow();
            (rx, seen)
        };
        let task = tokio::spawn(run(store, client, config, rx, seen));
        AutosaveCoordinator { task }
    }

    /// Cancel pending timers and stop observing the store.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for AutosaveCoordinator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    store: SharedStore,
    client: Arc<dyn PersistenceClient>,
    config: AutosaveConfig,
    mut rx: watch::Receiver<ChangeSeq>,
    mut seen: ChangeSeq,
) {
    let mut graph_deadline: Option<Instant> = None;
    let mut metadata_deadline: Option<Instant> = None;

    loop {
        let next = match (graph_deadline, metadata_deadline) {
            (Some(g), Some(m)) => Some(g.min(m)),
            (Some(g), None) => Some(g),
            (None, Some(m)) => Some(m),
            (None, None) => None,
        };

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let seq = *rx.borrow_and_update();
                let read_only = store.lock().unwrap().is_read_only();
                if !read_only {
                    let now = Instant::now();
                    if seq.graph != seen.graph {
                        graph_deadline = Some(now + config.graph_debounce);
                        log::debug!("autosave: graph timer armed");
                    }
                    if seq.metadata != seen.metadata {
                        metadata_deadline = Some(now + config.metadata_debounce);
                        log::debug!("autosave: metadata timer armed");
                    }
                }
                seen = seq;
            }
            _ = sleep_until(next.unwrap_or_else(Instant::now)), if next.is_some() => {
                let now = Instant::now();
                if graph_deadline.is_some_and(|d| d <= now) {
                    graph_deadline = None;
                    save_graph(&store, client.as_ref()).await;
                }
                if metadata_deadline.is_some_and(|d| d <= now) {
                    metadata_deadline = None;
                    save_metadata(&store, client.as_ref()).await;
                }
            }
        }
    }
}

async fn save_graph(store: &SharedStore, client: &dyn PersistenceClient) {
    // Serialize under the lock so the persisted payload is exactly the
    // quiescent state, then release it across the network call.
    let (id, payload) = {
        let mut s = store.lock().unwrap();
        if s.is_read_only() {
            return;
        }
        let Some(id) = s.diagram_id().map(str::to_string) else {
            return;
        };
        let payload = match s.to_graph_doc().to_json() {
            Ok(json) => json,
            Err(e) => {
                s.mark_save_error(e.to_string());
                return;
            }
        };
        s.mark_saving();
        (id, payload)
    };

    match client.save_graph(&id, &payload).await {
        Ok(()) => store.lock().unwrap().mark_saved(),
        Err(e) => {
            log::warn!("autosave: graph save failed for '{}': {}", id, e);
            store.lock().unwrap().mark_save_error(e.to_string());
        }
    }
}

async fn save_metadata(store: &SharedStore, client: &dyn PersistenceClient) {
    let (id, patch) = {
        let s = store.lock().unwrap();
        if s.is_read_only() {
            return;
        }
        let Some(id) = s.diagram_id().map(str::to_string) else {
            return;
        };
        let patch = MetadataPatch {
            title: Some(s.title().to_string()),
            description: Some(s.description().to_string()),
        };
        (id, patch)
    };

    match client.update_metadata(&id, &patch).await {
        Ok(()) => store.lock().unwrap().mark_saved(),
        Err(e) => {
            log::warn!("autosave: metadata save failed for '{}': {}", id, e);
            store.lock().unwrap().mark_save_error(e.to_string());
        }
    }
}
