//! The editor store: single source of truth for the editable graph.
//!
//! Every read and write path of an editing session goes through
//! [`EditorStore`]. Structural mutations snapshot the pre-mutation
//! graph into a bounded undo stack; positional and presentation updates
//! do not, so dragging a node across the canvas never floods undo with
//! per-frame entries.
//!
//! The store is deliberately lenient: operations against unknown node
//! or edge ids are no-ops. Stricter referential checks belong to the
//! persistence collaborator, not the in-memory layer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::{next_edge_id, Edge, EdgeData, EdgeKind, GraphDoc, Node, NodeStyle, Position, Viewport};

/// Maximum undo/redo depth. Pushing past it evicts the oldest entry.
pub const HISTORY_CAPACITY: usize = 50;

/// One editing session's store, shared between the UI task and the
/// autosave coordinator.
pub type SharedStore = Arc<Mutex<EditorStore>>;

/// By-value copy of the structural graph state. Snapshots own their
/// data outright, so later mutation of the live graph can never reach
/// back into a stacked entry.
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// Monotonic revision counters published to autosave observers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSeq {
    /// Bumped by every mutation that dirties the graph content.
    pub graph: u64,
    /// Bumped by title/description edits only.
    pub metadata: u64,
}

/// A single change from a canvas gesture. Batches of these are what a
/// drag, connect-preview, or multi-select interaction produces.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeDelta {
    Insert(Node),
    Remove { id: String },
    Reposition { id: String, position: Position },
    Select { id: String, selected: bool },
}

impl NodeDelta {
    /// Structural deltas change the set of nodes and are undoable.
    pub fn is_structural(&self) -> bool {
        matches!(self, NodeDelta::Insert(_) | NodeDelta::Remove { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EdgeDelta {
    Insert(Edge),
    Remove { id: String },
    Select { id: String, selected: bool },
}

impl EdgeDelta {
    pub fn is_structural(&self) -> bool {
        matches!(self, EdgeDelta::Insert(_) | EdgeDelta::Remove { .. })
    }
}

/// Partial update shallow-merged into a node's data.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeDataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<NodeStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Partial update shallow-merged into an edge's data.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<EdgeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// User-visible persistence state, in strict display priority.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    ReadOnly,
    Saving,
    Error(String),
    Unsaved,
    Saved { since: Duration },
    Idle,
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveStatus::ReadOnly => write!(f, "Read-only"),
            SaveStatus::Saving => write!(f, "Saving…"),
            SaveStatus::Error(msg) => write!(f, "Error: {}", msg),
            SaveStatus::Unsaved => write!(f, "Unsaved changes"),
            SaveStatus::Saved { since } => {
                let secs = since.as_secs();
                if secs < 60 {
                    write!(f, "Saved {}s ago", secs)
                } else {
                    write!(f, "Saved {}m ago", secs / 60)
                }
            }
            SaveStatus::Idle => write!(f, "No changes"),
        }
    }
}

pub struct EditorStore {
    diagram_id: Option<String>,
    title: String,
    description: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    viewport: Viewport,
    selected_node_id: Option<String>,
    selected_edge_id: Option<String>,
    dirty: bool,
    saving: bool,
    read_only: bool,
    save_error: Option<String>,
    last_saved_at: Option<Instant>,
    undo_stack: VecDeque<Snapshot>,
    redo_stack: Vec<Snapshot>,
    /// Session token: bumped on wholesale reloads so in-flight async
    /// results (layout responses) against an older graph are discarded.
    generation: u64,
    changes: watch::Sender<ChangeSeq>,
}

impl Default for EditorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(ChangeSeq::default());
        EditorStore {
            diagram_id: None,
            title: String::new(),
            description: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            viewport: Viewport::default(),
            selected_node_id: None,
            selected_edge_id: None,
            dirty: false,
            saving: false,
            read_only: false,
            save_error: None,
            last_saved_at: None,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            generation: 0,
            changes,
        }
    }

    /// Wrap a fresh store for sharing with the autosave coordinator.
    pub fn shared() -> SharedStore {
        Arc::new(Mutex::new(EditorStore::new()))
    }

    /// Observe graph/metadata revision bumps without polling.
    pub fn subscribe(&self) -> watch::Receiver<ChangeSeq> {
        self.changes.subscribe()
    }

    // --- Read accessors ---

    pub fn diagram_id(&self) -> Option<&str> {
        self.diagram_id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn selected_node_id(&self) -> Option<&str> {
        self.selected_node_id.as_deref()
    }

    pub fn selected_edge_id(&self) -> Option<&str> {
        self.selected_edge_id.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn save_error(&self) -> Option<&str> {
        self.save_error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Whether navigating away would destroy unsaved state. The host
    /// environment is expected to warn the user when this is true.
    pub fn needs_unload_warning(&self) -> bool {
        self.dirty
    }

    pub fn to_graph_doc(&self) -> GraphDoc {
        GraphDoc {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            viewport: self.viewport,
        }
    }

    pub fn save_status(&self) -> SaveStatus {
        if self.read_only {
            SaveStatus::ReadOnly
        } else if self.saving {
            SaveStatus::Saving
        } else if let Some(err) = &self.save_error {
            SaveStatus::Error(err.clone())
        } else if self.dirty {
            SaveStatus::Unsaved
        } else if let Some(at) = self.last_saved_at {
            SaveStatus::Saved { since: at.elapsed() }
        } else {
            SaveStatus::Idle
        }
    }

    // --- Lifecycle ---

    /// Replace the entire session state with a loaded diagram. Clears
    /// dirty tracking and both history stacks; referential integrity of
    /// the payload is trusted, not validated.
    pub fn load_diagram(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        viewport: Viewport,
    ) {
        self.diagram_id = Some(id.into());
        self.title = title.into();
        self.description = description.into();
        self.nodes = nodes;
        self.edges = edges;
        self.viewport = viewport;
        self.selected_node_id = None;
        self.selected_edge_id = None;
        self.dirty = false;
        self.saving = false;
        self.save_error = None;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.generation += 1;
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    // --- History ---

    /// Snapshot the current graph onto the undo stack and invalidate
    /// the redo future. Exposed for callers (the layout bridge) that
    /// apply wholesale replacements as a single undoable step.
    pub fn push_history(&mut self) {
        let snapshot = self.snapshot();
        self.push_undo(snapshot);
        self.redo_stack.clear();
    }

    /// Restore the most recent snapshot. Returns false on an empty
    /// undo stack.
    pub fn undo(&mut self) -> bool {
        let Some(prev) = self.undo_stack.pop_back() else {
            return false;
        };
        let current = self.snapshot();
        self.redo_stack.push(current);
        self.nodes = prev.nodes;
        self.edges = prev.edges;
        self.mark_graph_dirty();
        true
    }

    /// Reapply the most recently undone snapshot. Returns false on an
    /// empty redo stack.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.push_undo(current);
        self.nodes = next.nodes;
        self.edges = next.edges;
        self.mark_graph_dirty();
        true
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    fn push_undo(&mut self, snapshot: Snapshot) {
        if self.undo_stack.len() >= HISTORY_CAPACITY {
            self.undo_stack.pop_front();
        }
        self.undo_stack.push_back(snapshot);
    }

    // --- Mutations ---

    /// Apply a batch of canvas deltas. A batch containing any insertion
    /// or removal snapshots the pre-mutation state first; pure
    /// reposition/selection batches do not touch history.
    pub fn apply_node_deltas(&mut self, deltas: Vec<NodeDelta>) {
        if deltas.is_empty() {
            return;
        }
        if deltas.iter().any(NodeDelta::is_structural) {
            self.push_history();
        }
        for delta in deltas {
            match delta {
                NodeDelta::Insert(node) => self.nodes.push(node),
                NodeDelta::Remove { id } => self.nodes.retain(|n| n.id != id),
                NodeDelta::Reposition { id, position } => {
                    if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                        node.position = position;
                    }
                }
                NodeDelta::Select { id, selected } => {
                    if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                        node.selected = selected;
                    }
                }
            }
        }
        self.mark_graph_dirty();
    }

    pub fn apply_edge_deltas(&mut self, deltas: Vec<EdgeDelta>) {
        if deltas.is_empty() {
            return;
        }
        if deltas.iter().any(EdgeDelta::is_structural) {
            self.push_history();
        }
        for delta in deltas {
            match delta {
                EdgeDelta::Insert(edge) => self.edges.push(edge),
                EdgeDelta::Remove { id } => self.edges.retain(|e| e.id != id),
                EdgeDelta::Select { id, selected } => {
                    if let Some(edge) = self.edges.iter_mut().find(|e| e.id == id) {
                        edge.selected = selected;
                    }
                }
            }
        }
        self.mark_graph_dirty();
    }

    /// Connect two nodes with a fresh data-flow edge. Endpoints are not
    /// validated; self-loops and duplicates are accepted as drawn.
    pub fn connect(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        source_handle: Option<String>,
        target_handle: Option<String>,
    ) -> String {
        self.push_history();
        let id = next_edge_id(&self.edges);
        self.edges.push(Edge {
            id: id.clone(),
            source: source.into(),
            target: target.into(),
            source_handle,
            target_handle,
            data: EdgeData::default(),
            selected: false,
        });
        self.mark_graph_dirty();
        id
    }

    pub fn add_node(&mut self, node: Node) {
        self.push_history();
        self.nodes.push(node);
        self.mark_graph_dirty();
    }

    /// Shallow-merge a partial update into a node's data. Unknown ids
    /// are a no-op and record nothing.
    pub fn update_node_data(&mut self, node_id: &str, patch: NodeDataPatch) {
        let Some(idx) = self.nodes.iter().position(|n| n.id == node_id) else {
            return;
        };
        self.push_history();
        let node = &mut self.nodes[idx];
        if let Some(label) = patch.label {
            node.data.label = label;
        }
        if let Some(description) = patch.description {
            node.data.description = Some(description);
        }
        if let Some(style) = patch.style {
            node.data.style = Some(style);
        }
        if let Some(config) = patch.config {
            node.data.config = config;
        }
        for (key, value) in patch.extra {
            node.data.extra.insert(key, value);
        }
        self.mark_graph_dirty();
    }

    pub fn update_edge_data(&mut self, edge_id: &str, patch: EdgeDataPatch) {
        let Some(idx) = self.edges.iter().position(|e| e.id == edge_id) else {
            return;
        };
        self.push_history();
        let edge = &mut self.edges[idx];
        if let Some(edge_type) = patch.edge_type {
            edge.data.edge_type = edge_type;
        }
        if let Some(label) = patch.label {
            edge.data.label = Some(label);
        }
        if let Some(description) = patch.description {
            edge.data.description = Some(description);
        }
        if let Some(protocol) = patch.protocol {
            edge.data.protocol = Some(protocol);
        }
        for (key, value) in patch.extra {
            edge.data.extra.insert(key, value);
        }
        self.mark_graph_dirty();
    }

    /// Delete every node and edge flagged selected and clear the single
    /// selection. Edges referencing a removed node but not themselves
    /// selected are intentionally left in place (matching the canvas,
    /// which flags connected edges as part of the selection gesture).
    pub fn remove_selected(&mut self) {
        let any_selected =
            self.nodes.iter().any(|n| n.selected) || self.edges.iter().any(|e| e.selected);
        if !any_selected {
            return;
        }
        self.push_history();
        self.nodes.retain(|n| !n.selected);
        self.edges.retain(|e| !e.selected);
        self.selected_node_id = None;
        self.selected_edge_id = None;
        self.mark_graph_dirty();
    }

    /// Presentation-only: never dirties the graph or touches history.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Node and edge selection are mutually exclusive; at most one
    /// entity drives the properties panel.
    pub fn set_selection(&mut self, node_id: Option<String>, edge_id: Option<String>) {
        if node_id.is_some() {
            self.selected_node_id = node_id;
            self.selected_edge_id = None;
        } else if edge_id.is_some() {
            self.selected_node_id = None;
            self.selected_edge_id = edge_id;
        } else {
            self.selected_node_id = None;
            self.selected_edge_id = None;
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.dirty = true;
        self.changes.send_modify(|seq| seq.metadata += 1);
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.dirty = true;
        self.changes.send_modify(|seq| seq.metadata += 1);
    }

    /// Wholesale node replacement. Callers wanting undo support push
    /// history themselves first (the layout bridge does).
    pub fn replace_nodes(&mut self, nodes: Vec<Node>) {
        self.nodes = nodes;
        self.mark_graph_dirty();
    }

    pub fn replace_edges(&mut self, edges: Vec<Edge>) {
        self.edges = edges;
        self.mark_graph_dirty();
    }

    // --- Save lifecycle ---

    pub fn mark_saving(&mut self) {
        self.saving = true;
        self.save_error = None;
    }

    pub fn mark_saved(&mut self) {
        self.saving = false;
        self.dirty = false;
        self.last_saved_at = Some(Instant::now());
        self.save_error = None;
    }

    /// A failed save keeps the graph dirty so the next debounce cycle
    /// (or a manual retry) can still persist it.
    pub fn mark_save_error(&mut self, message: impl Into<String>) {
        self.saving = false;
        self.save_error = Some(message.into());
    }

    fn mark_graph_dirty(&mut self) {
        self.dirty = true;
        self.changes.send_modify(|seq| seq.graph += 1);
    }
}
