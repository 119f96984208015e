pub mod autosave;
pub mod catalog;
pub mod persistence;
pub mod store;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Types (matching the canvas frontend's node/edge shapes) ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    DataFlow,
    ServiceBinding,
    Trigger,
    External,
}

impl Default for EdgeKind {
    fn default() -> Self {
        EdgeKind::DataFlow
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
}

/// Payload carried by a node. Closed fields for everything the editor
/// understands; `extra` round-trips fields the rendering library may
/// attach so they survive a load/save cycle.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<NodeStyle>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A node on the canvas. Matches the frontend's Node structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    /// Catalog key identifying what this node represents.
    #[serde(rename = "type", default = "default_type_id")]
    pub type_id: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: NodeData,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selected: bool,
}

fn default_type_id() -> String {
    "service".to_string()
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(default)]
    pub edge_type: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A directed, typed connection between two nodes. Matches the
/// frontend's Edge structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default)]
    pub data: EdgeData,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selected: bool,
}

/// Pan/zoom state of the canvas. Presentation-only: persisted alongside
/// the graph but never part of dirty tracking or history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

// --- Persisted graph representation ---

/// The persisted graph payload: exactly `nodes`, `edges`, `viewport`.
/// Absent keys default so older payloads still load.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GraphDoc {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub viewport: Viewport,
}

impl GraphDoc {
    /// Parse a persisted graph payload. Malformed input fails closed to
    /// an empty graph rather than surfacing a parse error into the UI.
    pub fn from_json(raw: &str) -> GraphDoc {
        match serde_json::from_str(raw) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("discarding malformed graph payload: {}", e);
                GraphDoc::default()
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// --- ID generation ---

/// Generate the next node ID by scanning existing nodes.
/// Follows the frontend pattern: "node-{N}" with N incrementing.
pub fn next_node_id(nodes: &[Node]) -> String {
    let max = nodes
        .iter()
        .filter_map(|n| n.id.strip_prefix("node-").and_then(|s| s.parse::<u64>().ok()))
        .max()
        .unwrap_or(0);
    format!("node-{}", max + 1)
}

/// Generate the next edge ID by scanning existing edges: "edge-{N}".
pub fn next_edge_id(edges: &[Edge]) -> String {
    let max = edges
        .iter()
        .filter_map(|e| e.id.strip_prefix("edge-").and_then(|s| s.parse::<u64>().ok()))
        .max()
        .unwrap_or(0);
    format!("edge-{}", max + 1)
}
