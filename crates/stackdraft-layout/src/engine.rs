//! Layout engine contract and request/response shapes.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stackdraft_core::catalog::Side;
use stackdraft_core::Position;

/// Fixed box size every node is presented to the engine as.
pub const NODE_WIDTH: f64 = 200.0;
pub const NODE_HEIGHT: f64 = 80.0;

/// Spacing between nodes in the same rank.
pub const IN_RANK_SPACING: f64 = 60.0;
/// Spacing between consecutive ranks.
pub const RANK_SPACING: f64 = 80.0;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout engine failure: {0}")]
    Engine(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutDirection {
    TopToBottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeRouting {
    Orthogonal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPort {
    pub id: String,
    pub side: Side,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    pub id: String,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub ports: Vec<LayoutPort>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
    pub direction: LayoutDirection,
    pub routing: EdgeRouting,
    pub in_rank_spacing: f64,
    pub rank_spacing: f64,
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

/// Positions keyed by node id. Engines may return a partial result;
/// unmatched nodes keep their prior position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutResponse {
    pub positions: HashMap<String, Position>,
}

#[async_trait]
pub trait LayoutEngine: Send + Sync {
    async fn layout(&self, request: &LayoutRequest) -> Result<LayoutResponse, LayoutError>;
}
