//! Serialize the live graph into a layout request.

use stackdraft_core::catalog::{Catalog, Side};
use stackdraft_core::{Edge, Node};

use crate::engine::{
    EdgeRouting, LayoutDirection, LayoutEdge, LayoutNode, LayoutPort, LayoutRequest,
    IN_RANK_SPACING, NODE_HEIGHT, NODE_WIDTH, RANK_SPACING,
};

/// Build the engine request: every node as a fixed-size box with its
/// catalog-declared connection points tagged by side, every edge as a
/// source→target constraint.
pub fn build_request(nodes: &[Node], edges: &[Edge], catalog: &dyn Catalog) -> LayoutRequest {
    let layout_nodes = nodes
        .iter()
        .map(|node| LayoutNode {
            id: node.id.clone(),
            width: NODE_WIDTH,
            height: NODE_HEIGHT,
            ports: ports_for(node, catalog),
        })
        .collect();

    let layout_edges = edges
        .iter()
        .map(|edge| LayoutEdge {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            source_port: edge.source_handle.clone(),
            target_port: edge.target_handle.clone(),
        })
        .collect();

    LayoutRequest {
        direction: LayoutDirection::TopToBottom,
        routing: EdgeRouting::Orthogonal,
        in_rank_spacing: IN_RANK_SPACING,
        rank_spacing: RANK_SPACING,
        nodes: layout_nodes,
        edges: layout_edges,
    }
}

/// Connection points come from the catalog; types the catalog does not
/// know fall back to a top target / bottom source pair, matching the
/// top-to-bottom flow direction.
fn ports_for(node: &Node, catalog: &dyn Catalog) -> Vec<LayoutPort> {
    match catalog.get_type_definition(&node.type_id) {
        Some(def) if !def.connection_points.is_empty() => def
            .connection_points
            .iter()
            .map(|cp| LayoutPort {
                id: cp.id.clone(),
                side: cp.side,
            })
            .collect(),
        _ => vec![
            LayoutPort {
                id: "in".to_string(),
                side: Side::Top,
            },
            LayoutPort {
                id: "out".to_string(),
                side: Side::Bottom,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackdraft_core::catalog::{
        Category, ConnectionPoint, HandleDirection, TypeDefinition, TypeRegistry,
    };
    use stackdraft_core::{EdgeData, NodeData, Position};

    fn node(id: &str, type_id: &str) -> Node {
        Node {
            id: id.to_string(),
            type_id: type_id.to_string(),
            position: Position::default(),
            data: NodeData::default(),
            selected: false,
        }
    }

    #[test]
    fn request_uses_fixed_boxes_and_catalog_ports() {
        let mut registry = TypeRegistry::new();
        registry.insert(
            "worker",
            TypeDefinition {
                category: Category::Compute,
                connection_points: vec![
                    ConnectionPoint::new("in", HandleDirection::Target, Side::Left),
                    ConnectionPoint::new("out", HandleDirection::Source, Side::Right),
                ],
                binding_kind: None,
            },
        );

        let nodes = vec![node("node-1", "worker"), node("node-2", "mystery")];
        let edges = vec![Edge {
            id: "edge-1".to_string(),
            source: "node-1".to_string(),
            target: "node-2".to_string(),
            source_handle: Some("out".to_string()),
            target_handle: None,
            data: EdgeData::default(),
            selected: false,
        }];

        let request = build_request(&nodes, &edges, &registry);
        assert_eq!(request.direction, LayoutDirection::TopToBottom);
        assert_eq!(request.routing, EdgeRouting::Orthogonal);
        assert_eq!(request.in_rank_spacing, 60.0);
        assert_eq!(request.rank_spacing, 80.0);

        assert_eq!(request.nodes[0].width, 200.0);
        assert_eq!(request.nodes[0].height, 80.0);
        assert_eq!(request.nodes[0].ports[0].side, Side::Left);

        // Unknown type falls back to the default top/bottom pair.
        let fallback = &request.nodes[1].ports;
        assert_eq!(fallback.len(), 2);
        assert_eq!(fallback[0].side, Side::Top);
        assert_eq!(fallback[1].side, Side::Bottom);

        assert_eq!(request.edges[0].source_port.as_deref(), Some("out"));
    }
}
