//! Map engine positions back onto the graph's nodes.

use stackdraft_core::Node;

use crate::engine::LayoutResponse;

/// Produce the post-layout node list. Nodes the engine did not return a
/// position for keep their prior position (partial results tolerated).
pub fn apply_positions(nodes: &[Node], response: &LayoutResponse) -> Vec<Node> {
    nodes
        .iter()
        .map(|node| {
            let mut updated = node.clone();
            if let Some(position) = response.positions.get(&node.id) {
                updated.position = *position;
            }
            updated
        })
        .collect()
}
