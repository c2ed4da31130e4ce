//! Resolution of the opposing directed edge
//!
//! The two directions of a road segment are stored as separate directed
//! edges, each outbound from one of its nodes. The opposing index stored on
//! an edge is the local index of the reverse edge among its end node's edges.

use log::error;

use crate::formats::directed_edge::DirectedEdge;
use crate::formats::graph_tile::GraphTile;
use crate::formats::node_info::MAX_EDGES_PER_NODE;
use crate::geometry::shapes_match;
use crate::graph_id::GraphId;

/// Local index of the edge opposing `edge`, which starts at `start_node` in
/// `tile`. `end_tile` owns the end node of `edge` and may be `tile` itself.
///
/// Returns [`MAX_EDGES_PER_NODE`] when no edge qualifies. Map data does not
/// always contain a true opposing edge, so this is logged, not fatal.
pub fn opposing_edge_index(
    end_tile: &GraphTile,
    start_node: GraphId,
    tile: &GraphTile,
    edge: &DirectedEdge,
) -> u32 {
    let end_node = edge.end_node();
    let Some(node) = end_tile.node(end_node) else {
        error!("End node {end_node} of edge from {start_node} is not in its tile");
        return MAX_EDGES_PER_NODE;
    };

    let same_tile = end_tile.id == tile.id;
    for (i, candidate) in end_tile.edges_of(node).iter().enumerate() {
        if candidate.end_node() != start_node || candidate.length() != edge.length() {
            continue;
        }
        // Same tile and same edge info: same shape and names
        if same_tile && candidate.edgeinfo_offset() == edge.edgeinfo_offset() {
            return i as u32;
        }
        // Opposing edges may carry different names, so compare shapes
        let (Some(shape), Some(candidate_shape)) =
            (tile.edge_info(edge), end_tile.edge_info(candidate))
        else {
            continue;
        };
        if shapes_match(&shape.shape, &candidate_shape.shape) {
            return i as u32;
        }
    }

    error!(
        "Could not find opposing edge index for edge from {start_node} to {end_node} (length {})",
        edge.length()
    );
    MAX_EDGES_PER_NODE
}
