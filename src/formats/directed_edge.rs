//! Directed edge record - 24 bytes, three little-endian u64 words
//!
//!   word 0: end_node 46 | opp_index 7 | curvature 4 | forward 1 | leaves_tile 1 | spare 5
//!   word 1: edgeinfo_offset 25 | length 24 | local_edge_idx 3 | spare 12
//!   word 2: forward_access 12 | reverse_access 12 | spare 40
//!
//! The edge info offset indexes the tile's edge info list (shape, way id,
//! name). The two directions of a way share one entry when they live in the
//! same tile.

use log::{warn, Level};

use crate::bits::{Field, Overflow};
use crate::graph_id::GraphId;

pub const DIRECTED_EDGE_SIZE: usize = 24;

pub const MAX_EDGE_LENGTH: u32 = (1 << 24) - 1;
pub const MAX_CURVATURE: u32 = 15;
pub const MAX_EDGE_INFO_OFFSET: u32 = (1 << 25) - 1;
pub const MAX_LOCAL_EDGE_IDX: u32 = 7;

const END_NODE: Field = Field::new(0, 0, 46);
const OPP_INDEX: Field = Field::new(0, 46, 7);
const CURVATURE: Field = Field::new(0, 53, 4);
const FORWARD: Field = Field::new(0, 57, 1);
const LEAVES_TILE: Field = Field::new(0, 58, 1);

const EDGE_INFO_OFFSET: Field = Field::new(1, 0, 25);
const LENGTH: Field = Field::new(1, 25, 24);
const LOCAL_EDGE_IDX: Field = Field::new(1, 49, 3);

const FORWARD_ACCESS: Field = Field::new(2, 0, 12);
const REVERSE_ACCESS: Field = Field::new(2, 12, 12);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectedEdge {
    words: [u64; 3],
}

impl DirectedEdge {
    pub fn end_node(&self) -> GraphId {
        GraphId::from_value(END_NODE.get(&self.words))
    }

    pub fn set_end_node(&mut self, end_node: GraphId) {
        END_NODE.set(&mut self.words, end_node.value());
    }

    /// Index of the opposing edge among the end node's edges
    pub fn opp_index(&self) -> u32 {
        OPP_INDEX.get(&self.words) as u32
    }

    pub fn set_opp_index(&mut self, opp_index: u32) {
        OPP_INDEX.set(&mut self.words, opp_index as u64);
    }

    pub fn curvature(&self) -> u32 {
        CURVATURE.get(&self.words) as u32
    }

    pub fn set_curvature(&mut self, curvature: u32) {
        let v = Overflow::Clamp(Level::Warn)
            .apply("curvature", curvature as u64, MAX_CURVATURE as u64)
            .ok()
            .flatten()
            .unwrap_or(MAX_CURVATURE as u64);
        CURVATURE.set(&mut self.words, v);
    }

    /// Edge follows the digitized direction of its way
    pub fn forward(&self) -> bool {
        FORWARD.get_bool(&self.words)
    }

    pub fn set_forward(&mut self, forward: bool) {
        FORWARD.set_bool(&mut self.words, forward);
    }

    /// End node lives in another tile
    pub fn leaves_tile(&self) -> bool {
        LEAVES_TILE.get_bool(&self.words)
    }

    pub fn set_leaves_tile(&mut self, leaves_tile: bool) {
        LEAVES_TILE.set_bool(&mut self.words, leaves_tile);
    }

    pub fn edgeinfo_offset(&self) -> u32 {
        EDGE_INFO_OFFSET.get(&self.words) as u32
    }

    pub fn set_edgeinfo_offset(&mut self, offset: u32) {
        if offset > MAX_EDGE_INFO_OFFSET {
            warn!("Edge info offset {offset} exceeds max, edge info will be wrong");
        }
        EDGE_INFO_OFFSET.set(&mut self.words, offset as u64);
    }

    /// Length in meters
    pub fn length(&self) -> u32 {
        LENGTH.get(&self.words) as u32
    }

    pub fn set_length(&mut self, length: u32) {
        let v = Overflow::Clamp(Level::Warn)
            .apply("edge length", length as u64, MAX_EDGE_LENGTH as u64)
            .ok()
            .flatten()
            .unwrap_or(MAX_EDGE_LENGTH as u64);
        LENGTH.set(&mut self.words, v);
    }

    pub fn local_edge_idx(&self) -> u32 {
        LOCAL_EDGE_IDX.get(&self.words) as u32
    }

    /// Index among the node's local edges. Edges past the eighth keep the
    /// last index; the node holds heading and driveability for the first
    /// eight only.
    pub fn set_local_edge_idx(&mut self, idx: u32) {
        let v = Overflow::Clamp(Level::Warn)
            .apply("local edge index", idx as u64, MAX_LOCAL_EDGE_IDX as u64)
            .ok()
            .flatten()
            .unwrap_or(MAX_LOCAL_EDGE_IDX as u64);
        LOCAL_EDGE_IDX.set(&mut self.words, v);
    }

    pub fn forward_access(&self) -> u16 {
        FORWARD_ACCESS.get(&self.words) as u16
    }

    pub fn set_forward_access(&mut self, access: u16) {
        FORWARD_ACCESS.set(&mut self.words, access as u64);
    }

    pub fn reverse_access(&self) -> u16 {
        REVERSE_ACCESS.get(&self.words) as u16
    }

    pub fn set_reverse_access(&mut self, access: u16) {
        REVERSE_ACCESS.set(&mut self.words, access as u64);
    }

    pub fn to_bytes(&self) -> [u8; DIRECTED_EDGE_SIZE] {
        let mut out = [0u8; DIRECTED_EDGE_SIZE];
        for (chunk, word) in out.chunks_exact_mut(8).zip(self.words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; DIRECTED_EDGE_SIZE]) -> Self {
        let mut words = [0u64; 3];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            *word = u64::from_le_bytes(buf);
        }
        Self { words }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access;

    #[test]
    fn test_fields() {
        let end = GraphId::new(756_425, 2, 4321).unwrap();
        let mut edge = DirectedEdge::default();
        edge.set_end_node(end);
        edge.set_opp_index(5);
        edge.set_curvature(9);
        edge.set_forward(true);
        edge.set_edgeinfo_offset(77);
        edge.set_length(1234);
        edge.set_local_edge_idx(6);
        edge.set_forward_access(access::AUTO | access::PEDESTRIAN);
        edge.set_reverse_access(access::PEDESTRIAN);

        let edge = DirectedEdge::from_bytes(&edge.to_bytes());
        assert_eq!(edge.end_node(), end);
        assert_eq!(edge.opp_index(), 5);
        assert_eq!(edge.curvature(), 9);
        assert!(edge.forward());
        assert!(!edge.leaves_tile());
        assert_eq!(edge.edgeinfo_offset(), 77);
        assert_eq!(edge.length(), 1234);
        assert_eq!(edge.local_edge_idx(), 6);
        assert_eq!(edge.forward_access(), access::AUTO | access::PEDESTRIAN);
        assert_eq!(edge.reverse_access(), access::PEDESTRIAN);
    }

    #[test]
    fn test_clamps() {
        let mut edge = DirectedEdge::default();
        edge.set_length(MAX_EDGE_LENGTH + 100);
        edge.set_curvature(40);
        assert_eq!(edge.length(), MAX_EDGE_LENGTH);
        assert_eq!(edge.curvature(), MAX_CURVATURE);
    }

    #[test]
    fn test_local_edge_idx_past_eighth_edge() {
        let mut edge = DirectedEdge::default();
        let logged = crate::test_log::levels(|| edge.set_local_edge_idx(9));
        assert_eq!(logged, vec![Level::Warn]);
        assert_eq!(edge.local_edge_idx(), MAX_LOCAL_EDGE_IDX);

        let logged = crate::test_log::levels(|| edge.set_local_edge_idx(7));
        assert!(logged.is_empty());
        assert_eq!(edge.local_edge_idx(), 7);
    }
}
