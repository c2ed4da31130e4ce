//! Records stored in the intermediate `*.bin` files

use serde::{Deserialize, Serialize};

use crate::formats::access_restriction::OsmAccessRestriction;
use crate::formats::node_info::NodeType;
use crate::graph_id::GraphId;
use crate::point::PointLL;

/// A routable way (`ways.bin`), sorted by way id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsmWay {
    pub way_id: u64,
    /// First entry of this way in `way_nodes.bin`
    pub node_start: u64,
    pub node_count: u32,
    pub name_index: u32,
    pub forward_access: u16,
    pub reverse_access: u16,
}

/// Node attributes; the position is fixed point, 1e-7 degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OsmNode {
    pub osm_id: u64,
    /// `None` until ParseNodes has seen the node
    pub fixed: Option<(i32, i32)>,
    pub node_type: u8,
    pub traffic_signal: bool,
    pub tagged_access: bool,
    pub private_access: bool,
}

impl OsmNode {
    pub fn new(osm_id: u64) -> Self {
        Self {
            osm_id,
            ..Self::default()
        }
    }

    pub fn ll(&self) -> Option<PointLL> {
        self.fixed.map(|(lat, lon)| PointLL::from_fixed(lat, lon))
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::from_u8(self.node_type).unwrap_or_default()
    }
}

/// One node reference of a way (`way_nodes.bin`), in way order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsmWayNode {
    pub node: OsmNode,
    pub way_index: u32,
    pub way_shape_index: u32,
}

/// Way access restriction as written to `access.bin`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WayAccessRestriction {
    pub way_id: u64,
    pub restriction: OsmAccessRestriction,
}

/// Name pronunciation of a way or node (`pronunciation.bin`,
/// `linguistics_node.bin`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pronunciation {
    pub osm_id: u64,
    pub name_index: u32,
    pub pronunciation_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnRestrictionKind {
    No,
    Only,
}

/// Turn restriction relation (`complex_from_restrictions.bin` sorted by
/// from-way, `complex_to_restrictions.bin` sorted by to-way)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexRestriction {
    pub relation_id: u64,
    pub from_way: u64,
    pub via_nodes: Vec<u64>,
    pub via_ways: Vec<u64>,
    pub to_way: u64,
    pub kind: TurnRestrictionKind,
    /// Affected access modes
    pub modes: u16,
}

/// A graph node after edge construction (`nodes.bin`), sorted by graph id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub graph_id: GraphId,
    pub node: OsmNode,
}

/// Way segment between two graph nodes (`edges.bin`); its shape is the
/// entry of the same index in `shapes.bin`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsmEdge {
    pub way_index: u32,
    /// Index into `nodes.bin`
    pub start_node: u32,
    pub end_node: u32,
}
