///! Binary record codecs and the files they are stored in

// Packed records
pub mod access_restriction;
pub mod directed_edge;
pub mod node_info;

// Files
pub mod crc;
pub mod graph_tile;
pub mod manifest;
pub mod temp_file;

pub use access_restriction::{
    AccessRestriction, AccessRestrictionDirection, AccessType, OsmAccessRestriction,
};
pub use directed_edge::DirectedEdge;
pub use graph_tile::{EdgeInfo, GraphTile, GraphTileFile};
pub use manifest::{TileManifest, TileSet};
pub use node_info::{
    IntersectionType, NodeContext, NodeLinkage, NodeRecord, NodeType, TransitConnection,
    Traversability,
};
pub use temp_file::{remove_temp_file, TempFile};
