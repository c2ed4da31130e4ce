//! Graph tile - all nodes, directed edges and ancillary records of one tile
//!
//! Format: <tile_dir>/<level>/<ddd>/<ddd>.gph (little-endian)
//!
//! Header (64 bytes):
//!   magic:                u32 = 0x47504854  // "GPHT"
//!   version:              u16 = 1
//!   reserved:             u16 = 0
//!   graph_id:             u64
//!   base_lat:             f64
//!   base_lon:             f64
//!   n_nodes:              u32
//!   n_directed_edges:     u32
//!   n_access_restrictions: u32
//!   n_admins:             u32
//!   n_edge_infos:         u32
//!   padding
//!
//! Body:
//!   nodes:                n_nodes × 32 bytes
//!   directed_edges:       n_directed_edges × 24 bytes
//!   access_restrictions:  n_access_restrictions × 16 bytes (sorted by edge index)
//!   admins:               n_admins × 4 strings (u16 length + UTF-8 bytes)
//!   edge_infos:           n_edge_infos × { way_id u64, name_index u32,
//!                         n_points u32, n_points × (lat i32, lon i32) }
//!
//! Footer (16 bytes):
//!   body_crc64: u64
//!   file_crc64: u64
//!
//! The file carries no timestamp: building the same tile twice yields the
//! same bytes.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::Path;

use super::access_restriction::{
    restrictions_for_edge, AccessRestriction, ACCESS_RESTRICTION_SIZE,
};
use super::crc::{self, FOOTER_SIZE};
use super::directed_edge::{DirectedEdge, DIRECTED_EDGE_SIZE};
use super::node_info::{NodeRecord, NODE_RECORD_SIZE};
use crate::admin::AdminInfo;
use crate::error::{Error, Result};
use crate::graph_id::GraphId;
use crate::hierarchy;
use crate::point::PointLL;

const MAGIC: u32 = 0x47504854; // "GPHT"
const VERSION: u16 = 1;
const HEADER_SIZE: usize = 64;

/// Shape, way id and name shared by the two directions of an edge
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgeInfo {
    pub way_id: u64,
    pub name_index: u32,
    /// Shape in the digitized direction of the way
    pub shape: Vec<PointLL>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphTile {
    pub id: GraphId,
    pub base_ll: PointLL,
    pub nodes: Vec<NodeRecord>,
    pub directed_edges: Vec<DirectedEdge>,
    pub access_restrictions: Vec<AccessRestriction>,
    pub admins: Vec<AdminInfo>,
    pub edge_infos: Vec<EdgeInfo>,
}

impl GraphTile {
    /// Empty tile; `id` is reduced to its tile base
    pub fn new(id: GraphId) -> Self {
        let id = id.tile_base();
        Self {
            id,
            base_ll: hierarchy::base_ll(id).unwrap_or_default(),
            nodes: Vec::new(),
            directed_edges: Vec::new(),
            access_restrictions: Vec::new(),
            admins: Vec::new(),
            edge_infos: Vec::new(),
        }
    }

    pub fn node(&self, id: GraphId) -> Option<&NodeRecord> {
        self.nodes.get(id.id() as usize)
    }

    /// Index range of the outbound edges of a node
    pub fn edge_range(&self, node: &NodeRecord) -> Range<usize> {
        let start = node.edge_index() as usize;
        let end = (start + node.edge_count() as usize).min(self.directed_edges.len());
        start.min(end)..end
    }

    /// Outbound edges of a node
    pub fn edges_of(&self, node: &NodeRecord) -> &[DirectedEdge] {
        &self.directed_edges[self.edge_range(node)]
    }

    pub fn edge_info(&self, edge: &DirectedEdge) -> Option<&EdgeInfo> {
        self.edge_infos.get(edge.edgeinfo_offset() as usize)
    }

    pub fn admin(&self, index: u32) -> Option<&AdminInfo> {
        self.admins.get(index as usize)
    }

    pub fn restrictions_for_edge(&self, edge_index: u32) -> &[AccessRestriction] {
        restrictions_for_edge(&self.access_restrictions, edge_index)
    }

    fn header(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.extend_from_slice(&MAGIC.to_le_bytes());
        header.extend_from_slice(&VERSION.to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes()); // reserved
        header.extend_from_slice(&self.id.value().to_le_bytes());
        header.extend_from_slice(&self.base_ll.lat.to_le_bytes());
        header.extend_from_slice(&self.base_ll.lon.to_le_bytes());
        header.extend_from_slice(&(self.nodes.len() as u32).to_le_bytes());
        header.extend_from_slice(&(self.directed_edges.len() as u32).to_le_bytes());
        header.extend_from_slice(&(self.access_restrictions.len() as u32).to_le_bytes());
        header.extend_from_slice(&(self.admins.len() as u32).to_le_bytes());
        header.extend_from_slice(&(self.edge_infos.len() as u32).to_le_bytes());
        header.resize(HEADER_SIZE, 0);
        header
    }

    fn body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(
            self.nodes.len() * NODE_RECORD_SIZE
                + self.directed_edges.len() * DIRECTED_EDGE_SIZE
                + self.access_restrictions.len() * ACCESS_RESTRICTION_SIZE,
        );
        for node in &self.nodes {
            body.extend_from_slice(&node.to_bytes());
        }
        for edge in &self.directed_edges {
            body.extend_from_slice(&edge.to_bytes());
        }
        for restriction in &self.access_restrictions {
            body.extend_from_slice(&restriction.to_bytes());
        }
        for admin in &self.admins {
            for text in [
                &admin.country_iso,
                &admin.country_text,
                &admin.state_iso,
                &admin.state_text,
            ] {
                let bytes = text.as_bytes();
                let len = bytes.len().min(u16::MAX as usize);
                body.extend_from_slice(&(len as u16).to_le_bytes());
                body.extend_from_slice(&bytes[..len]);
            }
        }
        for info in &self.edge_infos {
            body.extend_from_slice(&info.way_id.to_le_bytes());
            body.extend_from_slice(&info.name_index.to_le_bytes());
            body.extend_from_slice(&(info.shape.len() as u32).to_le_bytes());
            for p in &info.shape {
                let (lat, lon) = p.to_fixed();
                body.extend_from_slice(&lat.to_le_bytes());
                body.extend_from_slice(&lon.to_le_bytes());
            }
        }
        body
    }
}

/// File reader/writer for graph tiles
pub struct GraphTileFile;

impl GraphTileFile {
    /// Write a tile to `path`, creating parent directories
    pub fn write<P: AsRef<Path>>(path: P, tile: &GraphTile) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);

        let header = tile.header();
        let body = tile.body();

        writer.write_all(&header)?;
        writer.write_all(&body)?;
        writer.write_all(&crc::footer(&header, &body))?;
        writer.flush()?;
        Ok(())
    }

    /// Read and CRC-verify a tile
    pub fn read<P: AsRef<Path>>(path: P) -> Result<GraphTile> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        if data.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(Error::Truncated {
                path: path.to_path_buf(),
                detail: format!("{} bytes", data.len()),
            });
        }

        let mut header = Reader::new(path, &data[..HEADER_SIZE]);
        let magic = header.u32()?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic {
                path: path.to_path_buf(),
                expected: MAGIC,
                found: magic,
            });
        }
        let version = header.u16()?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion {
                path: path.to_path_buf(),
                version,
            });
        }
        let _reserved = header.u16()?;
        let id = GraphId::from_value(header.u64()?);
        let base_lat = f64::from_bits(header.u64()?);
        let base_lon = f64::from_bits(header.u64()?);
        let n_nodes = header.u32()? as usize;
        let n_edges = header.u32()? as usize;
        let n_restrictions = header.u32()? as usize;
        let n_admins = header.u32()? as usize;
        let n_edge_infos = header.u32()? as usize;

        let footer_start = data.len() - FOOTER_SIZE;
        let body_bytes = &data[HEADER_SIZE..footer_start];
        crc::verify_footer(path, &data, HEADER_SIZE)?;

        let mut body = Reader::new(path, body_bytes);
        let mut nodes = Vec::with_capacity(n_nodes);
        for _ in 0..n_nodes {
            nodes.push(NodeRecord::from_bytes(&body.array::<NODE_RECORD_SIZE>()?));
        }
        let mut directed_edges = Vec::with_capacity(n_edges);
        for _ in 0..n_edges {
            directed_edges.push(DirectedEdge::from_bytes(&body.array::<DIRECTED_EDGE_SIZE>()?));
        }
        let mut access_restrictions = Vec::with_capacity(n_restrictions);
        for _ in 0..n_restrictions {
            access_restrictions.push(AccessRestriction::from_bytes(
                &body.array::<ACCESS_RESTRICTION_SIZE>()?,
            ));
        }
        let mut admins = Vec::with_capacity(n_admins);
        for _ in 0..n_admins {
            admins.push(AdminInfo::new(
                body.string()?,
                body.string()?,
                body.string()?,
                body.string()?,
            ));
        }
        let mut edge_infos = Vec::with_capacity(n_edge_infos);
        for _ in 0..n_edge_infos {
            let way_id = body.u64()?;
            let name_index = body.u32()?;
            let n_points = body.u32()? as usize;
            let mut shape = Vec::with_capacity(n_points);
            for _ in 0..n_points {
                let lat = body.u32()? as i32;
                let lon = body.u32()? as i32;
                shape.push(PointLL::from_fixed(lat, lon));
            }
            edge_infos.push(EdgeInfo {
                way_id,
                name_index,
                shape,
            });
        }
        if !body.is_empty() {
            return Err(Error::Truncated {
                path: path.to_path_buf(),
                detail: format!("{} trailing body bytes", body.remaining()),
            });
        }

        Ok(GraphTile {
            id,
            base_ll: PointLL::new(base_lon, base_lat),
            nodes,
            directed_edges,
            access_restrictions,
            admins,
            edge_infos,
        })
    }

    /// Verify a tile's checksums without keeping its contents
    pub fn verify<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::read(path).map(|_| ())
    }
}

/// Bounds-checked little-endian reader over a byte slice
struct Reader<'a> {
    path: &'a Path,
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(path: &'a Path, data: &'a [u8]) -> Self {
        Self { path, data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Truncated {
                path: self.path.to_path_buf(),
                detail: format!("needed {n} bytes at offset {}", self.pos),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array::<2>()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array::<4>()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array::<8>()?))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u16()? as usize;
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access;
    use crate::formats::access_restriction::AccessType;
    use crate::formats::node_info::NodeType;
    use tempfile::NamedTempFile;

    fn sample_tile() -> GraphTile {
        let level = hierarchy::local_level();
        let id = level.graph_id(&PointLL::new(4.35, 50.85)).unwrap();
        let mut tile = GraphTile::new(id);
        let a = PointLL::new(tile.base_ll.lon + 0.01, tile.base_ll.lat + 0.01);
        let b = PointLL::new(tile.base_ll.lon + 0.02, tile.base_ll.lat + 0.01);

        let mut n0 = NodeRecord::new(
            &tile.base_ll,
            &a,
            access::ALL as u32,
            NodeType::StreetIntersection,
            false,
            false,
            false,
            false,
        );
        n0.set_edge_index(0).unwrap();
        n0.set_edge_count(1);
        let mut n1 = NodeRecord::new(
            &tile.base_ll,
            &b,
            access::ALL as u32,
            NodeType::Gate,
            true,
            false,
            false,
            false,
        );
        n1.set_edge_index(1).unwrap();
        n1.set_edge_count(1);
        tile.nodes = vec![n0, n1];

        let mut e0 = DirectedEdge::default();
        e0.set_end_node(id.with_id(1).unwrap());
        e0.set_length(715);
        e0.set_forward(true);
        let mut e1 = DirectedEdge::default();
        e1.set_end_node(id.with_id(0).unwrap());
        e1.set_length(715);
        tile.directed_edges = vec![e0, e1];

        tile.access_restrictions = vec![AccessRestriction::new(
            1,
            AccessType::MaxHeight,
            access::TRUCK,
            350,
            false,
        )];
        tile.admins = vec![AdminInfo::new("BE", "Belgium", "BRU", "Brussels")];
        tile.edge_infos = vec![EdgeInfo {
            way_id: 42,
            name_index: 3,
            shape: vec![a, b],
        }];
        tile
    }

    #[test]
    fn test_write_read() -> anyhow::Result<()> {
        let tile = sample_tile();
        let tmp = NamedTempFile::new()?;
        GraphTileFile::write(tmp.path(), &tile)?;
        let loaded = GraphTileFile::read(tmp.path())?;

        assert_eq!(loaded.id, tile.id);
        assert_eq!(loaded.base_ll, tile.base_ll);
        assert_eq!(loaded.nodes, tile.nodes);
        assert_eq!(loaded.directed_edges, tile.directed_edges);
        assert_eq!(loaded.access_restrictions, tile.access_restrictions);
        assert_eq!(loaded.admins, tile.admins);
        assert_eq!(loaded.edge_infos[0].way_id, 42);
        assert_eq!(loaded.edge_infos[0].shape.len(), 2);

        let n1 = loaded.nodes[1];
        assert_eq!(loaded.edges_of(&n1).len(), 1);
        assert_eq!(loaded.restrictions_for_edge(1).len(), 1);
        assert!(loaded.restrictions_for_edge(0).is_empty());
        Ok(())
    }

    #[test]
    fn test_same_tile_same_bytes() -> anyhow::Result<()> {
        let tile = sample_tile();
        let a = NamedTempFile::new()?;
        let b = NamedTempFile::new()?;
        GraphTileFile::write(a.path(), &tile)?;
        GraphTileFile::write(b.path(), &tile)?;
        assert_eq!(fs::read(a.path())?, fs::read(b.path())?);
        Ok(())
    }

    #[test]
    fn test_corruption_detected() -> anyhow::Result<()> {
        let tmp = NamedTempFile::new()?;
        GraphTileFile::write(tmp.path(), &sample_tile())?;

        let mut data = fs::read(tmp.path())?;
        data[HEADER_SIZE + 3] ^= 0xff;
        fs::write(tmp.path(), &data)?;
        assert!(matches!(
            GraphTileFile::read(tmp.path()),
            Err(Error::ChecksumMismatch { .. })
        ));

        fs::write(tmp.path(), &data[..HEADER_SIZE])?;
        assert!(matches!(
            GraphTileFile::read(tmp.path()),
            Err(Error::Truncated { .. })
        ));
        Ok(())
    }
}
