//! Build: write the local level tiles from the constructed edges

use std::ops::Range;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use super::records::{GraphNode, OsmEdge, OsmWay};
use crate::formats::access_restriction::sort_by_edge;
use crate::formats::directed_edge::DirectedEdge;
use crate::formats::graph_tile::{EdgeInfo, GraphTile, GraphTileFile};
use crate::formats::manifest::TileSet;
use crate::formats::node_info::{
    IntersectionType, NodeRecord, Traversability, MAX_LOCAL_EDGE_INDEX,
};
use crate::formats::temp_file::TempFile;
use crate::geometry::compute_curvature;
use crate::graph_id::GraphId;
use crate::hierarchy;
use crate::osm_data::OsmData;
use crate::pipeline::BuildContext;
use crate::point::PointLL;

/// Everything the tile builders read, loaded once and shared across threads
struct Inputs {
    ways: Vec<OsmWay>,
    nodes: Vec<GraphNode>,
    edges: Vec<OsmEdge>,
    shapes: Vec<Vec<PointLL>>,
    /// Per node: (edge index, leaves the node in the digitized direction)
    adjacency: Vec<Vec<(u32, bool)>>,
}

impl Inputs {
    fn load(ctx: &BuildContext) -> Result<Self> {
        let ways: Vec<OsmWay> = TempFile::read(&ctx.files.ways).context("Failed to read ways")?;
        let nodes: Vec<GraphNode> =
            TempFile::read(&ctx.files.nodes).context("Failed to read nodes")?;
        let edges: Vec<OsmEdge> =
            TempFile::read(&ctx.files.edges).context("Failed to read edges")?;
        let shapes: Vec<Vec<PointLL>> =
            TempFile::read(&ctx.files.shapes).context("Failed to read shapes")?;
        if shapes.len() != edges.len() {
            bail!(
                "{} has {} shapes for {} edges",
                ctx.files.shapes.display(),
                shapes.len(),
                edges.len()
            );
        }

        let mut adjacency = vec![Vec::new(); nodes.len()];
        for (i, edge) in edges.iter().enumerate() {
            for (node, forward) in [(edge.start_node, true), (edge.end_node, false)] {
                let Some(list) = adjacency.get_mut(node as usize) else {
                    bail!("Edge {i} references node {node} past the end of the nodes file");
                };
                list.push((i as u32, forward));
            }
        }
        Ok(Self {
            ways,
            nodes,
            edges,
            shapes,
            adjacency,
        })
    }

    fn way(&self, edge: &OsmEdge) -> Result<&OsmWay> {
        self.ways
            .get(edge.way_index as usize)
            .with_context(|| format!("Edge references missing way index {}", edge.way_index))
    }
}

/// Node ranges of every tile; each range must hold exactly that tile's nodes
fn tile_ranges(tileset: &TileSet, nodes: &[GraphNode]) -> Result<Vec<(GraphId, Range<usize>)>> {
    let starts: Vec<(GraphId, usize)> = tileset.iter().map(|(t, s)| (*t, *s)).collect();
    let mut ranges = Vec::with_capacity(starts.len());
    for (i, &(tile, start)) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map(|(_, s)| *s).unwrap_or(nodes.len());
        let range = start..end;
        let matches = start < end
            && end <= nodes.len()
            && nodes[range.clone()]
                .iter()
                .all(|n| n.graph_id.tile_base() == tile);
        if !matches {
            bail!("Tile manifest entry {tile} does not match the constructed nodes");
        }
        ranges.push((tile, range));
    }
    let covered = ranges.first().map(|(_, r)| r.start == 0).unwrap_or(nodes.is_empty());
    if !covered {
        bail!("Tile manifest does not start at the first node");
    }
    Ok(ranges)
}

fn edge_length(shape: &[PointLL]) -> u32 {
    let meters: f64 = shape.windows(2).map(|w| w[0].distance(&w[1])).sum();
    meters.round() as u32
}

/// Heading of the edge leaving its start node
fn departure_heading(shape: &[PointLL], forward: bool) -> u32 {
    let (from, to) = if forward {
        (shape.first(), shape.get(1))
    } else {
        (shape.last(), shape.len().checked_sub(2).and_then(|i| shape.get(i)))
    };
    match (from, to) {
        (Some(a), Some(b)) => a.heading(b).round() as u32 % 360,
        _ => 0,
    }
}

fn build_tile(
    tile_id: GraphId,
    range: Range<usize>,
    inputs: &Inputs,
    osm_data: &OsmData,
) -> Result<GraphTile> {
    let mut tile = GraphTile::new(tile_id);
    let mut edge_info_offsets: FxHashMap<u32, u32> = FxHashMap::default();

    for node_idx in range {
        let graph_node = &inputs.nodes[node_idx];
        let Some(ll) = graph_node.node.ll() else {
            bail!("Node {} has no position", graph_node.node.osm_id);
        };
        let mut node = NodeRecord::new(
            &tile.base_ll,
            &ll,
            0,
            graph_node.node.node_type(),
            graph_node.node.traffic_signal,
            graph_node.node.tagged_access,
            graph_node.node.private_access,
            false,
        );
        node.set_edge_index(tile.directed_edges.len() as u32)?;
        node.set_drive_on_right(true);

        let adjacent = &inputs.adjacency[node_idx];
        let mut node_access = 0u16;
        for (local_idx, &(edge_idx, forward)) in adjacent.iter().enumerate() {
            let osm_edge = &inputs.edges[edge_idx as usize];
            let shape = &inputs.shapes[edge_idx as usize];
            let way = inputs.way(osm_edge)?;
            let end_idx = if forward {
                osm_edge.end_node
            } else {
                osm_edge.start_node
            };
            let end_node = inputs.nodes[end_idx as usize].graph_id;

            let (fwd_access, rev_access) = if forward {
                (way.forward_access, way.reverse_access)
            } else {
                (way.reverse_access, way.forward_access)
            };
            node_access |= fwd_access | rev_access;

            let offset = *edge_info_offsets.entry(edge_idx).or_insert_with(|| {
                tile.edge_infos.push(EdgeInfo {
                    way_id: way.way_id,
                    name_index: way.name_index,
                    shape: shape.clone(),
                });
                (tile.edge_infos.len() - 1) as u32
            });

            let mut edge = DirectedEdge::default();
            edge.set_end_node(end_node);
            edge.set_length(edge_length(shape));
            edge.set_curvature(compute_curvature(shape));
            edge.set_forward(forward);
            edge.set_leaves_tile(end_node.tile_base() != tile.id);
            edge.set_edgeinfo_offset(offset);
            edge.set_local_edge_idx(local_idx as u32);
            edge.set_forward_access(fwd_access);
            edge.set_reverse_access(rev_access);

            let directed_index = tile.directed_edges.len() as u32;
            for restriction in osm_data.restrictions_for_way(way.way_id) {
                if !restriction.applies(forward) {
                    continue;
                }
                if let Some(record) = restriction.to_tile_record(directed_index) {
                    tile.access_restrictions.push(record);
                }
            }

            if local_idx as u32 <= MAX_LOCAL_EDGE_INDEX {
                node.set_heading(local_idx as u32, departure_heading(shape, forward));
                node.set_local_driveability(
                    local_idx as u32,
                    Traversability::from_access(fwd_access != 0, rev_access != 0),
                );
            }
            tile.directed_edges.push(edge);
        }

        let n = adjacent.len() as u32;
        node.set_edge_count(n);
        node.set_local_edge_count(n.max(1));
        node.set_access(node_access as u32);
        if n == 1 {
            node.set_intersection(IntersectionType::DeadEnd);
        }
        tile.nodes.push(node);
    }

    sort_by_edge(&mut tile.access_restrictions);
    Ok(tile)
}

/// Build every tile of the partition and write it under the tile directory
pub fn build_tiles(ctx: &BuildContext, osm_data: &OsmData, tileset: &TileSet) -> Result<()> {
    let start = Instant::now();
    let inputs = Inputs::load(ctx)?;
    let ranges = tile_ranges(tileset, &inputs.nodes)?;

    let edge_counts = ranges
        .par_iter()
        .map(|(tile_id, range)| -> Result<usize> {
            let tile = build_tile(*tile_id, range.clone(), &inputs, osm_data)
                .with_context(|| format!("Failed to build tile {tile_id}"))?;
            let path = hierarchy::tile_path(&ctx.tile_dir, *tile_id);
            GraphTileFile::write(&path, &tile)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            debug!(
                "Wrote tile {} ({} nodes, {} edges)",
                tile_id,
                tile.nodes.len(),
                tile.directed_edges.len()
            );
            Ok(tile.directed_edges.len())
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Built {} tiles with {} nodes and {} directed edges in {:.2}s",
        ranges.len(),
        inputs.nodes.len(),
        edge_counts.iter().sum::<usize>(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
