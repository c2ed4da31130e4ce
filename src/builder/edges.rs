//! ConstructEdges: split ways at graph nodes and partition the nodes by tile

use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use rustc_hash::FxHashMap;

use super::records::{GraphNode, OsmEdge, OsmNode, OsmWay, OsmWayNode};
use crate::formats::manifest::TileSet;
use crate::formats::temp_file::TempFile;
use crate::graph_id::GraphId;
use crate::hierarchy;
use crate::pipeline::BuildContext;
use crate::point::PointLL;

/// Edge before node ids are assigned
struct RawEdge {
    way_index: u32,
    start: u64,
    end: u64,
    shape: Vec<PointLL>,
}

/// Reads `ways.bin` and `way_nodes.bin`; writes `nodes.bin`, `edges.bin` and
/// `shapes.bin`. Graph nodes are the endpoints of ways and the nodes shared by
/// more than one way reference.
///
/// Only reads the parse outputs, so running it twice yields the same files.
pub fn construct_edges(ctx: &BuildContext) -> Result<TileSet> {
    let start = Instant::now();
    let ways: Vec<OsmWay> = TempFile::read(&ctx.files.ways).context("Failed to read ways")?;
    let way_nodes: Vec<OsmWayNode> =
        TempFile::read(&ctx.files.way_nodes).context("Failed to read way nodes")?;

    let mut ref_counts: FxHashMap<u64, u32> = FxHashMap::default();
    for wn in &way_nodes {
        *ref_counts.entry(wn.node.osm_id).or_default() += 1;
    }

    let mut graph_nodes: FxHashMap<u64, OsmNode> = FxHashMap::default();
    let mut raw_edges = Vec::new();
    let mut skipped_ways = 0usize;

    for (way_index, way) in ways.iter().enumerate() {
        let first = way.node_start as usize;
        let nodes = way_nodes
            .get(first..first + way.node_count as usize)
            .ok_or_else(|| anyhow!("Way {} references way nodes past the end", way.way_id))?;
        let points: Option<Vec<PointLL>> = nodes.iter().map(|wn| wn.node.ll()).collect();
        let Some(points) = points.filter(|p| p.len() >= 2) else {
            skipped_ways += 1;
            continue;
        };

        let mut segment_start = nodes[0].node;
        let mut shape = vec![points[0]];
        for (i, (wn, ll)) in nodes.iter().zip(&points).enumerate().skip(1) {
            shape.push(*ll);
            let shared = ref_counts.get(&wn.node.osm_id).copied().unwrap_or(0) > 1;
            if i + 1 < nodes.len() && !shared {
                continue;
            }
            graph_nodes.insert(segment_start.osm_id, segment_start);
            graph_nodes.insert(wn.node.osm_id, wn.node);
            raw_edges.push(RawEdge {
                way_index: way_index as u32,
                start: segment_start.osm_id,
                end: wn.node.osm_id,
                shape: std::mem::replace(&mut shape, vec![*ll]),
            });
            segment_start = wn.node;
        }
    }
    if skipped_ways > 0 {
        warn!("Skipped {skipped_ways} ways with missing or out of range nodes");
    }

    // Sort by tile, then OSM id, so that ids are stable across runs
    let level = hierarchy::local_level();
    let mut keyed = graph_nodes
        .into_values()
        .map(|node| {
            let tile = node
                .ll()
                .and_then(|ll| level.graph_id(&ll))
                .ok_or_else(|| anyhow!("Node {} is outside the tiled area", node.osm_id))?;
            Ok((tile, node))
        })
        .collect::<Result<Vec<(GraphId, OsmNode)>>>()?;
    keyed.sort_by_key(|(tile, node)| (*tile, node.osm_id));

    let mut tileset = TileSet::new();
    let mut nodes = Vec::with_capacity(keyed.len());
    let mut node_index: FxHashMap<u64, u32> = FxHashMap::default();
    let mut id_in_tile = 0u32;
    for (i, (tile, node)) in keyed.into_iter().enumerate() {
        if !tileset.contains_key(&tile) {
            tileset.insert(tile, i);
            id_in_tile = 0;
        }
        let graph_id = tile
            .with_id(id_in_tile)
            .with_context(|| format!("Tile {tile} has too many nodes"))?;
        id_in_tile += 1;
        node_index.insert(node.osm_id, i as u32);
        nodes.push(GraphNode { graph_id, node });
    }

    let mut edges = Vec::with_capacity(raw_edges.len());
    let mut shapes = Vec::with_capacity(raw_edges.len());
    for raw in raw_edges {
        let (Some(&start_node), Some(&end_node)) =
            (node_index.get(&raw.start), node_index.get(&raw.end))
        else {
            bail!("Edge of way index {} lost its graph nodes", raw.way_index);
        };
        edges.push(OsmEdge {
            way_index: raw.way_index,
            start_node,
            end_node,
        });
        shapes.push(raw.shape);
    }

    TempFile::write(&ctx.files.nodes, &nodes).context("Failed to write nodes")?;
    TempFile::write(&ctx.files.edges, &edges).context("Failed to write edges")?;
    TempFile::write(&ctx.files.shapes, &shapes).context("Failed to write shapes")?;

    info!(
        "Constructed {} edges between {} nodes in {} tiles in {:.2}s",
        edges.len(),
        nodes.len(),
        tileset.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(tileset)
}
