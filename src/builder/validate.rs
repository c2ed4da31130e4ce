//! Validate: resolve the opposing edge of every directed edge

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use log::{error, info};
use rayon::prelude::*;

use crate::formats::graph_tile::{GraphTile, GraphTileFile};
use crate::formats::node_info::MAX_EDGES_PER_NODE;
use crate::graph_id::GraphId;
use crate::hierarchy;
use crate::opposing::opposing_edge_index;
use crate::pipeline::BuildContext;

/// Every `.gph` file under `dir`, sorted
fn tile_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to list {}", dir.display()))?
                .path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|e| e == "gph") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Opposing index of every directed edge of `tile`, in edge order
fn opposing_indices(tile: &GraphTile, tiles: &BTreeMap<GraphId, GraphTile>) -> Result<Vec<u32>> {
    let mut out = vec![MAX_EDGES_PER_NODE; tile.directed_edges.len()];
    for (n, node) in tile.nodes.iter().enumerate() {
        let start_node = tile.id.with_id(n as u32)?;
        for i in tile.edge_range(node) {
            let edge = &tile.directed_edges[i];
            let end_tile_id = edge.end_node().tile_base();
            let end_tile = if end_tile_id == tile.id {
                Some(tile)
            } else {
                tiles.get(&end_tile_id)
            };
            out[i] = match end_tile {
                Some(end_tile) => opposing_edge_index(end_tile, start_node, tile, edge),
                None => {
                    error!("Edge from {start_node} ends in missing tile {end_tile_id}");
                    MAX_EDGES_PER_NODE
                }
            };
        }
    }
    Ok(out)
}

/// Set opposing indices on every local level tile and rewrite the tiles
pub fn validate(ctx: &BuildContext) -> Result<()> {
    let start = Instant::now();
    let level_dir = hierarchy::level_dir(&ctx.tile_dir, hierarchy::local_level().level);
    let files = tile_files(&level_dir)?;

    let mut tiles = BTreeMap::new();
    for path in &files {
        let tile = GraphTileFile::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        tiles.insert(tile.id, tile);
    }

    let updates = tiles
        .par_iter()
        .map(|(id, tile)| -> Result<(GraphId, Vec<u32>)> {
            Ok((*id, opposing_indices(tile, &tiles)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut unresolved = 0usize;
    for (id, indices) in updates {
        let Some(tile) = tiles.get_mut(&id) else {
            continue;
        };
        for (edge, opp) in tile.directed_edges.iter_mut().zip(indices) {
            if opp == MAX_EDGES_PER_NODE {
                unresolved += 1;
            }
            edge.set_opp_index(opp);
        }
        let path = hierarchy::tile_path(&ctx.tile_dir, id);
        GraphTileFile::write(&path, tile)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    info!(
        "Validated {} tiles ({} edges without an opposing edge) in {:.2}s",
        tiles.len(),
        unresolved,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
