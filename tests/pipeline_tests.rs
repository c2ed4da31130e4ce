//! End-to-end pipeline tests on a small in-memory network
//!
//! The network straddles the boundary between two local level tiles
//! (lon 4.25) so that one edge leaves its tile:
//!
//! ```text
//!          7
//!           \ footway
//!            5
//!            |  oneway 2 -> 5 (via 6)
//!   1 ------ 2 ---- 3 -|- 4        way 100, maxheight 3.5
//!                      |
//!            tile A    |  tile B
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use butterfly_tiles::access;
use butterfly_tiles::builder::records::{ComplexRestriction, OsmNode, OsmWayNode};
use butterfly_tiles::builder::source::{Member, MemberKind};
use butterfly_tiles::builder::{MemorySource, TileBuilder};
use butterfly_tiles::formats::node_info::MAX_EDGES_PER_NODE;
use butterfly_tiles::formats::{
    AccessType, GraphTile, GraphTileFile, IntersectionType, NodeType, TempFile, TileManifest,
};
use butterfly_tiles::pipeline::{BuildContext, TileSetSource};
use butterfly_tiles::{
    build_tile_set, hierarchy, BuildConfig, BuildReport, BuildStage, GraphId, PointLL,
};
use tempfile::tempdir;

fn network() -> MemorySource {
    let member = |kind, ref_id, role: &str| Member {
        kind,
        ref_id,
        role: role.to_string(),
    };
    MemorySource::default()
        .node(1, 4.240, 50.850, &[])
        .node(2, 4.245, 50.850, &[])
        .node(3, 4.249, 50.851, &[])
        .node(4, 4.252, 50.851, &[])
        .node(5, 4.245, 50.855, &[("barrier", "gate"), ("access", "private")])
        .node(6, 4.246, 50.852, &[("highway", "traffic_signals")])
        .node(7, 4.244, 50.856, &[])
        .node(8, 4.243, 50.851, &[("amenity", "bicycle_rental")])
        .way(
            100,
            &[1, 2, 3, 4],
            &[
                ("highway", "residential"),
                ("name", "Rue de la Loi"),
                ("maxheight", "3.5"),
            ],
        )
        .way(
            101,
            &[2, 6, 5],
            &[("highway", "residential"), ("oneway", "yes"), ("name", "Avenue")],
        )
        .way(102, &[5, 7], &[("highway", "footway")])
        .way(103, &[7, 8], &[("building", "yes")])
        .relation(
            200,
            vec![
                member(MemberKind::Way, 100, "from"),
                member(MemberKind::Node, 2, "via"),
                member(MemberKind::Way, 101, "to"),
            ],
            &[("type", "restriction"), ("restriction", "no_left_turn")],
        )
}

fn run(dir: &Path, start: BuildStage, end: BuildStage) -> Result<BuildReport> {
    let mut builder = TileBuilder::new(network());
    build_tile_set(BuildConfig::for_tile_dir(dir), &[], start, end, &mut builder)
}

/// Every tile file under `dir`, keyed by its relative path
fn tile_bytes(dir: &Path) -> Result<BTreeMap<PathBuf, Vec<u8>>> {
    let mut out = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|e| e == "gph") {
                let relative = path.strip_prefix(dir)?.to_path_buf();
                out.insert(relative, fs::read(&path)?);
            }
        }
    }
    Ok(out)
}

fn tile_at(dir: &Path, lon: f64, lat: f64) -> Result<GraphTile> {
    let id = hierarchy::local_level()
        .graph_id(&PointLL::new(lon, lat))
        .expect("position is on the globe");
    Ok(GraphTileFile::read(hierarchy::tile_path(dir, id))?)
}

fn node_at(tile: &GraphTile, lon: f64, lat: f64) -> usize {
    tile.nodes
        .iter()
        .position(|n| {
            let ll = n.latlng(&tile.base_ll);
            (ll.lon - lon).abs() < 1e-5 && (ll.lat - lat).abs() < 1e-5
        })
        .expect("node in tile")
}

#[test]
fn test_split_at_build_matches_full_run() -> Result<()> {
    let full = tempdir()?;
    let report = run(full.path(), BuildStage::FIRST, BuildStage::LAST)?;
    assert_eq!(report.stages.len(), 16);
    assert_eq!(report.tileset_source, Some(TileSetSource::Memory));
    assert_eq!(report.tile_count, 2);

    let split = tempdir()?;
    run(split.path(), BuildStage::Initialize, BuildStage::ConstructEdges)?;
    let resumed = run(split.path(), BuildStage::Build, BuildStage::Cleanup)?;
    assert_eq!(resumed.tileset_source, Some(TileSetSource::Manifest));

    let expected = tile_bytes(full.path())?;
    assert_eq!(expected.len(), 2);
    assert_eq!(tile_bytes(split.path())?, expected);
    Ok(())
}

#[test]
fn test_resume_after_every_stage() -> Result<()> {
    let full = tempdir()?;
    run(full.path(), BuildStage::FIRST, BuildStage::LAST)?;
    let expected = tile_bytes(full.path())?;

    for &stage in BuildStage::all() {
        let Some(next) = stage.next() else {
            continue;
        };
        let dir = tempdir()?;
        run(dir.path(), BuildStage::FIRST, stage)?;
        run(dir.path(), next, BuildStage::LAST)?;
        assert_eq!(tile_bytes(dir.path())?, expected, "split after {stage}");
    }
    Ok(())
}

#[test]
fn test_missing_manifest_falls_back_to_recompute() -> Result<()> {
    let full = tempdir()?;
    run(full.path(), BuildStage::FIRST, BuildStage::LAST)?;

    let dir = tempdir()?;
    run(dir.path(), BuildStage::Initialize, BuildStage::ConstructEdges)?;
    fs::remove_file(dir.path().join("tile_manifest.json"))?;
    let report = run(dir.path(), BuildStage::Build, BuildStage::Cleanup)?;
    assert_eq!(report.tileset_source, Some(TileSetSource::Recomputed));
    assert_eq!(tile_bytes(dir.path())?, tile_bytes(full.path())?);
    Ok(())
}

#[test]
fn test_manifest_partitions_nodes() -> Result<()> {
    let dir = tempdir()?;
    run(dir.path(), BuildStage::Initialize, BuildStage::ConstructEdges)?;
    let manifest = TileManifest::read(dir.path().join("tile_manifest.json"))?;

    let tile_a = hierarchy::local_level()
        .graph_id(&PointLL::new(4.24, 50.85))
        .unwrap();
    let tile_b = hierarchy::local_level()
        .graph_id(&PointLL::new(4.252, 50.851))
        .unwrap();
    // Tile A holds nodes 1, 2, 5 and 7; node 3 is not shared and node 8 is
    // only on a non-routable way
    let entries: Vec<(GraphId, usize)> = manifest.tileset.into_iter().collect();
    assert_eq!(entries, vec![(tile_a, 0), (tile_b, 4)]);
    Ok(())
}

#[test]
fn test_parse_outputs() -> Result<()> {
    let dir = tempdir()?;
    run(dir.path(), BuildStage::Initialize, BuildStage::ParseNodes)?;
    let ctx = BuildContext::new(BuildConfig::for_tile_dir(dir.path()), vec![]);

    let way_nodes: Vec<OsmWayNode> = TempFile::read(&ctx.files.way_nodes)?;
    assert_eq!(way_nodes.len(), 4 + 3 + 2);
    assert!(way_nodes.iter().all(|wn| wn.node.fixed.is_some()));
    let gate = way_nodes
        .iter()
        .find(|wn| wn.node.osm_id == 5)
        .map(|wn| wn.node)
        .unwrap();
    assert_eq!(gate.node_type(), NodeType::Gate);
    assert!(gate.private_access);

    let bss: Vec<OsmNode> = TempFile::read(&ctx.files.bss_nodes)?;
    assert_eq!(bss.iter().map(|n| n.osm_id).collect::<Vec<_>>(), vec![8]);

    let from: Vec<ComplexRestriction> = TempFile::read(&ctx.files.cr_from)?;
    assert_eq!(from.len(), 1);
    assert_eq!((from[0].from_way, from[0].to_way), (100, 101));

    // Snapshot written because the run ended before Enhance
    assert!(ctx.files.osm_data.exists());
    assert!(ctx.files.unique_names.exists());
    Ok(())
}

#[test]
fn test_cleanup_leaves_only_tiles() -> Result<()> {
    let dir = tempdir()?;
    run(dir.path(), BuildStage::FIRST, BuildStage::LAST)?;
    let left: Vec<String> = fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(left.is_empty(), "left behind: {left:?}");
    assert_eq!(tile_bytes(dir.path())?.len(), 2);
    Ok(())
}

#[test]
fn test_opposing_edges_resolved() -> Result<()> {
    let dir = tempdir()?;
    run(dir.path(), BuildStage::FIRST, BuildStage::LAST)?;

    let mut tiles = BTreeMap::new();
    for path in tile_bytes(dir.path())?.keys() {
        let tile = GraphTileFile::read(dir.path().join(path))?;
        tiles.insert(tile.id, tile);
    }

    for tile in tiles.values() {
        for (n, node) in tile.nodes.iter().enumerate() {
            let start_node = tile.id.with_id(n as u32)?;
            for edge in tile.edges_of(node) {
                let opp = edge.opp_index();
                assert_ne!(opp, MAX_EDGES_PER_NODE, "edge from {start_node}");
                let end_tile = &tiles[&edge.end_node().tile_base()];
                let end_node = end_tile.node(edge.end_node()).unwrap();
                let back = end_tile.edges_of(end_node)[opp as usize];
                assert_eq!(back.end_node(), start_node);
                assert_eq!(back.length(), edge.length());
                assert_ne!(back.forward(), edge.forward());
            }
        }
    }
    Ok(())
}

#[test]
fn test_tile_contents() -> Result<()> {
    let dir = tempdir()?;
    run(dir.path(), BuildStage::FIRST, BuildStage::LAST)?;
    let tile = tile_at(dir.path(), 4.24, 50.85)?;
    assert_eq!(tile.nodes.len(), 4);

    let dead_end = &tile.nodes[node_at(&tile, 4.240, 50.850)];
    assert_eq!(dead_end.edge_count(), 1);
    assert_eq!(dead_end.intersection(), IntersectionType::DeadEnd);

    let junction = &tile.nodes[node_at(&tile, 4.245, 50.850)];
    assert_eq!(junction.edge_count(), 3);
    assert_eq!(junction.local_edge_count(), 3);
    let leaving: Vec<bool> = tile
        .edges_of(junction)
        .iter()
        .map(|e| e.leaves_tile())
        .collect();
    assert_eq!(leaving, vec![false, true, false]);

    // Against the oneway: no cars, pedestrians still allowed
    let gate = &tile.nodes[node_at(&tile, 4.245, 50.855)];
    assert_eq!(gate.node_type(), NodeType::Gate);
    let against_oneway = tile.edges_of(gate)[0];
    assert!(!against_oneway.forward());
    assert_eq!(against_oneway.forward_access() & access::AUTO, 0);
    assert_ne!(against_oneway.forward_access() & access::PEDESTRIAN, 0);

    // maxheight on both directions of 1-2 and on 2 -> 4
    let heights: Vec<u64> = tile
        .access_restrictions
        .iter()
        .filter(|r| r.access_type() == Some(AccessType::MaxHeight))
        .map(|r| r.value())
        .collect();
    assert_eq!(heights, vec![350, 350, 350]);

    let other = tile_at(dir.path(), 4.252, 50.851)?;
    assert_eq!(other.nodes.len(), 1);
    assert_eq!(other.access_restrictions.len(), 1);
    Ok(())
}
