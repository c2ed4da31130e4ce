//! Build context: configuration, inputs and every temp file path, resolved once

use std::path::{Path, PathBuf};

use crate::config::BuildConfig;
use crate::osm_data::{OSMDATA_FILE, UNIQUE_NAMES_FILE};

pub const WAYS_FILE: &str = "ways.bin";
pub const WAY_NODES_FILE: &str = "way_nodes.bin";
pub const NODES_FILE: &str = "nodes.bin";
pub const EDGES_FILE: &str = "edges.bin";
pub const ACCESS_FILE: &str = "access.bin";
pub const PRONUNCIATION_FILE: &str = "pronunciation.bin";
pub const BSS_NODES_FILE: &str = "bss_nodes.bin";
pub const LINGUISTIC_NODE_FILE: &str = "linguistics_node.bin";
pub const CR_FROM_FILE: &str = "complex_from_restrictions.bin";
pub const CR_TO_FILE: &str = "complex_to_restrictions.bin";
pub const NEW_TO_OLD_FILE: &str = "new_nodes_to_old_nodes.bin";
pub const OLD_TO_NEW_FILE: &str = "old_nodes_to_new_nodes.bin";
pub const INTERSECTIONS_FILE: &str = "intersections.bin";
pub const SHAPES_FILE: &str = "shapes.bin";
pub const TILE_MANIFEST_FILE: &str = "tile_manifest.json";

/// Paths of the intermediate files, all directly under the tile directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempFiles {
    pub ways: PathBuf,
    pub way_nodes: PathBuf,
    pub nodes: PathBuf,
    pub edges: PathBuf,
    pub access: PathBuf,
    pub pronunciation: PathBuf,
    pub bss_nodes: PathBuf,
    pub linguistic_node: PathBuf,
    pub cr_from: PathBuf,
    pub cr_to: PathBuf,
    pub new_to_old: PathBuf,
    pub old_to_new: PathBuf,
    pub intersections: PathBuf,
    pub shapes: PathBuf,
    pub tile_manifest: PathBuf,
    pub osm_data: PathBuf,
    pub unique_names: PathBuf,
}

impl TempFiles {
    pub fn new(tile_dir: &Path) -> Self {
        Self {
            ways: tile_dir.join(WAYS_FILE),
            way_nodes: tile_dir.join(WAY_NODES_FILE),
            nodes: tile_dir.join(NODES_FILE),
            edges: tile_dir.join(EDGES_FILE),
            access: tile_dir.join(ACCESS_FILE),
            pronunciation: tile_dir.join(PRONUNCIATION_FILE),
            bss_nodes: tile_dir.join(BSS_NODES_FILE),
            linguistic_node: tile_dir.join(LINGUISTIC_NODE_FILE),
            cr_from: tile_dir.join(CR_FROM_FILE),
            cr_to: tile_dir.join(CR_TO_FILE),
            new_to_old: tile_dir.join(NEW_TO_OLD_FILE),
            old_to_new: tile_dir.join(OLD_TO_NEW_FILE),
            intersections: tile_dir.join(INTERSECTIONS_FILE),
            shapes: tile_dir.join(SHAPES_FILE),
            tile_manifest: tile_dir.join(TILE_MANIFEST_FILE),
            osm_data: tile_dir.join(OSMDATA_FILE),
            unique_names: tile_dir.join(UNIQUE_NAMES_FILE),
        }
    }

    /// Every intermediate `*.bin` file (not the manifest or snapshots)
    pub fn bins(&self) -> [&Path; 14] {
        [
            &self.ways,
            &self.way_nodes,
            &self.nodes,
            &self.edges,
            &self.access,
            &self.pronunciation,
            &self.bss_nodes,
            &self.linguistic_node,
            &self.cr_from,
            &self.cr_to,
            &self.new_to_old,
            &self.old_to_new,
            &self.intersections,
            &self.shapes,
        ]
    }
}

/// Everything a stage may read, threaded through every stage call
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub config: BuildConfig,
    pub tile_dir: PathBuf,
    pub inputs: Vec<PathBuf>,
    pub files: TempFiles,
}

impl BuildContext {
    pub fn new(config: BuildConfig, inputs: Vec<PathBuf>) -> Self {
        let tile_dir = config.tile_dir.clone();
        let files = TempFiles::new(&tile_dir);
        Self {
            config,
            tile_dir,
            inputs,
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_under_tile_dir() {
        let ctx = BuildContext::new(BuildConfig::for_tile_dir("/data/tiles"), vec![]);
        assert_eq!(ctx.files.ways, PathBuf::from("/data/tiles/ways.bin"));
        assert_eq!(
            ctx.files.tile_manifest,
            PathBuf::from("/data/tiles/tile_manifest.json")
        );
        assert!(ctx
            .files
            .bins()
            .iter()
            .all(|p| p.starts_with("/data/tiles") && p.extension().is_some_and(|e| e == "bin")));
    }
}
