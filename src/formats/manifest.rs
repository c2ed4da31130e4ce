//! Tile manifest - the edge partition handed from ConstructEdges to Build
//!
//! JSON document:
//!
//! ```json
//! {"tiles": [{"graphid": {"level": 2, "tile_id": 756425, "id": 0, "value": 6051402},
//!             "node_index": 0}]}
//! ```
//!
//! `node_index` is the position of the tile's first node in the node file
//! written by ConstructEdges. Only `graphid.value` and `node_index` are
//! required when reading.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph_id::GraphId;

/// Tile id → index of the tile's first node
pub type TileSet = BTreeMap<GraphId, usize>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TileManifest {
    pub tileset: TileSet,
}

#[derive(Serialize)]
struct GraphIdOut {
    level: u32,
    tile_id: u32,
    id: u32,
    value: u64,
}

#[derive(Serialize)]
struct EntryOut {
    graphid: GraphIdOut,
    node_index: u64,
}

#[derive(Serialize)]
struct ManifestOut {
    tiles: Vec<EntryOut>,
}

#[derive(Deserialize)]
struct GraphIdIn {
    value: u64,
}

#[derive(Deserialize)]
struct EntryIn {
    graphid: GraphIdIn,
    node_index: u64,
}

#[derive(Deserialize)]
struct ManifestIn {
    tiles: Vec<EntryIn>,
}

impl TileManifest {
    pub fn new(tileset: TileSet) -> Self {
        Self { tileset }
    }

    pub fn len(&self) -> usize {
        self.tileset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tileset.is_empty()
    }

    /// Pretty-printed so that manifests diff well
    pub fn to_json_string(&self) -> Result<String> {
        let doc = ManifestOut {
            tiles: self
                .tileset
                .iter()
                .map(|(id, node_index)| EntryOut {
                    graphid: GraphIdOut {
                        level: id.level(),
                        tile_id: id.tile_id(),
                        id: id.id(),
                        value: id.value(),
                    },
                    node_index: *node_index as u64,
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: ManifestIn = serde_json::from_str(json)?;
        let mut tileset = TileSet::new();
        for entry in doc.tiles {
            let tile = GraphId::from_value(entry.graphid.value);
            let node_index = entry.node_index as usize;
            match tileset.get(&tile) {
                Some(&first) => warn!(
                    "Tile {tile} listed twice in the tile manifest (node index {first} and \
                     {node_index}), keeping {first}"
                ),
                None => {
                    tileset.insert(tile, node_index);
                }
            }
        }
        Ok(Self { tileset })
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json_string()?)?;
        info!("Writing tile manifest to {}", path.display());
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading tile manifest from {}", path.display());
        let manifest = Self::from_json_str(&fs::read_to_string(path)?)?;
        info!(
            "Reading {} tiles from tile manifest file {}",
            manifest.len(),
            path.display()
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sample() -> TileManifest {
        let mut tileset = TileSet::new();
        tileset.insert(GraphId::new(756_425, 2, 0).unwrap(), 0);
        tileset.insert(GraphId::new(756_426, 2, 0).unwrap(), 17);
        tileset.insert(GraphId::new(47_200, 1, 0).unwrap(), 4);
        TileManifest::new(tileset)
    }

    #[test]
    fn test_file_roundtrip() -> anyhow::Result<()> {
        let manifest = sample();
        let tmp = NamedTempFile::new()?;
        manifest.write(tmp.path())?;
        assert_eq!(TileManifest::read(tmp.path())?, manifest);
        Ok(())
    }

    #[test]
    fn test_json_shape() -> anyhow::Result<()> {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json_string()?)?;
        let tiles = json["tiles"].as_array().unwrap();
        assert_eq!(tiles.len(), 3);
        // BTreeMap order: by packed value, level in the low bits
        let first = &tiles[0];
        assert_eq!(first["graphid"]["level"], 1);
        assert_eq!(first["node_index"], 4);
        assert_eq!(
            first["graphid"]["value"],
            GraphId::new(47_200, 1, 0).unwrap().value()
        );
        Ok(())
    }

    #[test]
    fn test_reads_value_only_graphids() -> anyhow::Result<()> {
        let id = GraphId::new(12, 0, 0).unwrap();
        let json = format!(
            r#"{{"tiles":[{{"graphid":{{"value":{}}},"node_index":9}}]}}"#,
            id.value()
        );
        let manifest = TileManifest::from_json_str(&json)?;
        assert_eq!(manifest.tileset.get(&id), Some(&9));
        Ok(())
    }

    #[test]
    fn test_empty_manifest() -> anyhow::Result<()> {
        let manifest = TileManifest::default();
        let parsed = TileManifest::from_json_str(&manifest.to_json_string()?)?;
        assert!(parsed.is_empty());
        Ok(())
    }

    #[test]
    fn test_duplicate_tile_is_reported() -> anyhow::Result<()> {
        let id = GraphId::new(12, 0, 0).unwrap();
        let json = format!(
            r#"{{"tiles":[{{"graphid":{{"value":{v}}},"node_index":0}},
                          {{"graphid":{{"value":{v}}},"node_index":5}}]}}"#,
            v = id.value()
        );
        let mut parsed = None;
        let logged = crate::test_log::capture(|| {
            parsed = Some(TileManifest::from_json_str(&json));
        });
        let manifest = parsed.unwrap()?;
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.tileset.get(&id), Some(&0));
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].0, log::Level::Warn);
        assert!(logged[0].1.contains("listed twice"));
        Ok(())
    }
}
