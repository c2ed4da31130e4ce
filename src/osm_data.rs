//! Working dataset carried between the parse stages and the graph builders
//!
//! Bulk records (ways, nodes, relations) live in temp files; this keeps the
//! counters, the name dictionary and the per-way access restrictions. It can
//! be snapshotted to `osmdata.bin` + `unique_names.bin` so that a later run
//! starting at ConstructEdges or Build does not re-parse the input.

use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formats::access_restriction::OsmAccessRestriction;
use crate::formats::temp_file::{remove_temp_file, TempFile};

pub const OSMDATA_FILE: &str = "osmdata.bin";
pub const UNIQUE_NAMES_FILE: &str = "unique_names.bin";

/// Interned strings; index 0 is always the empty string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct UniqueNames {
    names: Vec<String>,
    index: FxHashMap<String, u32>,
}

impl Default for UniqueNames {
    fn default() -> Self {
        Self::from(Vec::new())
    }
}

impl From<Vec<String>> for UniqueNames {
    fn from(mut names: Vec<String>) -> Self {
        if names.first().map(|n| !n.is_empty()).unwrap_or(true) {
            names.insert(0, String::new());
        }
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i as u32))
            .collect();
        Self { names, index }
    }
}

impl From<UniqueNames> for Vec<String> {
    fn from(names: UniqueNames) -> Self {
        names.names
    }
}

impl PartialEq for UniqueNames {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

impl UniqueNames {
    /// Index of `name`, adding it if new
    pub fn index(&mut self, name: &str) -> u32 {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.names.len() as u32;
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), i);
        i
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }

    /// Number of names, the empty string included
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.len() <= 1
    }
}

/// Counters, names and restrictions gathered while parsing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsmData {
    pub max_changeset_id: u64,
    pub osm_node_count: u64,
    pub osm_way_count: u64,
    pub osm_way_node_count: u64,
    pub node_count: u64,
    pub edge_count: u64,
    pub restriction_count: u64,
    pub bss_node_count: u64,
    /// Per-way access restrictions, keyed by way id
    pub access_restrictions: BTreeMap<u64, Vec<OsmAccessRestriction>>,
    #[serde(skip)]
    pub names: UniqueNames,
}

impl OsmData {
    pub fn add_access_restriction(&mut self, way_id: u64, restriction: OsmAccessRestriction) {
        self.access_restrictions
            .entry(way_id)
            .or_default()
            .push(restriction);
    }

    pub fn restrictions_for_way(&self, way_id: u64) -> &[OsmAccessRestriction] {
        self.access_restrictions
            .get(&way_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Snapshot the dataset into `tile_dir`
    pub fn write_to_temp_files(&self, tile_dir: &Path) -> Result<()> {
        TempFile::write_value(tile_dir.join(OSMDATA_FILE), self)?;
        TempFile::write_value(tile_dir.join(UNIQUE_NAMES_FILE), &self.names)?;
        info!(
            "Wrote working dataset to {} ({} ways, {} names)",
            tile_dir.display(),
            self.osm_way_count,
            self.names.len()
        );
        Ok(())
    }

    /// Reload a full snapshot
    pub fn read_from_temp_files(tile_dir: &Path) -> Result<Self> {
        let mut data: OsmData = TempFile::read_value(tile_dir.join(OSMDATA_FILE))?;
        data.names = TempFile::read_value(tile_dir.join(UNIQUE_NAMES_FILE))?;
        info!(
            "Read working dataset from {} ({} ways, {} names)",
            tile_dir.display(),
            data.osm_way_count,
            data.names.len()
        );
        Ok(data)
    }

    /// Reload only the name dictionary; counters and restrictions stay empty
    pub fn read_from_unique_names_file(tile_dir: &Path) -> Result<Self> {
        let names: UniqueNames = TempFile::read_value(tile_dir.join(UNIQUE_NAMES_FILE))?;
        info!("Read {} unique names from {}", names.len(), tile_dir.display());
        Ok(Self {
            names,
            ..Self::default()
        })
    }

    pub fn cleanup_temp_files(tile_dir: &Path) -> Result<()> {
        remove_temp_file(tile_dir.join(OSMDATA_FILE))?;
        remove_temp_file(tile_dir.join(UNIQUE_NAMES_FILE))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access;
    use crate::formats::access_restriction::AccessType;
    use tempfile::tempdir;

    #[test]
    fn test_unique_names() {
        let mut names = UniqueNames::default();
        assert_eq!(names.index(""), 0);
        let a = names.index("Rue de la Loi");
        let b = names.index("Wetstraat");
        assert_eq!(names.index("Rue de la Loi"), a);
        assert_ne!(a, b);
        assert_eq!(names.get(b), Some("Wetstraat"));
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_snapshot_roundtrip() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut data = OsmData {
            osm_way_count: 3,
            osm_node_count: 12,
            ..OsmData::default()
        };
        data.names.index("Avenue Louise");
        data.add_access_restriction(
            77,
            OsmAccessRestriction::new(AccessType::MaxWeight, access::TRUCK, 7500),
        );
        data.write_to_temp_files(dir.path())?;

        let back = OsmData::read_from_temp_files(dir.path())?;
        assert_eq!(back, data);
        assert_eq!(back.restrictions_for_way(77).len(), 1);
        assert!(back.restrictions_for_way(78).is_empty());

        let names_only = OsmData::read_from_unique_names_file(dir.path())?;
        assert_eq!(names_only.names, data.names);
        assert_eq!(names_only.osm_way_count, 0);

        OsmData::cleanup_temp_files(dir.path())?;
        OsmData::cleanup_temp_files(dir.path())?;
        assert!(!dir.path().join(OSMDATA_FILE).exists());
        Ok(())
    }
}
