//! Tile hierarchy: road levels, transit level, tile grid math and tile paths

use std::path::{Path, PathBuf};

use crate::graph_id::GraphId;
use crate::point::PointLL;

/// One level of the tile hierarchy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileLevel {
    pub level: u32,
    pub name: &'static str,
    /// Tile edge length in degrees
    pub tile_size: f64,
}

const LEVELS: [TileLevel; 3] = [
    TileLevel {
        level: 0,
        name: "highway",
        tile_size: 4.0,
    },
    TileLevel {
        level: 1,
        name: "arterial",
        tile_size: 1.0,
    },
    TileLevel {
        level: 2,
        name: "local",
        tile_size: 0.25,
    },
];

const TRANSIT_LEVEL: TileLevel = TileLevel {
    level: 3,
    name: "transit",
    tile_size: 0.25,
};

/// Road levels, most important first
pub fn levels() -> &'static [TileLevel] {
    &LEVELS
}

pub fn transit_level() -> TileLevel {
    TRANSIT_LEVEL
}

/// The most detailed road level, where the initial graph is built
pub fn local_level() -> TileLevel {
    LEVELS[LEVELS.len() - 1]
}

pub fn level(level: u32) -> Option<TileLevel> {
    LEVELS
        .iter()
        .copied()
        .chain(std::iter::once(TRANSIT_LEVEL))
        .find(|l| l.level == level)
}

impl TileLevel {
    pub fn n_columns(&self) -> u32 {
        (360.0 / self.tile_size).round() as u32
    }

    pub fn n_rows(&self) -> u32 {
        (180.0 / self.tile_size).round() as u32
    }

    pub fn tile_count(&self) -> u32 {
        self.n_columns() * self.n_rows()
    }

    /// Id of the tile containing `ll`, or `None` off the globe
    pub fn tile_id(&self, ll: &PointLL) -> Option<u32> {
        if !ll.in_range() {
            return None;
        }
        let col = (((ll.lon + 180.0) / self.tile_size).floor() as u32).min(self.n_columns() - 1);
        let row = (((ll.lat + 90.0) / self.tile_size).floor() as u32).min(self.n_rows() - 1);
        Some(row * self.n_columns() + col)
    }

    pub fn graph_id(&self, ll: &PointLL) -> Option<GraphId> {
        self.tile_id(ll)
            .and_then(|tile_id| GraphId::new(tile_id, self.level, 0).ok())
    }

    /// South-west corner of a tile
    pub fn base_ll(&self, tile_id: u32) -> PointLL {
        let row = tile_id / self.n_columns();
        let col = tile_id % self.n_columns();
        PointLL::new(
            -180.0 + col as f64 * self.tile_size,
            -90.0 + row as f64 * self.tile_size,
        )
    }
}

/// South-west corner of the tile owning `id`, `None` for an unknown level
pub fn base_ll(id: GraphId) -> Option<PointLL> {
    level(id.level()).map(|l| l.base_ll(id.tile_id()))
}

/// Relative tile path: `<level>/<ddd>/<ddd>.gph`, tile id zero padded to a
/// multiple of three digits of the level's largest tile id.
pub fn tile_suffix(id: GraphId) -> PathBuf {
    let max_id = level(id.level())
        .map(|l| l.tile_count().saturating_sub(1))
        .unwrap_or(crate::graph_id::MAX_TILE_ID);
    let mut digits = max_id.to_string().len();
    digits += (3 - digits % 3) % 3;
    let padded = format!("{:0width$}", id.tile_id(), width = digits);

    let mut path = PathBuf::from(id.level().to_string());
    let groups: Vec<&str> = padded
        .as_bytes()
        .chunks(3)
        .filter_map(|c| std::str::from_utf8(c).ok())
        .collect();
    for (i, group) in groups.iter().enumerate() {
        if i + 1 == groups.len() {
            path.push(format!("{group}.gph"));
        } else {
            path.push(group);
        }
    }
    path
}

pub fn tile_path(tile_dir: &Path, id: GraphId) -> PathBuf {
    tile_dir.join(tile_suffix(id))
}

/// Directory holding all tiles of a level
pub fn level_dir(tile_dir: &Path, level: u32) -> PathBuf {
    tile_dir.join(level.to_string())
}
