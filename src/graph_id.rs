//! Hierarchical graph identifiers: level, tile and object index packed into 46 bits

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const LEVEL_BITS: u32 = 3;
const TILE_BITS: u32 = 22;
const ID_BITS: u32 = 21;

pub const MAX_HIERARCHY_LEVEL: u32 = (1 << LEVEL_BITS) - 1;
pub const MAX_TILE_ID: u32 = (1 << TILE_BITS) - 1;
/// Largest object index within a tile
pub const MAX_GRAPH_ID: u32 = (1 << ID_BITS) - 1;

const INVALID_VALUE: u64 = (1u64 << (LEVEL_BITS + TILE_BITS + ID_BITS)) - 1;

/// Identifier of a tile (id 0) or of a node/edge within a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphId(u64);

impl GraphId {
    pub const INVALID: GraphId = GraphId(INVALID_VALUE);

    pub fn new(tile_id: u32, level: u32, id: u32) -> Result<Self> {
        if level > MAX_HIERARCHY_LEVEL || tile_id > MAX_TILE_ID || id > MAX_GRAPH_ID {
            return Err(Error::InvalidGraphId(format!(
                "level {level}, tile {tile_id}, id {id} out of range"
            )));
        }
        Ok(Self(
            level as u64
                | (tile_id as u64) << LEVEL_BITS
                | (id as u64) << (LEVEL_BITS + TILE_BITS),
        ))
    }

    pub const fn from_value(value: u64) -> Self {
        Self(value & INVALID_VALUE)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    pub const fn level(&self) -> u32 {
        (self.0 & ((1 << LEVEL_BITS) - 1)) as u32
    }

    pub const fn tile_id(&self) -> u32 {
        ((self.0 >> LEVEL_BITS) & ((1 << TILE_BITS) - 1)) as u32
    }

    pub const fn id(&self) -> u32 {
        ((self.0 >> (LEVEL_BITS + TILE_BITS)) & ((1 << ID_BITS) - 1)) as u32
    }

    pub fn is_valid(&self) -> bool {
        self.0 != INVALID_VALUE
    }

    /// The id of the tile containing this object
    pub const fn tile_base(&self) -> GraphId {
        GraphId(self.0 & ((1 << (LEVEL_BITS + TILE_BITS)) - 1))
    }

    /// Same tile, different object index
    pub fn with_id(&self, id: u32) -> Result<GraphId> {
        GraphId::new(self.tile_id(), self.level(), id)
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level(), self.tile_id(), self.id())
    }
}

impl FromStr for GraphId {
    type Err = Error;

    /// Accepts either `level/tile_id/id` or the raw packed value
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        let parse = |p: &str| {
            p.trim()
                .parse::<u64>()
                .map_err(|_| Error::InvalidGraphId(s.to_string()))
        };
        match parts.as_slice() {
            [value] => Ok(GraphId::from_value(parse(value)?)),
            [level, tile, id] => {
                let (level, tile, id) = (parse(level)?, parse(tile)?, parse(id)?);
                if level > u32::MAX as u64 || tile > u32::MAX as u64 || id > u32::MAX as u64 {
                    return Err(Error::InvalidGraphId(s.to_string()));
                }
                GraphId::new(tile as u32, level as u32, id as u32)
            }
            _ => Err(Error::InvalidGraphId(s.to_string())),
        }
    }
}
