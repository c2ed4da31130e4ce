//! Access restriction records
//!
//! Tile record (16 bytes):
//!
//!   word 0: edge_index 22 | type 6 | modes 12 | except_destination 1 | spare 23
//!   word 1: value (meaning depends on type)
//!
//! Restrictions in a tile are kept sorted by edge index so that the
//! restrictions of one edge can be found by binary search.
//!
//! [`OsmAccessRestriction`] is the parse-time form keyed by way id, before
//! edges exist. It keeps `direction` and `except_destination` outside its
//! packed attribute word.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::bits::Field;

pub const ACCESS_RESTRICTION_SIZE: usize = 16;

/// Largest edge index an access restriction can reference
pub const MAX_TILE_EDGE_COUNT: u32 = (1 << 22) - 1;

const EDGE_INDEX: Field = Field::new(0, 0, 22);
const TYPE: Field = Field::new(0, 22, 6);
const MODES: Field = Field::new(0, 28, 12);
const EXCEPT_DESTINATION: Field = Field::new(0, 40, 1);

/// Kind of restriction; decides the unit of the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccessType {
    Hazmat = 0,
    /// Value in centimeters
    MaxHeight = 1,
    /// Value in centimeters
    MaxWidth = 2,
    /// Value in centimeters
    MaxLength = 3,
    /// Value in kilograms
    MaxWeight = 4,
    /// Value in kilograms
    MaxAxleLoad = 5,
    /// Value is an encoded time domain
    TimedAllowed = 6,
    /// Value is an encoded time domain
    TimedDenied = 7,
    DestinationAllowed = 8,
    MaxAxles = 9,
}

impl AccessType {
    pub fn from_u8(v: u8) -> Option<Self> {
        use AccessType::*;
        Some(match v {
            0 => Hazmat,
            1 => MaxHeight,
            2 => MaxWidth,
            3 => MaxLength,
            4 => MaxWeight,
            5 => MaxAxleLoad,
            6 => TimedAllowed,
            7 => TimedDenied,
            8 => DestinationAllowed,
            9 => MaxAxles,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        use AccessType::*;
        match self {
            Hazmat => "hazmat",
            MaxHeight => "max_height",
            MaxWidth => "max_width",
            MaxLength => "max_length",
            MaxWeight => "max_weight",
            MaxAxleLoad => "max_axle_load",
            TimedAllowed => "timed_allowed",
            TimedDenied => "timed_denied",
            DestinationAllowed => "destination_allowed",
            MaxAxles => "max_axles",
        }
    }
}

/// Which direction of a way a parsed restriction applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccessRestrictionDirection {
    #[default]
    Both,
    Forward,
    Backward,
}

/// Access restriction as stored in a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRestriction {
    words: [u64; 2],
}

impl AccessRestriction {
    pub fn new(
        edge_index: u32,
        access_type: AccessType,
        modes: u16,
        value: u64,
        except_destination: bool,
    ) -> Self {
        let mut restriction = Self { words: [0, value] };
        restriction.set_edge_index(edge_index);
        TYPE.set(&mut restriction.words, access_type as u64);
        MODES.set(&mut restriction.words, modes as u64);
        restriction.set_except_destination(except_destination);
        restriction
    }

    /// Directed edge index within the tile
    pub fn edge_index(&self) -> u32 {
        EDGE_INDEX.get(&self.words) as u32
    }

    pub fn set_edge_index(&mut self, edge_index: u32) {
        EDGE_INDEX.set(&mut self.words, edge_index as u64);
    }

    /// `None` for a type code this build does not know
    pub fn access_type(&self) -> Option<AccessType> {
        AccessType::from_u8(TYPE.get(&self.words) as u8)
    }

    /// Bit mask of affected modes
    pub fn modes(&self) -> u16 {
        MODES.get(&self.words) as u16
    }

    /// Whether local traffic is exempt
    pub fn except_destination(&self) -> bool {
        EXCEPT_DESTINATION.get_bool(&self.words)
    }

    pub fn set_except_destination(&mut self, except_destination: bool) {
        EXCEPT_DESTINATION.set_bool(&mut self.words, except_destination);
    }

    pub fn value(&self) -> u64 {
        self.words[1]
    }

    pub fn set_value(&mut self, value: u64) {
        self.words[1] = value;
    }

    pub fn to_bytes(&self) -> [u8; ACCESS_RESTRICTION_SIZE] {
        let mut out = [0u8; ACCESS_RESTRICTION_SIZE];
        out[..8].copy_from_slice(&self.words[0].to_le_bytes());
        out[8..].copy_from_slice(&self.words[1].to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; ACCESS_RESTRICTION_SIZE]) -> Self {
        let mut w0 = [0u8; 8];
        let mut w1 = [0u8; 8];
        w0.copy_from_slice(&bytes[..8]);
        w1.copy_from_slice(&bytes[8..]);
        Self {
            words: [u64::from_le_bytes(w0), u64::from_le_bytes(w1)],
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "edge_index": self.edge_index(),
            "type": self.access_type().map(|t| t.as_str()).unwrap_or("unknown"),
            "value": self.value(),
            "except_destination": self.except_destination(),
            "modes": crate::access::to_json(self.modes()),
        })
    }
}

/// Sort by edge index; equal edges keep their relative order
pub fn sort_by_edge(restrictions: &mut [AccessRestriction]) {
    restrictions.sort_by_key(|r| r.edge_index());
}

/// All restrictions of one edge in a slice sorted with [`sort_by_edge`]
pub fn restrictions_for_edge(
    restrictions: &[AccessRestriction],
    edge_index: u32,
) -> &[AccessRestriction] {
    let start = restrictions.partition_point(|r| r.edge_index() < edge_index);
    let end = restrictions.partition_point(|r| r.edge_index() <= edge_index);
    &restrictions[start..end]
}

const OSM_TYPE: Field = Field::new(0, 0, 6);
const OSM_MODES: Field = Field::new(0, 6, 12);

/// Access restriction parsed from way tags, keyed by way id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsmAccessRestriction {
    attributes: u64,
    value: u64,
    direction: AccessRestrictionDirection,
    except_destination: bool,
}

impl OsmAccessRestriction {
    pub fn new(access_type: AccessType, modes: u16, value: u64) -> Self {
        let mut r = Self {
            attributes: 0,
            value,
            direction: AccessRestrictionDirection::Both,
            except_destination: false,
        };
        r.set_type(access_type);
        r.set_modes(modes);
        r
    }

    pub fn set_type(&mut self, access_type: AccessType) {
        let mut words = [self.attributes];
        OSM_TYPE.set(&mut words, access_type as u64);
        self.attributes = words[0];
    }

    pub fn access_type(&self) -> Option<AccessType> {
        AccessType::from_u8(OSM_TYPE.get(&[self.attributes]) as u8)
    }

    pub fn set_modes(&mut self, modes: u16) {
        let mut words = [self.attributes];
        OSM_MODES.set(&mut words, modes as u64);
        self.attributes = words[0];
    }

    pub fn modes(&self) -> u16 {
        OSM_MODES.get(&[self.attributes]) as u16
    }

    pub fn set_value(&mut self, value: u64) {
        self.value = value;
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn set_direction(&mut self, direction: AccessRestrictionDirection) {
        self.direction = direction;
    }

    pub fn direction(&self) -> AccessRestrictionDirection {
        self.direction
    }

    pub fn set_except_destination(&mut self, except_destination: bool) {
        self.except_destination = except_destination;
    }

    pub fn except_destination(&self) -> bool {
        self.except_destination
    }

    /// Whether the restriction applies when traversing the way forward
    /// (`forward == true`) or against its digitized direction.
    pub fn applies(&self, forward: bool) -> bool {
        match self.direction {
            AccessRestrictionDirection::Both => true,
            AccessRestrictionDirection::Forward => forward,
            AccessRestrictionDirection::Backward => !forward,
        }
    }

    /// Tile record for a directed edge built from this way
    pub fn to_tile_record(&self, edge_index: u32) -> Option<AccessRestriction> {
        let access_type = self.access_type()?;
        Some(AccessRestriction::new(
            edge_index,
            access_type,
            self.modes(),
            self.value,
            self.except_destination,
        ))
    }
}
