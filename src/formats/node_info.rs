//! Node (intersection) record - 32 bytes, four little-endian u64 words
//!
//! Layout:
//!
//!   word 0: lat_offset 22 | lat_offset7 4 | lon_offset 22 | lon_offset7 4 | access 12
//!   word 1: edge_index 21 | edge_count 7 | admin_index 12 | timezone 9 |
//!           intersection 4 | type 4 | density 4 | traffic_signal 1 |
//!           mode_change 1 | named 1
//!   word 2: transition_index 21 | transition_count 3 | local_driveability 16 |
//!           local_edge_count 3 | drive_on_right 1 | tagged_access 1 |
//!           private_access 1 | cash_only_toll 1 | elevation 15 |
//!           timezone_ext_1 1 | timezone_ext_2 1
//!   word 3: 8 x 8-bit headings, or a transit connection (way id, or packed
//!           point with the top bit set) for transit nodes
//!
//! Positions are stored relative to the tile's south-west corner at 1e-7
//! degree resolution, split into a 1e-6 part and a single 1e-7 digit.

use log::{error, warn, Level};
use serde_json::{json, Value};

use crate::access;
use crate::admin::{AdminInfo, TimezoneDb};
use crate::bits::{self, Field, Overflow};
use crate::error::{Error, Result};
use crate::graph_id::MAX_GRAPH_ID;
use crate::point::PointLL;

pub const NODE_RECORD_SIZE: usize = 32;

pub const MAX_EDGES_PER_NODE: u32 = 127;
pub const MAX_ADMINS_PER_TILE: u32 = 4095;
pub const MAX_DENSITY: u32 = 15;
pub const MAX_LOCAL_EDGE_INDEX: u32 = 7;
pub const MAX_TRANSITIONS: u32 = 7;
/// Highest timezone index addressable with the legacy field plus one extension bit
pub const MAX_TIMEZONE_INDEX: u32 = (1 << 10) - 1;

pub const NODE_MIN_ELEVATION: f32 = -500.0;
pub const NODE_ELEVATION_PRECISION: f32 = 0.25;
pub const NODE_MAX_STORED_ELEVATION: u32 = (1 << 15) - 1;

pub const HEADING_SHRINK_FACTOR: f64 = 255.0 / 359.0;
pub const HEADING_EXPAND_FACTOR: f64 = 359.0 / 255.0;

const COORD_PRECISION: f64 = 1e-7;
const TRANSIT_POINT_FLAG: u64 = 1 << 63;

const LAT_OFFSET: Field = Field::new(0, 0, 22);
const LAT_OFFSET7: Field = Field::new(0, 22, 4);
const LON_OFFSET: Field = Field::new(0, 26, 22);
const LON_OFFSET7: Field = Field::new(0, 48, 4);
const ACCESS: Field = Field::new(0, 52, 12);

const EDGE_INDEX: Field = Field::new(1, 0, 21);
const EDGE_COUNT: Field = Field::new(1, 21, 7);
const ADMIN_INDEX: Field = Field::new(1, 28, 12);
const TIMEZONE: Field = Field::new(1, 40, 9);
const INTERSECTION: Field = Field::new(1, 49, 4);
const TYPE: Field = Field::new(1, 53, 4);
const DENSITY: Field = Field::new(1, 57, 4);
const TRAFFIC_SIGNAL: Field = Field::new(1, 61, 1);
const MODE_CHANGE: Field = Field::new(1, 62, 1);
const NAMED: Field = Field::new(1, 63, 1);

const TRANSITION_INDEX: Field = Field::new(2, 0, 21);
const TRANSITION_COUNT: Field = Field::new(2, 21, 3);
const LOCAL_DRIVEABILITY: Field = Field::new(2, 24, 16);
const LOCAL_EDGE_COUNT: Field = Field::new(2, 40, 3);
const DRIVE_ON_RIGHT: Field = Field::new(2, 43, 1);
const TAGGED_ACCESS: Field = Field::new(2, 44, 1);
const PRIVATE_ACCESS: Field = Field::new(2, 45, 1);
const CASH_ONLY_TOLL: Field = Field::new(2, 46, 1);
const ELEVATION: Field = Field::new(2, 47, 15);
const TIMEZONE_EXT_1: Field = Field::new(2, 62, 1);
// Reserved for a timezone split off a post-2023 timezone; never written.
#[allow(dead_code)]
const TIMEZONE_EXT_2: Field = Field::new(2, 63, 1);

const HEADINGS_WORD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum NodeType {
    #[default]
    StreetIntersection = 0,
    Gate = 1,
    Bollard = 2,
    TollBooth = 3,
    TransitEgress = 4,
    TransitStation = 5,
    MultiUseTransitPlatform = 6,
    BikeShare = 7,
    Parking = 8,
    MotorWayJunction = 9,
    BorderControl = 10,
    TollGantry = 11,
    SumpBuster = 12,
    BuildingEntrance = 13,
    Elevator = 14,
}

impl NodeType {
    pub fn from_u8(v: u8) -> Option<Self> {
        use NodeType::*;
        Some(match v {
            0 => StreetIntersection,
            1 => Gate,
            2 => Bollard,
            3 => TollBooth,
            4 => TransitEgress,
            5 => TransitStation,
            6 => MultiUseTransitPlatform,
            7 => BikeShare,
            8 => Parking,
            9 => MotorWayJunction,
            10 => BorderControl,
            11 => TollGantry,
            12 => SumpBuster,
            13 => BuildingEntrance,
            14 => Elevator,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        use NodeType::*;
        match self {
            StreetIntersection => "street_intersection",
            Gate => "gate",
            Bollard => "bollard",
            TollBooth => "toll_booth",
            TransitEgress => "transit_egress",
            TransitStation => "transit_station",
            MultiUseTransitPlatform => "multi_use_transit_platform",
            BikeShare => "bike_share",
            Parking => "parking",
            MotorWayJunction => "motor_way_junction",
            BorderControl => "border_control",
            TollGantry => "toll_gantry",
            SumpBuster => "sump_buster",
            BuildingEntrance => "building_entrance",
            Elevator => "elevator",
        }
    }

    pub fn is_transit(&self) -> bool {
        matches!(
            self,
            NodeType::TransitEgress | NodeType::TransitStation | NodeType::MultiUseTransitPlatform
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum IntersectionType {
    #[default]
    Regular = 0,
    /// Only two edges meet, e.g. a name change
    False = 1,
    DeadEnd = 2,
    Fork = 3,
}

impl IntersectionType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(IntersectionType::Regular),
            1 => Some(IntersectionType::False),
            2 => Some(IntersectionType::DeadEnd),
            3 => Some(IntersectionType::Fork),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntersectionType::Regular => "regular",
            IntersectionType::False => "false",
            IntersectionType::DeadEnd => "dead-end",
            IntersectionType::Fork => "fork",
        }
    }
}

/// Driveability of a local edge, 2 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Traversability {
    #[default]
    None = 0,
    Forward = 1,
    Backward = 2,
    Both = 3,
}

impl Traversability {
    pub fn from_bits(v: u64) -> Self {
        match v & 0x3 {
            1 => Traversability::Forward,
            2 => Traversability::Backward,
            3 => Traversability::Both,
            _ => Traversability::None,
        }
    }

    pub fn from_access(forward: bool, backward: bool) -> Self {
        match (forward, backward) {
            (true, true) => Traversability::Both,
            (true, false) => Traversability::Forward,
            (false, true) => Traversability::Backward,
            (false, false) => Traversability::None,
        }
    }
}

/// How a transit node links back to the road network
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitConnection {
    /// OSM way id the stop connects to
    Way(u64),
    /// Location on the road network the stop connects to
    Point(PointLL),
}

/// Eight 8-bit local edge headings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Headings(u64);

impl Headings {
    /// Heading in degrees of the local edge, `None` past the last local index
    pub fn get(&self, localidx: u32) -> Option<u32> {
        if localidx > MAX_LOCAL_EDGE_INDEX {
            return None;
        }
        let stored = bits::read(self.0, localidx, 8);
        Some((stored as f64 * HEADING_EXPAND_FACTOR).round() as u32)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Interpretation of word 3, keyed by the node type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeLinkage {
    Headings(Headings),
    Transit(TransitConnection),
}

/// Context needed to export a node: its tile corner and attribution tables
pub struct NodeContext<'a> {
    pub base_ll: PointLL,
    pub admin: Option<&'a AdminInfo>,
    pub timezones: &'a dyn TimezoneDb,
}

/// A graph node as stored in a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeRecord {
    words: [u64; 4],
}

impl NodeRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tile_corner: &PointLL,
        ll: &PointLL,
        access: u32,
        node_type: NodeType,
        traffic_signal: bool,
        tagged_access: bool,
        private_access: bool,
        cash_only_toll: bool,
    ) -> Self {
        let mut node = Self::default();
        node.set_latlng(tile_corner, ll);
        node.set_access(access);
        node.set_type(node_type);
        node.set_traffic_signal(traffic_signal);
        node.set_tagged_access(tagged_access);
        node.set_private_access(private_access);
        node.set_cash_only_toll(cash_only_toll);
        node
    }

    pub fn to_bytes(&self) -> [u8; NODE_RECORD_SIZE] {
        let mut out = [0u8; NODE_RECORD_SIZE];
        for (chunk, word) in out.chunks_exact_mut(8).zip(self.words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; NODE_RECORD_SIZE]) -> Self {
        let mut words = [0u64; 4];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            *word = u64::from_le_bytes(buf);
        }
        Self { words }
    }

    // ---- position ----

    /// Store `ll` as an offset from the tile corner. A node slightly outside
    /// the tile (float round-off) stores 0 on the offending axis.
    pub fn set_latlng(&mut self, tile_corner: &PointLL, ll: &PointLL) {
        let (lat, lat7) = Self::split_offset("lat_offset", ll.lat - tile_corner.lat);
        let (lon, lon7) = Self::split_offset("lon_offset", ll.lon - tile_corner.lon);
        LAT_OFFSET.set(&mut self.words, lat);
        LAT_OFFSET7.set(&mut self.words, lat7);
        LON_OFFSET.set(&mut self.words, lon);
        LON_OFFSET7.set(&mut self.words, lon7);
    }

    fn split_offset(field: &'static str, delta: f64) -> (u64, u64) {
        if delta.is_nan() || delta <= 0.0 {
            return (0, 0);
        }
        let units = (delta / COORD_PRECISION).round() as u64;
        let limit = LAT_OFFSET.max() * 10 + 9;
        let units = Overflow::Clamp(Level::Error)
            .apply(field, units, limit)
            .ok()
            .flatten()
            .unwrap_or(limit);
        let whole = units / 10;
        (whole, units - whole * 10)
    }

    /// Absolute position given the tile corner
    pub fn latlng(&self, tile_corner: &PointLL) -> PointLL {
        let lat = LAT_OFFSET.get(&self.words) * 10 + LAT_OFFSET7.get(&self.words);
        let lon = LON_OFFSET.get(&self.words) * 10 + LON_OFFSET7.get(&self.words);
        PointLL::new(
            tile_corner.lon + lon as f64 * COORD_PRECISION,
            tile_corner.lat + lat as f64 * COORD_PRECISION,
        )
    }

    // ---- edges ----

    /// Index within the tile of the first outbound edge. Exceeding the graph
    /// id range means the build is corrupt.
    pub fn set_edge_index(&mut self, edge_index: u32) -> Result<()> {
        if let Some(v) = Overflow::Fail.apply("edge index", edge_index as u64, MAX_GRAPH_ID as u64)? {
            EDGE_INDEX.set(&mut self.words, v);
        }
        Ok(())
    }

    pub fn edge_index(&self) -> u32 {
        EDGE_INDEX.get(&self.words) as u32
    }

    pub fn set_edge_count(&mut self, edge_count: u32) {
        let v = clamped("edge count", edge_count, MAX_EDGES_PER_NODE, Level::Error);
        EDGE_COUNT.set(&mut self.words, v);
    }

    pub fn edge_count(&self) -> u32 {
        EDGE_COUNT.get(&self.words) as u32
    }

    // ---- access ----

    pub fn set_access(&mut self, access: u32) {
        let v = Overflow::Mask(Level::Error)
            .apply("access", access as u64, access::ALL as u64)
            .ok()
            .flatten()
            .unwrap_or(0);
        ACCESS.set(&mut self.words, v);
    }

    pub fn access(&self) -> u16 {
        ACCESS.get(&self.words) as u16
    }

    pub fn set_tagged_access(&mut self, tagged_access: bool) {
        TAGGED_ACCESS.set_bool(&mut self.words, tagged_access);
    }

    /// Whether access was explicitly tagged on the node
    pub fn tagged_access(&self) -> bool {
        TAGGED_ACCESS.get_bool(&self.words)
    }

    pub fn set_private_access(&mut self, private_access: bool) {
        PRIVATE_ACCESS.set_bool(&mut self.words, private_access);
    }

    pub fn private_access(&self) -> bool {
        PRIVATE_ACCESS.get_bool(&self.words)
    }

    pub fn set_cash_only_toll(&mut self, cash_only_toll: bool) {
        CASH_ONLY_TOLL.set_bool(&mut self.words, cash_only_toll);
    }

    pub fn cash_only_toll(&self) -> bool {
        CASH_ONLY_TOLL.get_bool(&self.words)
    }

    // ---- classification ----

    pub fn set_intersection(&mut self, intersection: IntersectionType) {
        INTERSECTION.set(&mut self.words, intersection as u64);
    }

    pub fn intersection(&self) -> IntersectionType {
        IntersectionType::from_u8(INTERSECTION.get(&self.words) as u8).unwrap_or_default()
    }

    pub fn set_type(&mut self, node_type: NodeType) {
        TYPE.set(&mut self.words, node_type as u64);
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::from_u8(TYPE.get(&self.words) as u8).unwrap_or_default()
    }

    pub fn is_transit(&self) -> bool {
        self.node_type().is_transit()
    }

    pub fn set_traffic_signal(&mut self, traffic_signal: bool) {
        TRAFFIC_SIGNAL.set_bool(&mut self.words, traffic_signal);
    }

    pub fn traffic_signal(&self) -> bool {
        TRAFFIC_SIGNAL.get_bool(&self.words)
    }

    /// A mode change (transit stop, bike share, parking) is allowed here
    pub fn set_mode_change(&mut self, mode_change: bool) {
        MODE_CHANGE.set_bool(&mut self.words, mode_change);
    }

    pub fn mode_change(&self) -> bool {
        MODE_CHANGE.get_bool(&self.words)
    }

    pub fn set_named_intersection(&mut self, named: bool) {
        NAMED.set_bool(&mut self.words, named);
    }

    pub fn named_intersection(&self) -> bool {
        NAMED.get_bool(&self.words)
    }

    pub fn set_drive_on_right(&mut self, drive_on_right: bool) {
        DRIVE_ON_RIGHT.set_bool(&mut self.words, drive_on_right);
    }

    pub fn drive_on_right(&self) -> bool {
        DRIVE_ON_RIGHT.get_bool(&self.words)
    }

    // ---- attribution ----

    pub fn set_admin_index(&mut self, admin_index: u32) {
        let v = clamped("admin index", admin_index, MAX_ADMINS_PER_TILE, Level::Error);
        ADMIN_INDEX.set(&mut self.words, v);
    }

    pub fn admin_index(&self) -> u32 {
        ADMIN_INDEX.get(&self.words) as u32
    }

    /// Timezone index: low 9 bits in the legacy field, 10th bit in the
    /// first extension bit.
    pub fn set_timezone(&mut self, tz_index: u32) -> Result<()> {
        Overflow::Fail.apply("timezone index", tz_index as u64, MAX_TIMEZONE_INDEX as u64)?;
        TIMEZONE.set(&mut self.words, (tz_index & 0x1ff) as u64);
        TIMEZONE_EXT_1.set(&mut self.words, ((tz_index >> 9) & 0x1) as u64);
        Ok(())
    }

    pub fn timezone(&self) -> u32 {
        TIMEZONE.get(&self.words) as u32 | (TIMEZONE_EXT_1.get(&self.words) as u32) << 9
    }

    pub fn set_density(&mut self, density: u32) {
        let v = clamped("density", density, MAX_DENSITY, Level::Warn);
        DENSITY.set(&mut self.words, v);
    }

    pub fn density(&self) -> u32 {
        DENSITY.get(&self.words) as u32
    }

    // ---- local level ----

    pub fn set_local_driveability(&mut self, localidx: u32, t: Traversability) {
        let Ok(Some(idx)) = Overflow::Drop(Level::Warn).apply(
            "local driveability index",
            localidx as u64,
            MAX_LOCAL_EDGE_INDEX as u64,
        ) else {
            return;
        };
        let packed = bits::overwrite(LOCAL_DRIVEABILITY.get(&self.words), t as u64, idx as u32, 2);
        LOCAL_DRIVEABILITY.set(&mut self.words, packed);
    }

    pub fn local_driveability(&self, localidx: u32) -> Traversability {
        if localidx > MAX_LOCAL_EDGE_INDEX {
            return Traversability::None;
        }
        Traversability::from_bits(bits::read(LOCAL_DRIVEABILITY.get(&self.words), localidx, 2))
    }

    /// Number of edges on the local level. Stored minus one so that
    /// `MAX_LOCAL_EDGE_INDEX + 1` edges fit.
    pub fn set_local_edge_count(&mut self, n: u32) {
        if n == 0 {
            error!("Node with 0 local edges found");
            LOCAL_EDGE_COUNT.set(&mut self.words, 0);
            return;
        }
        let n = match Overflow::Clamp(Level::Info).apply(
            "local edge count",
            n as u64,
            MAX_LOCAL_EDGE_INDEX as u64 + 1,
        ) {
            Ok(Some(v)) => v,
            _ => MAX_LOCAL_EDGE_INDEX as u64 + 1,
        };
        LOCAL_EDGE_COUNT.set(&mut self.words, n - 1);
    }

    pub fn local_edge_count(&self) -> u32 {
        LOCAL_EDGE_COUNT.get(&self.words) as u32 + 1
    }

    // ---- hierarchy / transit ----

    pub fn set_transition_index(&mut self, index: u32) -> Result<()> {
        let v = Overflow::Fail.apply("transition index", index as u64, TRANSITION_INDEX.max())?;
        if let Some(v) = v {
            TRANSITION_INDEX.set(&mut self.words, v);
        }
        Ok(())
    }

    pub fn transition_index(&self) -> u32 {
        TRANSITION_INDEX.get(&self.words) as u32
    }

    pub fn set_transition_count(&mut self, count: u32) {
        let v = clamped("transition count", count, MAX_TRANSITIONS, Level::Error);
        TRANSITION_COUNT.set(&mut self.words, v);
    }

    pub fn transition_count(&self) -> u32 {
        TRANSITION_COUNT.get(&self.words) as u32
    }

    /// Transit nodes reuse the transition index for their stop index
    pub fn set_stop_index(&mut self, stop_index: u32) -> Result<()> {
        self.set_transition_index(stop_index)
    }

    pub fn stop_index(&self) -> u32 {
        self.transition_index()
    }

    // ---- elevation ----

    /// Quantize to 0.25 m steps above -500 m; out of range values clamp
    pub fn set_elevation(&mut self, elevation: f32) {
        let stored = if elevation < NODE_MIN_ELEVATION {
            0
        } else {
            let elev = ((elevation - NODE_MIN_ELEVATION) / NODE_ELEVATION_PRECISION) as u32;
            elev.min(NODE_MAX_STORED_ELEVATION)
        };
        ELEVATION.set(&mut self.words, stored as u64);
    }

    pub fn elevation(&self) -> f32 {
        NODE_MIN_ELEVATION + ELEVATION.get(&self.words) as f32 * NODE_ELEVATION_PRECISION
    }

    // ---- headings / transit connection ----

    /// Heading of a local edge, reduced to 8 bits. Up to 8 local edges.
    pub fn set_heading(&mut self, localidx: u32, heading: u32) {
        let Ok(Some(idx)) = Overflow::Drop(Level::Warn).apply(
            "heading local index",
            localidx as u64,
            MAX_LOCAL_EDGE_INDEX as u64,
        ) else {
            return;
        };
        if self.is_transit() {
            warn!("Heading set on a transit node, which stores its connection instead - skip");
            return;
        }
        let hdg = ((heading % 360) as f64 * HEADING_SHRINK_FACTOR).round() as u64;
        let word = &mut self.words[HEADINGS_WORD];
        *word = bits::overwrite(*word, hdg, idx as u32, 8);
    }

    /// Heading of a local edge in degrees; `None` for transit nodes or an
    /// index past the last local edge.
    pub fn heading(&self, localidx: u32) -> Option<u32> {
        match self.linkage() {
            NodeLinkage::Headings(headings) => headings.get(localidx),
            NodeLinkage::Transit(_) => None,
        }
    }

    pub fn set_connecting_wayid(&mut self, wayid: u64) -> Result<()> {
        if wayid >> 63 != 0 {
            return Err(Error::WayIdOverflow(wayid));
        }
        if !self.is_transit() {
            warn!("Connecting way id {wayid} set on a non transit node - skip");
            return Ok(());
        }
        self.words[HEADINGS_WORD] = wayid;
        Ok(())
    }

    pub fn set_connecting_point(&mut self, p: &PointLL) -> Result<()> {
        if !p.in_range() {
            return Err(Error::InvalidConnectingPoint {
                lon: p.lon,
                lat: p.lat,
            });
        }
        if !self.is_transit() {
            warn!("Connecting point set on a non transit node - skip");
            return Ok(());
        }
        self.words[HEADINGS_WORD] = p.pack() | TRANSIT_POINT_FLAG;
        Ok(())
    }

    /// Word 3 decoded according to the node type
    pub fn linkage(&self) -> NodeLinkage {
        let raw = self.words[HEADINGS_WORD];
        if !self.is_transit() {
            return NodeLinkage::Headings(Headings(raw));
        }
        if raw & TRANSIT_POINT_FLAG != 0 {
            NodeLinkage::Transit(TransitConnection::Point(PointLL::unpack(
                raw & !TRANSIT_POINT_FLAG,
            )))
        } else {
            NodeLinkage::Transit(TransitConnection::Way(raw))
        }
    }

    // ---- export ----

    /// Diagnostic view of the node
    pub fn to_json(&self, ctx: &NodeContext<'_>) -> Value {
        let ll = self.latlng(&ctx.base_ll);
        let default_admin = AdminInfo::default();
        let admin = ctx.admin.unwrap_or(&default_admin);

        let mut administrative = json!({
            "iso_3166-1": admin.country_iso,
            "country": admin.country_text,
            "iso_3166-2": admin.state_iso,
            "state": admin.state_text,
        });
        if let Some(tz) = ctx.timezones.name(self.timezone()) {
            administrative["time_zone_name"] = Value::from(tz);
        }

        let mut out = json!({
            "lon": round_to(ll.lon, 6),
            "lat": round_to(ll.lat, 6),
            "elevation": round_to(self.elevation() as f64, 2),
            "edge_count": self.edge_count(),
            "access": access::to_json(self.access()),
            "tagged_access": self.tagged_access(),
            "intersection_type": self.intersection().as_str(),
            "administrative": administrative,
            "density": self.density(),
            "local_edge_count": self.local_edge_count(),
            "drive_on_right": self.drive_on_right(),
            "mode_change": self.mode_change(),
            "private_access": self.private_access(),
            "traffic_signal": self.traffic_signal(),
            "type": self.node_type().as_str(),
            "transition_count": self.transition_count(),
            "named_intersection": self.named_intersection(),
        });
        if self.is_transit() {
            out["stop_index"] = Value::from(self.stop_index());
        }
        out
    }
}

fn clamped(field: &'static str, value: u32, max: u32, level: Level) -> u64 {
    match Overflow::Clamp(level).apply(field, value as u64, max as u64) {
        Ok(Some(v)) => v,
        _ => max as u64,
    }
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}
