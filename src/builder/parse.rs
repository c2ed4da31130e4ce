//! Parse stages: ways, relations, nodes
//!
//! Each stage makes one pass over the inputs. Ways come first so that the
//! node pass only keeps nodes some routable way references.

use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use super::records::{
    ComplexRestriction, OsmNode, OsmWay, OsmWayNode, Pronunciation, TurnRestrictionKind,
    WayAccessRestriction,
};
use super::source::{tag, MemberKind, OsmElement, OsmSource, RelationElement, WayElement};
use crate::access;
use crate::formats::access_restriction::{
    AccessRestrictionDirection, AccessType, OsmAccessRestriction,
};
use crate::formats::node_info::NodeType;
use crate::formats::temp_file::TempFile;
use crate::osm_data::OsmData;
use crate::pipeline::BuildContext;
use crate::point::PointLL;

const ROUTABLE_HIGHWAYS: [&str; 22] = [
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "unclassified",
    "residential",
    "living_street",
    "service",
    "road",
    "track",
    "pedestrian",
    "footway",
    "path",
    "cycleway",
    "steps",
    "bridleway",
];

const ONEWAY_MODES: u16 = access::VEHICULAR | access::BICYCLE | access::EMERGENCY;

/// Modes a highway class is open to before any access tags
fn highway_access(highway: &str) -> u16 {
    use access::*;
    match highway {
        "motorway" | "motorway_link" | "trunk" | "trunk_link" => {
            AUTO | TRUCK | BUS | TAXI | HOV | MOTORCYCLE | EMERGENCY
        }
        "footway" | "pedestrian" => PEDESTRIAN | WHEELCHAIR,
        "steps" | "bridleway" => PEDESTRIAN,
        "path" => PEDESTRIAN | BICYCLE | WHEELCHAIR,
        "cycleway" => BICYCLE | PEDESTRIAN | WHEELCHAIR,
        _ => ALL,
    }
}

fn is_yes(v: &str) -> bool {
    matches!(v, "yes" | "designated" | "permissive" | "destination")
}

fn is_no(v: &str) -> bool {
    matches!(v, "no" | "private" | "use_sidepath")
}

/// Forward and reverse access masks of a way
fn way_access(tags: &[(String, String)], highway: &str) -> (u16, u16) {
    let mut mask = highway_access(highway);
    if tag(tags, "access").is_some_and(is_no) {
        mask = 0;
    }
    let overrides: [(&str, u16); 6] = [
        ("motor_vehicle", access::VEHICULAR),
        ("motorcar", access::AUTO | access::TAXI | access::HOV),
        ("hgv", access::TRUCK),
        ("psv", access::BUS | access::TAXI),
        ("bicycle", access::BICYCLE),
        ("foot", access::PEDESTRIAN | access::WHEELCHAIR),
    ];
    for (key, modes) in overrides {
        match tag(tags, key) {
            Some(v) if is_no(v) => mask &= !modes,
            Some(v) if is_yes(v) => mask |= modes,
            _ => {}
        }
    }

    let implied_oneway = matches!(highway, "motorway" | "motorway_link")
        || tag(tags, "junction") == Some("roundabout");
    let (mut forward, mut reverse) = (mask, mask);
    match tag(tags, "oneway") {
        Some("yes" | "1" | "true") => reverse &= !ONEWAY_MODES,
        Some("-1" | "reverse") => forward &= !ONEWAY_MODES,
        Some("no" | "0" | "false") => {}
        _ if implied_oneway => reverse &= !ONEWAY_MODES,
        _ => {}
    }
    if tag(tags, "oneway:bicycle") == Some("no") {
        forward |= mask & access::BICYCLE;
        reverse |= mask & access::BICYCLE;
    }
    (forward, reverse)
}

/// Numeric part of a measure such as `3.5`, `3.5 m` or `7.5 t`, scaled
fn parse_measure(value: &str, scale: f64) -> Option<u64> {
    let number = value
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .trim();
    let v: f64 = number.parse().ok()?;
    (v.is_finite() && v > 0.0).then(|| (v * scale).round() as u64)
}

/// Access restrictions expressed as way tags
fn way_restrictions(tags: &[(String, String)]) -> Vec<OsmAccessRestriction> {
    const MEASURES: [(&str, AccessType, f64, u16); 6] = [
        ("maxheight", AccessType::MaxHeight, 100.0, access::VEHICULAR),
        ("maxwidth", AccessType::MaxWidth, 100.0, access::VEHICULAR),
        ("maxlength", AccessType::MaxLength, 100.0, access::TRUCK),
        ("maxweight", AccessType::MaxWeight, 1000.0, access::TRUCK),
        ("maxaxleload", AccessType::MaxAxleLoad, 1000.0, access::TRUCK),
        ("maxaxles", AccessType::MaxAxles, 1.0, access::TRUCK),
    ];
    let except_destination = tag(tags, "hgv") == Some("destination")
        || tag(tags, "motor_vehicle") == Some("destination");

    let mut out = Vec::new();
    for (key, access_type, scale, modes) in MEASURES {
        for (suffix, direction) in [
            ("", AccessRestrictionDirection::Both),
            (":forward", AccessRestrictionDirection::Forward),
            (":backward", AccessRestrictionDirection::Backward),
        ] {
            let Some(raw) = tag(tags, &format!("{key}{suffix}")) else {
                continue;
            };
            let Some(value) = parse_measure(raw, scale) else {
                debug!("Ignoring {key}{suffix}={raw}");
                continue;
            };
            let mut r = OsmAccessRestriction::new(access_type, modes, value);
            r.set_direction(direction);
            r.set_except_destination(except_destination);
            out.push(r);
        }
    }
    if tag(tags, "hazmat") == Some("no") {
        out.push(OsmAccessRestriction::new(AccessType::Hazmat, access::TRUCK, 1));
    }
    out
}

fn is_routable(way: &WayElement) -> bool {
    way.refs.len() >= 2
        && tag(&way.tags, "highway").is_some_and(|h| ROUTABLE_HIGHWAYS.contains(&h))
        && tag(&way.tags, "area") != Some("yes")
}

/// ParseWays: routable ways into `ways.bin`/`way_nodes.bin`, tag restrictions
/// into `access.bin`, name pronunciations into `pronunciation.bin`
pub fn parse_ways(source: &dyn OsmSource, ctx: &BuildContext) -> Result<OsmData> {
    let start = Instant::now();
    let mut osm_data = OsmData::default();

    let mut elements = Vec::new();
    source.for_each(&ctx.inputs, &mut |element| {
        if let OsmElement::Way(way) = element {
            if is_routable(&way) {
                elements.push(way);
            }
        }
    })?;
    // Sort by ID for determinism
    elements.sort_by_key(|w| w.id);
    elements.dedup_by_key(|w| w.id);

    let mut ways = Vec::with_capacity(elements.len());
    let mut way_nodes = Vec::new();
    let mut access_records = Vec::new();
    let mut pronunciations = Vec::new();

    for (way_index, element) in elements.iter().enumerate() {
        let way_id = element.id as u64;
        let highway = tag(&element.tags, "highway").unwrap_or_default();
        let (forward_access, reverse_access) = way_access(&element.tags, highway);
        let name = tag(&element.tags, "name").unwrap_or_default();
        let name_index = osm_data.names.index(name);

        if let Some(p) = tag(&element.tags, "name:pronunciation") {
            pronunciations.push(Pronunciation {
                osm_id: way_id,
                name_index,
                pronunciation_index: osm_data.names.index(p),
            });
        }
        for restriction in way_restrictions(&element.tags) {
            osm_data.add_access_restriction(way_id, restriction);
            access_records.push(WayAccessRestriction {
                way_id,
                restriction,
            });
        }

        ways.push(OsmWay {
            way_id,
            node_start: way_nodes.len() as u64,
            node_count: element.refs.len() as u32,
            name_index,
            forward_access,
            reverse_access,
        });
        for (i, node_ref) in element.refs.iter().enumerate() {
            way_nodes.push(OsmWayNode {
                node: OsmNode::new(*node_ref as u64),
                way_index: way_index as u32,
                way_shape_index: i as u32,
            });
        }
    }

    osm_data.osm_way_count = ways.len() as u64;
    osm_data.osm_way_node_count = way_nodes.len() as u64;

    TempFile::write(&ctx.files.ways, &ways).context("Failed to write ways")?;
    TempFile::write(&ctx.files.way_nodes, &way_nodes).context("Failed to write way nodes")?;
    TempFile::write(&ctx.files.access, &access_records)
        .context("Failed to write access restrictions")?;
    TempFile::write(&ctx.files.pronunciation, &pronunciations)
        .context("Failed to write pronunciations")?;

    info!(
        "Finished parsing {} ways ({} way nodes, {} access restrictions) in {:.2}s",
        ways.len(),
        way_nodes.len(),
        access_records.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(osm_data)
}

/// Modes a `restriction[:mode]` key applies to, minus `except`
fn restriction_modes(key: &str, except: Option<&str>) -> Option<u16> {
    let mut modes = match key {
        "restriction" => access::VEHICULAR | access::BICYCLE,
        "restriction:motorcar" => access::AUTO,
        "restriction:hgv" => access::TRUCK,
        "restriction:bus" => access::BUS,
        "restriction:bicycle" => access::BICYCLE,
        _ => return None,
    };
    for mode in except.unwrap_or_default().split(';').map(str::trim) {
        modes &= !match mode {
            "bicycle" => access::BICYCLE,
            "psv" => access::BUS | access::TAXI,
            "hgv" => access::TRUCK,
            "motorcar" => access::AUTO,
            "emergency" => access::EMERGENCY,
            _ => 0,
        };
    }
    Some(modes)
}

fn turn_restriction(relation: &RelationElement) -> Option<ComplexRestriction> {
    if tag(&relation.tags, "type") != Some("restriction") {
        return None;
    }
    let (key, value) = relation
        .tags
        .iter()
        .find(|(k, _)| k == "restriction" || k.starts_with("restriction:"))?;
    let kind = if value.starts_with("no_") {
        TurnRestrictionKind::No
    } else if value.starts_with("only_") {
        TurnRestrictionKind::Only
    } else {
        return None;
    };
    let modes = restriction_modes(key, tag(&relation.tags, "except"))?;

    let mut from = Vec::new();
    let mut to = Vec::new();
    let mut via_nodes = Vec::new();
    let mut via_ways = Vec::new();
    for member in &relation.members {
        match (member.role.as_str(), member.kind) {
            ("from", MemberKind::Way) => from.push(member.ref_id as u64),
            ("to", MemberKind::Way) => to.push(member.ref_id as u64),
            ("via", MemberKind::Node) => via_nodes.push(member.ref_id as u64),
            ("via", MemberKind::Way) => via_ways.push(member.ref_id as u64),
            _ => {}
        }
    }
    if from.len() != 1 || to.len() != 1 || (via_nodes.is_empty() && via_ways.is_empty()) {
        debug!("Skipping malformed restriction relation {}", relation.id);
        return None;
    }
    Some(ComplexRestriction {
        relation_id: relation.id as u64,
        from_way: from[0],
        via_nodes,
        via_ways,
        to_way: to[0],
        kind,
        modes,
    })
}

/// ParseRelations: turn restrictions into the two complex restriction files
pub fn parse_relations(
    source: &dyn OsmSource,
    ctx: &BuildContext,
    osm_data: &mut OsmData,
) -> Result<()> {
    let start = Instant::now();
    let mut restrictions = Vec::new();
    source.for_each(&ctx.inputs, &mut |element| {
        if let OsmElement::Relation(relation) = element {
            if let Some(r) = turn_restriction(&relation) {
                restrictions.push(r);
            }
        }
    })?;
    restrictions.sort_by_key(|r| r.relation_id);
    restrictions.dedup_by_key(|r| r.relation_id);
    osm_data.restriction_count = restrictions.len() as u64;

    let mut by_from = restrictions.clone();
    by_from.sort_by_key(|r| (r.from_way, r.relation_id));
    let mut by_to = restrictions;
    by_to.sort_by_key(|r| (r.to_way, r.relation_id));

    TempFile::write(&ctx.files.cr_from, &by_from)
        .context("Failed to write complex restrictions (from)")?;
    TempFile::write(&ctx.files.cr_to, &by_to)
        .context("Failed to write complex restrictions (to)")?;

    info!(
        "Finished parsing {} turn restrictions in {:.2}s",
        osm_data.restriction_count,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn node_type(tags: &[(String, String)]) -> NodeType {
    match (tag(tags, "barrier"), tag(tags, "highway"), tag(tags, "amenity")) {
        (Some("gate" | "lift_gate" | "swing_gate"), _, _) => NodeType::Gate,
        (Some("bollard"), _, _) => NodeType::Bollard,
        (Some("toll_booth"), _, _) => NodeType::TollBooth,
        (Some("border_control"), _, _) => NodeType::BorderControl,
        (_, Some("motorway_junction"), _) => NodeType::MotorWayJunction,
        (_, Some("elevator"), _) => NodeType::Elevator,
        (_, _, Some("bicycle_rental")) => NodeType::BikeShare,
        _ => NodeType::StreetIntersection,
    }
}

/// ParseNodes: positions and attributes of the way nodes, bike share
/// stations into `bss_nodes.bin`, node pronunciations into
/// `linguistics_node.bin`
pub fn parse_nodes(
    source: &dyn OsmSource,
    ctx: &BuildContext,
    osm_data: &mut OsmData,
) -> Result<()> {
    let start = Instant::now();
    let mut way_nodes: Vec<OsmWayNode> =
        TempFile::read(&ctx.files.way_nodes).context("Failed to read way nodes")?;

    // (osm id, way node index), sorted for lookup
    let mut lookup: Vec<(u64, usize)> = way_nodes
        .iter()
        .enumerate()
        .map(|(i, wn)| (wn.node.osm_id, i))
        .collect();
    lookup.sort_unstable();

    let mut found = 0u64;
    let mut bss_nodes = Vec::new();
    let mut linguistics = Vec::new();
    let names = &mut osm_data.names;

    source.for_each(&ctx.inputs, &mut |element| {
        let OsmElement::Node(element) = element else {
            return;
        };
        let osm_id = element.id as u64;
        let node_type = node_type(&element.tags);
        let access_tag = tag(&element.tags, "access");
        let node = OsmNode {
            osm_id,
            fixed: Some(PointLL::new(element.lon, element.lat).to_fixed()),
            node_type: node_type as u8,
            traffic_signal: tag(&element.tags, "highway") == Some("traffic_signals"),
            tagged_access: access_tag.is_some(),
            private_access: access_tag == Some("private"),
        };

        if node_type == NodeType::BikeShare {
            bss_nodes.push(node);
        }

        let first = lookup.partition_point(|(id, _)| *id < osm_id);
        let refs = lookup[first..].iter().take_while(|(id, _)| *id == osm_id);
        let mut referenced = false;
        for (_, i) in refs {
            way_nodes[*i].node = node;
            referenced = true;
        }
        if !referenced {
            return;
        }
        found += 1;

        if let (Some(name), Some(p)) = (
            tag(&element.tags, "name"),
            tag(&element.tags, "name:pronunciation"),
        ) {
            linguistics.push(Pronunciation {
                osm_id,
                name_index: names.index(name),
                pronunciation_index: names.index(p),
            });
        }
    })?;

    let missing = way_nodes.iter().filter(|wn| wn.node.fixed.is_none()).count();
    if missing > 0 {
        warn!("{missing} way node references have no node in the input");
    }

    bss_nodes.sort_by_key(|n| n.osm_id);
    bss_nodes.dedup_by_key(|n| n.osm_id);
    linguistics.sort_by_key(|p| p.osm_id);
    linguistics.dedup_by_key(|p| p.osm_id);

    osm_data.osm_node_count = found;
    osm_data.bss_node_count = bss_nodes.len() as u64;

    TempFile::write(&ctx.files.way_nodes, &way_nodes).context("Failed to write way nodes")?;
    TempFile::write(&ctx.files.bss_nodes, &bss_nodes).context("Failed to write bss nodes")?;
    TempFile::write(&ctx.files.linguistic_node, &linguistics)
        .context("Failed to write node linguistics")?;

    info!(
        "Finished parsing {} nodes ({} bike share stations) in {:.2}s",
        found,
        bss_nodes.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
