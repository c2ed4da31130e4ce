//! OSM element sources for the parse stages

use std::path::PathBuf;

use anyhow::{Context, Result};
use osmpbf::{Element, ElementReader};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeElement {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tags: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WayElement {
    pub id: i64,
    pub refs: Vec<i64>,
    pub tags: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Node,
    Way,
    Relation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub kind: MemberKind,
    pub ref_id: i64,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationElement {
    pub id: i64,
    pub members: Vec<Member>,
    pub tags: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OsmElement {
    Node(NodeElement),
    Way(WayElement),
    Relation(RelationElement),
}

/// Value of `key` in a tag list
pub fn tag<'a>(tags: &'a [(String, String)], key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Streams every element of the build inputs, in input order
pub trait OsmSource {
    fn for_each(&self, inputs: &[PathBuf], f: &mut dyn FnMut(OsmElement)) -> Result<()>;
}

/// Reads `.osm.pbf` files
#[derive(Debug, Clone, Copy, Default)]
pub struct PbfSource;

fn owned_tags<'a>(tags: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<(String, String)> {
    tags.map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

impl OsmSource for PbfSource {
    fn for_each(&self, inputs: &[PathBuf], f: &mut dyn FnMut(OsmElement)) -> Result<()> {
        for path in inputs {
            let reader = ElementReader::from_path(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            reader
                .for_each(|element| match element {
                    Element::Node(node) => f(OsmElement::Node(NodeElement {
                        id: node.id(),
                        lat: node.lat(),
                        lon: node.lon(),
                        tags: owned_tags(node.tags()),
                    })),
                    Element::DenseNode(node) => f(OsmElement::Node(NodeElement {
                        id: node.id(),
                        lat: node.lat(),
                        lon: node.lon(),
                        tags: owned_tags(node.tags()),
                    })),
                    Element::Way(way) => f(OsmElement::Way(WayElement {
                        id: way.id(),
                        refs: way.refs().collect(),
                        tags: owned_tags(way.tags()),
                    })),
                    Element::Relation(relation) => {
                        let members = relation
                            .members()
                            .map(|member| Member {
                                kind: match member.member_type {
                                    osmpbf::RelMemberType::Node => MemberKind::Node,
                                    osmpbf::RelMemberType::Way => MemberKind::Way,
                                    osmpbf::RelMemberType::Relation => MemberKind::Relation,
                                },
                                ref_id: member.member_id,
                                role: member.role().unwrap_or("").to_string(),
                            })
                            .collect();
                        f(OsmElement::Relation(RelationElement {
                            id: relation.id(),
                            members,
                            tags: owned_tags(relation.tags()),
                        }))
                    }
                })
                .with_context(|| format!("Failed to read {}", path.display()))?;
        }
        Ok(())
    }
}

/// Elements held in memory; the input paths are ignored
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    elements: Vec<OsmElement>,
}

impl MemorySource {
    pub fn new(elements: Vec<OsmElement>) -> Self {
        Self { elements }
    }

    pub fn node(mut self, id: i64, lon: f64, lat: f64, tags: &[(&str, &str)]) -> Self {
        self.elements.push(OsmElement::Node(NodeElement {
            id,
            lat,
            lon,
            tags: to_owned(tags),
        }));
        self
    }

    pub fn way(mut self, id: i64, refs: &[i64], tags: &[(&str, &str)]) -> Self {
        self.elements.push(OsmElement::Way(WayElement {
            id,
            refs: refs.to_vec(),
            tags: to_owned(tags),
        }));
        self
    }

    pub fn relation(mut self, id: i64, members: Vec<Member>, tags: &[(&str, &str)]) -> Self {
        self.elements.push(OsmElement::Relation(RelationElement {
            id,
            members,
            tags: to_owned(tags),
        }));
        self
    }
}

fn to_owned(tags: &[(&str, &str)]) -> Vec<(String, String)> {
    tags.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl OsmSource for MemorySource {
    fn for_each(&self, _inputs: &[PathBuf], f: &mut dyn FnMut(OsmElement)) -> Result<()> {
        for element in &self.elements {
            f(element.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_order() -> Result<()> {
        let source = MemorySource::default()
            .node(1, 4.35, 50.85, &[("highway", "traffic_signals")])
            .way(10, &[1, 2], &[("highway", "residential")]);
        let mut seen = Vec::new();
        source.for_each(&[], &mut |e| seen.push(e))?;
        assert_eq!(seen.len(), 2);
        let OsmElement::Node(node) = &seen[0] else {
            panic!("expected node first");
        };
        assert_eq!(tag(&node.tags, "highway"), Some("traffic_signals"));
        assert_eq!(tag(&node.tags, "name"), None);
        Ok(())
    }

    #[test]
    fn test_pbf_missing_file() {
        let result = PbfSource.for_each(&[PathBuf::from("/nonexistent/x.osm.pbf")], &mut |_| {});
        assert!(result.is_err());
    }
}
