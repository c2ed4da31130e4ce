//! Ordered build stages

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// One checkpointed step of a tile build, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildStage {
    Initialize,
    ParseWays,
    ParseRelations,
    ParseNodes,
    ConstructEdges,
    Build,
    Enhance,
    Filter,
    Transit,
    Bss,
    Hierarchy,
    Shortcuts,
    Elevation,
    Restrictions,
    Validate,
    Cleanup,
}

const ALL_STAGES: [BuildStage; 16] = [
    BuildStage::Initialize,
    BuildStage::ParseWays,
    BuildStage::ParseRelations,
    BuildStage::ParseNodes,
    BuildStage::ConstructEdges,
    BuildStage::Build,
    BuildStage::Enhance,
    BuildStage::Filter,
    BuildStage::Transit,
    BuildStage::Bss,
    BuildStage::Hierarchy,
    BuildStage::Shortcuts,
    BuildStage::Elevation,
    BuildStage::Restrictions,
    BuildStage::Validate,
    BuildStage::Cleanup,
];

impl BuildStage {
    pub const FIRST: BuildStage = BuildStage::Initialize;
    pub const LAST: BuildStage = BuildStage::Cleanup;

    pub fn all() -> &'static [BuildStage] {
        &ALL_STAGES
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStage::Initialize => "initialize",
            BuildStage::ParseWays => "parseways",
            BuildStage::ParseRelations => "parserelations",
            BuildStage::ParseNodes => "parsenodes",
            BuildStage::ConstructEdges => "constructedges",
            BuildStage::Build => "build",
            BuildStage::Enhance => "enhance",
            BuildStage::Filter => "filter",
            BuildStage::Transit => "transit",
            BuildStage::Bss => "bss",
            BuildStage::Hierarchy => "hierarchy",
            BuildStage::Shortcuts => "shortcuts",
            BuildStage::Elevation => "elevation",
            BuildStage::Restrictions => "restrictions",
            BuildStage::Validate => "validate",
            BuildStage::Cleanup => "cleanup",
        }
    }

    /// Stage after this one
    pub fn next(&self) -> Option<BuildStage> {
        ALL_STAGES.get(*self as usize + 1).copied()
    }

    /// Parse stages, after which the working dataset may be snapshotted
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            BuildStage::ParseWays | BuildStage::ParseRelations | BuildStage::ParseNodes
        )
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildStage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let wanted = s.trim().to_ascii_lowercase();
        ALL_STAGES
            .iter()
            .copied()
            .find(|stage| stage.as_str() == wanted)
            .ok_or_else(|| Error::InvalidStage(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for stage in BuildStage::all() {
            assert_eq!(stage.to_string().parse::<BuildStage>().unwrap(), *stage);
        }
        assert_eq!(
            "ConstructEdges".parse::<BuildStage>().unwrap(),
            BuildStage::ConstructEdges
        );
        assert!("parse".parse::<BuildStage>().is_err());
    }

    #[test]
    fn test_order() {
        assert!(BuildStage::ParseNodes < BuildStage::ConstructEdges);
        assert!(BuildStage::Enhance < BuildStage::Cleanup);
        assert_eq!(BuildStage::Build.next(), Some(BuildStage::Enhance));
        assert_eq!(BuildStage::LAST.next(), None);
        assert_eq!(BuildStage::all().len(), 16);
        assert!(BuildStage::all().windows(2).all(|w| w[0] < w[1]));
    }
}
