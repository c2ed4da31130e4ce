//! Stage plan: which stages run for a `[start, end]` range and what each
//! one needs before and after it runs

use super::stage::BuildStage;

/// Working dataset a step must load from disk before running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reload {
    None,
    /// Full snapshot (`osmdata.bin` + `unique_names.bin`)
    WorkingSet,
    /// Name dictionary only
    UniqueNames,
}

/// How a step deals with the tile manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestAction {
    None,
    /// Computes the edge partition and writes the manifest
    Write,
    /// Uses the partition computed earlier in this run
    UseMemory,
    /// Reads the manifest, or recomputes the partition if it is missing
    ReadOrRecompute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStep {
    pub stage: BuildStage,
    pub reload: Reload,
    /// Snapshot the working dataset after the stage
    pub snapshot: bool,
    pub manifest: ManifestAction,
}

/// Stage in range but switched off by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedStage {
    pub stage: BuildStage,
    pub switch: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    pub start: BuildStage,
    pub end: BuildStage,
    pub steps: Vec<StageStep>,
    pub skipped: Vec<SkippedStage>,
}

impl StagePlan {
    /// `hierarchy` and `shortcuts` are the `mjolnir.*` switches; shortcuts
    /// are only built on top of a hierarchy.
    pub fn new(start: BuildStage, end: BuildStage, hierarchy: bool, shortcuts: bool) -> Self {
        let mut steps = Vec::new();
        let mut skipped = Vec::new();

        for &stage in BuildStage::all() {
            if stage < start || stage > end {
                continue;
            }
            let switched_off = match stage {
                BuildStage::Hierarchy if !hierarchy => Some("mjolnir.hierarchy"),
                BuildStage::Shortcuts if !hierarchy => Some("mjolnir.hierarchy"),
                BuildStage::Shortcuts if !shortcuts => Some("mjolnir.shortcuts"),
                _ => None,
            };
            if let Some(switch) = switched_off {
                skipped.push(SkippedStage { stage, switch });
                continue;
            }

            let entry = stage == start;
            let reload = match stage {
                BuildStage::ParseRelations
                | BuildStage::ParseNodes
                | BuildStage::ConstructEdges
                | BuildStage::Build
                    if entry =>
                {
                    Reload::WorkingSet
                }
                BuildStage::Enhance | BuildStage::Bss if entry => Reload::UniqueNames,
                _ => Reload::None,
            };
            let manifest = match stage {
                BuildStage::ConstructEdges => ManifestAction::Write,
                BuildStage::Build if entry => ManifestAction::ReadOrRecompute,
                BuildStage::Build => ManifestAction::UseMemory,
                _ => ManifestAction::None,
            };
            steps.push(StageStep {
                stage,
                reload,
                snapshot: stage.is_parse() && end <= BuildStage::Enhance,
                manifest,
            });
        }

        Self {
            start,
            end,
            steps,
            skipped,
        }
    }

    pub fn contains(&self, stage: BuildStage) -> bool {
        self.step(stage).is_some()
    }

    pub fn step(&self, stage: BuildStage) -> Option<&StageStep> {
        self.steps.iter().find(|s| s.stage == stage)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn stages(&self) -> impl Iterator<Item = BuildStage> + '_ {
        self.steps.iter().map(|s| s.stage)
    }
}
