//! Tile build pipeline
//!
//! Runs the stages of a `[start, end]` range strictly in order. Each stage
//! leaves its outputs fully written under the tile directory before the next
//! one starts, which is what lets a later invocation resume at any stage:
//! running `[S, S]` then `[S+1, end]` yields the same tiles as `[S, end]`.
//!
//! The stage bodies are supplied through [`StageHandlers`]; this module only
//! sequences them, moves the working dataset and tile partition between them,
//! and owns Initialize and Cleanup.

pub mod context;
pub mod plan;
pub mod stage;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::config::BuildConfig;
use crate::formats::manifest::{TileManifest, TileSet};
use crate::formats::temp_file::remove_temp_file;
use crate::hierarchy;
use crate::osm_data::OsmData;

pub use context::{BuildContext, TempFiles};
pub use plan::{ManifestAction, Reload, SkippedStage, StagePlan, StageStep};
pub use stage::BuildStage;

/// Stage implementations invoked by [`build_tile_set`]
///
/// Parsing, edge construction and tile building are required. The later
/// stages default to doing nothing.
pub trait StageHandlers {
    /// Parse ways into a fresh working dataset; writes `ways.bin`,
    /// `way_nodes.bin` and `access.bin`
    fn parse_ways(&mut self, ctx: &BuildContext) -> Result<OsmData>;

    /// Parse relations; writes the complex restriction files
    fn parse_relations(&mut self, ctx: &BuildContext, osm_data: &mut OsmData) -> Result<()>;

    /// Parse the nodes referenced by ways; completes `way_nodes.bin` and
    /// writes `bss_nodes.bin` and `linguistics_node.bin`
    fn parse_nodes(&mut self, ctx: &BuildContext, osm_data: &mut OsmData) -> Result<()>;

    /// Split ways into edges and partition them across tiles; writes
    /// `nodes.bin`, `edges.bin` and `shapes.bin`
    fn construct_edges(&mut self, ctx: &BuildContext) -> Result<TileSet>;

    /// Write the local level tiles
    fn build(&mut self, ctx: &BuildContext, osm_data: &OsmData, tileset: &TileSet) -> Result<()>;

    fn enhance(&mut self, _ctx: &BuildContext, _osm_data: &OsmData) -> Result<()> {
        not_provided(BuildStage::Enhance)
    }

    fn filter(&mut self, _ctx: &BuildContext) -> Result<()> {
        not_provided(BuildStage::Filter)
    }

    fn transit(&mut self, _ctx: &BuildContext) -> Result<()> {
        not_provided(BuildStage::Transit)
    }

    fn bss(&mut self, _ctx: &BuildContext, _osm_data: &OsmData) -> Result<()> {
        not_provided(BuildStage::Bss)
    }

    fn hierarchy(&mut self, _ctx: &BuildContext) -> Result<()> {
        not_provided(BuildStage::Hierarchy)
    }

    fn shortcuts(&mut self, _ctx: &BuildContext) -> Result<()> {
        not_provided(BuildStage::Shortcuts)
    }

    fn elevation(&mut self, _ctx: &BuildContext) -> Result<()> {
        not_provided(BuildStage::Elevation)
    }

    fn restrictions(&mut self, _ctx: &BuildContext) -> Result<()> {
        not_provided(BuildStage::Restrictions)
    }

    fn validate(&mut self, _ctx: &BuildContext) -> Result<()> {
        not_provided(BuildStage::Validate)
    }
}

fn not_provided(stage: BuildStage) -> Result<()> {
    debug!("No {stage} builder configured, nothing to do");
    Ok(())
}

/// Where the Build stage got its tile partition from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSetSource {
    /// Computed by ConstructEdges earlier in the same run
    Memory,
    /// Read from `tile_manifest.json`
    Manifest,
    /// Manifest missing: edges were constructed again
    Recomputed,
}

/// What a run did
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildReport {
    pub stages: Vec<BuildStage>,
    pub skipped: Vec<BuildStage>,
    pub tileset_source: Option<TileSetSource>,
    pub tile_count: usize,
}

/// Run the stages `[start, end]`
///
/// A failing stage aborts the run; its temp files stay on disk so that the
/// failure can be inspected.
pub fn build_tile_set(
    config: BuildConfig,
    inputs: &[PathBuf],
    start: BuildStage,
    end: BuildStage,
    handlers: &mut dyn StageHandlers,
) -> Result<BuildReport> {
    let plan = StagePlan::new(start, end, config.hierarchy, config.shortcuts);
    let ctx = BuildContext::new(config, inputs.to_vec());
    let mut report = BuildReport::default();

    if plan.is_empty() {
        warn!("No stages to run between {start} and {end}");
        return Ok(report);
    }
    if inputs.len() > 1 {
        warn!(
            "Building from {} input files; the inputs must not overlap",
            inputs.len()
        );
    }
    if !ctx.config.hierarchy {
        info!("Skipping hierarchy builder and shortcut builder");
    } else if !ctx.config.shortcuts {
        info!("Skipping shortcut builder");
    }
    report.skipped = plan.skipped.iter().map(|s| s.stage).collect();

    let run_start = Instant::now();
    let mut osm_data = OsmData::default();
    let mut tileset: Option<TileSet> = None;

    for step in &plan.steps {
        let stage = step.stage;
        let stage_start = Instant::now();
        info!("Stage {stage} starting");

        match step.reload {
            Reload::None => {}
            Reload::WorkingSet => {
                osm_data = OsmData::read_from_temp_files(&ctx.tile_dir)
                    .with_context(|| format!("{stage}: failed to reload the working dataset"))?;
            }
            // Only written when the previous run ended at or before Enhance
            Reload::UniqueNames if !ctx.files.unique_names.exists() => {
                warn!(
                    "{stage}: no unique names in {}, continuing without them",
                    ctx.tile_dir.display()
                );
                osm_data = OsmData::default();
            }
            Reload::UniqueNames => {
                osm_data = OsmData::read_from_unique_names_file(&ctx.tile_dir)
                    .with_context(|| format!("{stage}: failed to reload unique names"))?;
            }
        }

        match stage {
            BuildStage::Initialize => initialize(&ctx)?,
            BuildStage::ParseWays => osm_data = handlers.parse_ways(&ctx)?,
            BuildStage::ParseRelations => handlers.parse_relations(&ctx, &mut osm_data)?,
            BuildStage::ParseNodes => handlers.parse_nodes(&ctx, &mut osm_data)?,
            BuildStage::ConstructEdges => {
                let tiles = handlers.construct_edges(&ctx)?;
                TileManifest::new(tiles.clone())
                    .write(&ctx.files.tile_manifest)
                    .context("Failed to write tile manifest")?;
                tileset = Some(tiles);
            }
            BuildStage::Build => {
                let (tiles, source) =
                    resolve_tileset(&ctx, handlers, step.manifest, tileset.take())?;
                handlers.build(&ctx, &osm_data, &tiles)?;
                report.tileset_source = Some(source);
                report.tile_count = tiles.len();
                tileset = Some(tiles);
            }
            BuildStage::Enhance => handlers.enhance(&ctx, &osm_data)?,
            BuildStage::Filter => handlers.filter(&ctx)?,
            BuildStage::Transit => handlers.transit(&ctx)?,
            BuildStage::Bss => handlers.bss(&ctx, &osm_data)?,
            BuildStage::Hierarchy => handlers.hierarchy(&ctx)?,
            BuildStage::Shortcuts => handlers.shortcuts(&ctx)?,
            BuildStage::Elevation => handlers.elevation(&ctx)?,
            BuildStage::Restrictions => handlers.restrictions(&ctx)?,
            BuildStage::Validate => handlers.validate(&ctx)?,
            BuildStage::Cleanup => cleanup(&ctx)?,
        }

        if step.snapshot {
            osm_data
                .write_to_temp_files(&ctx.tile_dir)
                .with_context(|| format!("{stage}: failed to snapshot the working dataset"))?;
        }

        info!(
            "Stage {stage} finished in {:.2}s",
            stage_start.elapsed().as_secs_f64()
        );
        report.stages.push(stage);
    }

    info!(
        "Stages {start}..{end} finished in {:.2}s",
        run_start.elapsed().as_secs_f64()
    );
    Ok(report)
}

/// Tile partition for the Build stage
///
/// Entering the pipeline at Build reads the manifest written by an earlier
/// ConstructEdges run. Without a manifest, edges are constructed again: a
/// compatibility path for tile directories prepared before manifests existed.
pub fn resolve_tileset(
    ctx: &BuildContext,
    handlers: &mut dyn StageHandlers,
    action: ManifestAction,
    in_memory: Option<TileSet>,
) -> Result<(TileSet, TileSetSource)> {
    if let (ManifestAction::UseMemory, Some(tiles)) = (action, in_memory) {
        return Ok((tiles, TileSetSource::Memory));
    }

    let path = &ctx.files.tile_manifest;
    if path.exists() {
        let manifest = TileManifest::read(path)
            .with_context(|| format!("Failed to read tile manifest {}", path.display()))?;
        return Ok((manifest.tileset, TileSetSource::Manifest));
    }

    warn!("Tile manifest not found, rebuilding edges and manifest");
    let tiles = handlers.construct_edges(ctx)?;
    Ok((tiles, TileSetSource::Recomputed))
}

/// Purge existing tiles of every level and create the tile directory
///
/// Removing non-empty level directories is destructive and not reversible.
pub fn initialize(ctx: &BuildContext) -> Result<()> {
    let levels = hierarchy::levels()
        .iter()
        .copied()
        .chain(std::iter::once(hierarchy::transit_level()));
    for level in levels {
        let dir = hierarchy::level_dir(&ctx.tile_dir, level.level);
        let non_empty = fs::read_dir(&dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if non_empty {
            warn!("Non-empty {} will be purged of tiles", dir.display());
            fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to purge {}", dir.display()))?;
        }
    }

    fs::create_dir_all(&ctx.tile_dir)
        .with_context(|| format!("Failed to create {}", ctx.tile_dir.display()))?;
    Ok(())
}

/// Remove every temp file, the manifest and the dataset snapshot; files that
/// do not exist are skipped
pub fn cleanup(ctx: &BuildContext) -> Result<()> {
    info!(
        "Cleaning up temporary *.bin files within {}",
        ctx.tile_dir.display()
    );
    for path in ctx.files.bins() {
        remove_temp_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    remove_temp_file(&ctx.files.tile_manifest)
        .with_context(|| format!("Failed to remove {}", ctx.files.tile_manifest.display()))?;
    OsmData::cleanup_temp_files(&ctx.tile_dir).context("Failed to remove dataset snapshot")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_id::GraphId;
    use tempfile::tempdir;

    /// Records calls; construct_edges returns a fixed partition
    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    fn fixed_tileset() -> TileSet {
        let mut tiles = TileSet::new();
        tiles.insert(GraphId::new(756_425, 2, 0).unwrap(), 0);
        tiles
    }

    impl StageHandlers for Recorder {
        fn parse_ways(&mut self, _ctx: &BuildContext) -> Result<OsmData> {
            self.calls.push("parse_ways");
            let mut data = OsmData {
                osm_way_count: 1,
                ..OsmData::default()
            };
            data.names.index("Main Street");
            Ok(data)
        }

        fn parse_relations(&mut self, _ctx: &BuildContext, _d: &mut OsmData) -> Result<()> {
            self.calls.push("parse_relations");
            Ok(())
        }

        fn parse_nodes(&mut self, _ctx: &BuildContext, _d: &mut OsmData) -> Result<()> {
            self.calls.push("parse_nodes");
            Ok(())
        }

        fn construct_edges(&mut self, _ctx: &BuildContext) -> Result<TileSet> {
            self.calls.push("construct_edges");
            Ok(fixed_tileset())
        }

        fn build(&mut self, _ctx: &BuildContext, d: &OsmData, t: &TileSet) -> Result<()> {
            assert_eq!(d.osm_way_count, 1);
            assert_eq!(t, &fixed_tileset());
            self.calls.push("build");
            Ok(())
        }

        fn hierarchy(&mut self, _ctx: &BuildContext) -> Result<()> {
            self.calls.push("hierarchy");
            Ok(())
        }

        fn shortcuts(&mut self, _ctx: &BuildContext) -> Result<()> {
            self.calls.push("shortcuts");
            Ok(())
        }
    }

    #[test]
    fn test_resume_at_build_reads_manifest() -> Result<()> {
        let dir = tempdir()?;
        let config = BuildConfig::for_tile_dir(dir.path());

        let mut first = Recorder::default();
        build_tile_set(
            config.clone(),
            &[],
            BuildStage::Initialize,
            BuildStage::ConstructEdges,
            &mut first,
        )?;
        assert_eq!(
            first.calls,
            vec!["parse_ways", "parse_relations", "parse_nodes", "construct_edges"]
        );
        assert!(dir.path().join("tile_manifest.json").exists());

        let mut second = Recorder::default();
        let report = build_tile_set(config, &[], BuildStage::Build, BuildStage::Build, &mut second)?;
        assert_eq!(second.calls, vec!["build"]);
        assert_eq!(report.tileset_source, Some(TileSetSource::Manifest));
        Ok(())
    }

    #[test]
    fn test_missing_manifest_recomputes() -> Result<()> {
        let dir = tempdir()?;
        let config = BuildConfig::for_tile_dir(dir.path());
        build_tile_set(
            config.clone(),
            &[],
            BuildStage::Initialize,
            BuildStage::ParseNodes,
            &mut Recorder::default(),
        )?;

        let mut resumed = Recorder::default();
        let report = build_tile_set(config, &[], BuildStage::Build, BuildStage::Build, &mut resumed)?;
        assert_eq!(resumed.calls, vec!["construct_edges", "build"]);
        assert_eq!(report.tileset_source, Some(TileSetSource::Recomputed));
        // The recomputed partition is not persisted
        assert!(!dir.path().join("tile_manifest.json").exists());
        Ok(())
    }

    #[test]
    fn test_hierarchy_switches() -> Result<()> {
        let dir = tempdir()?;
        let mut config = BuildConfig::for_tile_dir(dir.path());
        config.shortcuts = false;
        let mut recorder = Recorder::default();
        let report = build_tile_set(
            config,
            &[],
            BuildStage::Hierarchy,
            BuildStage::Shortcuts,
            &mut recorder,
        )?;
        assert_eq!(recorder.calls, vec!["hierarchy"]);
        assert_eq!(report.skipped, vec![BuildStage::Shortcuts]);
        Ok(())
    }

    #[test]
    fn test_initialize_purges_levels_only() -> Result<()> {
        let dir = tempdir()?;
        let ctx = BuildContext::new(BuildConfig::for_tile_dir(dir.path()), vec![]);
        fs::create_dir_all(dir.path().join("2/000"))?;
        fs::write(dir.path().join("2/000/001.gph"), b"x")?;
        fs::create_dir_all(dir.path().join("3"))?;
        fs::write(dir.path().join("3/keep.gph"), b"x")?;
        fs::create_dir_all(dir.path().join("0"))?;
        fs::write(dir.path().join("ways.bin"), b"x")?;

        initialize(&ctx)?;
        assert!(!dir.path().join("2").exists());
        assert!(!dir.path().join("3").exists());
        // Empty level directories are left alone
        assert!(dir.path().join("0").exists());
        assert!(dir.path().join("ways.bin").exists());
        Ok(())
    }

    #[test]
    fn test_cleanup_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let ctx = BuildContext::new(BuildConfig::for_tile_dir(dir.path()), vec![]);
        for path in ctx.files.bins() {
            fs::write(path, b"x")?;
        }
        fs::write(&ctx.files.tile_manifest, b"{}")?;
        fs::write(&ctx.files.osm_data, b"x")?;
        fs::write(&ctx.files.unique_names, b"x")?;
        fs::create_dir_all(dir.path().join("2"))?;

        cleanup(&ctx)?;
        cleanup(&ctx)?;
        let left: Vec<_> = fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .collect();
        assert_eq!(left, vec![std::ffi::OsString::from("2")]);
        Ok(())
    }

    #[test]
    fn test_failed_stage_aborts() {
        struct Failing;
        impl StageHandlers for Failing {
            fn parse_ways(&mut self, _ctx: &BuildContext) -> Result<OsmData> {
                anyhow::bail!("input unreadable")
            }
            fn parse_relations(&mut self, _c: &BuildContext, _d: &mut OsmData) -> Result<()> {
                panic!("must not run after a failure")
            }
            fn parse_nodes(&mut self, _c: &BuildContext, _d: &mut OsmData) -> Result<()> {
                panic!("must not run after a failure")
            }
            fn construct_edges(&mut self, _c: &BuildContext) -> Result<TileSet> {
                panic!("must not run after a failure")
            }
            fn build(&mut self, _c: &BuildContext, _d: &OsmData, _t: &TileSet) -> Result<()> {
                panic!("must not run after a failure")
            }
        }

        let dir = tempdir().unwrap();
        let result = build_tile_set(
            BuildConfig::for_tile_dir(dir.path()),
            &[],
            BuildStage::Initialize,
            BuildStage::LAST,
            &mut Failing,
        );
        assert!(result.is_err());
    }
}
