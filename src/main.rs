use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use butterfly_tiles::admin::StaticTimezones;
use butterfly_tiles::builder::TileBuilder;
use butterfly_tiles::formats::{GraphTileFile, NodeContext};
use butterfly_tiles::{build_tile_set, hierarchy, BuildConfig, BuildStage, GraphId};
use clap::{Parser, Subcommand};
use log::{error, info};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "butterfly-tiles")]
#[command(about = "Resumable routing tile builder for OpenStreetMap data", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build tiles from PBF files, optionally only a range of stages
    Build {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Configuration as a JSON string, used instead of --config
        #[arg(short, long)]
        inline_config: Option<String>,
        /// First stage to run
        #[arg(short, long, default_value = "initialize")]
        start: BuildStage,
        /// Last stage to run
        #[arg(short, long, default_value = "cleanup")]
        end: BuildStage,
        /// Input .osm.pbf files
        inputs: Vec<PathBuf>,
    },
    /// Print the contents of a built tile as JSON
    Inspect {
        /// JSON configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Tile id, as `level/tile_id/id` or a raw value
        #[arg(long)]
        tile: GraphId,
        /// Print a single node with its edges
        #[arg(long)]
        node: Option<u32>,
    },
    /// List the build stages in order
    Stages,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run(cli.command) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Build {
            config,
            inline_config,
            start,
            end,
            inputs,
        } => {
            let config = load_config(config, inline_config)?;
            if start > end {
                bail!("Start stage {start} comes after end stage {end}");
            }
            let parses = start <= BuildStage::ParseNodes && end >= BuildStage::ParseWays;
            if parses && inputs.is_empty() {
                bail!("Stages {start} to {end} need at least one input file");
            }
            let mut builder = TileBuilder::pbf();
            let report = build_tile_set(config, &inputs, start, end, &mut builder)?;
            info!(
                "Ran {} stages, {} tiles built",
                report.stages.len(),
                report.tile_count
            );
        }
        Commands::Inspect { config, tile, node } => {
            let config = BuildConfig::from_file(&config)
                .with_context(|| format!("Failed to load {}", config.display()))?;
            let out = inspect(&config, tile, node)?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Stages => {
            for stage in BuildStage::all() {
                println!("{stage}");
            }
        }
    }
    Ok(())
}

fn load_config(path: Option<PathBuf>, inline: Option<String>) -> Result<BuildConfig> {
    match (path, inline) {
        (_, Some(json)) => BuildConfig::from_json_str(&json).context("Invalid inline config"),
        (Some(path), None) => BuildConfig::from_file(&path)
            .with_context(|| format!("Failed to load {}", path.display())),
        (None, None) => bail!("Either --config or --inline-config is required"),
    }
}

fn inspect(config: &BuildConfig, tile_id: GraphId, node: Option<u32>) -> Result<Value> {
    let path = hierarchy::tile_path(&config.tile_dir, tile_id);
    let tile =
        GraphTileFile::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;

    let Some(index) = node else {
        return Ok(json!({
            "graph_id": tile.id.to_string(),
            "base_lat": tile.base_ll.lat,
            "base_lon": tile.base_ll.lon,
            "nodes": tile.nodes.len(),
            "directed_edges": tile.directed_edges.len(),
            "access_restrictions": tile.access_restrictions.len(),
            "admins": tile.admins.len(),
            "edge_infos": tile.edge_infos.len(),
        }));
    };

    let Some(record) = tile.nodes.get(index as usize) else {
        bail!("Tile {} has {} nodes, no node {index}", tile.id, tile.nodes.len());
    };
    let timezones = StaticTimezones::new(config.timezones.iter().cloned());
    let ctx = NodeContext {
        base_ll: tile.base_ll,
        admin: tile.admin(record.admin_index()),
        timezones: &timezones,
    };
    let mut out = record.to_json(&ctx);

    let range = tile.edge_range(record);
    let edges: Vec<Value> = range
        .map(|i| {
            let edge = &tile.directed_edges[i];
            let info = tile.edge_info(edge);
            json!({
                "end_node": edge.end_node().to_string(),
                "length": edge.length(),
                "forward": edge.forward(),
                "opp_index": edge.opp_index(),
                "curvature": edge.curvature(),
                "way_id": info.map(|e| e.way_id),
                "restrictions": tile
                    .restrictions_for_edge(i as u32)
                    .iter()
                    .map(|r| r.to_json())
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    out["graph_id"] = Value::from(tile.id.with_id(index)?.to_string());
    out["edges"] = Value::from(edges);
    Ok(out)
}
