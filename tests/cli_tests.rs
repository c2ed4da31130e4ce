//! Tests of the `butterfly-tiles` binary

use std::fs;
use std::process::Command;

use anyhow::Result;
use butterfly_tiles::builder::{MemorySource, TileBuilder};
use butterfly_tiles::{build_tile_set, hierarchy, BuildConfig, BuildStage, PointLL};
use serde_json::Value;
use tempfile::tempdir;

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_butterfly-tiles"))
}

#[test]
fn test_stages_lists_every_stage() -> Result<()> {
    let output = binary().arg("stages").output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let names: Vec<&str> = stdout.lines().collect();
    assert_eq!(names.len(), 16);
    assert_eq!(names.first(), Some(&"initialize"));
    assert_eq!(names.last(), Some(&"cleanup"));
    assert!(names.contains(&"constructedges"));
    Ok(())
}

#[test]
fn test_build_requires_config() -> Result<()> {
    let output = binary().args(["build", "input.osm.pbf"]).output()?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn test_build_rejects_unknown_stage() -> Result<()> {
    let output = binary()
        .args(["build", "--start", "bogus", "input.osm.pbf"])
        .output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("bogus"), "stderr: {stderr}");
    Ok(())
}

#[test]
fn test_build_missing_input_fails() -> Result<()> {
    let dir = tempdir()?;
    let config = format!(
        r#"{{"mjolnir": {{"tile_dir": "{}"}}}}"#,
        dir.path().join("tiles").display()
    );
    let output = binary()
        .args(["build", "--inline-config", &config])
        .arg(dir.path().join("missing.osm.pbf"))
        .output()?;
    assert!(!output.status.success());
    // Temp files of the failed run are kept, no tile was written
    assert!(!dir.path().join("tiles/2").exists());
    Ok(())
}

#[test]
fn test_initialize_alone_needs_no_input() -> Result<()> {
    let dir = tempdir()?;
    let tile_dir = dir.path().join("tiles");
    let config = format!(r#"{{"mjolnir": {{"tile_dir": "{}"}}}}"#, tile_dir.display());
    let output = binary()
        .args(["build", "--inline-config", &config, "-s", "initialize", "-e", "initialize"])
        .output()?;
    assert!(output.status.success(), "{:?}", output);
    assert!(tile_dir.is_dir());

    // A range reaching the parse stages still needs an input
    let output = binary()
        .args(["build", "--inline-config", &config, "-s", "initialize", "-e", "parseways"])
        .output()?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn test_inspect_node() -> Result<()> {
    let dir = tempdir()?;
    let tile_dir = dir.path().join("tiles");
    let source = MemorySource::default()
        .node(1, 4.240, 50.850, &[("highway", "traffic_signals")])
        .node(2, 4.245, 50.850, &[])
        .way(10, &[1, 2], &[("highway", "residential")]);
    build_tile_set(
        BuildConfig::for_tile_dir(&tile_dir),
        &[],
        BuildStage::FIRST,
        BuildStage::LAST,
        &mut TileBuilder::new(source),
    )?;

    let config_path = dir.path().join("config.json");
    fs::write(
        &config_path,
        format!(
            r#"{{"mjolnir": {{"tile_dir": "{}", "timezones": ["Europe/Brussels"]}}}}"#,
            tile_dir.display()
        ),
    )?;
    let tile = hierarchy::local_level()
        .graph_id(&PointLL::new(4.24, 50.85))
        .unwrap();

    let output = binary()
        .args(["inspect", "-c"])
        .arg(&config_path)
        .args(["--tile", &tile.to_string(), "--node", "0"])
        .output()?;
    assert!(output.status.success(), "{:?}", output);
    let node: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(node["edge_count"], 1);
    assert_eq!(node["traffic_signal"], true);
    assert_eq!(node["intersection_type"], "dead-end");
    assert_eq!(node["edges"].as_array().map(Vec::len), Some(1));
    assert_eq!(node["edges"][0]["way_id"], 10);

    let output = binary()
        .args(["inspect", "-c"])
        .arg(&config_path)
        .args(["--tile", &tile.to_string()])
        .output()?;
    assert!(output.status.success());
    let summary: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(summary["nodes"], 2);
    assert_eq!(summary["directed_edges"], 2);
    Ok(())
}
