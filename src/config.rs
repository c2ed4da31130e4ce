//! Build configuration: a JSON tree with the `mjolnir` section consumed here
//!
//! ```json
//! {"mjolnir": {"tile_dir": "/data/tiles", "hierarchy": true, "shortcuts": true}}
//! ```
//!
//! Tiles are only ever built into a plain directory, so the packaged-extract
//! and remote-URL keys are removed before the tree is handed to any stage.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde_json::Value;

use crate::error::{Error, Result};

/// Keys removed from the `mjolnir` section before use
pub const STRIPPED_KEYS: [&str; 3] = ["tile_extract", "tile_url", "traffic_extract"];

#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    tree: Value,
    pub tile_dir: PathBuf,
    pub hierarchy: bool,
    pub shortcuts: bool,
    pub timezones: Vec<String>,
}

impl BuildConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_value(mut tree: Value) -> Result<Self> {
        let Some(mjolnir) = tree.get_mut("mjolnir").and_then(Value::as_object_mut) else {
            return Err(Error::Config("missing \"mjolnir\" section".into()));
        };
        for key in STRIPPED_KEYS {
            if mjolnir.remove(key).is_some() {
                debug!("Ignoring mjolnir.{key}: tiles are built into mjolnir.tile_dir");
            }
        }

        let tile_dir = mjolnir
            .get("tile_dir")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| Error::Config("mjolnir.tile_dir is required".into()))?;
        let hierarchy = bool_or(mjolnir.get("hierarchy"), "hierarchy", true)?;
        let shortcuts = bool_or(mjolnir.get("shortcuts"), "shortcuts", true)?;
        let timezones = match mjolnir.get("timezones") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        Error::Config("mjolnir.timezones must be an array of strings".into())
                    })
                })
                .collect::<Result<_>>()?,
            Some(_) => {
                return Err(Error::Config(
                    "mjolnir.timezones must be an array of strings".into(),
                ))
            }
        };

        Ok(Self {
            tree,
            tile_dir,
            hierarchy,
            shortcuts,
            timezones,
        })
    }

    /// Minimal configuration for a tile directory, all switches on
    pub fn for_tile_dir<P: AsRef<Path>>(tile_dir: P) -> Self {
        let tile_dir = tile_dir.as_ref().to_path_buf();
        Self {
            tree: serde_json::json!({
                "mjolnir": { "tile_dir": tile_dir.to_string_lossy() }
            }),
            tile_dir,
            hierarchy: true,
            shortcuts: true,
            timezones: Vec::new(),
        }
    }

    /// Full tree, stripped keys removed
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// Look up a dotted path such as `mjolnir.hierarchy`
    pub fn get(&self, dotted: &str) -> Option<&Value> {
        dotted
            .split('.')
            .try_fold(&self.tree, |node, key| node.get(key))
    }
}

fn bool_or(value: Option<&Value>, key: &str, default: bool) -> Result<bool> {
    match value {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(Error::Config(format!(
            "mjolnir.{key} must be a boolean, got {other}"
        ))),
    }
}
