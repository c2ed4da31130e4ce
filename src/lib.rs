//! # Butterfly-tiles
//!
//! Resumable routing tile builder for OpenStreetMap data.
//!
//! Graph entities are packed into fixed-width binary records
//! ([`formats`]); a staged pipeline ([`pipeline`]) turns raw map data into
//! tiles of those records, persisting its intermediate state so that a build
//! can be restarted at any stage. [`builder`] provides the stage
//! implementations on top of `.osm.pbf` input.

pub mod access;
pub mod admin;
pub mod bits;
pub mod builder;
pub mod config;
pub mod error;
pub mod formats;
pub mod geometry;
pub mod graph_id;
pub mod hierarchy;
pub mod opposing;
pub mod osm_data;
pub mod pipeline;
pub mod point;

#[cfg(test)]
mod test_log;

pub use config::BuildConfig;
pub use error::{Error, Result};
pub use graph_id::GraphId;
pub use pipeline::{build_tile_set, BuildReport, BuildStage, StageHandlers};
pub use point::PointLL;
