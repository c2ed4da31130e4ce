//! Reference tile builder
//!
//! Implements the stages from parsing through Build plus Validate on top of an
//! [`OsmSource`]. Every intermediate result goes through the temp files under
//! the tile directory, so any stage can be the first one of a run.

pub mod edges;
pub mod parse;
pub mod records;
pub mod source;
pub mod tiles;
pub mod validate;

use anyhow::Result;

use crate::formats::manifest::TileSet;
use crate::osm_data::OsmData;
use crate::pipeline::{BuildContext, StageHandlers};

pub use source::{MemorySource, OsmElement, OsmSource, PbfSource};

pub struct TileBuilder<S> {
    source: S,
}

impl<S: OsmSource> TileBuilder<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl TileBuilder<PbfSource> {
    pub fn pbf() -> Self {
        Self::new(PbfSource)
    }
}

impl<S: OsmSource> StageHandlers for TileBuilder<S> {
    fn parse_ways(&mut self, ctx: &BuildContext) -> Result<OsmData> {
        parse::parse_ways(&self.source, ctx)
    }

    fn parse_relations(&mut self, ctx: &BuildContext, osm_data: &mut OsmData) -> Result<()> {
        parse::parse_relations(&self.source, ctx, osm_data)
    }

    fn parse_nodes(&mut self, ctx: &BuildContext, osm_data: &mut OsmData) -> Result<()> {
        parse::parse_nodes(&self.source, ctx, osm_data)
    }

    fn construct_edges(&mut self, ctx: &BuildContext) -> Result<TileSet> {
        edges::construct_edges(ctx)
    }

    fn build(&mut self, ctx: &BuildContext, osm_data: &OsmData, tileset: &TileSet) -> Result<()> {
        tiles::build_tiles(ctx, osm_data, tileset)
    }

    fn validate(&mut self, ctx: &BuildContext) -> Result<()> {
        validate::validate(ctx)
    }
}
