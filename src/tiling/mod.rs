//! Cutting map requests into tile pyramids.
//!
//! [`TilePlanner`] picks the gridset and zoom levels, [`TileRasterizer`]
//! enumerates and renders the tiles, and [`TilingSession`] ties both to a
//! [`crate::Gpkg`] container.

mod grid;
mod options;
mod planner;
mod rasterizer;
mod render;
mod session;

pub use grid::{Grid, GridSet, GridSetRegistry};
pub use options::TilingOptions;
pub use planner::{TilePlan, TilePlanner, ZoomPlan};
pub use rasterizer::{TileRange, TileRasterizer, TileSink};
pub use render::{MapRenderer, RenderRequest};
pub use session::{SessionSummary, TilingSession, write_geopackage};
