//! GeoPackage tile pyramid writer built on top of rusqlite.
//!
//! ## Overview
//!
//! - `Gpkg` represents a GeoPackage file holding one or more tile tables.
//! - `TileEntry` describes a tile table: its extent, SRS and tile matrices.
//! - `Tile` is a single encoded image addressed by zoom, column and row.
//! - `TilingSession` renders a `MapRequest` tile by tile into a `Gpkg`.
//!
//! `Gpkg` is the entry point and supports several open modes:
//!
//! - `Gpkg::open_read_only(path)`: open an existing file without write access.
//! - `Gpkg::open(path)`: open an existing file for read/write.
//! - `Gpkg::new(path)`: create a new file.
//! - `Gpkg::new_in_memory()`: create a transient in-memory GeoPackage.
//! - `Gpkg::open_with_options(path, &options)`: open or create a file with
//!   explicit SQLite pragmas, e.g. `ContainerOptions::throughput()`.
//!
//! Rows follow the GeoPackage convention: row 0 is the top of the matrix.
//!
//! ## Tiling a map
//!
//! The renderer is any `MapRenderer`; closures taking a `RenderRequest`
//! work too. Options use the WMS `format_options` syntax.
//!
//! ```no_run
//! use rusqlite_gpkg_tiles::{
//!     BoundingBox, BoxError, GridSetRegistry, LayerInfo, LayerKind, MapRequest, RenderRequest,
//!     TilingOptions, write_geopackage,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = MapRequest {
//!         layers: vec![LayerInfo::new("topp:states", LayerKind::Vector)],
//!         bbox: BoundingBox::new(-124.73, 24.96, -66.97, 49.37),
//!         srs_id: 4326,
//!         title: None,
//!     };
//!     let options: TilingOptions = "min_zoom:3;num_zooms:4;format:image/png".parse()?;
//!
//!     let mut renderer = |request: &RenderRequest<'_>| -> Result<Vec<u8>, BoxError> {
//!         // Hand request.bbox, request.width and request.height to the map engine.
//!         Ok(std::fs::read("blank.png")?)
//!     };
//!
//!     let summary = write_geopackage(
//!         "states.gpkg",
//!         &request,
//!         options,
//!         &GridSetRegistry::default(),
//!         &mut renderer,
//!     )?;
//!     println!("{}: {} tiles", summary.table_name, summary.tiles_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Reader
//!
//! ```no_run
//! use rusqlite_gpkg_tiles::Gpkg;
//!
//! let gpkg = Gpkg::open_read_only("states.gpkg")?;
//! for table_name in gpkg.list_tile_entries()? {
//!     let entry = gpkg.tile_entry(&table_name)?;
//!     for matrix in &entry.tile_matrices {
//!         println!(
//!             "{table_name} z{}: {}x{} tiles",
//!             matrix.zoom_level, matrix.matrix_width, matrix.matrix_height
//!         );
//!     }
//!     if let Some(tile) = gpkg.tile(&entry, 0, 0, 0)? {
//!         println!("top-left tile has {} bytes", tile.data.len());
//!     }
//! }
//! # Ok::<(), rusqlite_gpkg_tiles::GpkgError>(())
//! ```
//!
//! `Gpkg::tiles()` always allocates a `Vec<Tile>` for the whole table. For
//! large pyramids, use `tiles_batch(&entry, batch_size)` to iterate in chunks
//! and limit peak memory.
mod error;
mod gpkg;
mod ogc_sql;
mod tiling;
mod types;

pub use error::{BoxError, ErrorKind, GpkgError, Result};
pub use gpkg::{
    ContainerOptions, Gpkg, GpkgTileBatchIterator, JournalMode, LockingMode, SynchronousMode,
};
pub use tiling::{
    Grid, GridSet, GridSetRegistry, MapRenderer, RenderRequest, SessionSummary, TilePlan,
    TilePlanner, TileRange, TileRasterizer, TileSink, TilingOptions, TilingSession, ZoomPlan,
    write_geopackage,
};
pub use types::{
    BoundingBox, LayerInfo, LayerKind, MapRequest, Tile, TileEntry, TileFormat, TileMatrix,
};
