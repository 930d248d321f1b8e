//! GeoPackage tile container backed by rusqlite.
//!
//! The container owns a single SQLite file. Tile entries are written once
//! with `create_tile_entry`, then tiles are appended with `add_tile`.

mod gpkg;
mod options;
mod tile_reader;

pub use gpkg::Gpkg;
pub use options::{ContainerOptions, JournalMode, LockingMode, SynchronousMode};
pub use tile_reader::GpkgTileBatchIterator;
