use crate::error::{GpkgError, Result};
use crate::ogc_sql::{
    SQL_HAS_GPKG_CONTENTS, SQL_IDENTIFIER_EXISTS, SQL_INSERT_GPKG_CONTENTS, SQL_INSERT_GPKG_SPATIAL_REF_SYS,
    SQL_INSERT_GPKG_TILE_MATRIX, SQL_INSERT_GPKG_TILE_MATRIX_SET, SQL_INSERT_WEBP_EXTENSION,
    SQL_LIST_TILE_ENTRIES, SQL_SELECT_GPKG_CONTENTS, SQL_SELECT_GPKG_TILE_MATRIX,
    SQL_SELECT_GPKG_TILE_MATRIX_SET, SQL_SRS_EXISTS, SQL_TABLE_EXISTS, initialize_gpkg,
    sql_count_tiles, sql_create_tile_table, sql_first_tile_data, sql_insert_tile,
    sql_select_tile, sql_select_tiles, sql_select_zoom_levels,
};
use crate::tiling::TileSink;
use crate::types::{BoundingBox, Tile, TileEntry, TileFormat, TileMatrix};
use rusqlite::{OpenFlags, OptionalExtension};
use std::cell::Cell;
use std::path::Path;

use super::options::ContainerOptions;
use super::tile_reader::{GpkgTileBatchIterator, row_to_tile};

#[derive(Debug)]
/// GeoPackage connection wrapper for writing and reading tile pyramids.
///
/// Tiles added with [`Gpkg::add_tile`] are committed in batches of
/// `ContainerOptions::batch_insert_size`. Call [`Gpkg::flush`] or
/// [`Gpkg::close`] to commit the last partial batch; dropping the value
/// without doing so discards it.
pub struct Gpkg {
    conn: rusqlite::Connection,
    read_only: bool,
    batch_insert_size: usize,
    pending: Cell<usize>,
}

impl Gpkg {
    /// Open a GeoPackage in read-only mode.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = rusqlite::Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|source| GpkgError::CannotOpen {
                path: path.to_path_buf(),
                source,
            })?;
        if !has_gpkg_contents(&conn)? {
            return Err(GpkgError::NotAGeoPackage(path.to_path_buf()));
        }
        Ok(Self {
            conn,
            read_only: true,
            batch_insert_size: 1,
            pending: Cell::new(0),
        })
    }

    /// Open an existing GeoPackage in read-write mode.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GpkgError::MissingFile(path.to_path_buf()));
        }
        Self::open_with_options(path, &ContainerOptions::default())
    }

    /// Create a new GeoPackage.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(GpkgError::FileAlreadyExists(path.to_path_buf()));
        }
        Self::open_with_options(path, &ContainerOptions::default())
    }

    /// Create a new GeoPackage in memory
    pub fn new_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        initialize_gpkg(&conn)?;

        Ok(Self {
            conn,
            read_only: false,
            batch_insert_size: 1,
            pending: Cell::new(0),
        })
    }

    /// Open a GeoPackage for writing, creating and initializing the file if
    /// it does not exist yet.
    ///
    /// The pragmas in `options` are applied before anything else touches the
    /// file. An existing SQLite file without `gpkg_contents` is rejected
    /// unless it is completely empty.
    ///
    /// ```no_run
    /// use rusqlite_gpkg_tiles::{ContainerOptions, Gpkg};
    ///
    /// let gpkg = Gpkg::open_with_options("tiles.gpkg", &ContainerOptions::throughput())?;
    /// gpkg.close()?;
    /// # Ok::<(), rusqlite_gpkg_tiles::GpkgError>(())
    /// ```
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: &ContainerOptions) -> Result<Self> {
        let path = path.as_ref();
        let conn = rusqlite::Connection::open_with_flags(path, options.open_flags()).map_err(
            |source| GpkgError::CannotOpen {
                path: path.to_path_buf(),
                source,
            },
        )?;
        options.apply(&conn)?;

        if !has_gpkg_contents(&conn)? {
            let table_count: i64 =
                conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get(0))?;
            if table_count > 0 {
                return Err(GpkgError::NotAGeoPackage(path.to_path_buf()));
            }
            log::debug!("initializing GeoPackage at {}", path.display());
            initialize_gpkg(&conn)?;
        }

        Ok(Self {
            conn,
            read_only: false,
            batch_insert_size: options.effective_batch_size(),
            pending: Cell::new(0),
        })
    }

    /// Expert-only: register a spatial reference system in gpkg_spatial_ref_sys.
    ///
    /// Tile entries must reference a valid `srs_id` that already exists in
    /// `gpkg_spatial_ref_sys`. New containers only carry EPSG:4326,
    /// EPSG:3857 and the two undefined systems, so any other SRS has to be
    /// inserted here before a tile entry can use it.
    ///
    /// This method performs a direct insert with all required columns and does
    /// no validation of the WKT or authority fields.
    pub fn register_srs(
        &self,
        srs_name: &str,
        srs_id: i32,
        organization: &str,
        organization_coordsys_id: i32,
        definition: &str,
        description: &str,
    ) -> Result<()> {
        self.ensure_writable()?;

        self.conn.execute(
            SQL_INSERT_GPKG_SPATIAL_REF_SYS,
            rusqlite::params![
                srs_name,
                srs_id,
                organization,
                organization_coordsys_id,
                definition,
                description
            ],
        )?;
        Ok(())
    }

    /// Write the metadata of a tile pyramid and create its tile table.
    ///
    /// This writes `gpkg_contents`, `gpkg_tile_matrix_set` and one
    /// `gpkg_tile_matrix` row per matrix in a single transaction.
    pub fn create_tile_entry(&self, entry: &TileEntry) -> Result<()> {
        self.ensure_writable()?;
        validate_tile_matrices(entry)?;

        if self.table_exists(&entry.table_name)? {
            return Err(GpkgError::TileEntryAlreadyExists {
                table_name: entry.table_name.clone(),
            });
        }
        if !self.srs_exists(entry.srs_id)? {
            return Err(GpkgError::MissingSpatialRefSysId {
                srs_id: entry.srs_id,
            });
        }

        let identifier = self.available_identifier(entry)?;

        self.flush()?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&sql_create_tile_table(&entry.table_name), [])?;

        let bounds = &entry.bounds;
        tx.execute(
            SQL_INSERT_GPKG_CONTENTS,
            rusqlite::params![
                entry.table_name,
                identifier,
                entry.description.as_deref().unwrap_or(""),
                bounds.min_x,
                bounds.min_y,
                bounds.max_x,
                bounds.max_y,
                entry.srs_id
            ],
        )?;

        let tms = &entry.tile_matrix_set_bounds;
        tx.execute(
            SQL_INSERT_GPKG_TILE_MATRIX_SET,
            rusqlite::params![
                entry.table_name,
                entry.srs_id,
                tms.min_x,
                tms.min_y,
                tms.max_x,
                tms.max_y
            ],
        )?;

        {
            let mut stmt = tx.prepare(SQL_INSERT_GPKG_TILE_MATRIX)?;
            for matrix in &entry.tile_matrices {
                stmt.execute(rusqlite::params![
                    entry.table_name,
                    matrix.zoom_level,
                    matrix.matrix_width,
                    matrix.matrix_height,
                    matrix.tile_width,
                    matrix.tile_height,
                    matrix.pixel_x_size,
                    matrix.pixel_y_size
                ])?;
            }
        }

        if entry.format == TileFormat::WebP {
            tx.execute(SQL_INSERT_WEBP_EXTENSION, [&entry.table_name])?;
        }

        tx.commit()?;
        log::debug!(
            "created tile entry '{}' with {} tile matrices",
            entry.table_name,
            entry.tile_matrices.len()
        );
        Ok(())
    }

    /// Append one tile to the table of `entry`.
    ///
    /// `tile.row` must already count from the top of the matrix.
    pub fn add_tile(&self, entry: &TileEntry, tile: Tile) -> Result<()> {
        self.ensure_writable()?;

        if self.pending.get() == 0 && self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }

        let mut stmt = self
            .conn
            .prepare_cached(&sql_insert_tile(&entry.table_name))?;
        stmt.execute(rusqlite::params![
            tile.zoom,
            tile.column,
            tile.row,
            tile.data
        ])?;
        log::trace!(
            "added tile {}/{}/{} ({} bytes) to '{}'",
            tile.zoom,
            tile.column,
            tile.row,
            tile.data.len(),
            entry.table_name
        );

        self.pending.set(self.pending.get() + 1);
        if self.pending.get() >= self.batch_insert_size {
            self.commit_batch()?;
        }
        Ok(())
    }

    /// Commit tiles added since the last batch boundary.
    pub fn flush(&self) -> Result<()> {
        if self.pending.get() > 0 || !self.conn.is_autocommit() {
            self.commit_batch()?;
        }
        Ok(())
    }

    /// Commit pending tiles and release the file (and its lock).
    pub fn close(self) -> Result<()> {
        self.flush()?;
        self.conn.close().map_err(|(_, err)| GpkgError::Sql(err))
    }

    /// List the names of the tile tables.
    pub fn list_tile_entries(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(SQL_LIST_TILE_ENTRIES)?;
        let entries = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(entries)
    }

    /// Load a tile entry and its tile matrices by table name.
    pub fn tile_entry(&self, table_name: &str) -> Result<TileEntry> {
        let contents = self
            .conn
            .query_row(SQL_SELECT_GPKG_CONTENTS, [table_name], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    BoundingBox::new(row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?),
                    row.get::<_, i32>(6)?,
                ))
            })
            .optional()?;
        let Some((identifier, description, bounds, srs_id)) = contents else {
            return Err(GpkgError::MissingTileEntry {
                table_name: table_name.to_string(),
            });
        };

        let tile_matrix_set_bounds =
            self.conn
                .query_row(SQL_SELECT_GPKG_TILE_MATRIX_SET, [table_name], |row| {
                    Ok(BoundingBox::new(
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                    ))
                })?;

        let mut stmt = self.conn.prepare(SQL_SELECT_GPKG_TILE_MATRIX)?;
        let tile_matrices = stmt
            .query_map([table_name], |row| {
                Ok(TileMatrix {
                    zoom_level: row.get(0)?,
                    matrix_width: row.get(1)?,
                    matrix_height: row.get(2)?,
                    tile_width: row.get(3)?,
                    tile_height: row.get(4)?,
                    pixel_x_size: row.get(5)?,
                    pixel_y_size: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<TileMatrix>, _>>()?;

        // GeoPackage does not record the tile encoding, so look at the data.
        let first_tile: Option<Vec<u8>> = self
            .conn
            .query_row(&sql_first_tile_data(table_name), [], |row| row.get(0))
            .optional()?;
        let format = first_tile
            .as_deref()
            .and_then(TileFormat::sniff)
            .unwrap_or_default();

        Ok(TileEntry {
            table_name: table_name.to_string(),
            identifier,
            description: description.filter(|d| !d.is_empty()),
            bounds,
            srs_id,
            tile_matrix_set_bounds,
            tile_matrices,
            format,
        })
    }

    /// Read a single tile, `row` counting from the top of the matrix.
    pub fn tile(&self, entry: &TileEntry, zoom: u32, column: u32, row: u32) -> Result<Option<Tile>> {
        let mut stmt = self.conn.prepare_cached(&sql_select_tile(&entry.table_name))?;
        let tile = stmt
            .query_row(rusqlite::params![zoom, column, row], row_to_tile)
            .optional()?;
        Ok(tile)
    }

    /// Read every tile of `entry`, ordered by zoom, row and column.
    pub fn tiles(&self, entry: &TileEntry) -> Result<Vec<Tile>> {
        let mut stmt = self
            .conn
            .prepare(&sql_select_tiles(&entry.table_name, None))?;
        let tiles = stmt
            .query_map([], row_to_tile)?
            .collect::<std::result::Result<Vec<Tile>, _>>()?;
        Ok(tiles)
    }

    /// Iterate over the tiles of `entry` in chunks of `batch_size`.
    ///
    /// ```no_run
    /// use rusqlite_gpkg_tiles::Gpkg;
    ///
    /// let gpkg = Gpkg::open_read_only("tiles.gpkg")?;
    /// let entry = gpkg.tile_entry("world")?;
    /// for batch in gpkg.tiles_batch(&entry, 500)? {
    ///     for tile in batch? {
    ///         println!("{}/{}/{}", tile.zoom, tile.column, tile.row);
    ///     }
    /// }
    /// # Ok::<(), rusqlite_gpkg_tiles::GpkgError>(())
    /// ```
    pub fn tiles_batch(&self, entry: &TileEntry, batch_size: u32) -> Result<GpkgTileBatchIterator<'_>> {
        let batch_size = batch_size.max(1);
        let stmt = self
            .conn
            .prepare(&sql_select_tiles(&entry.table_name, Some(batch_size)))?;
        Ok(GpkgTileBatchIterator {
            stmt,
            batch_size,
            offset: 0,
            end_or_invalid_state: false,
        })
    }

    /// Number of tiles stored for `entry`.
    pub fn count_tiles(&self, entry: &TileEntry) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row(&sql_count_tiles(&entry.table_name), [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Zoom levels that hold at least one tile of `entry`, ascending.
    pub fn zoom_levels(&self, entry: &TileEntry) -> Result<Vec<u32>> {
        let mut stmt = self
            .conn
            .prepare(&sql_select_zoom_levels(&entry.table_name))?;
        let zooms = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<u32>, _>>()?;
        Ok(zooms)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &rusqlite::Connection {
        &self.conn
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(GpkgError::ReadOnly);
        }
        Ok(())
    }

    fn commit_batch(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
            log::trace!("committed batch of {} tiles", self.pending.get());
        }
        self.pending.set(0);
        Ok(())
    }

    fn table_exists(&self, table_name: &str) -> Result<bool> {
        let exists: i64 = self
            .conn
            .query_row(SQL_TABLE_EXISTS, [table_name], |row| row.get(0))?;
        Ok(exists != 0)
    }

    fn identifier_exists(&self, identifier: &str) -> Result<bool> {
        let exists: i64 = self
            .conn
            .query_row(SQL_IDENTIFIER_EXISTS, [identifier], |row| row.get(0))?;
        Ok(exists != 0)
    }

    /// `gpkg_contents.identifier` is unique, so an identifier already used by
    /// another table falls back to the table name, then to NULL.
    fn available_identifier(&self, entry: &TileEntry) -> Result<Option<String>> {
        let candidates = entry
            .identifier
            .iter()
            .chain(std::iter::once(&entry.table_name));
        for candidate in candidates {
            if !self.identifier_exists(candidate)? {
                return Ok(Some(candidate.clone()));
            }
        }
        log::debug!(
            "identifier of '{}' is already taken, leaving it empty",
            entry.table_name
        );
        Ok(None)
    }

    fn srs_exists(&self, srs_id: i32) -> Result<bool> {
        let exists: i64 = self
            .conn
            .query_row(SQL_SRS_EXISTS, [srs_id], |row| row.get(0))?;
        Ok(exists != 0)
    }
}

impl TileSink for Gpkg {
    fn add(&mut self, entry: &TileEntry, tile: Tile) -> Result<()> {
        self.add_tile(entry, tile)
    }
}

fn has_gpkg_contents(conn: &rusqlite::Connection) -> Result<bool> {
    let exists: i64 = conn.query_row(SQL_HAS_GPKG_CONTENTS, [], |row| row.get(0))?;
    Ok(exists != 0)
}

fn validate_tile_matrices(entry: &TileEntry) -> Result<()> {
    if entry.tile_matrices.is_empty() {
        return Err(GpkgError::EmptyTileMatrixSet {
            table_name: entry.table_name.clone(),
        });
    }
    for pair in entry.tile_matrices.windows(2) {
        if pair[1].zoom_level <= pair[0].zoom_level {
            return Err(GpkgError::UnorderedZoomLevels {
                table_name: entry.table_name.clone(),
                previous: pair[0].zoom_level,
                next: pair[1].zoom_level,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Gpkg;
    use crate::Result;
    use crate::error::{ErrorKind, GpkgError};
    use crate::gpkg::ContainerOptions;
    use crate::types::{BoundingBox, Tile, TileEntry, TileFormat, TileMatrix};

    fn world_entry(table_name: &str, zooms: &[u32]) -> TileEntry {
        let world = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
        TileEntry {
            table_name: table_name.to_string(),
            identifier: Some(format!("{table_name} identifier")),
            description: Some("test tiles".to_string()),
            bounds: BoundingBox::new(-10.0, -10.0, 10.0, 10.0),
            srs_id: 4326,
            tile_matrix_set_bounds: world,
            tile_matrices: zooms
                .iter()
                .map(|&z| {
                    let width = 2u32 << z;
                    TileMatrix {
                        zoom_level: z,
                        matrix_width: width,
                        matrix_height: width / 2,
                        tile_width: 256,
                        tile_height: 256,
                        pixel_x_size: 360.0 / (width as f64 * 256.0),
                        pixel_y_size: 360.0 / (width as f64 * 256.0),
                    }
                })
                .collect(),
            format: TileFormat::Png,
        }
    }

    fn tile(zoom: u32, column: u32, row: u32) -> Tile {
        Tile {
            zoom,
            column,
            row,
            data: vec![0x89, b'P', b'N', b'G', zoom as u8, column as u8, row as u8],
        }
    }

    #[test]
    fn creates_tile_entry_metadata() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let entry = world_entry("world", &[0, 1, 2]);
        gpkg.create_tile_entry(&entry)?;

        let (data_type, srs_id, min_x, max_y): (String, i32, f64, f64) =
            gpkg.connection().query_row(
                "SELECT data_type, srs_id, min_x, max_y FROM gpkg_contents WHERE table_name = 'world'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
        assert_eq!(data_type, "tiles");
        assert_eq!(srs_id, 4326);
        assert_eq!(min_x, -10.0);
        assert_eq!(max_y, 10.0);

        let (tms_min_x, tms_max_y): (f64, f64) = gpkg.connection().query_row(
            "SELECT min_x, max_y FROM gpkg_tile_matrix_set WHERE table_name = 'world'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        assert_eq!(tms_min_x, -180.0);
        assert_eq!(tms_max_y, 90.0);

        let matrices: i64 = gpkg.connection().query_row(
            "SELECT COUNT(*) FROM gpkg_tile_matrix WHERE table_name = 'world'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(matrices, 3);

        let reloaded = gpkg.tile_entry("world")?;
        assert_eq!(reloaded, entry);
        assert_eq!(gpkg.list_tile_entries()?, vec!["world".to_string()]);
        Ok(())
    }

    #[test]
    fn taken_identifier_falls_back_to_table_name() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let mut first = world_entry("states_a", &[0]);
        first.identifier = Some("USA Population".to_string());
        let mut second = world_entry("states_b", &[0]);
        second.identifier = Some("USA Population".to_string());

        gpkg.create_tile_entry(&first)?;
        gpkg.create_tile_entry(&second)?;

        assert_eq!(
            gpkg.tile_entry("states_a")?.identifier.as_deref(),
            Some("USA Population")
        );
        assert_eq!(
            gpkg.tile_entry("states_b")?.identifier.as_deref(),
            Some("states_b")
        );
        Ok(())
    }

    #[test]
    fn quotes_in_table_names_are_escaped() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let name = r#"x" (a INT); DROP TABLE gpkg_extensions; --"#;
        let entry = world_entry(name, &[0]);
        gpkg.create_tile_entry(&entry)?;
        gpkg.add_tile(&entry, tile(0, 1, 0))?;

        assert_eq!(gpkg.list_tile_entries()?, vec![name.to_string()]);
        assert_eq!(gpkg.count_tiles(&entry)?, 1);
        assert_eq!(gpkg.tile(&entry, 0, 1, 0)?, Some(tile(0, 1, 0)));
        let extensions: i64 = gpkg.connection().query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE name = 'gpkg_extensions'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(extensions, 1);
        Ok(())
    }

    #[test]
    fn sets_geopackage_application_id() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let application_id: i32 =
            gpkg.connection()
                .query_row("PRAGMA application_id", [], |row| row.get(0))?;
        let user_version: i32 = gpkg
            .connection()
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        assert_eq!(application_id, 0x4750_4B47);
        assert_eq!(user_version, 10300);
        Ok(())
    }

    #[test]
    fn create_tile_entry_rejects_duplicates() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let entry = world_entry("world", &[0]);
        gpkg.create_tile_entry(&entry)?;
        let err = gpkg
            .create_tile_entry(&entry)
            .expect_err("duplicate should fail");
        assert!(matches!(err, GpkgError::TileEntryAlreadyExists { .. }));
        Ok(())
    }

    #[test]
    fn create_tile_entry_requires_existing_srs() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let mut entry = world_entry("unknown_srs", &[0]);
        entry.srs_id = 9999;
        let err = gpkg
            .create_tile_entry(&entry)
            .expect_err("missing srs should fail");
        assert!(matches!(
            err,
            GpkgError::MissingSpatialRefSysId { srs_id: 9999 }
        ));
        assert_eq!(err.kind(), ErrorKind::Configuration);

        gpkg.register_srs("Custom", 9999, "NONE", 9999, "undefined", "custom")?;
        gpkg.create_tile_entry(&entry)?;
        Ok(())
    }

    #[test]
    fn create_tile_entry_rejects_unordered_zooms() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let entry = world_entry("unordered", &[1, 1]);
        let err = gpkg
            .create_tile_entry(&entry)
            .expect_err("repeated zoom should fail");
        assert!(matches!(
            err,
            GpkgError::UnorderedZoomLevels {
                previous: 1,
                next: 1,
                ..
            }
        ));

        let empty = world_entry("empty", &[]);
        let err = gpkg
            .create_tile_entry(&empty)
            .expect_err("empty matrix set should fail");
        assert!(matches!(err, GpkgError::EmptyTileMatrixSet { .. }));
        Ok(())
    }

    #[test]
    fn registers_webp_extension() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let mut entry = world_entry("webp_tiles", &[0]);
        entry.format = TileFormat::WebP;
        gpkg.create_tile_entry(&entry)?;

        let extension: String = gpkg.connection().query_row(
            "SELECT extension_name FROM gpkg_extensions WHERE table_name = 'webp_tiles'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(extension, "gpkg_webp");
        Ok(())
    }

    #[test]
    fn adds_and_reads_tiles() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let entry = world_entry("world", &[0, 1]);
        gpkg.create_tile_entry(&entry)?;

        gpkg.add_tile(&entry, tile(0, 0, 0))?;
        gpkg.add_tile(&entry, tile(0, 1, 0))?;
        gpkg.add_tile(&entry, tile(1, 3, 1))?;

        assert_eq!(gpkg.count_tiles(&entry)?, 3);
        assert_eq!(gpkg.zoom_levels(&entry)?, vec![0, 1]);
        assert_eq!(gpkg.tile(&entry, 1, 3, 1)?, Some(tile(1, 3, 1)));
        assert_eq!(gpkg.tile(&entry, 1, 0, 0)?, None);
        assert_eq!(
            gpkg.tiles(&entry)?,
            vec![tile(0, 0, 0), tile(0, 1, 0), tile(1, 3, 1)]
        );
        Ok(())
    }

    #[test]
    fn duplicate_tile_coordinates_fail() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let entry = world_entry("world", &[0]);
        gpkg.create_tile_entry(&entry)?;
        gpkg.add_tile(&entry, tile(0, 0, 0))?;

        let err = gpkg
            .add_tile(&entry, tile(0, 0, 0))
            .expect_err("duplicate tile should fail");
        assert!(matches!(err, GpkgError::Sql(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
        Ok(())
    }

    #[test]
    fn batches_commit_on_boundary_and_flush() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("batched.gpkg");
        let options = ContainerOptions {
            batch_insert_size: 3,
            ..ContainerOptions::default()
        };
        let gpkg = Gpkg::open_with_options(&path, &options)?;
        let entry = world_entry("world", &[2]);
        gpkg.create_tile_entry(&entry)?;

        for column in 0..4 {
            gpkg.add_tile(&entry, tile(2, column, 0))?;
        }
        // The fourth tile opened a new batch.
        assert!(!gpkg.connection().is_autocommit());
        gpkg.flush()?;
        assert!(gpkg.connection().is_autocommit());
        gpkg.close()?;

        let reader = Gpkg::open_read_only(&path)?;
        let entry = reader.tile_entry("world")?;
        assert_eq!(reader.count_tiles(&entry)?, 4);
        Ok(())
    }

    #[test]
    fn unflushed_batch_is_discarded_on_drop() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("dropped.gpkg");
        let options = ContainerOptions {
            batch_insert_size: 10,
            ..ContainerOptions::default()
        };
        {
            let gpkg = Gpkg::open_with_options(&path, &options)?;
            let entry = world_entry("world", &[0]);
            gpkg.create_tile_entry(&entry)?;
            gpkg.add_tile(&entry, tile(0, 0, 0))?;
        }

        let reader = Gpkg::open_read_only(&path)?;
        let entry = reader.tile_entry("world")?;
        assert_eq!(reader.count_tiles(&entry)?, 0);
        Ok(())
    }

    #[test]
    fn reopens_existing_file_with_options() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("reopen.gpkg");
        Gpkg::new(&path)?.close()?;

        let gpkg = Gpkg::open(&path)?;
        gpkg.create_tile_entry(&world_entry("world", &[0]))?;
        gpkg.close()?;

        let gpkg = Gpkg::open_with_options(&path, &ContainerOptions::throughput())?;
        assert_eq!(gpkg.list_tile_entries()?, vec!["world".to_string()]);
        gpkg.close()?;
        Ok(())
    }

    #[test]
    fn new_fails_if_file_exists() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("exists.gpkg");
        std::fs::write(&path, [])?;

        let err = Gpkg::new(&path).expect_err("existing file should fail");
        assert!(matches!(err, GpkgError::FileAlreadyExists(_)));
        Ok(())
    }

    #[test]
    fn open_fails_if_missing_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("missing.gpkg");

        let err = Gpkg::open(&path).expect_err("missing file should fail");
        assert!(matches!(err, GpkgError::MissingFile(_)));
        Ok(())
    }

    #[test]
    fn open_in_missing_directory_is_io_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("no").join("such").join("dir.gpkg");

        let err = Gpkg::open_with_options(&path, &ContainerOptions::throughput())
            .expect_err("missing directory should fail");
        assert!(matches!(err, GpkgError::CannotOpen { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
        Ok(())
    }

    #[test]
    fn rejects_non_geopackage_database() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("plain.sqlite");
        {
            let conn = rusqlite::Connection::open(&path)?;
            conn.execute_batch("CREATE TABLE other (id INTEGER)")?;
        }

        let err = Gpkg::open_with_options(&path, &ContainerOptions::default())
            .expect_err("plain sqlite should fail");
        assert!(matches!(err, GpkgError::NotAGeoPackage(_)));
        Ok(())
    }

    #[test]
    fn read_only_rejects_writes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("read_only.gpkg");
        let gpkg = Gpkg::new(&path)?;
        let entry = world_entry("world", &[0]);
        gpkg.create_tile_entry(&entry)?;
        gpkg.close()?;

        let reader = Gpkg::open_read_only(&path)?;
        let err = reader
            .add_tile(&entry, tile(0, 0, 0))
            .expect_err("read-only should fail");
        assert!(matches!(err, GpkgError::ReadOnly));
        let err = reader
            .create_tile_entry(&world_entry("other", &[0]))
            .expect_err("read-only should fail");
        assert!(matches!(err, GpkgError::ReadOnly));
        Ok(())
    }

    #[test]
    fn missing_tile_entry_is_reported() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let err = gpkg
            .tile_entry("nothing")
            .expect_err("missing entry should fail");
        assert!(matches!(err, GpkgError::MissingTileEntry { .. }));
        Ok(())
    }
}
