use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Boxed error returned by map renderers.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Coarse classification of a [`GpkgError`].
///
/// Every error aborts the current tiling session; the kind only tells the
/// caller whether the request, the renderer, or the container was at fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request or its options could not be resolved.
    Configuration,
    /// The render collaborator failed for a tile extent.
    Render,
    /// The container could not be created, opened, read, or appended to.
    Io,
}

/// Crate error type for GeoPackage tiling operations.
#[derive(Debug)]
pub enum GpkgError {
    /// Wraps errors returned by `rusqlite`.
    Sql(rusqlite::Error),
    /// Wraps filesystem errors.
    Io(std::io::Error),
    /// The container file could not be opened or created.
    CannotOpen {
        path: PathBuf,
        source: rusqlite::Error,
    },
    /// `Gpkg::open` was called on a path that does not exist.
    MissingFile(PathBuf),
    /// `Gpkg::new` was called on a path that already exists.
    FileAlreadyExists(PathBuf),
    /// The file is a SQLite database but not a GeoPackage.
    NotAGeoPackage(PathBuf),
    /// No gridset is registered under this name.
    UnknownGridSet(String),
    /// No gridset matches the requested spatial reference.
    NoGridSetForSrs {
        srs_id: i32,
    },
    /// The gridset and the request use different spatial references.
    SrsMismatch {
        gridset: String,
        gridset_srs_id: i32,
        request_srs_id: i32,
    },
    /// A zoom level's tiles do not evenly cover the gridset extent.
    UnevenGridLevel {
        gridset: String,
        zoom_level: u32,
    },
    /// The requested zoom range is empty or outside the gridset.
    InvalidZoomRange {
        min: u32,
        max: u32,
        available: u32,
    },
    /// A request option had a value that could not be parsed.
    InvalidOption {
        key: String,
        value: String,
    },
    /// The tile image format is not one GeoPackage can store.
    UnsupportedFormat(String),
    /// Neither a tile table name nor any layer was supplied.
    MissingTableName,
    /// A tile entry must contain at least one tile matrix.
    EmptyTileMatrixSet {
        table_name: String,
    },
    /// Tile matrices must be ordered by strictly increasing zoom level.
    UnorderedZoomLevels {
        table_name: String,
        previous: u32,
        next: u32,
    },
    /// A table with the same name already exists.
    TileEntryAlreadyExists {
        table_name: String,
    },
    /// No tile entry with this name exists in `gpkg_contents`.
    MissingTileEntry {
        table_name: String,
    },
    /// Referenced `srs_id` does not exist in `gpkg_spatial_ref_sys`.
    MissingSpatialRefSysId {
        srs_id: i32,
    },
    /// The renderer failed for one tile.
    Render {
        zoom: u32,
        column: u32,
        row: u32,
        source: BoxError,
    },
    ReadOnly,
}

impl GpkgError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownGridSet(_)
            | Self::NoGridSetForSrs { .. }
            | Self::SrsMismatch { .. }
            | Self::UnevenGridLevel { .. }
            | Self::InvalidZoomRange { .. }
            | Self::InvalidOption { .. }
            | Self::UnsupportedFormat(_)
            | Self::MissingTableName
            | Self::EmptyTileMatrixSet { .. }
            | Self::UnorderedZoomLevels { .. }
            | Self::MissingSpatialRefSysId { .. } => ErrorKind::Configuration,
            Self::Render { .. } => ErrorKind::Render,
            Self::Sql(_)
            | Self::Io(_)
            | Self::CannotOpen { .. }
            | Self::MissingFile(_)
            | Self::FileAlreadyExists(_)
            | Self::NotAGeoPackage(_)
            | Self::TileEntryAlreadyExists { .. }
            | Self::MissingTileEntry { .. }
            | Self::ReadOnly => ErrorKind::Io,
        }
    }
}

impl fmt::Display for GpkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::CannotOpen { path, source } => {
                write!(f, "cannot open GeoPackage {}: {source}", path.display())
            }
            Self::MissingFile(path) => {
                write!(f, "GeoPackage file does not exist: {}", path.display())
            }
            Self::FileAlreadyExists(path) => {
                write!(f, "GeoPackage file already exists: {}", path.display())
            }
            Self::NotAGeoPackage(path) => {
                write!(f, "not a GeoPackage (no gpkg_contents): {}", path.display())
            }
            Self::UnknownGridSet(name) => write!(f, "unknown gridset: {name}"),
            Self::NoGridSetForSrs { srs_id } => {
                write!(f, "no gridset registered for srs_id {srs_id}")
            }
            Self::SrsMismatch {
                gridset,
                gridset_srs_id,
                request_srs_id,
            } => write!(
                f,
                "gridset '{gridset}' uses srs_id {gridset_srs_id} but the request uses srs_id {request_srs_id}"
            ),
            Self::UnevenGridLevel {
                gridset,
                zoom_level,
            } => write!(
                f,
                "gridset '{gridset}': tiles of zoom level {zoom_level} do not evenly cover its extent"
            ),
            Self::InvalidZoomRange {
                min,
                max,
                available,
            } => write!(
                f,
                "invalid zoom range [{min}, {max}): gridset has {available} levels"
            ),
            Self::InvalidOption { key, value } => {
                write!(f, "invalid value for option '{key}': {value}")
            }
            Self::UnsupportedFormat(format) => write!(f, "unsupported tile format: {format}"),
            Self::MissingTableName => {
                write!(f, "no tileset name, title or layer to name the tile table")
            }
            Self::EmptyTileMatrixSet { table_name } => {
                write!(f, "tile entry '{table_name}' has no tile matrices")
            }
            Self::UnorderedZoomLevels {
                table_name,
                previous,
                next,
            } => write!(
                f,
                "tile entry '{table_name}': zoom level {next} follows {previous}"
            ),
            Self::TileEntryAlreadyExists { table_name } => {
                write!(f, "table already exists: {table_name}")
            }
            Self::MissingTileEntry { table_name } => {
                write!(f, "no tile entry named '{table_name}' in gpkg_contents")
            }
            Self::MissingSpatialRefSysId { srs_id } => {
                write!(f, "srs_id {srs_id} not found in gpkg_spatial_ref_sys")
            }
            Self::Render {
                zoom,
                column,
                row,
                source,
            } => write!(
                f,
                "failed to render tile (zoom={zoom}, column={column}, row={row}): {source}"
            ),
            Self::ReadOnly => write!(f, "operation not allowed on read-only connection"),
        }
    }
}

impl Error for GpkgError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sql(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::CannotOpen { source, .. } => Some(source),
            Self::Render { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for GpkgError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sql(err)
    }
}

impl From<std::io::Error> for GpkgError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, GpkgError>;
