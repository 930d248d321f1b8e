use crate::error::{GpkgError, Result};
use geo_traits::{CoordTrait, RectTrait};
use std::fmt;
use std::str::FromStr;

/// Axis-aligned rectangle in ground coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Build a bounding box from any rectangle implementing `RectTrait`
    /// (for example `geo_types::Rect`).
    pub fn from_rect<R>(rect: &R) -> Self
    where
        R: RectTrait<T = f64>,
    {
        let min = rect.min();
        let max = rect.max();
        Self::new(min.x(), min.y(), max.x(), max.y())
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Grid geometry of a single zoom level.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMatrix {
    pub zoom_level: u32,
    /// Number of tile columns.
    pub matrix_width: u32,
    /// Number of tile rows.
    pub matrix_height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub pixel_x_size: f64,
    pub pixel_y_size: f64,
}

/// Container-level description of a tile pyramid table.
///
/// Written once by `Gpkg::create_tile_entry` before any tile is added.
#[derive(Clone, Debug, PartialEq)]
pub struct TileEntry {
    pub table_name: String,
    pub identifier: Option<String>,
    pub description: Option<String>,
    /// Extent of the requested data, stored in `gpkg_contents`.
    pub bounds: BoundingBox,
    pub srs_id: i32,
    /// Full extent of the tile matrix set. Tile (0, 0) of every zoom level
    /// sits in the upper-left corner of this box.
    pub tile_matrix_set_bounds: BoundingBox,
    /// Ordered by strictly increasing zoom level.
    pub tile_matrices: Vec<TileMatrix>,
    pub format: TileFormat,
}

impl TileEntry {
    pub fn tile_matrix(&self, zoom_level: u32) -> Option<&TileMatrix> {
        self.tile_matrices
            .iter()
            .find(|matrix| matrix.zoom_level == zoom_level)
    }
}

/// A single encoded tile. `row` counts from the top of the matrix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pub zoom: u32,
    pub column: u32,
    pub row: u32,
    pub data: Vec<u8>,
}

/// Image encoding of tile blobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TileFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
}

impl TileFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            TileFormat::Png => "image/png",
            TileFormat::Jpeg => "image/jpeg",
            TileFormat::WebP => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Jpeg => "jpeg",
            TileFormat::WebP => "webp",
        }
    }

    /// Guess the format from the leading bytes of an encoded image.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(TileFormat::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(TileFormat::Jpeg)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(TileFormat::WebP)
        } else {
            None
        }
    }
}

impl FromStr for TileFormat {
    type Err = GpkgError;

    fn from_str(s: &str) -> Result<Self> {
        // Drop MIME parameters such as "image/png; mode=8bit".
        let s = s.split(';').next().unwrap_or_default().trim();
        let s = s.strip_prefix("image/").unwrap_or(s);
        if s.eq_ignore_ascii_case("png")
            || s.eq_ignore_ascii_case("png8")
            || s.eq_ignore_ascii_case("png24")
        {
            Ok(TileFormat::Png)
        } else if s.eq_ignore_ascii_case("jpeg") || s.eq_ignore_ascii_case("jpg") {
            Ok(TileFormat::Jpeg)
        } else if s.eq_ignore_ascii_case("webp") {
            Ok(TileFormat::WebP)
        } else {
            Err(GpkgError::UnsupportedFormat(s.to_string()))
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerKind {
    Vector,
    Raster,
}

/// Catalog metadata of a requested layer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerInfo {
    pub name: String,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub kind: LayerKind,
}

impl LayerInfo {
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            title: None,
            abstract_text: None,
            kind,
        }
    }
}

/// A map request to be cut into tiles.
#[derive(Clone, Debug, PartialEq)]
pub struct MapRequest {
    pub layers: Vec<LayerInfo>,
    pub bbox: BoundingBox,
    pub srs_id: i32,
    pub title: Option<String>,
}

impl MapRequest {
    pub fn layer_names(&self) -> Vec<String> {
        self.layers.iter().map(|layer| layer.name.clone()).collect()
    }
}
