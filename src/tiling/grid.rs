use crate::error::{GpkgError, Result};
use crate::types::BoundingBox;
use std::collections::BTreeMap;

/// Tile grid of a single zoom level. The zoom level is the position of the
/// grid inside its [`GridSet`].
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    pub matrix_width: u32,
    pub matrix_height: u32,
    /// Ground units per pixel along x.
    pub resolution_x: f64,
    /// Ground units per pixel along y.
    pub resolution_y: f64,
}

/// Named set of per-zoom-level grids sharing one extent and tile size.
#[derive(Clone, Debug, PartialEq)]
pub struct GridSet {
    pub name: String,
    pub srs_id: i32,
    pub bounds: BoundingBox,
    pub tile_width: u32,
    pub tile_height: u32,
    pub grids: Vec<Grid>,
}

// Scale denominators are published with limited precision, so matrix sizes a
// hair above an integer are treated as that integer.
const MATRIX_SIZE_TOLERANCE: f64 = 1e-6;

fn tiles_to_cover(extent: f64, tile_span: f64) -> u32 {
    let tiles = extent / tile_span;
    let rounded = tiles.round();
    let count = if (tiles - rounded).abs() <= MATRIX_SIZE_TOLERANCE * rounded.max(1.0) {
        rounded
    } else {
        tiles.ceil()
    };
    count.max(1.0) as u32
}

fn covers_exactly(extent: f64, tiles: u32, tile_span: f64) -> bool {
    (tiles as f64 * tile_span - extent).abs() <= MATRIX_SIZE_TOLERANCE * extent
}

/// Extent of the whole tiles needed to cover `extent`.
fn covered_extent(extent: f64, tile_span: f64) -> f64 {
    let tiles = tiles_to_cover(extent, tile_span);
    if covers_exactly(extent, tiles, tile_span) {
        extent
    } else {
        tiles as f64 * tile_span
    }
}

fn levels(bounds: &BoundingBox, tile_width: u32, tile_height: u32, resolutions: &[f64]) -> Vec<Grid> {
    resolutions
        .iter()
        .map(|&resolution| Grid {
            matrix_width: tiles_to_cover(bounds.width(), resolution * tile_width as f64),
            matrix_height: tiles_to_cover(bounds.height(), resolution * tile_height as f64),
            resolution_x: resolution,
            resolution_y: resolution,
        })
        .collect()
}

impl GridSet {
    pub fn new(
        name: impl Into<String>,
        srs_id: i32,
        bounds: BoundingBox,
        tile_width: u32,
        tile_height: u32,
        grids: Vec<Grid>,
    ) -> Self {
        Self {
            name: name.into(),
            srs_id,
            bounds,
            tile_width,
            tile_height,
            grids,
        }
    }

    /// Build a gridset from one square-pixel resolution per zoom level,
    /// coarsest first.
    ///
    /// If the coarsest level does not tile `bounds` evenly, the extent grows
    /// to whole tiles right and down of the fixed top-left corner. Every
    /// other level must then tile that extent evenly too.
    pub fn from_resolutions(
        name: impl Into<String>,
        srs_id: i32,
        bounds: BoundingBox,
        tile_width: u32,
        tile_height: u32,
        resolutions: &[f64],
    ) -> Result<Self> {
        let name = name.into();
        let bounds = match resolutions.first() {
            Some(&coarsest) => {
                let width = covered_extent(bounds.width(), coarsest * tile_width as f64);
                let height = covered_extent(bounds.height(), coarsest * tile_height as f64);
                BoundingBox::new(
                    bounds.min_x,
                    bounds.max_y - height,
                    bounds.min_x + width,
                    bounds.max_y,
                )
            }
            None => bounds,
        };

        let grids = levels(&bounds, tile_width, tile_height, resolutions);
        for (zoom_level, grid) in grids.iter().enumerate() {
            let even = covers_exactly(
                bounds.width(),
                grid.matrix_width,
                grid.resolution_x * tile_width as f64,
            ) && covers_exactly(
                bounds.height(),
                grid.matrix_height,
                grid.resolution_y * tile_height as f64,
            );
            if !even {
                return Err(GpkgError::UnevenGridLevel {
                    gridset: name,
                    zoom_level: zoom_level as u32,
                });
            }
        }

        Ok(Self::new(name, srs_id, bounds, tile_width, tile_height, grids))
    }

    /// World in plate carrée (EPSG:4326), two 256 px tiles wide at level 0.
    pub fn world_crs84() -> Self {
        let bounds = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
        let resolutions: Vec<f64> = (0..22).map(|z| 0.703125 / f64::powi(2.0, z)).collect();
        Self::new(
            "EPSG:4326",
            4326,
            bounds,
            256,
            256,
            levels(&bounds, 256, 256, &resolutions),
        )
    }

    /// Spherical web mercator (EPSG:3857), a single 256 px tile at level 0.
    pub fn web_mercator() -> Self {
        const HALF_WORLD: f64 = 20_037_508.342_789_244;
        let bounds = BoundingBox::new(-HALF_WORLD, -HALF_WORLD, HALF_WORLD, HALF_WORLD);
        let resolutions: Vec<f64> = (0..25)
            .map(|z| 156_543.033_928_041 / f64::powi(2.0, z))
            .collect();
        Self::new(
            "EPSG:3857",
            3857,
            bounds,
            256,
            256,
            levels(&bounds, 256, 256, &resolutions),
        )
    }

    pub fn grid(&self, zoom_level: u32) -> Option<&Grid> {
        self.grids.get(zoom_level as usize)
    }

    pub fn num_levels(&self) -> u32 {
        self.grids.len() as u32
    }
}

/// Lookup of gridsets by name.
///
/// `Default` holds `EPSG:4326`, `EPSG:3857` and the legacy alias
/// `EPSG:900913` for the latter.
#[derive(Clone, Debug)]
pub struct GridSetRegistry {
    gridsets: BTreeMap<String, GridSet>,
}

impl Default for GridSetRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.insert(GridSet::world_crs84());
        let mercator = GridSet::web_mercator();
        registry.insert(GridSet {
            name: "EPSG:900913".to_string(),
            ..mercator.clone()
        });
        registry.insert(mercator);
        registry
    }
}

impl GridSetRegistry {
    pub fn empty() -> Self {
        Self {
            gridsets: BTreeMap::new(),
        }
    }

    /// Add a gridset, replacing any gridset with the same name.
    pub fn insert(&mut self, gridset: GridSet) {
        self.gridsets.insert(gridset.name.clone(), gridset);
    }

    pub fn get(&self, name: &str) -> Result<&GridSet> {
        self.gridsets
            .get(name)
            .ok_or_else(|| GpkgError::UnknownGridSet(name.to_string()))
    }

    /// First gridset (by name) defined in `srs_id`.
    pub fn find_for_srs(&self, srs_id: i32) -> Result<&GridSet> {
        self.gridsets
            .values()
            .find(|gridset| gridset.srs_id == srs_id)
            .ok_or(GpkgError::NoGridSetForSrs { srs_id })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.gridsets.keys().map(String::as_str)
    }
}
