use crate::error::{GpkgError, Result};
use crate::types::{LayerKind, MapRequest, TileEntry, TileFormat, TileMatrix};
use std::collections::BTreeMap;

use super::grid::{GridSet, GridSetRegistry};
use super::options::TilingOptions;

/// Render parameters of one planned zoom level.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoomPlan {
    pub resolution_x: f64,
    pub resolution_y: f64,
    pub tile_width: u32,
    pub tile_height: u32,
}

/// Outcome of planning a tiling session.
#[derive(Clone, Debug, PartialEq)]
pub struct TilePlan {
    /// Entry to create in the container, one matrix per planned zoom level.
    pub entry: TileEntry,
    pub zooms: BTreeMap<u32, ZoomPlan>,
    /// Layer names passed to the renderer.
    pub layers: Vec<String>,
    /// Name of the gridset the matrices were taken from.
    pub gridset: String,
}

impl TilePlan {
    pub fn zoom_levels(&self) -> Vec<u32> {
        self.zooms.keys().copied().collect()
    }
}

/// Turns a map request and its tiling options into a [`TilePlan`].
pub struct TilePlanner<'a> {
    grids: &'a GridSetRegistry,
}

impl<'a> TilePlanner<'a> {
    pub fn new(grids: &'a GridSetRegistry) -> Self {
        Self { grids }
    }

    pub fn plan(&self, request: &MapRequest, options: &TilingOptions) -> Result<TilePlan> {
        let gridset = self.gridset(request, options)?;
        let (min_zoom, max_zoom) = zoom_range(gridset, options)?;
        let table_name = table_name(request, options)?;

        let mut zooms = BTreeMap::new();
        let mut tile_matrices = Vec::with_capacity((max_zoom - min_zoom) as usize);
        for (zoom_level, grid) in gridset
            .grids
            .iter()
            .enumerate()
            .skip(min_zoom as usize)
            .take((max_zoom - min_zoom) as usize)
        {
            let zoom_level = zoom_level as u32;
            tile_matrices.push(TileMatrix {
                zoom_level,
                matrix_width: grid.matrix_width,
                matrix_height: grid.matrix_height,
                tile_width: gridset.tile_width,
                tile_height: gridset.tile_height,
                pixel_x_size: grid.resolution_x,
                pixel_y_size: grid.resolution_y,
            });
            zooms.insert(
                zoom_level,
                ZoomPlan {
                    resolution_x: grid.resolution_x,
                    resolution_y: grid.resolution_y,
                    tile_width: gridset.tile_width,
                    tile_height: gridset.tile_height,
                },
            );
        }

        let (identifier, description) = match request.layers.as_slice() {
            [layer] => (
                Some(layer.title.clone().unwrap_or_else(|| layer.name.clone())),
                layer.abstract_text.clone(),
            ),
            _ => (Some(table_name.clone()), None),
        };

        let format = options.format.unwrap_or_else(|| default_format(request));
        log::debug!(
            "planned '{}' on gridset {} with zoom levels [{}, {}) as {}",
            table_name,
            gridset.name,
            min_zoom,
            max_zoom,
            format
        );

        Ok(TilePlan {
            entry: TileEntry {
                table_name,
                identifier,
                description,
                bounds: request.bbox,
                srs_id: gridset.srs_id,
                tile_matrix_set_bounds: gridset.bounds,
                tile_matrices,
                format,
            },
            zooms,
            layers: request.layer_names(),
            gridset: gridset.name.clone(),
        })
    }

    fn gridset(&self, request: &MapRequest, options: &TilingOptions) -> Result<&'a GridSet> {
        let gridset = match &options.gridset {
            Some(name) => self.grids.get(name)?,
            None => self.grids.find_for_srs(request.srs_id)?,
        };
        if gridset.srs_id != request.srs_id {
            return Err(GpkgError::SrsMismatch {
                gridset: gridset.name.clone(),
                gridset_srs_id: gridset.srs_id,
                request_srs_id: request.srs_id,
            });
        }
        Ok(gridset)
    }
}

/// Resolve the half-open zoom range `[min, max)` to tile.
fn zoom_range(gridset: &GridSet, options: &TilingOptions) -> Result<(u32, u32)> {
    let levels = gridset.num_levels();
    let min = options.min_zoom.unwrap_or(0);
    let requested_max = match (options.max_zoom, options.num_zooms) {
        (Some(max), _) => max,
        (None, Some(count)) => min.saturating_add(count),
        (None, None) => levels,
    };

    let max = if requested_max > levels {
        log::warn!(
            "gridset {} has {} zoom levels, clamping max zoom {} to {}",
            gridset.name,
            levels,
            requested_max,
            levels
        );
        levels
    } else {
        requested_max
    };

    if min >= max {
        return Err(GpkgError::InvalidZoomRange {
            min,
            max: requested_max,
            available: levels,
        });
    }
    Ok((min, max))
}

fn table_name(request: &MapRequest, options: &TilingOptions) -> Result<String> {
    let non_empty = |name: &Option<String>| name.clone().filter(|name| !name.trim().is_empty());
    if let Some(name) = non_empty(&options.tileset_name).or_else(|| non_empty(&request.title)) {
        return Ok(name);
    }
    if request.layers.is_empty() {
        return Err(GpkgError::MissingTableName);
    }
    Ok(request.layer_names().join("_"))
}

/// JPEG for a lone raster layer, PNG for anything that may need transparency.
fn default_format(request: &MapRequest) -> TileFormat {
    match request.layers.as_slice() {
        [layer] if layer.kind == LayerKind::Raster => TileFormat::Jpeg,
        _ => TileFormat::Png,
    }
}
