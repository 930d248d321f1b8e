use crate::error::{GpkgError, Result};
use crate::types::{BoundingBox, Tile, TileEntry, TileMatrix};

use super::options::TilingOptions;
use super::planner::TilePlan;
use super::render::{MapRenderer, RenderRequest};

/// Receiver of rendered tiles.
pub trait TileSink {
    fn add(&mut self, entry: &TileEntry, tile: Tile) -> Result<()>;
}

impl TileSink for Vec<Tile> {
    fn add(&mut self, _entry: &TileEntry, tile: Tile) -> Result<()> {
        self.push(tile);
        Ok(())
    }
}

/// Half-open range of source tile indices, `y` counting from the bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRange {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl TileRange {
    pub fn len(&self) -> u64 {
        (self.max_x - self.min_x) as u64 * (self.max_y - self.min_y) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn clip_axis(min: f64, max: f64, lower: Option<u32>, upper: Option<u32>, size: u32) -> (u32, u32) {
    let mut min = min as i64;
    let mut max = max as i64;
    if let Some(lower) = lower {
        min = min.max(lower as i64);
    }
    if let Some(upper) = upper {
        max = max.min(upper as i64);
    }
    let min = min.clamp(0, size as i64);
    let max = max.clamp(min, size as i64);
    (min as u32, max as u32)
}

/// Walks the tile matrices of a plan and renders every tile that touches
/// the requested bounding box.
pub struct TileRasterizer<'a> {
    plan: &'a TilePlan,
    options: &'a TilingOptions,
}

impl<'a> TileRasterizer<'a> {
    pub fn new(plan: &'a TilePlan, options: &'a TilingOptions) -> Self {
        Self { plan, options }
    }

    /// Ground size of one tile of `matrix`.
    ///
    /// Derived from the full tile matrix set extent so indices stay anchored
    /// to the global grid rather than to the request.
    fn tile_span(&self, matrix: &TileMatrix) -> (f64, f64) {
        let extent = &self.plan.entry.tile_matrix_set_bounds;
        (
            extent.width() / matrix.matrix_width as f64,
            extent.height() / matrix.matrix_height as f64,
        )
    }

    /// Source tiles of `matrix` intersecting the requested bbox, after the
    /// column/row options and the matrix extent are applied.
    pub fn tile_range(&self, matrix: &TileMatrix) -> TileRange {
        let extent = &self.plan.entry.tile_matrix_set_bounds;
        let bbox = &self.plan.entry.bounds;
        let (span_x, span_y) = self.tile_span(matrix);

        let (min_x, max_x) = clip_axis(
            ((bbox.min_x - extent.min_x) / span_x).floor(),
            ((bbox.max_x - extent.min_x) / span_x).ceil(),
            self.options.min_column,
            self.options.max_column,
            matrix.matrix_width,
        );
        let (min_y, max_y) = clip_axis(
            ((bbox.min_y - extent.min_y) / span_y).floor(),
            ((bbox.max_y - extent.min_y) / span_y).ceil(),
            self.options.min_row,
            self.options.max_row,
            matrix.matrix_height,
        );

        TileRange {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Ground extent of source tile `(x, y)`.
    pub fn tile_bounds(&self, matrix: &TileMatrix, x: u32, y: u32) -> BoundingBox {
        let extent = &self.plan.entry.tile_matrix_set_bounds;
        let (span_x, span_y) = self.tile_span(matrix);
        BoundingBox::new(
            extent.min_x + x as f64 * span_x,
            extent.min_y + y as f64 * span_y,
            extent.min_x + (x + 1) as f64 * span_x,
            extent.min_y + (y + 1) as f64 * span_y,
        )
    }

    /// Render every tile of the plan and hand it to `sink`.
    ///
    /// Zoom levels are processed in ascending order, rows before columns
    /// within a level. Returns the number of tiles written.
    pub fn run<R, S>(&self, renderer: &mut R, sink: &mut S) -> Result<u64>
    where
        R: MapRenderer + ?Sized,
        S: TileSink + ?Sized,
    {
        let entry = &self.plan.entry;
        let mut written = 0;

        for matrix in &entry.tile_matrices {
            let range = self.tile_range(matrix);
            log::debug!(
                "zoom {}: columns [{}, {}), rows [{}, {}), {} tiles",
                matrix.zoom_level,
                range.min_x,
                range.max_x,
                range.min_y,
                range.max_y,
                range.len()
            );

            for y in range.min_y..range.max_y {
                // GeoPackage rows count from the top of the matrix.
                let row = matrix.matrix_height - 1 - y;
                for x in range.min_x..range.max_x {
                    let request = RenderRequest {
                        bbox: self.tile_bounds(matrix, x, y),
                        srs_id: entry.srs_id,
                        width: matrix.tile_width,
                        height: matrix.tile_height,
                        format: entry.format,
                        layers: &self.plan.layers,
                    };
                    let rendered = renderer.render(&request);
                    renderer.finished();
                    let data = rendered.map_err(|source| GpkgError::Render {
                        zoom: matrix.zoom_level,
                        column: x,
                        row,
                        source,
                    })?;

                    sink.add(
                        entry,
                        Tile {
                            zoom: matrix.zoom_level,
                            column: x,
                            row,
                            data,
                        },
                    )?;
                    written += 1;
                }
            }
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::{TileRange, TileRasterizer, TileSink};
    use crate::Result;
    use crate::error::{BoxError, ErrorKind, GpkgError};
    use crate::tiling::{
        Grid, GridSet, GridSetRegistry, MapRenderer, RenderRequest, TilePlan, TilePlanner,
        TilingOptions,
    };
    use crate::types::{BoundingBox, LayerInfo, LayerKind, MapRequest, Tile, TileEntry};

    /// Renders the tile bbox as text and remembers every request.
    #[derive(Default)]
    struct RecordingRenderer {
        requests: Vec<(BoundingBox, u32, u32)>,
        finished: usize,
        fail_after: Option<usize>,
    }

    impl MapRenderer for RecordingRenderer {
        fn render(&mut self, request: &RenderRequest<'_>) -> std::result::Result<Vec<u8>, BoxError> {
            if self.fail_after == Some(self.requests.len()) {
                return Err("renderer out of memory".into());
            }
            self.requests
                .push((request.bbox, request.width, request.height));
            let b = request.bbox;
            Ok(format!("{},{},{},{}", b.min_x, b.min_y, b.max_x, b.max_y).into_bytes())
        }

        fn finished(&mut self) {
            self.finished += 1;
        }
    }

    fn request(bbox: BoundingBox, srs_id: i32) -> MapRequest {
        MapRequest {
            layers: vec![LayerInfo::new("topp:states", LayerKind::Vector)],
            bbox,
            srs_id,
            title: None,
        }
    }

    fn plan(registry: &GridSetRegistry, request: &MapRequest, options: &TilingOptions) -> Result<TilePlan> {
        TilePlanner::new(registry).plan(request, options)
    }

    fn render_all(plan: &TilePlan, options: &TilingOptions) -> Result<(Vec<Tile>, RecordingRenderer)> {
        let mut renderer = RecordingRenderer::default();
        let mut tiles = Vec::new();
        TileRasterizer::new(plan, options).run(&mut renderer, &mut tiles)?;
        Ok((tiles, renderer))
    }

    #[test]
    fn world_in_single_tile() -> Result<()> {
        let world = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
        let mut registry = GridSetRegistry::empty();
        registry.insert(GridSet::new(
            "world-1x1",
            4326,
            world,
            256,
            256,
            vec![Grid {
                matrix_width: 1,
                matrix_height: 1,
                resolution_x: 360.0 / 256.0,
                resolution_y: 180.0 / 256.0,
            }],
        ));
        let options = TilingOptions::default();
        let plan = plan(&registry, &request(world, 4326), &options)?;

        let (tiles, renderer) = render_all(&plan, &options)?;
        assert_eq!(tiles.len(), 1);
        assert_eq!((tiles[0].zoom, tiles[0].column, tiles[0].row), (0, 0, 0));
        assert_eq!(renderer.requests, vec![(world, 256, 256)]);
        Ok(())
    }

    #[test]
    fn rendered_pixel_size_matches_stored_matrix() -> Result<()> {
        let mut registry = GridSetRegistry::empty();
        registry.insert(GridSet::from_resolutions(
            "local",
            -1,
            BoundingBox::new(0.0, 0.0, 1000.0, 300.0),
            256,
            256,
            &[2.0, 1.0],
        )?);
        let options = TilingOptions::default();
        let bbox = BoundingBox::new(100.0, 50.0, 900.0, 250.0);
        let plan = plan(&registry, &request(bbox, -1), &options)?;
        let rasterizer = TileRasterizer::new(&plan, &options);

        for matrix in &plan.entry.tile_matrices {
            let tile = rasterizer.tile_bounds(matrix, 0, 0);
            assert_eq!(tile.width() / matrix.tile_width as f64, matrix.pixel_x_size);
            assert_eq!(tile.height() / matrix.tile_height as f64, matrix.pixel_y_size);
        }
        Ok(())
    }

    #[test]
    fn tile_count_matches_index_bounds() -> Result<()> {
        let registry = GridSetRegistry::default();
        let options = TilingOptions {
            min_zoom: Some(0),
            max_zoom: Some(6),
            ..TilingOptions::default()
        };
        let bboxes = [
            BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
            BoundingBox::new(-10.5, 35.2, 30.1, 71.9),
            BoundingBox::new(0.1, 0.1, 0.2, 0.2),
            BoundingBox::new(-120.0, -45.0, 0.0, 0.0),
        ];

        for bbox in bboxes {
            let plan = plan(&registry, &request(bbox, 4326), &options)?;
            let rasterizer = TileRasterizer::new(&plan, &options);
            let (tiles, _) = render_all(&plan, &options)?;

            for matrix in &plan.entry.tile_matrices {
                let span_x = 360.0 / matrix.matrix_width as f64;
                let span_y = 180.0 / matrix.matrix_height as f64;
                let min_x = ((bbox.min_x + 180.0) / span_x).floor() as u64;
                let max_x = ((bbox.max_x + 180.0) / span_x).ceil() as u64;
                let min_y = ((bbox.min_y + 90.0) / span_y).floor() as u64;
                let max_y = ((bbox.max_y + 90.0) / span_y).ceil() as u64;
                let expected = (max_x - min_x) * (max_y - min_y);

                assert_eq!(rasterizer.tile_range(matrix).len(), expected);
                let emitted = tiles
                    .iter()
                    .filter(|t| t.zoom == matrix.zoom_level)
                    .count() as u64;
                assert_eq!(emitted, expected, "bbox {bbox:?} zoom {}", matrix.zoom_level);
            }
        }
        Ok(())
    }

    #[test]
    fn rows_count_from_the_top() -> Result<()> {
        let registry = GridSetRegistry::default();
        let options = TilingOptions {
            min_zoom: Some(2),
            max_zoom: Some(3),
            ..TilingOptions::default()
        };
        let bbox = BoundingBox::new(-100.0, -60.0, 100.0, 80.0);
        let plan = plan(&registry, &request(bbox, 4326), &options)?;
        let (tiles, _) = render_all(&plan, &options)?;
        assert!(!tiles.is_empty());

        // Zoom 2 of EPSG:4326 is 8 x 4 tiles of 45 degrees.
        for tile in &tiles {
            let text = String::from_utf8(tile.data.clone()).expect("utf8");
            let coords: Vec<f64> = text
                .split(',')
                .map(|v| v.parse().expect("number"))
                .collect();
            let (min_x, max_y) = (coords[0], coords[3]);

            let reference_column = ((min_x + 180.0) / 45.0).round() as u32;
            let reference_row = ((90.0 - max_y) / 45.0).round() as u32;
            assert_eq!((tile.column, tile.row), (reference_column, reference_row));
        }

        let top_left = tiles
            .iter()
            .find(|t| t.row == 0)
            .expect("a tile in the top row");
        assert!(String::from_utf8_lossy(&top_left.data).ends_with(",90"));
        Ok(())
    }

    #[test]
    fn column_and_row_options_clip_to_intersection() -> Result<()> {
        let registry = GridSetRegistry::default();
        let world = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
        let unclipped = TilingOptions {
            min_zoom: Some(2),
            max_zoom: Some(3),
            ..TilingOptions::default()
        };
        let clipped = TilingOptions {
            min_column: Some(2),
            max_column: Some(5),
            min_row: Some(1),
            max_row: Some(2),
            ..unclipped.clone()
        };

        let full_plan = plan(&registry, &request(world, 4326), &unclipped)?;
        let (all_tiles, _) = render_all(&full_plan, &unclipped)?;
        let clipped_plan = plan(&registry, &request(world, 4326), &clipped)?;
        let (clipped_tiles, _) = render_all(&clipped_plan, &clipped)?;

        assert_eq!(all_tiles.len(), 32);
        assert_eq!(clipped_tiles.len(), 3);
        for tile in &clipped_tiles {
            assert!((2..5).contains(&tile.column));
            // Source row 1 of a 4-row matrix is stored as row 2.
            assert_eq!(tile.row, 2);
            assert!(all_tiles.contains(tile));
        }
        Ok(())
    }

    #[test]
    fn clip_outside_bbox_is_empty() -> Result<()> {
        let registry = GridSetRegistry::default();
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let options = TilingOptions {
            min_zoom: Some(1),
            max_zoom: Some(2),
            min_column: Some(0),
            max_column: Some(1),
            ..TilingOptions::default()
        };
        let plan = plan(&registry, &request(bbox, 4326), &options)?;
        let rasterizer = TileRasterizer::new(&plan, &options);
        let range = rasterizer.tile_range(&plan.entry.tile_matrices[0]);
        assert!(range.is_empty());

        let (tiles, renderer) = render_all(&plan, &options)?;
        assert!(tiles.is_empty());
        assert!(renderer.requests.is_empty());
        Ok(())
    }

    #[test]
    fn request_outside_grid_is_clamped_to_matrix() -> Result<()> {
        let registry = GridSetRegistry::default();
        let bbox = BoundingBox::new(-200.0, -100.0, 200.0, 100.0);
        let options = TilingOptions {
            min_zoom: Some(0),
            max_zoom: Some(1),
            ..TilingOptions::default()
        };
        let plan = plan(&registry, &request(bbox, 4326), &options)?;
        let range = TileRasterizer::new(&plan, &options).tile_range(&plan.entry.tile_matrices[0]);
        assert_eq!(
            range,
            TileRange {
                min_x: 0,
                max_x: 2,
                min_y: 0,
                max_y: 1,
            }
        );
        Ok(())
    }

    #[test]
    fn zoom_levels_are_ascending_and_finished_is_called_per_tile() -> Result<()> {
        let registry = GridSetRegistry::default();
        let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
        let options = TilingOptions {
            max_zoom: Some(3),
            ..TilingOptions::default()
        };
        let plan = plan(&registry, &request(bbox, 4326), &options)?;
        let (tiles, renderer) = render_all(&plan, &options)?;

        assert_eq!(tiles.len(), 2 + 8 + 32);
        assert!(tiles.windows(2).all(|w| w[0].zoom <= w[1].zoom));
        assert_eq!(renderer.finished, tiles.len());
        Ok(())
    }

    #[test]
    fn render_failure_aborts_the_run() -> Result<()> {
        let registry = GridSetRegistry::default();
        let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
        let options = TilingOptions {
            min_zoom: Some(1),
            max_zoom: Some(2),
            ..TilingOptions::default()
        };
        let plan = plan(&registry, &request(bbox, 4326), &options)?;

        let mut renderer = RecordingRenderer {
            fail_after: Some(3),
            ..RecordingRenderer::default()
        };
        let mut tiles = Vec::new();
        let err = TileRasterizer::new(&plan, &options)
            .run(&mut renderer, &mut tiles)
            .expect_err("render failure should abort");

        assert!(matches!(err, GpkgError::Render { zoom: 1, .. }));
        assert_eq!(err.kind(), ErrorKind::Render);
        assert_eq!(tiles.len(), 3);
        // Resources are released for the failed tile as well.
        assert_eq!(renderer.finished, 4);
        Ok(())
    }

    #[test]
    fn sink_failure_propagates() -> Result<()> {
        struct FullDisk;

        impl TileSink for FullDisk {
            fn add(&mut self, _entry: &TileEntry, _tile: Tile) -> Result<()> {
                Err(GpkgError::Io(std::io::Error::other("disk full")))
            }
        }

        let registry = GridSetRegistry::default();
        let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
        let options = TilingOptions {
            max_zoom: Some(1),
            ..TilingOptions::default()
        };
        let plan = plan(&registry, &request(bbox, 4326), &options)?;
        let mut renderer = RecordingRenderer::default();
        let err = TileRasterizer::new(&plan, &options)
            .run(&mut renderer, &mut FullDisk)
            .expect_err("sink failure should abort");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(renderer.requests.len(), 1);
        Ok(())
    }

    #[test]
    fn closures_are_renderers() -> Result<()> {
        let registry = GridSetRegistry::default();
        let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
        let options = TilingOptions {
            max_zoom: Some(1),
            ..TilingOptions::default()
        };
        let plan = plan(&registry, &request(bbox, 4326), &options)?;

        let mut calls = 0;
        let mut renderer = |request: &RenderRequest<'_>| -> std::result::Result<Vec<u8>, BoxError> {
            calls += 1;
            assert_eq!(request.layers, ["topp:states".to_string()]);
            Ok(vec![0x89, b'P', b'N', b'G'])
        };
        let mut tiles = Vec::new();
        let written = TileRasterizer::new(&plan, &options).run(&mut renderer, &mut tiles)?;
        assert_eq!(written, 2);
        assert_eq!(calls, 2);
        Ok(())
    }
}
