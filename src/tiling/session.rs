use crate::error::Result;
use crate::gpkg::{ContainerOptions, Gpkg};
use crate::types::MapRequest;
use std::path::Path;

use super::grid::GridSetRegistry;
use super::options::TilingOptions;
use super::planner::TilePlanner;
use super::rasterizer::TileRasterizer;
use super::render::MapRenderer;

/// What a completed tiling run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub table_name: String,
    pub zoom_levels: Vec<u32>,
    pub tiles_written: u64,
}

/// Plans, renders and stores tile pyramids into one container.
///
/// A session runs on the calling thread and renders one tile at a time.
/// If [`TilingSession::run`] fails, the container keeps every tile written
/// before the failure and should be discarded by the caller.
pub struct TilingSession<'g> {
    container: Gpkg,
    planner: TilePlanner<'g>,
    options: TilingOptions,
}

impl<'g> TilingSession<'g> {
    pub fn new(container: Gpkg, grids: &'g GridSetRegistry, options: TilingOptions) -> Self {
        Self {
            container,
            planner: TilePlanner::new(grids),
            options,
        }
    }

    pub fn container(&self) -> &Gpkg {
        &self.container
    }

    /// Tile `request` into a new tile table of the container.
    pub fn run<R>(&mut self, request: &MapRequest, renderer: &mut R) -> Result<SessionSummary>
    where
        R: MapRenderer + ?Sized,
    {
        let plan = self.planner.plan(request, &self.options)?;
        self.container.create_tile_entry(&plan.entry)?;

        let rendered =
            TileRasterizer::new(&plan, &self.options).run(renderer, &mut self.container);
        // Keep whatever was rendered before a failure.
        let flushed = self.container.flush();
        let tiles_written = rendered?;
        flushed?;

        let summary = SessionSummary {
            table_name: plan.entry.table_name.clone(),
            zoom_levels: plan.zoom_levels(),
            tiles_written,
        };
        log::info!(
            "wrote {} tiles over {} zoom levels to '{}'",
            summary.tiles_written,
            summary.zoom_levels.len(),
            summary.table_name
        );
        Ok(summary)
    }

    /// Close the container, surfacing any error raised while doing so.
    pub fn finish(self) -> Result<()> {
        self.container.close()
    }
}

/// Tile `request` into the GeoPackage at `path`, creating it if needed.
///
/// The file is opened with [`ContainerOptions::throughput`], so it holds an
/// exclusive lock and no journal until the function returns.
///
/// ```no_run
/// use rusqlite_gpkg_tiles::{
///     BoundingBox, BoxError, GridSetRegistry, LayerInfo, LayerKind, MapRequest, RenderRequest,
///     TilingOptions, write_geopackage,
/// };
///
/// let request = MapRequest {
///     layers: vec![LayerInfo::new("topp:states", LayerKind::Vector)],
///     bbox: BoundingBox::new(-124.73, 24.96, -66.97, 49.37),
///     srs_id: 4326,
///     title: None,
/// };
/// let options: TilingOptions = "min_zoom:2;num_zooms:3".parse()?;
/// let mut renderer = |_: &RenderRequest<'_>| -> Result<Vec<u8>, BoxError> {
///     Ok(std::fs::read("blank.png")?)
/// };
/// let summary = write_geopackage(
///     "states.gpkg",
///     &request,
///     options,
///     &GridSetRegistry::default(),
///     &mut renderer,
/// )?;
/// println!("{} tiles", summary.tiles_written);
/// # Ok::<(), rusqlite_gpkg_tiles::GpkgError>(())
/// ```
pub fn write_geopackage<P, R>(
    path: P,
    request: &MapRequest,
    options: TilingOptions,
    grids: &GridSetRegistry,
    renderer: &mut R,
) -> Result<SessionSummary>
where
    P: AsRef<Path>,
    R: MapRenderer + ?Sized,
{
    let container = Gpkg::open_with_options(path, &ContainerOptions::throughput())?;
    let mut session = TilingSession::new(container, grids, options);
    let summary = session.run(request, renderer)?;
    session.finish()?;
    Ok(summary)
}
