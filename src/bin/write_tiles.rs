use image::codecs::{jpeg, png, webp};
use image::{ImageEncoder, Rgb, RgbImage};
use rusqlite_gpkg_tiles::{
    BoxError, GridSetRegistry, LayerInfo, LayerKind, MapRenderer, MapRequest, RenderRequest,
    TileFormat, TilingOptions, write_geopackage,
};

const JPEG_QUALITY: u8 = 90;
const SQUARES_PER_TILE: u32 = 8;
const DEFAULT_ZOOM_LEVELS: u32 = 4;

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    if let Err(err) = run() {
        eprintln!("write_tiles failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .ok_or("Usage: write_tiles <output.gpkg> [min_zoom:0;max_zoom:4;format:image/png;...]")?;
    let mut options: TilingOptions = args.next().unwrap_or_default().parse()?;
    if options.max_zoom.is_none() && options.num_zooms.is_none() {
        options.num_zooms = Some(DEFAULT_ZOOM_LEVELS);
    }

    let registry = GridSetRegistry::default();
    let gridset = match &options.gridset {
        Some(name) => registry.get(name)?,
        None => registry.get("EPSG:4326")?,
    };
    let request = MapRequest {
        layers: vec![LayerInfo::new("demo:checkerboard", LayerKind::Vector)],
        bbox: gridset.bounds,
        srs_id: gridset.srs_id,
        title: Some("checkerboard".to_string()),
    };

    let summary = write_geopackage(
        &path,
        &request,
        options,
        &registry,
        &mut CheckerboardRenderer::default(),
    )?;
    println!(
        "wrote {} tiles (zoom levels {:?}) to table '{}' in {path}",
        summary.tiles_written, summary.zoom_levels, summary.table_name
    );
    Ok(())
}

/// Draws a checkerboard whose colors change from tile to tile.
#[derive(Default)]
struct CheckerboardRenderer {
    rendered: u64,
}

impl MapRenderer for CheckerboardRenderer {
    fn render(&mut self, request: &RenderRequest<'_>) -> Result<Vec<u8>, BoxError> {
        let shade = (self.rendered % 6) as u8 * 40;
        let square = (request.width / SQUARES_PER_TILE).max(1);
        let image = RgbImage::from_fn(request.width, request.height, |x, y| {
            if (x / square + y / square) % 2 == 0 {
                Rgb([255, 255 - shade, shade])
            } else {
                Rgb([shade, 64, 255 - shade])
            }
        });

        let mut buffer = Vec::new();
        let (width, height) = image.dimensions();
        let color = image::ExtendedColorType::Rgb8;
        match request.format {
            TileFormat::Png => png::PngEncoder::new(&mut buffer)
                .write_image(image.as_raw(), width, height, color)?,
            TileFormat::Jpeg => jpeg::JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY)
                .write_image(image.as_raw(), width, height, color)?,
            TileFormat::WebP => webp::WebPEncoder::new_lossless(&mut buffer)
                .write_image(image.as_raw(), width, height, color)?,
        }
        Ok(buffer)
    }

    fn finished(&mut self) {
        self.rendered += 1;
    }
}
