use crate::error::BoxError;
use crate::types::{BoundingBox, TileFormat};

/// One render call: draw `layers` over `bbox` into a `width` x `height`
/// image encoded as `format`.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderRequest<'a> {
    pub bbox: BoundingBox,
    pub srs_id: i32,
    pub width: u32,
    pub height: u32,
    pub format: TileFormat,
    pub layers: &'a [String],
}

/// The map renderer invoked once per tile.
///
/// Calls are blocking and strictly sequential. A failed render aborts the
/// tiling session; it is never retried.
pub trait MapRenderer {
    fn render(&mut self, request: &RenderRequest<'_>) -> Result<Vec<u8>, BoxError>;

    /// Called after every tile, whether or not the render succeeded, so
    /// per-tile caches can be released before the next one.
    fn finished(&mut self) {}
}

impl<F> MapRenderer for F
where
    F: FnMut(&RenderRequest<'_>) -> Result<Vec<u8>, BoxError>,
{
    fn render(&mut self, request: &RenderRequest<'_>) -> Result<Vec<u8>, BoxError> {
        self(request)
    }
}
