use crate::Result;
use crate::types::Tile;
use rusqlite::Row;

pub(crate) fn row_to_tile(row: &Row<'_>) -> rusqlite::Result<Tile> {
    Ok(Tile {
        zoom: row.get(0)?,
        column: row.get(1)?,
        row: row.get(2)?,
        data: row.get(3)?,
    })
}

/// Iterator that yields batches of tiles from a tile table.
///
/// Each call to `next()` returns a `Result<Vec<Tile>>` containing up to
/// `batch_size` tiles. This provides a chunked alternative to `Gpkg::tiles()`,
/// which loads every tile blob of the table at once.
pub struct GpkgTileBatchIterator<'a> {
    pub(super) stmt: rusqlite::Statement<'a>,
    pub(super) batch_size: u32,
    pub(super) offset: u32,
    pub(super) end_or_invalid_state: bool,
}

impl<'a> Iterator for GpkgTileBatchIterator<'a> {
    type Item = Result<Vec<Tile>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end_or_invalid_state {
            return None;
        }

        let collected = self
            .stmt
            .query_map([self.offset], row_to_tile)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<Tile>>>());

        let tiles = match collected {
            Ok(tiles) => tiles,
            Err(e) => {
                // A failed query leaves the offset unreliable, so stop here.
                self.end_or_invalid_state = true;
                return Some(Err(e.into()));
            }
        };

        // If the result is less than the batch size, it means it reached the end.
        let result_size = tiles.len();
        if result_size < self.batch_size as usize {
            self.end_or_invalid_state = true;
            if tiles.is_empty() {
                return None;
            }
        }

        self.offset += result_size as u32;

        Some(Ok(tiles))
    }
}
