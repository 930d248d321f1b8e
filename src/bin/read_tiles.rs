use rusqlite_gpkg_tiles::Gpkg;
use std::collections::BTreeMap;

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        eprintln!("read_tiles failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("Usage: read_tiles <path-to-gpkg>")?;
    let gpkg = Gpkg::open_read_only(path)?;

    for table_name in gpkg.list_tile_entries()? {
        let entry = gpkg.tile_entry(&table_name)?;
        let b = entry.bounds;
        println!(
            "table: {table_name} (srs {}, {}, {} tiles)",
            entry.srs_id,
            entry.format,
            gpkg.count_tiles(&entry)?
        );
        println!("  bounds: {} {} {} {}", b.min_x, b.min_y, b.max_x, b.max_y);

        // (tile count, total bytes) per zoom level
        let mut stats: BTreeMap<u32, (u64, u64)> = BTreeMap::new();
        for batch in gpkg.tiles_batch(&entry, 1000)? {
            for tile in batch? {
                let stat = stats.entry(tile.zoom).or_default();
                stat.0 += 1;
                stat.1 += tile.data.len() as u64;
            }
        }

        for matrix in &entry.tile_matrices {
            let (count, bytes) = stats.get(&matrix.zoom_level).copied().unwrap_or_default();
            println!(
                "  zoom {}: {}x{} matrix, {}x{} px, {} tiles, {} bytes",
                matrix.zoom_level,
                matrix.matrix_width,
                matrix.matrix_height,
                matrix.tile_width,
                matrix.tile_height,
                count,
                bytes
            );
        }
    }

    Ok(())
}
