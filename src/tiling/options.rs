use crate::error::{GpkgError, Result};
use crate::types::TileFormat;
use std::str::FromStr;

/// Request-time options of a tiling session.
///
/// Every field is optional; an absent value falls back to the full zoom
/// range of the gridset, the full tile range of the request, and an
/// automatically chosen format and table name.
///
/// Zoom, column and row maxima are exclusive. Row bounds refer to the
/// gridset's own rows, which count from the bottom.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TilingOptions {
    pub min_zoom: Option<u32>,
    pub max_zoom: Option<u32>,
    pub num_zooms: Option<u32>,
    pub min_column: Option<u32>,
    pub max_column: Option<u32>,
    pub min_row: Option<u32>,
    pub max_row: Option<u32>,
    pub format: Option<TileFormat>,
    pub filename: Option<String>,
    pub gridset: Option<String>,
    pub tileset_name: Option<String>,
}

fn parse_u32(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| GpkgError::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
        })
}

impl TilingOptions {
    /// Build options from key/value pairs such as WMS `format_options`.
    ///
    /// Keys are matched case-insensitively; unknown keys are ignored.
    ///
    /// ```
    /// use rusqlite_gpkg_tiles::TilingOptions;
    ///
    /// let options = TilingOptions::from_format_options([("min_zoom", "2"), ("num_zooms", "3")])?;
    /// assert_eq!(options.min_zoom, Some(2));
    /// assert_eq!(options.num_zooms, Some(3));
    /// # Ok::<(), rusqlite_gpkg_tiles::GpkgError>(())
    /// ```
    pub fn from_format_options<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            options.set(key.as_ref(), value.as_ref())?;
        }
        Ok(options)
    }

    /// Set a single option by its key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let key = key.trim().to_ascii_lowercase();
        let text = || Some(value.trim().to_string()).filter(|v| !v.is_empty());
        match key.as_str() {
            "min_zoom" => self.min_zoom = Some(parse_u32(&key, value)?),
            "max_zoom" => self.max_zoom = Some(parse_u32(&key, value)?),
            "num_zooms" => self.num_zooms = Some(parse_u32(&key, value)?),
            "min_column" => self.min_column = Some(parse_u32(&key, value)?),
            "max_column" => self.max_column = Some(parse_u32(&key, value)?),
            "min_row" => self.min_row = Some(parse_u32(&key, value)?),
            "max_row" => self.max_row = Some(parse_u32(&key, value)?),
            "format" => self.format = Some(value.parse()?),
            "filename" => self.filename = text(),
            "gridset" => self.gridset = text(),
            "tileset_name" => self.tileset_name = text(),
            _ => log::debug!("ignoring unknown tiling option '{key}'"),
        }
        Ok(())
    }

    /// File name to offer for the produced container.
    pub fn suggested_filename(&self, table_name: &str) -> String {
        match &self.filename {
            Some(filename) if filename.contains('.') => filename.clone(),
            Some(filename) => format!("{filename}.gpkg"),
            None => format!("{table_name}.gpkg"),
        }
    }
}

/// Parses the `key:value;key:value` syntax of WMS `format_options`.
impl FromStr for TilingOptions {
    type Err = GpkgError;

    fn from_str(s: &str) -> Result<Self> {
        let mut options = Self::default();
        for pair in s.split(';').filter(|pair| !pair.trim().is_empty()) {
            let (key, value) = pair.split_once(':').ok_or_else(|| GpkgError::InvalidOption {
                key: pair.trim().to_string(),
                value: String::new(),
            })?;
            options.set(key, value)?;
        }
        Ok(options)
    }
}
