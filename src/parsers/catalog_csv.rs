use crate::error::BundleError;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// One code/display pair read from a catalog CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub code: String,
    pub display: String,
}

pub struct CatalogCsvParser;

impl CatalogCsvParser {
    /// Parse catalog rows from a CSV file.
    /// The first line is a header; only the first two columns are used, by
    /// position, so header names are free to vary between files.
    pub fn parse<P: AsRef<Path>, F>(path: P, callback: F) -> Result<usize, BundleError>
    where
        F: FnMut(CatalogRow) -> Result<(), BundleError>,
    {
        let file = std::fs::File::open(path.as_ref())?;
        Self::parse_reader(file, callback)
    }

    pub fn parse_reader<R: Read, F>(reader: R, mut callback: F) -> Result<usize, BundleError>
    where
        F: FnMut(CatalogRow) -> Result<(), BundleError>,
    {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let header_len = csv_reader.headers()?.len();

        let mut count = 0;
        for result in csv_reader.records() {
            let record = result?;

            // A header without a display column only matters once there is data
            if header_len < 2 {
                return Err(BundleError::MissingColumns { found: header_len });
            }

            let (code, display) = match (record.get(0), record.get(1)) {
                (Some(code), Some(display)) => (code, display),
                _ => {
                    let line = record.position().map(|p| p.line()).unwrap_or_default();
                    return Err(BundleError::ShortRow {
                        line,
                        found: record.len(),
                    });
                }
            };

            callback(CatalogRow {
                code: strip_quotes(code).to_string(),
                display: strip_quotes(display).to_string(),
            })?;
            count += 1;
        }

        Ok(count)
    }

    /// Convenience wrapper collecting every row
    pub fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<CatalogRow>, BundleError> {
        let mut rows = Vec::new();
        Self::parse(path, |row| {
            rows.push(row);
            Ok(())
        })?;
        Ok(rows)
    }
}

/// Remove any run of `"` wrapping a value. Some exports double-quote fields
/// inside already quoted cells, which leaves literal quotes after CSV decoding.
pub fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"')
}
