//! Input Loader — reads the key-phrase CSV fully into memory.
//!
//! Decoding is attempted as UTF-8 first; files exported from spreadsheet tools
//! are frequently Latin-1, so a decode failure falls back to ISO-8859-1 rather
//! than aborting. Parse errors in either encoding are fatal.

use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::dataset::models::{RawRow, TermRow};
use crate::errors::AppError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const REQUIRED_COLUMNS: [&str; 2] = ["legislation_term", "legislation_id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8 => f.write_str("utf-8"),
            TextEncoding::Latin1 => f.write_str("latin-1"),
        }
    }
}

/// Everything the loader produced, plus enough bookkeeping to log what it dropped.
#[derive(Debug)]
pub struct LoadedDataset {
    pub rows: Vec<TermRow>,
    pub encoding: TextEncoding,
    /// Rows without a term or legislation identifier; they cannot be grouped.
    pub skipped_rows: usize,
}

pub fn load_rows(path: &Path) -> Result<LoadedDataset, AppError> {
    info!("Reading CSV file: {}", path.display());
    let bytes = std::fs::read(path).map_err(|e| AppError::read(path, e))?;

    let (text, encoding) = decode(&bytes);
    if encoding == TextEncoding::Latin1 {
        warn!("UTF-8 decoding failed for {}, fell back to latin-1", path.display());
    }

    let (rows, skipped_rows) = parse_rows(path, &text)?;

    if skipped_rows > 0 {
        warn!(
            "Skipped {} rows with no legislation_term or legislation_id",
            skipped_rows
        );
    }
    info!("Loaded {} rows from CSV ({})", rows.len(), encoding);

    Ok(LoadedDataset {
        rows,
        encoding,
        skipped_rows,
    })
}

/// Decodes as UTF-8, or as Latin-1 when the bytes are not valid UTF-8.
/// Latin-1 maps every byte to the code point of the same value, so it cannot fail.
fn decode(bytes: &[u8]) -> (String, TextEncoding) {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), TextEncoding::Utf8),
        Err(_) => (
            bytes.iter().map(|&b| char::from(b)).collect(),
            TextEncoding::Latin1,
        ),
    }
}

fn parse_rows(path: &Path, text: &str) -> Result<(Vec<TermRow>, usize), AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(|e| AppError::csv(path, e))?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(AppError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }

    let mut rows = Vec::new();
    let mut skipped = 0;
    for record in reader.deserialize::<RawRow>() {
        let raw = record.map_err(|e| AppError::csv(path, e))?;
        match TermRow::from_raw(raw) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }

    Ok((rows, skipped))
}
