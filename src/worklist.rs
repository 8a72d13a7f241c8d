//! Work-list input parsing.
//!
//! Both pipelines read a CSV with a header; the scrape pipeline needs only
//! the `part_number` column, the batch pipeline treats every other column
//! as a URL column in header order.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::warn;

/// Read and trim every identifier from the work list. Rows with a blank
/// part number are dropped with a warning.
pub fn read_part_numbers(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening work list {}", path.display()))?;
    let part_col = part_number_column(&mut reader, path)?;

    let mut identifiers = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("work list {} row {}", path.display(), index + 2))?;
        let id = record.get(part_col).unwrap_or("").trim();
        if id.is_empty() {
            warn!("skipping work-list row {} with blank part number", index + 2);
            continue;
        }
        identifiers.push(id.to_string());
    }
    Ok(identifiers)
}

/// One batch row: an identifier plus the cells of every URL column, in
/// header order. Blank cells are kept so the column index (and with it the
/// output filename suffix) stays stable.
#[derive(Debug, Clone)]
pub struct BatchRow {
    pub part_number: String,
    pub urls: Vec<String>,
}

/// Read the batch input: `part_number` plus one or more URL columns.
pub fn read_batch_rows(path: &Path) -> Result<Vec<BatchRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening batch input {}", path.display()))?;
    let part_col = part_number_column(&mut reader, path)?;
    let column_count = reader.headers()?.len();
    let url_cols: Vec<usize> = (0..column_count).filter(|&i| i != part_col).collect();
    if url_cols.is_empty() {
        bail!("batch input {} has no URL columns", path.display());
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("batch input {} row {}", path.display(), index + 2))?;
        let part_number = record.get(part_col).unwrap_or("").trim();
        if part_number.is_empty() {
            warn!("skipping batch row {} with blank part number", index + 2);
            continue;
        }
        let urls = url_cols
            .iter()
            .map(|&i| record.get(i).unwrap_or("").trim().to_string())
            .collect();
        rows.push(BatchRow {
            part_number: part_number.to_string(),
            urls,
        });
    }
    Ok(rows)
}

fn part_number_column(
    reader: &mut csv::Reader<std::fs::File>,
    path: &Path,
) -> Result<usize> {
    reader
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .position(|h| h.trim() == "part_number")
        .with_context(|| format!("{} has no part_number column", path.display()))
}
