//! Append-only ledger of completed part numbers.
//!
//! One CSV row per completed identifier, `part_number,number_of_images`.
//! A later run never rewrites an entry; it only skips the identifier.
//! Appends from concurrent workers are serialized behind a single lock so
//! the file never contains interleaved or truncated rows.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

const HEADER: [&str; 2] = ["part_number", "number_of_images"];

#[derive(Debug, Deserialize)]
struct LedgerRow {
    part_number: String,
    number_of_images: u32,
}

/// The persisted record that makes runs resumable.
pub struct Ledger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Read every completed identifier and its image count. An absent file
    /// is an empty ledger; a malformed row fails the whole load.
    pub fn load(&self) -> Result<HashMap<String, u32>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("opening ledger {}", self.path.display()))?;
        let mut completed = HashMap::new();
        for (index, record) in reader.deserialize::<LedgerRow>().enumerate() {
            let row = record.with_context(|| {
                format!("malformed ledger row {} in {}", index + 2, self.path.display())
            })?;
            completed.insert(row.part_number.trim().to_string(), row.number_of_images);
        }
        Ok(completed)
    }

    /// Append one completed identifier, writing the header only when the
    /// file is being created. Safe to call from concurrent workers.
    pub async fn append(&self, part_number: &str, count: u32) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let new_file = !self.path.exists();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening ledger {} for append", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if new_file {
            writer.write_record(HEADER)?;
        }
        writer.write_record([part_number, &count.to_string()])?;
        writer.flush().context("flushing ledger")?;
        Ok(())
    }
}
