//! Batch download of images whose URLs are already known.
//!
//! Reads `part_number` plus one or more URL columns, downloads every cell
//! through the shared retry core, and appends one row per permanently
//! failed URL to a failure-log CSV.

use crate::config::BatchConfig;
use crate::fetcher::Fetcher;
use crate::worklist;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

const FAILURE_HEADER: [&str; 3] = ["part_number", "image_url", "reason"];

/// What a finished batch run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub downloaded: usize,
    /// Blank cells and outputs that already existed on disk.
    pub skipped: usize,
    /// URLs that exhausted the retry budget or never validated.
    pub failed: usize,
}

enum CellOutcome {
    Downloaded,
    Skipped,
    Failed,
}

/// Append-only log of permanently failed URLs, serialized like the ledger.
pub struct FailureLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Record one permanent failure, writing the header only when the file
    /// is being created.
    pub async fn record(&self, part_number: &str, image_url: &str, reason: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let new_file = !self.path.exists();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening failure log {}", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if new_file {
            writer.write_record(FAILURE_HEADER)?;
        }
        writer.write_record([part_number, image_url, reason])?;
        writer.flush().context("flushing failure log")?;
        Ok(())
    }
}

/// Replace filesystem-unsafe characters with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect()
}

/// Run the batch pipeline over every (row, URL column) cell.
pub async fn run(cfg: &BatchConfig) -> Result<BatchSummary> {
    let rows = worklist::read_batch_rows(&cfg.input)?;

    std::fs::create_dir_all(&cfg.out_dir)
        .with_context(|| format!("creating output directory {}", cfg.out_dir.display()))?;

    let fetcher = Arc::new(Fetcher::new(None, cfg.download.clone()));
    let failure_log = Arc::new(FailureLog::new(&cfg.failure_log));

    // Repeated part numbers keep counting where the previous row left off,
    // so a later row never collides with an earlier row's file.
    let mut jobs = Vec::new();
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    for row in rows {
        for cell in row.urls {
            let index = occurrences.entry(row.part_number.clone()).or_insert(0);
            jobs.push((row.part_number.clone(), *index, cell));
            *index += 1;
        }
    }

    info!(
        "batch downloading {} cells across {} workers",
        jobs.len(),
        cfg.concurrency
    );

    let outcomes: Vec<CellOutcome> = stream::iter(jobs)
        .map(|(part_number, index, cell)| {
            let fetcher = Arc::clone(&fetcher);
            let failure_log = Arc::clone(&failure_log);
            let out_dir = cfg.out_dir.clone();
            async move {
                download_cell(&fetcher, &failure_log, &out_dir, &part_number, index, &cell).await
            }
        })
        .buffer_unordered(cfg.concurrency.max(1))
        .collect()
        .await;

    let mut summary = BatchSummary::default();
    for outcome in outcomes {
        match outcome {
            CellOutcome::Downloaded => summary.downloaded += 1,
            CellOutcome::Skipped => summary.skipped += 1,
            CellOutcome::Failed => summary.failed += 1,
        }
    }

    info!(
        "batch complete: {} downloaded, {} skipped, {} failed",
        summary.downloaded, summary.skipped, summary.failed
    );
    Ok(summary)
}

/// One cell: validate the URL, skip existing outputs, download with retry,
/// and record permanent failures. `index` is the cell's ordinal among all
/// cells sharing its part number, first cell unsuffixed.
async fn download_cell(
    fetcher: &Fetcher,
    failure_log: &FailureLog,
    out_dir: &std::path::Path,
    part_number: &str,
    index: usize,
    raw_url: &str,
) -> CellOutcome {
    let raw = raw_url.trim();
    if raw.is_empty() {
        debug!("skipping empty URL for {part_number}");
        return CellOutcome::Skipped;
    }

    let suffix = if index > 0 {
        format!("_{index}")
    } else {
        String::new()
    };
    let dest = out_dir.join(format!("{}{suffix}.jpg", sanitize_filename(part_number)));
    if dest.exists() {
        info!("{} already exists, skipping", dest.display());
        return CellOutcome::Skipped;
    }

    if !raw.starts_with("http") {
        warn!("invalid URL for {part_number}: {raw}");
        record_failure(failure_log, part_number, raw, "invalid URL").await;
        return CellOutcome::Failed;
    }
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            warn!("invalid URL for {part_number}: {raw}: {e}");
            record_failure(failure_log, part_number, raw, "invalid URL").await;
            return CellOutcome::Failed;
        }
    };

    let body = match fetcher.download_with_retry(&url).await {
        Ok(body) => body,
        Err(e) => {
            warn!("failed to download {url}: {e}");
            record_failure(failure_log, part_number, raw, &e.to_string()).await;
            return CellOutcome::Failed;
        }
    };

    match tokio::fs::write(&dest, &body).await {
        Ok(()) => {
            info!("downloaded {}", dest.display());
            CellOutcome::Downloaded
        }
        Err(e) => {
            warn!("writing {} failed: {e}", dest.display());
            record_failure(failure_log, part_number, raw, "write error").await;
            CellOutcome::Failed
        }
    }
}

async fn record_failure(failure_log: &FailureLog, part_number: &str, url: &str, reason: &str) {
    if let Err(e) = failure_log.record(part_number, url, reason).await {
        warn!("recording failure for {part_number} failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename(r#"AB:12/34|x?*"#), "AB_12_34_x__");
        assert_eq!(sanitize_filename("plain-123"), "plain-123");
        assert_eq!(sanitize_filename(r#"a<b>c"d\e"#), "a_b_c_d_e");
    }

    #[tokio::test]
    async fn failure_log_appends_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed_downloads.csv");
        let log = FailureLog::new(&path);
        log.record("A100", "http://x/1.jpg", "status 404").await.unwrap();
        log.record("B200", "nota url", "invalid URL").await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents.lines().collect::<Vec<_>>(),
            vec![
                "part_number,image_url,reason",
                "A100,http://x/1.jpg,status 404",
                "B200,nota url,invalid URL"
            ]
        );
    }
}
