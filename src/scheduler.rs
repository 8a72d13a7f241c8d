//! Ledger diff plus bounded fan-out of extract→fetch→record workers.

use crate::config::ScrapeConfig;
use crate::extractor::Extractor;
use crate::fetcher::Fetcher;
use crate::ledger::Ledger;
use crate::worklist;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a finished run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Identifiers extracted, downloaded, and recorded in the ledger.
    pub completed: usize,
    /// Identifiers whose search succeeded with no images. Not recorded, so
    /// they are retried on the next run.
    pub no_images: usize,
    /// Identifiers that failed extraction or recording this run.
    pub failed: usize,
    /// Identifiers already in the ledger at startup.
    pub skipped: usize,
}

enum WorkOutcome {
    Completed,
    NoImages,
    Failed,
}

/// The work list diffed against the ledger.
#[derive(Debug)]
pub struct WorkPlan {
    /// Identifiers not yet in the ledger, duplicates dropped.
    pub pending: Vec<String>,
    /// Identifiers already in the ledger.
    pub skipped: usize,
}

/// Diff the work list against the ledger. Cheap, no browser involved, so
/// callers can decide whether launching one is worth it at all.
pub fn plan(cfg: &ScrapeConfig, ledger: &Ledger) -> Result<WorkPlan> {
    let completed = ledger.load().context("loading ledger")?;
    let identifiers = worklist::read_part_numbers(&cfg.work_list)?;

    let mut skipped = 0;
    let mut pending: Vec<String> = Vec::new();
    for id in identifiers {
        if completed.contains_key(&id) {
            info!("skipping already processed: {id}");
            skipped += 1;
        } else if pending.contains(&id) {
            // A duplicate would race its twin to a second ledger row.
            debug!("dropping duplicate work-list entry {id}");
        } else {
            pending.push(id);
        }
    }
    Ok(WorkPlan { pending, skipped })
}

/// Run the scrape pipeline: diff the work list against the ledger and fan
/// the remainder across a bounded pool of workers.
pub async fn run(
    cfg: &ScrapeConfig,
    extractor: Arc<dyn Extractor>,
    fetcher: Arc<Fetcher>,
    ledger: Arc<Ledger>,
) -> Result<RunSummary> {
    let plan = plan(cfg, &ledger)?;
    run_plan(cfg, plan, extractor, fetcher, ledger).await
}

/// Fan a prepared [`WorkPlan`] across the worker pool.
pub async fn run_plan(
    cfg: &ScrapeConfig,
    plan: WorkPlan,
    extractor: Arc<dyn Extractor>,
    fetcher: Arc<Fetcher>,
    ledger: Arc<Ledger>,
) -> Result<RunSummary> {
    let WorkPlan { pending, skipped } = plan;
    let mut summary = RunSummary {
        skipped,
        ..RunSummary::default()
    };

    if pending.is_empty() {
        info!("no unprocessed part numbers found");
        return Ok(summary);
    }

    std::fs::create_dir_all(&cfg.out_dir)
        .with_context(|| format!("creating output directory {}", cfg.out_dir.display()))?;

    info!(
        "processing {} part numbers across {} workers",
        pending.len(),
        cfg.concurrency
    );

    let outcomes: Vec<WorkOutcome> = stream::iter(pending)
        .map(|id| {
            let extractor = Arc::clone(&extractor);
            let fetcher = Arc::clone(&fetcher);
            let ledger = Arc::clone(&ledger);
            let out_dir = cfg.out_dir.clone();
            async move { process_one(&id, extractor.as_ref(), &fetcher, &ledger, &out_dir).await }
        })
        .buffer_unordered(cfg.concurrency.max(1))
        .collect()
        .await;

    for outcome in outcomes {
        match outcome {
            WorkOutcome::Completed => summary.completed += 1,
            WorkOutcome::NoImages => summary.no_images += 1,
            WorkOutcome::Failed => summary.failed += 1,
        }
    }

    info!(
        "run complete: {} completed, {} without images, {} failed, {} skipped",
        summary.completed, summary.no_images, summary.failed, summary.skipped
    );
    Ok(summary)
}

/// One worker's full sequence for one identifier. Every failure is absorbed
/// here so siblings and the pool keep running.
async fn process_one(
    part_number: &str,
    extractor: &dyn Extractor,
    fetcher: &Fetcher,
    ledger: &Ledger,
    out_dir: &Path,
) -> WorkOutcome {
    info!("processing part number: {part_number}");

    let urls = match extractor.extract(part_number).await {
        Ok(urls) => urls,
        Err(e) => {
            warn!("{part_number}: extraction failed: {e}");
            return WorkOutcome::Failed;
        }
    };

    if urls.is_empty() {
        // Deliberately unrecorded: the identifier is retried next run.
        info!("no images found for {part_number}");
        return WorkOutcome::NoImages;
    }

    let count = fetcher.fetch_all(part_number, &urls, out_dir).await;
    match ledger.append(part_number, count).await {
        Ok(()) => WorkOutcome::Completed,
        Err(e) => {
            warn!("{part_number}: recording completion failed: {e}");
            WorkOutcome::Failed
        }
    }
}
