//! Run configuration: site selectors, stage timeouts, and file locations.

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default worker-pool width for the browser scrape pipeline.
pub const SCRAPE_CONCURRENCY: usize = 10;

/// Default worker-pool width for the known-URL batch pipeline.
pub const BATCH_CONCURRENCY: usize = 50;

/// Everything site-specific the extractor needs: where the search UI lives
/// and which elements gate each stage of the flow.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Entry page loaded at the start of every extraction.
    pub entry_url: String,
    /// Origin that site-relative image URLs are resolved against.
    pub origin: Url,
    /// DOM id of the overlay that may cover the page after load.
    pub overlay_id: String,
    /// CSS selector for the control that opens the search box.
    pub search_trigger: String,
    /// CSS selector for the search text input.
    pub search_input: String,
    /// CSS selector for the carousel container that signals results.
    pub carousel: String,
    /// CSS selector for one carousel slide.
    pub slide: String,
    /// CSS selector for the product image inside a slide.
    pub slide_image: String,
    /// Best-effort wait for the overlay; expiry is not an error.
    pub overlay_timeout: Duration,
    /// Wait for the search trigger and the search input. Expiry is fatal.
    pub search_timeout: Duration,
    /// Wait for the carousel after submitting a query. The container renders
    /// even for zero matches, so expiry means the page never responded.
    pub results_timeout: Duration,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            entry_url: "https://www.supersprint.com/en-us/default.aspx".into(),
            origin: Url::parse("https://www.supersprint.com").expect("static origin"),
            overlay_id: "ctl00_ContentPlaceHolder13_ctl01_mainWrap".into(),
            search_trigger: "a.search-icon-container".into(),
            search_input: "input.input-search-box".into(),
            carousel: ".swiper-container".into(),
            slide: "div.swiper-slide".into(),
            slide_image: "img.system-components-pack-item-image".into(),
            overlay_timeout: Duration::from_secs(5),
            search_timeout: Duration::from_secs(10),
            results_timeout: Duration::from_secs(20),
        }
    }
}

/// Retry and timeout budget for one image download.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Attempts per URL before it is skipped.
    pub retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Per-request transport timeout.
    pub request_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Configuration for one browser scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub site: SiteConfig,
    /// CSV work list with a `part_number` column.
    pub work_list: PathBuf,
    /// Append-only ledger of completed part numbers.
    pub ledger_path: PathBuf,
    /// Directory downloaded images are written to.
    pub out_dir: PathBuf,
    /// Concurrent workers, each owning a private browser page.
    pub concurrency: usize,
    pub download: DownloadConfig,
}

/// Configuration for one known-URL batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// CSV with a `part_number` column plus one or more URL columns.
    pub input: PathBuf,
    pub out_dir: PathBuf,
    /// CSV receiving one row per permanently failed URL.
    pub failure_log: PathBuf,
    pub concurrency: usize,
    pub download: DownloadConfig,
}
