//! Error taxonomy for the pipeline.
//!
//! Per-identifier and per-URL failures are typed so workers can log them and
//! move on; only ledger parse failures and output-directory creation are
//! fatal to a run, and those surface as `anyhow` errors at the CLI boundary.

use std::time::Duration;

/// The stages of the browser flow whose timeout is fatal to one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStage {
    OpenSearch,
    SubmitQuery,
    AwaitResults,
}

impl std::fmt::Display for NavStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NavStage::OpenSearch => "search trigger",
            NavStage::SubmitQuery => "search input",
            NavStage::AwaitResults => "results carousel",
        };
        f.write_str(name)
    }
}

/// A required UI stage never reached its ready condition. Fatal to that
/// identifier's extraction, never to the run.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("could not open a browser page: {0}")]
    Session(String),

    #[error("{stage} not ready within {timeout:?}")]
    StageTimeout { stage: NavStage, timeout: Duration },

    #[error("{stage} interaction failed: {reason}")]
    Interaction { stage: NavStage, reason: String },
}

/// One download attempt failed. Retried up to the attempt budget, after
/// which the URL is skipped. `Display` strings double as failure-log reasons.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("timed out")]
    Timeout,

    #[error("request error: {0}")]
    Transport(String),

    #[error("status {0}")]
    Status(u16),

    #[error("content type {0:?} is not an image")]
    ContentType(String),
}

/// Unusable identifier or URL. Skipped with a log line, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid URL {url:?}: {reason}")]
    Url { url: String, reason: String },

    #[error("blank URL")]
    BlankUrl,

    #[error("relative URL {0:?} with no origin configured")]
    NoOrigin(String),
}
