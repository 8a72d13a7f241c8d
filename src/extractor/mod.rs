//! Extractor capability: one part number in, ordered carousel image URLs out.
//!
//! The trait decouples the scheduler and its tests from any real browser;
//! the production implementation lives in [`chromium`].

pub mod chromium;
pub mod parse;

use crate::error::NavigationError;
use async_trait::async_trait;

/// Drives the site's search flow for one identifier.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Returns the carousel image URLs in DOM order. An empty list means
    /// the search completed with no images; that is not a failure.
    async fn extract(&self, part_number: &str) -> Result<Vec<String>, NavigationError>;
}

/// Outcome of the best-effort overlay dismissal. The overlay may simply be
/// absent, so this is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dismissal {
    Dismissed,
    Absent,
}
