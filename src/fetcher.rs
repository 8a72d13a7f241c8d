//! Image downloads with bounded retries and content-type validation.

use crate::config::DownloadConfig;
use crate::error::{DownloadError, ValidationError};
use std::path::Path;
use tracing::{info, warn};
use url::Url;

/// Downloads image URLs for one identifier and writes them to storage.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    /// Origin that `/`-relative URLs resolve against. The batch pipeline
    /// runs without one and accepts absolute URLs only.
    origin: Option<Url>,
    cfg: DownloadConfig,
}

impl Fetcher {
    pub fn new(origin: Option<Url>, cfg: DownloadConfig) -> Self {
        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                  AppleWebKit/537.36 (KHTML, like Gecko) \
                  Chrome/131.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(ua)
            .build()
            .unwrap_or_default();

        Self { client, origin, cfg }
    }

    /// Resolve a raw image URL before any transport call: site-relative
    /// paths join the configured origin, everything else must parse as an
    /// absolute http(s) URL.
    pub fn resolve(&self, raw: &str) -> Result<Url, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::BlankUrl);
        }
        if raw.starts_with('/') {
            let origin = self
                .origin
                .as_ref()
                .ok_or_else(|| ValidationError::NoOrigin(raw.to_string()))?;
            return origin.join(raw).map_err(|e| ValidationError::Url {
                url: raw.to_string(),
                reason: e.to_string(),
            });
        }
        let url = Url::parse(raw).map_err(|e| ValidationError::Url {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ValidationError::Url {
                url: raw.to_string(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }
        Ok(url)
    }

    /// Download every URL at its 1-based position and write the survivors to
    /// `{out_dir}/{part_number}_{position}.jpg`. Returns the number written;
    /// individual failures are logged and skipped.
    pub async fn fetch_all(&self, part_number: &str, urls: &[String], out_dir: &Path) -> u32 {
        let mut written = 0;
        for (index, raw) in urls.iter().enumerate() {
            let position = index + 1;
            let url = match self.resolve(raw) {
                Ok(url) => url,
                Err(e) => {
                    warn!("{part_number}: skipping image {position}: {e}");
                    continue;
                }
            };
            let body = match self.download_with_retry(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(
                        "{part_number}: giving up on {url} after {} attempts: {e}",
                        self.cfg.retries
                    );
                    continue;
                }
            };
            let dest = out_dir.join(format!("{part_number}_{position}.jpg"));
            match tokio::fs::write(&dest, &body).await {
                Ok(()) => {
                    info!("downloaded {}", dest.display());
                    written += 1;
                }
                Err(e) => warn!("{part_number}: writing {} failed: {e}", dest.display()),
            }
        }
        written
    }

    /// One URL through the attempt budget with a fixed inter-attempt delay.
    /// Shared by the scrape and batch pipelines.
    pub async fn download_with_retry(&self, url: &Url) -> Result<Vec<u8>, DownloadError> {
        let attempts = self.cfg.retries.max(1);
        let mut last = DownloadError::Timeout;
        for attempt in 1..=attempts {
            match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!("attempt {attempt}/{attempts} for {url} failed: {e}");
                    last = e;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.cfg.retry_delay).await;
            }
        }
        Err(last)
    }

    /// A single attempt succeeds only on a success status whose declared
    /// content type contains "image". The payload is written as-is later;
    /// this is heuristic validation, not a decode.
    async fn attempt(&self, url: &Url) -> Result<Vec<u8>, DownloadError> {
        let response = match self
            .client
            .get(url.clone())
            .timeout(self.cfg.request_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Err(DownloadError::Timeout),
            Err(e) => return Err(DownloadError::Transport(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("image") {
            return Err(DownloadError::ContentType(content_type));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DownloadError::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }
}
