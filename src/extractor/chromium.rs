//! Chromium-backed extractor using chromiumoxide.
//!
//! One headless browser process is shared by all workers; every extraction
//! runs in its own page, released on all exit paths by [`PageGuard`].

use super::{Dismissal, Extractor};
use crate::config::SiteConfig;
use crate::error::{NavStage, NavigationError};
use crate::extractor::parse;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use chromiumoxide::Element;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const ENTRY_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. PARTGRAB_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("PARTGRAB_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    if let Ok(path) = which::which("google-chrome") {
        return Some(path);
    }
    if let Ok(path) = which::which("chromium") {
        return Some(path);
    }
    if let Ok(path) = which::which("chromium-browser") {
        return Some(path);
    }

    // 3. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-backed [`Extractor`].
pub struct ChromiumExtractor {
    browser: Browser,
    site: SiteConfig,
}

impl ChromiumExtractor {
    /// Launch a headless Chromium instance shared by all workers.
    pub async fn launch(site: SiteConfig) -> Result<Self> {
        let chrome_path = find_chromium().context(
            "Chromium not found. Set PARTGRAB_CHROMIUM_PATH or install google-chrome.",
        )?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self { browser, site })
    }
}

#[async_trait]
impl Extractor for ChromiumExtractor {
    async fn extract(&self, part_number: &str) -> Result<Vec<String>, NavigationError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| NavigationError::Session(e.to_string()))?;
        let guard = PageGuard::new(page);

        let urls = run_flow(guard.page(), &self.site, part_number).await;
        guard.close().await;
        urls
    }
}

/// The fixed UI sequence: open, dismiss overlay, open search, submit the
/// part number, wait for the carousel, parse the rendered markup.
async fn run_flow(
    page: &Page,
    site: &SiteConfig,
    part_number: &str,
) -> Result<Vec<String>, NavigationError> {
    // Open. The site renders client-side after a round trip; the staged
    // waits below gate on readiness, so the load signal itself is not fatal.
    match tokio::time::timeout(ENTRY_LOAD_TIMEOUT, page.goto(site.entry_url.clone())).await {
        Ok(Ok(_)) => {
            let _ = page.wait_for_navigation().await;
        }
        Ok(Err(e)) => warn!("{part_number}: entry page load failed: {e}"),
        Err(_) => warn!("{part_number}: entry page still loading after {ENTRY_LOAD_TIMEOUT:?}"),
    }

    // DismissOverlay, best effort. Hidden via JS rather than clicked: the
    // overlay intercepts clicks aimed at anything underneath it.
    match dismiss_overlay(page, site).await {
        Dismissal::Dismissed => debug!("{part_number}: overlay hidden"),
        Dismissal::Absent => debug!(
            "{part_number}: no overlay within {:?}, continuing",
            site.overlay_timeout
        ),
    }

    // OpenSearch
    wait_and_click(page, &site.search_trigger, site.search_timeout, NavStage::OpenSearch).await?;

    // SubmitQuery
    let input = wait_for_element(page, &site.search_input, site.search_timeout)
        .await
        .ok_or(NavigationError::StageTimeout {
            stage: NavStage::SubmitQuery,
            timeout: site.search_timeout,
        })?;
    let interaction = |e: CdpError| NavigationError::Interaction {
        stage: NavStage::SubmitQuery,
        reason: e.to_string(),
    };
    // Clear any residual value before typing.
    input
        .call_js_fn("function() { this.value = ''; }", false)
        .await
        .map_err(interaction)?;
    input.focus().await.map_err(interaction)?;
    input.type_str(part_number).await.map_err(interaction)?;
    input.press_key("Enter").await.map_err(interaction)?;

    // AwaitResults. The container renders even for zero matches, so a
    // timeout means the page never responded, not an empty result.
    wait_for_element(page, &site.carousel, site.results_timeout)
        .await
        .ok_or(NavigationError::StageTimeout {
            stage: NavStage::AwaitResults,
            timeout: site.results_timeout,
        })?;

    // Parse off the async runtime; scraper's DOM types are not Send.
    let html: String = page
        .evaluate("document.documentElement.outerHTML")
        .await
        .map_err(|e| NavigationError::Interaction {
            stage: NavStage::AwaitResults,
            reason: format!("reading page markup: {e}"),
        })?
        .into_value()
        .map_err(|e| NavigationError::Interaction {
            stage: NavStage::AwaitResults,
            reason: format!("decoding page markup: {e:?}"),
        })?;
    let slide = site.slide.clone();
    let slide_image = site.slide_image.clone();
    let urls =
        tokio::task::spawn_blocking(move || parse::carousel_image_urls(&html, &slide, &slide_image))
            .await
            .unwrap_or_default();
    Ok(urls)
}

async fn dismiss_overlay(page: &Page, site: &SiteConfig) -> Dismissal {
    let selector = format!("#{}", site.overlay_id);
    if wait_for_element(page, &selector, site.overlay_timeout)
        .await
        .is_none()
    {
        return Dismissal::Absent;
    }
    let script = format!(
        "document.getElementById('{}').style.display = 'none';",
        site.overlay_id
    );
    match page.evaluate(script).await {
        Ok(_) => Dismissal::Dismissed,
        Err(e) => {
            warn!("hiding overlay failed: {e}");
            Dismissal::Absent
        }
    }
}

/// Poll `attempt` until it yields a value or the budget runs out. The last
/// sleep is clamped to the deadline so one final attempt runs at the
/// deadline itself and the stage gets its full budget.
async fn poll_until<T, F, Fut>(timeout: Duration, mut attempt: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(value) = attempt().await {
            return Some(value);
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return None;
        }
        tokio::time::sleep_until(deadline.min(now + POLL_INTERVAL)).await;
    }
}

/// Poll until the selector matches an element or the deadline passes.
async fn wait_for_element(page: &Page, selector: &str, timeout: Duration) -> Option<Element> {
    poll_until(timeout, || async move {
        page.find_element(selector).await.ok()
    })
    .await
}

/// Poll until the element is present and accepts a click. Click errors count
/// as "not clickable yet" and are retried until the deadline.
async fn wait_and_click(
    page: &Page,
    selector: &str,
    timeout: Duration,
    stage: NavStage,
) -> Result<(), NavigationError> {
    poll_until(timeout, || async move {
        match page.find_element(selector).await {
            Ok(el) => el.click().await.ok().map(|_| ()),
            Err(_) => None,
        }
    })
    .await
    .ok_or(NavigationError::StageTimeout { stage, timeout })
}

/// RAII guard releasing the page on every exit path. chromiumoxide pages
/// have no `Drop` of their own and leak CDP targets unless closed, so the
/// fallback path spawns the close onto the runtime captured at construction.
struct PageGuard {
    page: Option<Page>,
    handle: tokio::runtime::Handle,
}

impl PageGuard {
    fn new(page: Page) -> Self {
        Self {
            page: Some(page),
            handle: tokio::runtime::Handle::current(),
        }
    }

    fn page(&self) -> &Page {
        self.page.as_ref().expect("page already closed")
    }

    async fn close(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("closing page: {e}");
            }
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            self.handle.spawn(async move {
                let _ = page.close().await;
            });
        }
    }
}
