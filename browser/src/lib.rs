//! Headless Chromium rank source.
//!
//! Each fetch launches a fresh browser, loads the app's leaderboard page,
//! waits for the ranking table to render and reads the category and rank
//! cells of every row. The browser is shut down before the fetch returns,
//! on success and on failure.

#![deny(clippy::print_stdout, clippy::print_stderr)]

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use rankwatch_tracker::{
    RankSource, Result, ScrapeConfig, ScrapeResult, TableRow, TrackedApp, TrackerError,
    extract_ranks,
};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// [`RankSource`] backed by a headless Chromium.
#[derive(Debug, Clone)]
pub struct ChromiumRankSource {
    config: ScrapeConfig,
}

impl ChromiumRankSource {
    pub fn new(config: ScrapeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RankSource for ChromiumRankSource {
    async fn fetch_ranks(&self, app: &TrackedApp) -> Result<ScrapeResult> {
        let mut session = BrowserSession::launch(&self.config).await?;
        let rows = session.read_table(app, &self.config).await;
        session.close().await;

        let rows = rows?;
        tracing::debug!(app = %app.name, rows = rows.len(), "Ranking table read");
        Ok(extract_ranks(rows, &app.category))
    }
}

/// A launched browser plus the task driving its CDP connection.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(config: &ScrapeConfig) -> Result<Self> {
        let browser_config = browser_config(config)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| TrackerError::scrape(format!("failed to launch browser: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "Browser connection closed");
                    break;
                }
            }
        });

        Ok(Self { browser, handler })
    }

    async fn read_table(&self, app: &TrackedApp, config: &ScrapeConfig) -> Result<Vec<TableRow>> {
        tracing::info!(app = %app.name, url = %app.url, "Loading leaderboard");
        let page = self
            .browser
            .new_page(app.url.as_str())
            .await
            .map_err(|e| TrackerError::scrape(format!("failed to open {}: {e}", app.url)))?;

        wait_for_table(&page, app, config).await?;

        let params = EvaluateParams::builder()
            .expression(table_script(config)?)
            .return_by_value(true)
            .build()
            .map_err(|e| TrackerError::scrape(format!("invalid table script: {e}")))?;
        let cells = page
            .evaluate_expression(params)
            .await
            .map_err(|e| TrackerError::scrape(format!("failed to read ranking table: {e}")))?
            .into_value::<Vec<(Option<String>, Option<String>)>>()
            .map_err(|e| TrackerError::scrape_with_source("unexpected ranking table shape", e))?;

        Ok(rows_from_cells(cells))
    }

    /// Close the browser and reap the process. Failures are only logged.
    async fn close(&mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!(error = %e, "Failed to close browser");
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!(error = %e, "Failed to wait for browser exit");
        }
        self.handler.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

fn browser_config(config: &ScrapeConfig) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport_width, config.viewport_height)
        .viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            ..Viewport::default()
        });
    if config.no_sandbox {
        builder = builder.no_sandbox();
    }
    if let Some(path) = &config.chrome_executable {
        builder = builder.chrome_executable(path);
    }
    builder
        .build()
        .map_err(|e| TrackerError::scrape(format!("invalid browser config: {e}")))
}

/// Poll for the table selector until it matches or the wait runs out.
async fn wait_for_table(page: &Page, app: &TrackedApp, config: &ScrapeConfig) -> Result<()> {
    let waited = config.wait_timeout();
    let deadline = Instant::now() + waited;
    loop {
        if page.find_element(config.table_selector.as_str()).await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(TrackerError::scrape_timeout(&app.name, waited));
        }
        tokio::time::sleep(config.poll_interval()).await;
    }
}

/// Expression returning `[category, rank]` text pairs for every row under
/// the table selector. Missing cells come back as `null`.
fn table_script(config: &ScrapeConfig) -> Result<String> {
    let selector = serde_json::to_string(&config.table_selector)
        .map_err(|e| TrackerError::scrape_with_source("failed to quote table selector", e))?;
    Ok(format!(
        r#"(() => {{
  const body = document.querySelector({selector});
  if (!body) return [];
  const text = (row, i) => (row.children[i] ? row.children[i].textContent : null);
  return Array.from(body.children).map((row) => [text(row, {category}), text(row, {rank})]);
}})()"#,
        category = config.category_column,
        rank = config.rank_column,
    ))
}

fn rows_from_cells(cells: Vec<(Option<String>, Option<String>)>) -> Vec<TableRow> {
    cells
        .into_iter()
        .map(|(category, rank)| TableRow { category, rank })
        .collect()
}
