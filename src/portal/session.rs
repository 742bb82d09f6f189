//! Browser-automation driver for the portal's report form.
//!
//! The portal has no API; every query is one interactive session: navigate,
//! enter the report frame, pick the port, fill the date range, submit, then
//! trigger the client-side XML export and wait for the file to land in a
//! dedicated download directory. The form is externally owned and unversioned,
//! so controls are located heuristically (visible text, value shape) rather
//! than by fixed position, and optional controls are best-effort skips.

use super::errors::PortalError;
use super::export;
use crate::config::Config;
use crate::pipeline::SegmentFetcher;
use crate::range::Segment;
use crate::records::RawShipRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thirtyfour::ChromiumLikeCapabilities;
use thirtyfour::prelude::*;
use tracing::{debug, info, warn};

/// Pause after submit before checking for a rejection alert.
const POST_SUBMIT_ALERT_DELAY: Duration = Duration::from_secs(1);

/// Pause after a successful submit while the result grid renders.
const RESULTS_RENDER_DELAY: Duration = Duration::from_secs(3);

const SET_VALUE_JS: &str =
    "arguments[0].value = arguments[1]; arguments[0].dispatchEvent(new Event('change'));";

/// Drives one complete portal session per segment and parses the export.
///
/// Sessions are heavyweight (a browser process); one is opened per segment
/// and always quit, on every exit path.
pub struct PortalClient {
    webdriver_url: String,
    portal_url: String,
    port_label: String,
    download_dir: PathBuf,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl PortalClient {
    pub fn new(config: &Config) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            portal_url: config.portal_url.clone(),
            port_label: config.port_label.clone(),
            download_dir: config.download_dir.clone(),
            poll_interval: Duration::from_secs(config.export_poll_interval_secs),
            poll_attempts: config.export_poll_attempts,
        }
    }

    /// Launches a headless browser session with a pre-cleared download
    /// directory.
    async fn open_session(&self) -> Result<WebDriver, PortalError> {
        self.reset_download_dir().await?;
        let download_dir = std::path::absolute(&self.download_dir)?;

        let mut caps = DesiredCapabilities::chrome();
        for arg in ["--headless=new", "--no-sandbox", "--disable-dev-shm-usage"] {
            caps.add_arg(arg)
                .map_err(|e| PortalError::SessionStart(e.to_string()))?;
        }
        caps.add_experimental_option(
            "prefs",
            serde_json::json!({
                "download.default_directory": download_dir.display().to_string(),
                "download.prompt_for_download": false,
            }),
        )
        .map_err(|e| PortalError::SessionStart(e.to_string()))?;

        WebDriver::new(&self.webdriver_url, caps)
            .await
            .map_err(|e| PortalError::SessionStart(e.to_string()))
    }

    /// Runs one query session and returns the path of the export artifact.
    async fn run_query(&self, driver: &WebDriver, segment: &Segment) -> Result<PathBuf, PortalError> {
        driver.goto(&self.portal_url).await?;
        self.enter_report_frame(driver).await?;
        self.select_port_tab(driver).await;
        self.fill_date_range(driver, segment).await?;
        self.prepare_filters(driver).await;
        self.submit_query(driver).await?;
        self.trigger_export(driver).await?;
        self.await_export().await
    }

    /// The report form is sometimes embedded in an iframe; enter it if so.
    async fn enter_report_frame(&self, driver: &WebDriver) -> Result<(), PortalError> {
        let frames = driver.find_all(By::Tag("iframe")).await?;
        if let Some(frame) = frames.into_iter().next() {
            frame.enter_frame().await?;
            debug!("entered report iframe");
        }
        Ok(())
    }

    /// Activates the tab selecting the target port. Some portal states arrive
    /// with it pre-selected, so absence is not a failure.
    async fn select_port_tab(&self, driver: &WebDriver) {
        let locator = By::XPath(format!("//*[contains(text(),'{}')]", self.port_label));
        match driver.find(locator).await {
            Ok(tab) => {
                if let Err(e) = click_js(driver, &tab).await {
                    warn!(port = %self.port_label, error = %e, "port tab found but not clickable");
                }
            }
            Err(_) => {
                debug!(port = %self.port_label, "port tab not present, assuming pre-selected");
            }
        }
    }

    /// Overwrites the two date inputs with the segment bounds, dispatching a
    /// `change` event so the page's own validation registers the new values.
    async fn fill_date_range(
        &self,
        driver: &WebDriver,
        segment: &Segment,
    ) -> Result<(), PortalError> {
        let inputs = driver.find_all(By::Tag("input")).await?;
        let mut values = Vec::with_capacity(inputs.len());
        for input in &inputs {
            values.push(input.attr("value").await?);
        }

        let Some((start_idx, end_idx)) = pick_date_inputs(&values) else {
            return Err(PortalError::FormLayout(
                "no date range inputs found on the report form".to_owned(),
            ));
        };
        debug!(start_idx, end_idx, segment = %segment, "filling date range");

        for (idx, stamp) in [
            (start_idx, segment.portal_start()),
            (end_idx, segment.portal_end()),
        ] {
            driver
                .execute(
                    SET_VALUE_JS,
                    vec![inputs[idx].to_json()?, serde_json::Value::String(stamp)],
                )
                .await?;
        }
        Ok(())
    }

    /// Clears pre-checked filter checkboxes and forces the result ordering to
    /// the expected-pilot-time option. Both controls come and go with portal
    /// layout changes; all-miss is a skip.
    async fn prepare_filters(&self, driver: &WebDriver) {
        if let Ok(boxes) = driver.find_all(By::Css("input[type='checkbox']")).await {
            for checkbox in boxes {
                if checkbox.is_selected().await.unwrap_or(false)
                    && let Err(e) = click_js(driver, &checkbox).await
                {
                    debug!(error = %e, "could not clear pre-checked filter checkbox");
                }
            }
        }

        match driver
            .find(By::XPath("//select/option[contains(text(),'預計引水')]"))
            .await
        {
            Ok(option) => {
                if let Err(e) = option.click().await {
                    debug!(error = %e, "ordering option found but not selectable");
                }
            }
            Err(_) => debug!("ordering control not present, keeping portal default"),
        }
    }

    /// Submits the query, turning a modal rejection into a typed error. A
    /// rejected window must be narrowed by the caller, never replayed as-is.
    async fn submit_query(&self, driver: &WebDriver) -> Result<(), PortalError> {
        let button = driver
            .find(By::XPath(
                "//*[contains(@value,'Query') or contains(@value,'查詢')]",
            ))
            .await
            .map_err(|_| {
                PortalError::FormLayout("query submission control not found".to_owned())
            })?;
        click_js(driver, &button).await?;

        tokio::time::sleep(POST_SUBMIT_ALERT_DELAY).await;
        if let Ok(message) = driver.get_alert_text().await {
            if let Err(e) = driver.accept_alert().await {
                warn!(error = %e, "could not dismiss rejection alert");
            }
            return Err(PortalError::QueryRejected(message));
        }

        tokio::time::sleep(RESULTS_RENDER_DELAY).await;
        Ok(())
    }

    /// Activates the XML export control, falling back to the export-menu flow
    /// when no direct control is present.
    async fn trigger_export(&self, driver: &WebDriver) -> Result<(), PortalError> {
        let direct = By::XPath("//*[contains(text(),'XML') or contains(@value,'XML')]");
        if let Ok(button) = driver.find(direct).await {
            click_js(driver, &button).await?;
            return Ok(());
        }

        debug!("no direct XML control, trying export menu");
        let menu = driver
            .find(By::XPath("//*[contains(text(),'匯出') or contains(@title,'Export')]"))
            .await
            .map_err(|_| PortalError::FormLayout("no XML export control found".to_owned()))?;
        click_js(driver, &menu).await?;

        let item = driver
            .find(By::XPath("//*[contains(text(),'XML')]"))
            .await
            .map_err(|_| {
                PortalError::FormLayout("export menu has no XML item".to_owned())
            })?;
        click_js(driver, &item).await?;
        Ok(())
    }

    /// Polls the download directory for the export artifact, newest file
    /// winning, up to the configured attempt bound.
    async fn await_export(&self) -> Result<PathBuf, PortalError> {
        for attempt in 1..=self.poll_attempts {
            tokio::time::sleep(self.poll_interval).await;
            if let Some(path) = newest_export(&self.download_dir).await? {
                debug!(attempt, path = %path.display(), "export artifact materialized");
                return Ok(path);
            }
        }
        Err(PortalError::ExportTimeout {
            attempts: self.poll_attempts,
        })
    }

    /// The directory is exclusively owned by the in-flight session; stale
    /// files from a previous segment would be picked up as false positives.
    async fn reset_download_dir(&self) -> Result<(), PortalError> {
        tokio::fs::create_dir_all(&self.download_dir).await?;
        let mut entries = tokio::fs::read_dir(&self.download_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                warn!(path = %entry.path().display(), error = %e, "could not clear stale download");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SegmentFetcher for PortalClient {
    async fn fetch_segment(&self, segment: &Segment) -> Result<Vec<RawShipRecord>, PortalError> {
        info!(segment = %segment, "opening portal session");
        let driver = self.open_session().await?;

        let outcome = self.run_query(&driver, segment).await;

        // The browser process leaks if the session is not explicitly quit.
        if let Err(e) = driver.quit().await {
            warn!(error = %e, "automation session did not shut down cleanly");
        }

        export::parse_export(&outcome?)
    }
}

/// Clicks through the page's own handler; the portal overlays some controls,
/// which makes native WebDriver clicks flaky.
async fn click_js(
    driver: &WebDriver,
    element: &WebElement,
) -> Result<(), thirtyfour::error::WebDriverError> {
    driver
        .execute("arguments[0].click();", vec![element.to_json()?])
        .await?;
    Ok(())
}

/// Picks the (start, end) date input indices from the form's input values.
///
/// Primary strategy: the first two inputs whose current value looks like a
/// year-prefixed date. Fallback: the first two inputs on the page. All-miss
/// means the form has no usable date controls.
fn pick_date_inputs(values: &[Option<String>]) -> Option<(usize, usize)> {
    let year_prefixed: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, value)| value.as_deref().is_some_and(|v| v.starts_with("20")))
        .map(|(idx, _)| idx)
        .collect();
    if let [start, end, ..] = year_prefixed.as_slice() {
        return Some((*start, *end));
    }
    if values.len() >= 2 {
        return Some((0, 1));
    }
    None
}

async fn newest_export(dir: &Path) -> Result<Option<PathBuf>, PortalError> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_xml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        if !is_xml {
            continue;
        }
        let modified = entry.metadata().await?.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}
