//! Headless Chromium driven over the DevTools protocol.
//!
//! `headless_chrome` is blocking, so every browser call runs on the blocking
//! pool. Each session launches its own browser process; dropping the
//! [`Browser`] kills it.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use tracing::debug;

use super::{RenderSession, Renderer};
use crate::error::FetchError;

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";
const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";

const CHROME_ARGS: &[&str] = &[
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-sync",
    "--no-first-run",
    "--no-default-browser-check",
    "--mute-audio",
];

#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    executable: Option<PathBuf>,
    headless: bool,
    sandbox: bool,
    idle_timeout: Duration,
}

impl ChromeRenderer {
    pub fn from_env() -> Result<Self> {
        let executable = dotenv::var("CHROME_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let headless = dotenv::var("VISIBLE_BROWSER").is_err();
        let sandbox = dotenv::var("CHROME_SANDBOX")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let idle_secs = match dotenv::var("CHROME_IDLE_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid CHROME_IDLE_TIMEOUT_SECS: {raw}"))?,
            Err(_) => 120,
        };

        Ok(Self::new(executable, headless, sandbox, Duration::from_secs(idle_secs)))
    }

    pub fn new(
        executable: Option<PathBuf>,
        headless: bool,
        sandbox: bool,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            executable,
            headless,
            sandbox,
            idle_timeout,
        }
    }

    fn launch_options(&self) -> Result<LaunchOptions<'static>, FetchError> {
        LaunchOptions::default_builder()
            .headless(self.headless)
            .sandbox(self.sandbox)
            .path(self.executable.clone())
            .idle_browser_timeout(self.idle_timeout)
            .args(CHROME_ARGS.iter().map(|arg| OsStr::new(*arg)).collect())
            .build()
            .map_err(|e| FetchError::SessionStart(e.to_string()))
    }
}

/// Run a blocking browser call off the async workers.
async fn blocking<T, F>(op: F) -> Result<T, FetchError>
where
    F: FnOnce() -> Result<T, FetchError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| FetchError::Browser(format!("browser task aborted: {e}")))?
}

fn height_from_value(value: Option<Value>) -> Result<u64, FetchError> {
    let value = value.unwrap_or(Value::Null);
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|h| h.is_finite()).map(|h| h.max(0.0) as u64))
        .ok_or_else(|| FetchError::Browser(format!("non-numeric height {value}")))
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn open(&self) -> Result<Box<dyn RenderSession>, FetchError> {
        let options = self.launch_options()?;
        let (browser, tab) = blocking(move || {
            let browser =
                Browser::new(options).map_err(|e| FetchError::SessionStart(e.to_string()))?;
            let tab = browser
                .new_tab()
                .map_err(|e| FetchError::SessionStart(e.to_string()))?;
            Ok((browser, tab))
        })
        .await?;

        debug!(headless = self.headless, "browser session opened");
        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            tab,
        }))
    }
}

pub struct ChromeSession {
    /// `None` once closed.
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl ChromeSession {
    fn live_tab(&self) -> Result<Arc<Tab>, FetchError> {
        match self.browser {
            Some(_) => Ok(Arc::clone(&self.tab)),
            None => Err(FetchError::Browser("session already closed".to_string())),
        }
    }

    async fn evaluate(&self, script: &'static str) -> Result<Option<Value>, FetchError> {
        let tab = self.live_tab()?;
        blocking(move || {
            tab.evaluate(script, false)
                .map(|object| object.value)
                .map_err(|e| FetchError::Browser(e.to_string()))
        })
        .await
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        let tab = self.live_tab()?;
        let target = url.to_string();
        blocking(move || {
            tab.navigate_to(&target)
                .and_then(|tab| tab.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| FetchError::Navigation {
                    url: target.clone(),
                    reason: e.to_string(),
                })
        })
        .await
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), FetchError> {
        self.evaluate(SCROLL_SCRIPT).await.map(|_| ())
    }

    async fn content_height(&mut self) -> Result<u64, FetchError> {
        height_from_value(self.evaluate(HEIGHT_SCRIPT).await?)
    }

    async fn page_source(&mut self) -> Result<String, FetchError> {
        let tab = self.live_tab()?;
        blocking(move || tab.get_content().map_err(|e| FetchError::Browser(e.to_string()))).await
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            let closed = tab
                .close(false)
                .map(|_| ())
                .map_err(|e| FetchError::Browser(e.to_string()));
            drop(browser);
            closed
        })
        .await?;
        debug!("browser session closed");
        Ok(())
    }
}
